/*
 * resolved.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! Resolved values with provenance.
//!
//! Every scalar produced by evaluation is a [`TemplateLeaf`] that remembers
//! which context keys were read to produce it. Downstream consumers hash
//! these inputs to decide whether a configuration changed.

use crate::value::TemplateValue;
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// Context keys read to produce a value, keyed by dotted path
/// (`var.colors.0`).
pub type Inputs = BTreeMap<String, TemplateLeaf>;

/// A scalar result together with its provenance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateLeaf {
    /// A primitive value, or `None` for undefined.
    pub value: Option<TemplateValue>,
    /// Raw template string the value came from, if any.
    pub expr: Option<String>,
    pub inputs: Inputs,
}

impl TemplateLeaf {
    /// A leaf with no provenance.
    pub fn plain(value: TemplateValue) -> Self {
        TemplateLeaf {
            value: Some(value),
            expr: None,
            inputs: Inputs::new(),
        }
    }

    pub fn undefined() -> Self {
        TemplateLeaf::default()
    }
}

/// A fully evaluated tree of leaves.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Leaf(TemplateLeaf),
    Array(Vec<Resolved>),
    Object(IndexMap<String, Resolved>),
}

impl Resolved {
    /// Wrap a plain value; collections become trees of input-free leaves.
    pub fn from_value(value: TemplateValue) -> Self {
        match value {
            TemplateValue::Array(items) => {
                Resolved::Array(items.into_iter().map(Resolved::from_value).collect())
            }
            TemplateValue::Object(map) => Resolved::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Resolved::from_value(v)))
                    .collect(),
            ),
            scalar => Resolved::Leaf(TemplateLeaf::plain(scalar)),
        }
    }

    pub fn undefined() -> Self {
        Resolved::Leaf(TemplateLeaf::undefined())
    }

    /// Strip provenance. Undefined array items and object members are
    /// dropped.
    pub fn unwrap(&self) -> Option<TemplateValue> {
        match self {
            Resolved::Leaf(leaf) => leaf.value.clone(),
            Resolved::Array(items) => Some(TemplateValue::Array(
                items.iter().filter_map(Resolved::unwrap).collect(),
            )),
            Resolved::Object(map) => Some(TemplateValue::Object(
                map.iter()
                    .filter_map(|(k, v)| v.unwrap().map(|v| (k.clone(), v)))
                    .collect(),
            )),
        }
    }

    /// Type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Resolved::Leaf(TemplateLeaf { value: None, .. }) => "undefined",
            Resolved::Leaf(TemplateLeaf {
                value: Some(value), ..
            }) => value.type_name(),
            Resolved::Array(_) => "array",
            Resolved::Object(_) => "object",
        }
    }

    /// Union of the inputs of every leaf in the tree.
    pub fn collect_inputs(&self) -> Inputs {
        let mut inputs = Inputs::new();
        self.collect_inputs_into(&mut inputs);
        inputs
    }

    fn collect_inputs_into(&self, into: &mut Inputs) {
        match self {
            Resolved::Leaf(leaf) => {
                into.extend(leaf.inputs.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Resolved::Array(items) => items.iter().for_each(|item| item.collect_inputs_into(into)),
            Resolved::Object(map) => map.values().for_each(|item| item.collect_inputs_into(into)),
        }
    }

    /// Add `inputs` to every leaf.
    pub fn with_inputs(mut self, inputs: &Inputs) -> Self {
        if !inputs.is_empty() {
            self.add_inputs(inputs);
        }
        self
    }

    fn add_inputs(&mut self, inputs: &Inputs) {
        match self {
            Resolved::Leaf(leaf) => {
                for (k, v) in inputs {
                    leaf.inputs.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
            Resolved::Array(items) => items.iter_mut().for_each(|item| item.add_inputs(inputs)),
            Resolved::Object(map) => map.values_mut().for_each(|item| item.add_inputs(inputs)),
        }
    }

    /// Record that this value was read from the context at `path`: every
    /// leaf gains an input for its own full path, plus that leaf's inputs.
    pub fn tracked(self, path: &str) -> Self {
        match self {
            Resolved::Leaf(leaf) => {
                let mut inputs = leaf.inputs.clone();
                inputs.insert(path.to_string(), leaf.clone());
                Resolved::Leaf(TemplateLeaf {
                    value: leaf.value,
                    expr: leaf.expr,
                    inputs,
                })
            }
            Resolved::Array(items) => Resolved::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| item.tracked(&format!("{path}.{i}")))
                    .collect(),
            ),
            Resolved::Object(map) => Resolved::Object(
                map.into_iter()
                    .map(|(k, v)| {
                        let child = format!("{path}.{k}");
                        (k, v.tracked(&child))
                    })
                    .collect(),
            ),
        }
    }

    /// Keys available at this level, for "not found" messages.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Resolved::Leaf(_) => Vec::new(),
            Resolved::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            Resolved::Object(map) => map.keys().cloned().collect(),
        }
    }

    /// Child by key. Arrays accept decimal indices.
    pub fn get(&self, key: &str) -> Option<&Resolved> {
        match self {
            Resolved::Leaf(_) => None,
            Resolved::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            Resolved::Object(map) => map.get(key),
        }
    }
}

impl From<TemplateLeaf> for Resolved {
    fn from(leaf: TemplateLeaf) -> Self {
        Resolved::Leaf(leaf)
    }
}
