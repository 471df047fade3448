/*
 * lazy.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! Lazy evaluation of parsed collections.
//!
//! A [`LazyValue`] evaluates one level at a time: object members and array
//! items come back as further lazy values, so reading `var.a.b` never
//! evaluates `var.c`. Directives are expanded at the level they appear.

use crate::collection::{
    ArrayItem, CONCAT_KEY, FOR_EACH_KEY, ForEachDirective, IF_KEY, MERGE_KEY, ObjectEntry,
    ParsedNode, ParsedValue,
};
use crate::context::{Context, ContextBag, KeyNotFound, LookupResult};
use crate::error::{TemplateError, TemplateResult};
use crate::evaluator::{TemplateOutcome, evaluate_template};
use crate::options::EvalOptions;
use crate::resolved::{Inputs, Resolved, TemplateLeaf};
use crate::value::TemplateValue;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::trace;

/// A value that is evaluated on demand.
#[derive(Debug, Clone)]
pub struct LazyValue(Inner);

#[derive(Debug, Clone)]
enum Inner {
    Node {
        node: Arc<ParsedNode>,
        context: Arc<Context>,
        /// Inputs of enclosing conditions and loop items.
        inherited: Inputs,
    },
    Override {
        base: Box<LazyValue>,
        path: Vec<String>,
        value: Box<LazyValue>,
    },
    Settled(Resolved),
}

/// One level of an evaluated value.
#[derive(Debug, Clone)]
pub enum Evaluated {
    Leaf(TemplateLeaf),
    Array(Vec<LazyValue>),
    Object(IndexMap<String, LazyValue>),
}

impl Evaluated {
    fn type_name(&self) -> &'static str {
        match self {
            Evaluated::Leaf(TemplateLeaf { value: None, .. }) => "undefined",
            Evaluated::Leaf(TemplateLeaf {
                value: Some(value), ..
            }) => value.type_name(),
            Evaluated::Array(_) => "array",
            Evaluated::Object(_) => "object",
        }
    }

    fn split(resolved: Resolved) -> Self {
        match resolved {
            Resolved::Leaf(leaf) => Evaluated::Leaf(leaf),
            Resolved::Array(items) => {
                Evaluated::Array(items.into_iter().map(LazyValue::settled).collect())
            }
            Resolved::Object(map) => Evaluated::Object(
                map.into_iter()
                    .map(|(k, v)| (k, LazyValue::settled(v)))
                    .collect(),
            ),
        }
    }
}

/// Shallow result. `Deferred` holds the raw document value of a node that
/// could not be resolved yet.
enum Shallow {
    Done(Evaluated),
    Deferred(TemplateValue),
}

/// What to do with deferred nodes during deep evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferral {
    /// Keep the raw value in the output.
    Render,
    /// Give up and report the whole value as deferred.
    Propagate,
}

impl LazyValue {
    pub fn new(node: Arc<ParsedNode>, context: Arc<Context>) -> Self {
        Self::with_inherited(node, context, Inputs::new())
    }

    fn with_inherited(node: Arc<ParsedNode>, context: Arc<Context>, inherited: Inputs) -> Self {
        LazyValue(Inner::Node {
            node,
            context,
            inherited,
        })
    }

    /// An already resolved value.
    pub fn settled(value: Resolved) -> Self {
        LazyValue(Inner::Settled(value))
    }

    /// Replace the value at `path` (creating objects along the way) without
    /// evaluating anything else.
    pub fn with_override(self, path: Vec<String>, value: LazyValue) -> Self {
        if path.is_empty() {
            return value;
        }
        LazyValue(Inner::Override {
            base: Box::new(self),
            path,
            value: Box::new(value),
        })
    }

    /// Evaluate one level. Values that cannot be resolved yet come back as
    /// their raw document value.
    pub fn evaluate(&self, opts: &EvalOptions) -> TemplateResult<Evaluated> {
        match self.shallow(opts)? {
            Shallow::Done(evaluated) => Ok(evaluated),
            Shallow::Deferred(raw) => Ok(Evaluated::split(passthrough(raw))),
        }
    }

    /// Evaluate the whole tree.
    pub fn deep_evaluate(&self, opts: &EvalOptions) -> TemplateResult<Resolved> {
        Ok(self
            .deep(opts, Deferral::Render)?
            .unwrap_or_else(Resolved::undefined))
    }

    /// Evaluate the whole tree and strip provenance.
    pub fn deep_evaluate_and_unwrap(
        &self,
        opts: &EvalOptions,
    ) -> TemplateResult<Option<TemplateValue>> {
        Ok(self.deep_evaluate(opts)?.unwrap())
    }

    fn shallow(&self, opts: &EvalOptions) -> TemplateResult<Shallow> {
        match &self.0 {
            Inner::Node {
                node,
                context,
                inherited,
            } => evaluate_node(node, context, inherited, opts),
            Inner::Settled(resolved) => Ok(Shallow::Done(Evaluated::split(resolved.clone()))),
            Inner::Override { base, path, value } => {
                let Some((first, rest)) = path.split_first() else {
                    return value.shallow(opts);
                };
                let replace = |existing: Option<&LazyValue>| {
                    existing
                        .cloned()
                        .unwrap_or_else(empty_object)
                        .with_override(rest.to_vec(), (**value).clone())
                };
                match base.shallow(opts)? {
                    Shallow::Deferred(raw) => Ok(Shallow::Deferred(raw)),
                    Shallow::Done(Evaluated::Object(mut map)) => {
                        let child = replace(map.get(first));
                        map.insert(first.clone(), child);
                        Ok(Shallow::Done(Evaluated::Object(map)))
                    }
                    Shallow::Done(Evaluated::Array(mut items)) => {
                        let Ok(index) = first.parse::<usize>() else {
                            return Err(TemplateError::type_error(format!(
                                "Cannot override key '{first}' of an array (expected a non-negative integer index)"
                            )));
                        };
                        if index > items.len() {
                            return Err(TemplateError::type_error(format!(
                                "Cannot override index {index} of an array of length {}",
                                items.len()
                            )));
                        }
                        // The index right past the end appends.
                        let child = replace(items.get(index));
                        match items.get_mut(index) {
                            Some(slot) => *slot = child,
                            None => items.push(child),
                        }
                        Ok(Shallow::Done(Evaluated::Array(items)))
                    }
                    Shallow::Done(Evaluated::Leaf(TemplateLeaf { value: None, .. })) => {
                        let mut map = IndexMap::new();
                        map.insert(first.clone(), replace(None));
                        Ok(Shallow::Done(Evaluated::Object(map)))
                    }
                    Shallow::Done(leaf @ Evaluated::Leaf(_)) => Err(TemplateError::type_error(format!(
                        "Cannot override key '{first}' of a value of type {}",
                        leaf.type_name()
                    ))),
                }
            }
        }
    }

    /// `None` only with [`Deferral::Propagate`], when something below is
    /// deferred.
    fn deep(&self, opts: &EvalOptions, deferral: Deferral) -> TemplateResult<Option<Resolved>> {
        match self.shallow(opts)? {
            Shallow::Deferred(raw) => Ok(match deferral {
                Deferral::Render => Some(passthrough(raw)),
                Deferral::Propagate => None,
            }),
            Shallow::Done(Evaluated::Leaf(leaf)) => Ok(Some(Resolved::Leaf(leaf))),
            Shallow::Done(Evaluated::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item.deep(opts, deferral)? {
                        Some(value) => out.push(value),
                        None => return Ok(None),
                    }
                }
                Ok(Some(Resolved::Array(out)))
            }
            Shallow::Done(Evaluated::Object(map)) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (key, value) in map {
                    match value.deep(opts, deferral)? {
                        Some(value) => {
                            out.insert(key, value);
                        }
                        None => return Ok(None),
                    }
                }
                Ok(Some(Resolved::Object(out)))
            }
        }
    }
}

fn empty_object() -> LazyValue {
    LazyValue::settled(Resolved::Object(IndexMap::new()))
}

/// A raw value kept in the output. Strings remember that they are the
/// template as written.
fn passthrough(raw: TemplateValue) -> Resolved {
    match raw {
        TemplateValue::String(s) => Resolved::Leaf(TemplateLeaf {
            expr: Some(s.clone()),
            value: Some(TemplateValue::String(s)),
            inputs: Inputs::new(),
        }),
        other => Resolved::from_value(other),
    }
}

fn directive_type_error(node: &ParsedNode, key: &str, expected: &str, got: &str) -> TemplateError {
    TemplateError::type_error(format!(
        "Value of {key} key must be (or resolve to) {expected} (got {got})"
    ))
    .at_path(&node.path)
    .with_document(node.source.as_ref())
}

/// Evaluate a directive operand fully, for conditions and loop sources.
fn evaluate_operand(
    node: &Arc<ParsedNode>,
    context: &Arc<Context>,
    opts: &EvalOptions,
) -> TemplateResult<Option<Resolved>> {
    LazyValue::new(node.clone(), context.clone()).deep(opts, Deferral::Propagate)
}

fn evaluate_node(
    node: &Arc<ParsedNode>,
    context: &Arc<Context>,
    inherited: &Inputs,
    opts: &EvalOptions,
) -> TemplateResult<Shallow> {
    let child = |child: &Arc<ParsedNode>| {
        LazyValue::with_inherited(child.clone(), context.clone(), inherited.clone())
    };

    match &node.value {
        ParsedValue::Plain => Ok(Shallow::Done(Evaluated::split(
            Resolved::from_value(node.raw.clone()).with_inputs(inherited),
        ))),
        ParsedValue::Template(template) => {
            let outcome = evaluate_template(template, context, opts)
                .map_err(|err| err.at_path(&node.path).with_document(node.source.as_ref()))?;
            match outcome {
                TemplateOutcome::Value(resolved) => Ok(Shallow::Done(Evaluated::split(
                    resolved.with_inputs(inherited),
                ))),
                TemplateOutcome::Deferred => Ok(Shallow::Deferred(node.raw.clone())),
            }
        }
        ParsedValue::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    ArrayItem::Item(node) => out.push(child(node)),
                    ArrayItem::Concat(operand) => {
                        match evaluate_node(operand, context, inherited, opts)? {
                            Shallow::Done(Evaluated::Array(items)) => out.extend(items),
                            Shallow::Done(other) => {
                                return Err(directive_type_error(
                                    operand,
                                    CONCAT_KEY,
                                    "an array",
                                    other.type_name(),
                                ));
                            }
                            Shallow::Deferred(_) => return Ok(Shallow::Deferred(node.raw.clone())),
                        }
                    }
                }
            }
            Ok(Shallow::Done(Evaluated::Array(out)))
        }
        ParsedValue::Object(entries) => {
            let mut map = IndexMap::with_capacity(entries.len());
            for entry in entries {
                match entry {
                    ObjectEntry::Field(key, node) => {
                        map.insert(key.clone(), child(node));
                    }
                    ObjectEntry::Merge(operand) => {
                        match evaluate_node(operand, context, inherited, opts)? {
                            Shallow::Done(Evaluated::Object(merged)) => {
                                // Later keys win but keep the first position.
                                for (key, value) in merged {
                                    map.insert(key, value);
                                }
                            }
                            Shallow::Done(other) => {
                                return Err(directive_type_error(
                                    operand,
                                    MERGE_KEY,
                                    "a map",
                                    other.type_name(),
                                ));
                            }
                            Shallow::Deferred(_) => return Ok(Shallow::Deferred(node.raw.clone())),
                        }
                    }
                }
            }
            Ok(Shallow::Done(Evaluated::Object(map)))
        }
        ParsedValue::ForEach(directive) => {
            expand_for_each(node, directive, context, inherited, opts)
        }
        ParsedValue::If(directive) => {
            let Some(condition) = evaluate_operand(&directive.condition, context, opts)? else {
                return Ok(Shallow::Deferred(node.raw.clone()));
            };
            let Resolved::Leaf(TemplateLeaf {
                value: Some(TemplateValue::Bool(passed)),
                ..
            }) = &condition
            else {
                return Err(directive_type_error(
                    &directive.condition,
                    IF_KEY,
                    "a boolean",
                    condition.type_name(),
                ));
            };
            trace!(path = %node.path, passed, "evaluated $if condition");

            let mut inherited = inherited.clone();
            inherited.extend(condition.collect_inputs());
            let branch = if *passed {
                Some(&directive.then)
            } else {
                directive.otherwise.as_ref()
            };
            match branch {
                Some(branch) => evaluate_node(branch, context, &inherited, opts),
                None => Ok(Shallow::Done(Evaluated::Leaf(TemplateLeaf {
                    value: None,
                    expr: None,
                    inputs: inherited,
                }))),
            }
        }
        ParsedValue::Concat(operand) => match evaluate_node(operand, context, inherited, opts)? {
            Shallow::Done(Evaluated::Array(items)) => Ok(Shallow::Done(Evaluated::Array(items))),
            Shallow::Done(other) => Err(directive_type_error(
                operand,
                CONCAT_KEY,
                "an array",
                other.type_name(),
            )),
            Shallow::Deferred(_) => Ok(Shallow::Deferred(node.raw.clone())),
        },
    }
}

fn expand_for_each(
    node: &Arc<ParsedNode>,
    directive: &ForEachDirective,
    context: &Arc<Context>,
    inherited: &Inputs,
    opts: &EvalOptions,
) -> TemplateResult<Shallow> {
    let Some(source) = evaluate_operand(&directive.source, context, opts)? else {
        return Ok(Shallow::Deferred(node.raw.clone()));
    };

    let pair = |key: TemplateValue, value: Resolved| {
        let mut item = IndexMap::new();
        item.insert("key".to_string(), Resolved::Leaf(TemplateLeaf::plain(key)));
        item.insert("value".to_string(), value);
        Resolved::Object(item)
    };
    let items: Vec<Resolved> = match source {
        Resolved::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, value)| pair(TemplateValue::Number(i as f64), value))
            .collect(),
        Resolved::Object(map) => map
            .into_iter()
            .map(|(key, value)| pair(TemplateValue::String(key), value))
            .collect(),
        other => {
            return Err(directive_type_error(
                &directive.source,
                FOR_EACH_KEY,
                "an array or map",
                other.type_name(),
            ));
        }
    };
    trace!(path = %node.path, items = items.len(), "expanding $forEach");

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let mut item_inputs = inherited.clone();
        item_inputs.extend(item.collect_inputs());
        let scope = Arc::new(Context::from(ContextBag::new().with_resolved("item", item)));
        let item_context = Arc::new(Context::chain(vec![scope, context.clone()]));

        if let Some(filter) = &directive.filter {
            let Some(result) = evaluate_operand(filter, &item_context, opts)? else {
                return Ok(Shallow::Deferred(node.raw.clone()));
            };
            let Resolved::Leaf(TemplateLeaf {
                value: Some(TemplateValue::Bool(keep)),
                ..
            }) = &result
            else {
                return Err(TemplateError::type_error(format!(
                    "$filter clause in $forEach loop must resolve to a boolean value (got {})",
                    result.type_name()
                ))
                .at_path(&filter.path)
                .with_document(filter.source.as_ref()));
            };
            if !keep {
                continue;
            }
            item_inputs.extend(result.collect_inputs());
        }

        match &directive.ret.value {
            ParsedValue::ForEach(_) | ParsedValue::Concat(_) => {
                match evaluate_node(&directive.ret, &item_context, &item_inputs, opts)? {
                    Shallow::Done(Evaluated::Array(items)) => out.extend(items),
                    Shallow::Done(other) => {
                        return Err(directive_type_error(
                            &directive.ret,
                            CONCAT_KEY,
                            "an array",
                            other.type_name(),
                        ));
                    }
                    Shallow::Deferred(_) => return Ok(Shallow::Deferred(node.raw.clone())),
                }
            }
            _ => out.push(LazyValue::with_inherited(
                directive.ret.clone(),
                item_context,
                item_inputs,
            )),
        }
    }
    Ok(Shallow::Done(Evaluated::Array(out)))
}

/// Resolve `path[pos..]` inside a template entry of the context, evaluating
/// only the nodes along the path.
pub(crate) fn lookup_in_node(
    node: &Arc<ParsedNode>,
    root: &Arc<Context>,
    path: &[String],
    pos: usize,
    opts: &EvalOptions,
) -> TemplateResult<LookupResult> {
    let opts = opts.nested()?;
    let mut current = LazyValue::new(node.clone(), root.clone());
    for (i, key) in path.iter().enumerate().skip(pos) {
        let next = match current.shallow(&opts)? {
            Shallow::Deferred(_) => return Ok(LookupResult::AvailableLater),
            Shallow::Done(Evaluated::Object(mut map)) => match map.shift_remove(key) {
                Some(next) => next,
                None => return Ok(miss(path, i, map.keys().cloned().collect())),
            },
            Shallow::Done(Evaluated::Array(mut items)) => {
                match key.parse::<usize>().ok().filter(|i| *i < items.len()) {
                    Some(index) => items.swap_remove(index),
                    None => {
                        return Ok(miss(path, i, (0..items.len()).map(|i| i.to_string()).collect()));
                    }
                }
            }
            Shallow::Done(Evaluated::Leaf(_)) => return Ok(miss(path, i, Vec::new())),
        };
        current = next;
    }
    Ok(match current.deep(&opts, Deferral::Propagate)? {
        Some(value) => LookupResult::Found(value),
        None => LookupResult::AvailableLater,
    })
}

fn miss(path: &[String], failed_index: usize, available_keys: Vec<String>) -> LookupResult {
    LookupResult::NotFound(KeyNotFound {
        key_path: path.to_vec(),
        failed_index,
        available_keys,
    })
}
