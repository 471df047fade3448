/*
 * context.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! Lookup scopes for template evaluation.
//!
//! A [`Context`] is a tree of named entries. Entries may hold plain values,
//! already resolved values, nested scopes, unevaluated template collections
//! (evaluated lazily against the root context on first access), or a marker
//! saying the value is only produced in a later phase.

use crate::actions::ActionsView;
use crate::collection::ParsedNode;
use crate::error::{TemplateResult, key_not_found_message};
use crate::lazy;
use crate::options::EvalOptions;
use crate::resolved::Resolved;
use crate::value::TemplateValue;
use indexmap::IndexMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Context {
    Bag(ContextBag),
    /// Scopes searched in order; the first scope that has the first path
    /// segment wins.
    Chain(Vec<Arc<Context>>),
    Actions(ActionsView),
}

#[derive(Debug, Clone)]
pub enum ContextEntry {
    Value(TemplateValue),
    Resolved(Resolved),
    Scope(Arc<Context>),
    Template(Arc<ParsedNode>),
    AvailableLater,
}

/// Named entries, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ContextBag {
    entries: IndexMap<String, ContextEntry>,
}

impl ContextBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: ContextEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<TemplateValue>) -> Self {
        self.insert(key, ContextEntry::Value(value.into()));
        self
    }

    pub fn with_resolved(mut self, key: impl Into<String>, value: Resolved) -> Self {
        self.insert(key, ContextEntry::Resolved(value));
        self
    }

    pub fn with_scope(mut self, key: impl Into<String>, scope: Context) -> Self {
        self.insert(key, ContextEntry::Scope(Arc::new(scope)));
        self
    }

    pub fn with_template(mut self, key: impl Into<String>, node: Arc<ParsedNode>) -> Self {
        self.insert(key, ContextEntry::Template(node));
        self
    }

    pub fn with_available_later(mut self, key: impl Into<String>) -> Self {
        self.insert(key, ContextEntry::AvailableLater);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ContextEntry> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

impl From<ContextBag> for Context {
    fn from(bag: ContextBag) -> Self {
        Context::Bag(bag)
    }
}

/// Outcome of a context lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    Found(Resolved),
    /// The key exists but its value is produced in a later phase.
    AvailableLater,
    NotFound(KeyNotFound),
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyNotFound {
    pub key_path: Vec<String>,
    /// Index of the first segment that did not resolve.
    pub failed_index: usize,
    /// Keys present where the lookup failed.
    pub available_keys: Vec<String>,
}

impl KeyNotFound {
    pub fn message(&self) -> String {
        key_not_found_message(&self.key_path, self.failed_index, &self.available_keys)
    }

    pub fn failed_key(&self) -> &str {
        &self.key_path[self.failed_index]
    }
}

impl Context {
    /// A bag holding the members of an object value. Other values give an
    /// empty context.
    pub fn from_value(value: TemplateValue) -> Self {
        let mut bag = ContextBag::new();
        if let TemplateValue::Object(map) = value {
            for (key, value) in map {
                bag.insert(key, ContextEntry::Value(value));
            }
        }
        Context::Bag(bag)
    }

    pub fn chain(scopes: Vec<Arc<Context>>) -> Self {
        Context::Chain(scopes)
    }

    /// Top-level keys. Chains list the union, first occurrence first.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Context::Bag(bag) => bag.keys().cloned().collect(),
            Context::Chain(scopes) => {
                let mut keys: Vec<String> = Vec::new();
                for key in scopes.iter().flat_map(|scope| scope.keys()) {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                keys
            }
            Context::Actions(view) => view.keys(),
        }
    }

    fn has_key(&self, key: &str) -> bool {
        match self {
            Context::Bag(bag) => bag.get(key).is_some(),
            Context::Chain(scopes) => scopes.iter().any(|scope| scope.has_key(key)),
            Context::Actions(view) => view.keys().iter().any(|k| k == key),
        }
    }

    /// Resolve a key path. Template entries are evaluated against this
    /// context, which acts as the root.
    pub fn lookup(self: &Arc<Self>, path: &[String], opts: &EvalOptions) -> TemplateResult<LookupResult> {
        if path.is_empty() {
            return self.materialize(self, &[], opts);
        }
        self.lookup_at(self, path, 0, opts)
    }

    /// Resolve `path[pos..]` in this scope.
    pub(crate) fn lookup_at(
        &self,
        root: &Arc<Context>,
        path: &[String],
        pos: usize,
        opts: &EvalOptions,
    ) -> TemplateResult<LookupResult> {
        let key = &path[pos];
        match self {
            Context::Actions(view) => Ok(view.lookup_at(path, pos)),
            Context::Chain(scopes) => match scopes.iter().find(|scope| scope.has_key(key)) {
                Some(scope) => scope.lookup_at(root, path, pos, opts),
                None => Ok(not_found(path, pos, self.keys())),
            },
            Context::Bag(bag) => {
                let Some(entry) = bag.get(key) else {
                    return Ok(not_found(path, pos, self.keys()));
                };
                match entry {
                    ContextEntry::Value(value) => Ok(descend_value(value, path, pos + 1)),
                    ContextEntry::Resolved(value) => Ok(descend_resolved(value, path, pos + 1)),
                    ContextEntry::Scope(scope) if pos + 1 == path.len() => {
                        scope.materialize(root, &path[..=pos], opts)
                    }
                    ContextEntry::Scope(scope) => scope.lookup_at(root, path, pos + 1, opts),
                    ContextEntry::Template(node) => {
                        lazy::lookup_in_node(node, root, path, pos + 1, opts)
                    }
                    ContextEntry::AvailableLater => Ok(LookupResult::AvailableLater),
                }
            }
        }
    }

    /// Resolve every key of this scope into one object.
    fn materialize(
        &self,
        root: &Arc<Context>,
        prefix: &[String],
        opts: &EvalOptions,
    ) -> TemplateResult<LookupResult> {
        let mut map = IndexMap::new();
        for key in self.keys() {
            let mut path = prefix.to_vec();
            path.push(key.clone());
            match self.lookup_at(root, &path, prefix.len(), opts)? {
                LookupResult::Found(value) => {
                    map.insert(key, value);
                }
                other => return Ok(other),
            }
        }
        Ok(LookupResult::Found(Resolved::Object(map)))
    }
}

fn not_found(path: &[String], failed_index: usize, available_keys: Vec<String>) -> LookupResult {
    LookupResult::NotFound(KeyNotFound {
        key_path: path.to_vec(),
        failed_index,
        available_keys,
    })
}

/// Navigate `path[pos..]` inside a plain value.
pub(crate) fn descend_value(value: &TemplateValue, path: &[String], pos: usize) -> LookupResult {
    let mut current = value;
    for (i, key) in path.iter().enumerate().skip(pos) {
        let next = match current {
            TemplateValue::Object(map) => map.get(key),
            TemplateValue::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(next) => current = next,
            None => {
                let available = match current {
                    TemplateValue::Object(map) => map.keys().cloned().collect(),
                    TemplateValue::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
                    _ => Vec::new(),
                };
                return not_found(path, i, available);
            }
        }
    }
    LookupResult::Found(Resolved::from_value(current.clone()))
}

/// Navigate `path[pos..]` inside a resolved value.
pub(crate) fn descend_resolved(value: &Resolved, path: &[String], pos: usize) -> LookupResult {
    let mut current = value;
    for (i, key) in path.iter().enumerate().skip(pos) {
        match current.get(key) {
            Some(next) => current = next,
            None => return not_found(path, i, current.keys()),
        }
    }
    LookupResult::Found(current.clone())
}
