/*
 * actions.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! Action metadata exposed to templates as `actions.<kind>.<name>` and
//! `runtime.<services|tasks>.<name>`.

use crate::context::{KeyNotFound, LookupResult, descend_value};
use crate::value::TemplateValue;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// The closed set of action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    Build,
    Deploy,
    Run,
    Test,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Build,
        ActionKind::Deploy,
        ActionKind::Run,
        ActionKind::Test,
    ];

    /// Parse a kind name, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Build => "Build",
            ActionKind::Deploy => "Deploy",
            ActionKind::Run => "Run",
            ActionKind::Test => "Test",
        }
    }

    /// Key of this kind under `actions`.
    pub fn context_key(self) -> &'static str {
        match self {
            ActionKind::Build => "build",
            ActionKind::Deploy => "deploy",
            ActionKind::Run => "run",
            ActionKind::Test => "test",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind aliases under `runtime`.
pub(crate) fn runtime_kind(key: &str) -> Option<ActionKind> {
    match key {
        "services" => Some(ActionKind::Deploy),
        "tasks" => Some(ActionKind::Run),
        _ => None,
    }
}

/// One action as seen by templates.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEntry {
    pub kind: ActionKind,
    pub name: String,
    pub disabled: bool,
    pub version: String,
    /// `None` until the action has run; its outputs are then only
    /// available in a later phase.
    pub outputs: Option<IndexMap<String, TemplateValue>>,
}

impl ActionEntry {
    pub fn new(kind: ActionKind, name: impl Into<String>) -> Self {
        ActionEntry {
            kind,
            name: name.into(),
            disabled: false,
            version: String::new(),
            outputs: Some(IndexMap::new()),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn with_outputs(mut self, outputs: IndexMap<String, TemplateValue>) -> Self {
        self.outputs = Some(outputs);
        self
    }

    /// Mark the outputs as produced by a later phase.
    pub fn with_outputs_later(mut self) -> Self {
        self.outputs = None;
        self
    }

    fn to_value(&self, outputs: &IndexMap<String, TemplateValue>) -> TemplateValue {
        let mut map = IndexMap::new();
        map.insert("name".to_string(), TemplateValue::String(self.name.clone()));
        map.insert(
            "kind".to_string(),
            TemplateValue::String(self.kind.as_str().to_string()),
        );
        map.insert("disabled".to_string(), TemplateValue::Bool(self.disabled));
        map.insert(
            "version".to_string(),
            TemplateValue::String(self.version.clone()),
        );
        map.insert(
            "outputs".to_string(),
            TemplateValue::Object(outputs.clone()),
        );
        TemplateValue::Object(map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionsNamespace {
    /// `actions.<build|deploy|run|test>.<name>`
    Actions,
    /// `runtime.<services|tasks>.<name>`
    Runtime,
}

/// Read-only view over action metadata.
#[derive(Debug, Clone)]
pub struct ActionsView {
    namespace: ActionsNamespace,
    entries: Arc<Vec<ActionEntry>>,
}

impl ActionsView {
    pub fn actions(entries: Vec<ActionEntry>) -> Self {
        ActionsView {
            namespace: ActionsNamespace::Actions,
            entries: Arc::new(entries),
        }
    }

    pub fn runtime(entries: Vec<ActionEntry>) -> Self {
        ActionsView {
            namespace: ActionsNamespace::Runtime,
            entries: Arc::new(entries),
        }
    }

    pub fn namespace(&self) -> ActionsNamespace {
        self.namespace
    }

    pub fn keys(&self) -> Vec<String> {
        match self.namespace {
            ActionsNamespace::Actions => ActionKind::ALL
                .iter()
                .map(|kind| kind.context_key().to_string())
                .collect(),
            ActionsNamespace::Runtime => vec!["services".to_string(), "tasks".to_string()],
        }
    }

    fn kind_for_key(&self, key: &str) -> Option<ActionKind> {
        match self.namespace {
            ActionsNamespace::Actions => ActionKind::ALL
                .into_iter()
                .find(|kind| kind.context_key() == key),
            ActionsNamespace::Runtime => runtime_kind(key),
        }
    }

    fn of_kind(&self, kind: ActionKind) -> impl Iterator<Item = &ActionEntry> {
        self.entries.iter().filter(move |entry| entry.kind == kind)
    }

    /// Look up `path[pos..]`, where `path[pos]` is a kind key.
    pub(crate) fn lookup_at(&self, path: &[String], pos: usize) -> LookupResult {
        let Some(kind) = self.kind_for_key(&path[pos]) else {
            return LookupResult::NotFound(KeyNotFound {
                key_path: path.to_vec(),
                failed_index: pos,
                available_keys: self.keys(),
            });
        };

        let Some(name) = path.get(pos + 1) else {
            // The whole kind: every action of it, with outputs.
            let mut map = IndexMap::new();
            for entry in self.of_kind(kind) {
                let Some(outputs) = &entry.outputs else {
                    return LookupResult::AvailableLater;
                };
                map.insert(entry.name.clone(), entry.to_value(outputs));
            }
            return descend_value(&TemplateValue::Object(map), path, pos + 1);
        };

        let Some(entry) = self.of_kind(kind).find(|entry| &entry.name == name) else {
            return LookupResult::NotFound(KeyNotFound {
                key_path: path.to_vec(),
                failed_index: pos + 1,
                available_keys: self.of_kind(kind).map(|e| e.name.clone()).collect(),
            });
        };

        let reads_outputs = path.get(pos + 2).is_none_or(|key| key == "outputs");
        match &entry.outputs {
            None if reads_outputs => LookupResult::AvailableLater,
            None => descend_value(&entry.to_value(&IndexMap::new()), path, pos + 2),
            Some(outputs) => descend_value(&entry.to_value(outputs), path, pos + 2),
        }
    }
}
