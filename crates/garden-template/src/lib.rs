/*
 * lib.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! Template string engine for Garden configuration.
//!
//! Configuration values may embed `${...}` expressions that read from a
//! context of variables, action outputs and secrets. This crate provides:
//!
//! - A parser for template strings: operators, helper calls, member access,
//!   `${if}...${else}...${endif}` blocks, the optional `?` suffix and `$${`
//!   escapes
//! - A collection parser that recognizes the structural directives `$merge`,
//!   `$concat`, `$forEach`/`$filter`/`$return` and `$if`/`$then`/`$else`
//! - A lazy evaluator whose results record the context keys they were
//!   derived from
//! - Strict and legacy partial resolution modes
//! - Static analysis of the context keys and action references a document
//!   uses, without evaluating it
//!
//! # Example
//!
//! ```
//! use garden_template::{
//!     Context, EvalOptions, LazyValue, ParseOptions, TemplateValue, parse_template_collection,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let doc = TemplateValue::from(json!({
//!     "image": "${var.name}:${var.tag}",
//!     "ports": {"$forEach": "${var.ports}", "$return": {"port": "${item.value}"}},
//! }));
//! let parsed = parse_template_collection(&doc, &ParseOptions::default()).unwrap();
//!
//! let ctx = Arc::new(Context::from_value(
//!     json!({"var": {"name": "api", "tag": "v1", "ports": [80, 443]}}).into(),
//! ));
//! let value = LazyValue::new(parsed.root().clone(), ctx)
//!     .deep_evaluate_and_unwrap(&EvalOptions::strict())
//!     .unwrap();
//!
//! assert_eq!(
//!     value,
//!     Some(json!({"image": "api:v1", "ports": [{"port": 80}, {"port": 443}]}).into())
//! );
//! ```

pub mod actions;
pub mod analysis;
pub mod ast;
pub mod collection;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod evaluator;
pub mod helpers;
pub mod lazy;
mod lexer;
pub mod options;
pub mod parser;
pub mod path;
pub mod resolve;
pub mod resolved;
pub mod value;

pub use actions::{ActionEntry, ActionKind, ActionsView};
pub use analysis::{
    ActionTemplateReference, ContextLookupReferenceFinding, KeySegment, ReferenceKind,
    UnresolvableValue, check_missing_secret_keys, get_action_template_references,
    get_context_lookup_references, visit_all,
};
pub use ast::{ParsedTemplate, TemplatePart};
pub use collection::{ParseOptions, ParsedCollection, ParsedNode, parse_template_collection};
pub use context::{Context, ContextBag, ContextEntry, KeyNotFound, LookupResult};
pub use diagnostics::SourceDocument;
pub use error::{ErrorKind, SecretsMissingError, TemplateError, TemplateResult};
pub use evaluator::{TemplateOutcome, evaluate_template};
pub use lazy::{Evaluated, LazyValue};
pub use options::{EvalOptions, ResolutionMode};
pub use parser::{is_template_string, parse_template};
pub use path::DocumentPath;
pub use resolve::{resolve_template_string, resolve_template_strings};
pub use resolved::{Inputs, Resolved, TemplateLeaf};
pub use value::TemplateValue;
