/*
 * resolve.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! One-call entry points for resolving strings and documents.

use crate::collection::{ParseOptions, parse_template_collection};
use crate::context::Context;
use crate::error::TemplateResult;
use crate::evaluator::{TemplateOutcome, evaluate_template};
use crate::lazy::LazyValue;
use crate::options::EvalOptions;
use crate::parser::{is_template_string, parse_template};
use crate::value::TemplateValue;
use std::sync::Arc;

/// Resolve a single string. Strings without `${` are returned unchanged and
/// deferred templates are returned as written. `None` means undefined.
///
/// ```
/// use garden_template::{Context, EvalOptions, TemplateValue, resolve_template_string};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let ctx = Arc::new(Context::from_value(json!({"a": 100}).into()));
/// let opts = EvalOptions::strict();
/// assert_eq!(resolve_template_string("${a}", &ctx, &opts).unwrap(), Some(TemplateValue::Number(100.0)));
/// assert_eq!(resolve_template_string("foo-${a}", &ctx, &opts).unwrap(), Some("foo-100".into()));
/// ```
pub fn resolve_template_string(
    raw: &str,
    context: &Arc<Context>,
    options: &EvalOptions,
) -> TemplateResult<Option<TemplateValue>> {
    if !is_template_string(raw) {
        return Ok(Some(TemplateValue::String(raw.to_string())));
    }
    let template = parse_template(raw)?;
    match evaluate_template(&template, context, options)? {
        TemplateOutcome::Value(resolved) => Ok(resolved.unwrap()),
        TemplateOutcome::Deferred => Ok(Some(TemplateValue::String(raw.to_string()))),
    }
}

/// Parse and fully resolve a document.
pub fn resolve_template_strings(
    value: &TemplateValue,
    context: &Arc<Context>,
    options: &EvalOptions,
) -> TemplateResult<Option<TemplateValue>> {
    let parsed = parse_template_collection(value, &ParseOptions::default())?;
    LazyValue::new(parsed.root().clone(), context.clone()).deep_evaluate_and_unwrap(options)
}
