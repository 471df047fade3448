/*
 * analysis.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! Static reference analysis of parsed documents.
//!
//! These functions find the context keys a document reads without
//! evaluating it. Only computed member keys (`var.map[var.key]`) are
//! evaluated, against the given context; a key that cannot be evaluated
//! becomes an [`UnresolvableValue`] whose error is surfaced only if the key
//! is actually used.

use crate::actions::{ActionKind, runtime_kind};
use crate::ast::{BinaryOp, Expr, ExprKind, ParsedTemplate, TemplatePart};
use crate::collection::{ArrayItem, ObjectEntry, ParsedNode, ParsedValue};
use crate::context::Context;
use crate::error::{SecretsMissingError, TemplateError, TemplateResult};
use crate::evaluator::{ExprEvaluator, Outcome};
use crate::options::EvalOptions;
use crate::path::DocumentPath;
use crate::value::TemplateValue;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Name bound to the current item inside `$filter` and `$return`.
const LOOP_VARIABLE: &str = "item";

/// A computed key that could not be resolved statically.
#[derive(Debug, Clone)]
pub struct UnresolvableValue {
    error: TemplateError,
    /// Set when the key evaluated to a value that cannot be used as a key.
    resolved: Option<TemplateValue>,
}

impl UnresolvableValue {
    /// The error a lookup through this key would raise.
    pub fn error(&self) -> TemplateError {
        self.error.clone()
    }

    /// The value the key resolved to, when it resolved but is not a valid key.
    pub fn resolved_value(&self) -> Option<&TemplateValue> {
        self.resolved.as_ref()
    }
}

#[derive(Debug, Clone)]
pub enum KeySegment {
    Key(String),
    Index(usize),
    Unresolvable(UnresolvableValue),
}

impl KeySegment {
    /// The concrete key, or the deferred error of an unresolvable segment.
    pub fn as_key(&self) -> TemplateResult<String> {
        match self {
            KeySegment::Key(key) => Ok(key.clone()),
            KeySegment::Index(index) => Ok(index.to_string()),
            KeySegment::Unresolvable(value) => Err(value.error()),
        }
    }

    fn is_key(&self, key: &str) -> bool {
        matches!(self, KeySegment::Key(k) if k == key)
    }
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Key(key) => f.write_str(key),
            KeySegment::Index(index) => write!(f, "{index}"),
            KeySegment::Unresolvable(_) => f.write_str("<unresolvable>"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Resolvable,
    /// At least one segment is an [`UnresolvableValue`].
    Unresolvable,
}

/// One reference to a context key path.
#[derive(Debug, Clone)]
pub struct ContextLookupReferenceFinding {
    pub kind: ReferenceKind,
    pub key_path: Vec<KeySegment>,
    pub document_path: DocumentPath,
    /// Set when a missing key would not fail evaluation.
    pub optional: bool,
    /// The template string the reference appears in.
    pub template: String,
}

impl ContextLookupReferenceFinding {
    /// The key path as strings, if every segment is concrete.
    pub fn concrete_path(&self) -> Option<Vec<String>> {
        concrete(&self.key_path)
    }
}

fn concrete(path: &[KeySegment]) -> Option<Vec<String>> {
    path.iter().map(|segment| segment.as_key().ok()).collect()
}

/// Every template and directive node of a document, in document order.
pub fn visit_all(root: &ParsedNode) -> Vec<&ParsedNode> {
    let mut nodes = Vec::new();
    visit(root, &mut nodes);
    nodes
}

fn visit<'a>(node: &'a ParsedNode, out: &mut Vec<&'a ParsedNode>) {
    match &node.value {
        ParsedValue::Plain => {}
        ParsedValue::Template(_) => out.push(node),
        ParsedValue::Array(items) => {
            for item in items {
                match item {
                    ArrayItem::Item(child) => visit(child, out),
                    ArrayItem::Concat(operand) => visit(operand, out),
                }
            }
        }
        ParsedValue::Object(entries) => {
            for entry in entries {
                match entry {
                    ObjectEntry::Field(_, child) => visit(child, out),
                    ObjectEntry::Merge(operand) => visit(operand, out),
                }
            }
        }
        ParsedValue::ForEach(directive) => {
            out.push(node);
            visit(&directive.source, out);
            if let Some(filter) = &directive.filter {
                visit(filter, out);
            }
            visit(&directive.ret, out);
        }
        ParsedValue::If(directive) => {
            out.push(node);
            visit(&directive.condition, out);
            visit(&directive.then, out);
            if let Some(otherwise) = &directive.otherwise {
                visit(otherwise, out);
            }
        }
        ParsedValue::Concat(operand) => {
            out.push(node);
            visit(operand, out);
        }
    }
}

/// Find every context key path the document reads.
///
/// References to the loop variable inside `$forEach` are not context
/// references and are skipped.
pub fn get_context_lookup_references(
    root: &ParsedNode,
    context: &Arc<Context>,
) -> Vec<ContextLookupReferenceFinding> {
    let mut collector = ReferenceCollector {
        context,
        options: EvalOptions::strict(),
        findings: Vec::new(),
    };
    collector.walk_node(root, false);
    trace!(count = collector.findings.len(), "collected context references");
    collector.findings
}

struct ReferenceCollector<'a> {
    context: &'a Arc<Context>,
    options: EvalOptions,
    findings: Vec<ContextLookupReferenceFinding>,
}

/// Per-template state while walking expressions.
struct Site<'a> {
    template: &'a ParsedTemplate,
    path: &'a DocumentPath,
    in_loop: bool,
}

impl ReferenceCollector<'_> {
    fn walk_node(&mut self, node: &ParsedNode, in_loop: bool) {
        match &node.value {
            ParsedValue::Plain => {}
            ParsedValue::Template(template) => {
                let site = Site {
                    template,
                    path: &node.path,
                    in_loop,
                };
                self.walk_parts(&site, &template.parts, template.optional, None);
            }
            ParsedValue::Array(items) => {
                for item in items {
                    match item {
                        ArrayItem::Item(child) | ArrayItem::Concat(child) => {
                            self.walk_node(child, in_loop)
                        }
                    }
                }
            }
            ParsedValue::Object(entries) => {
                for entry in entries {
                    match entry {
                        ObjectEntry::Field(_, child) | ObjectEntry::Merge(child) => {
                            self.walk_node(child, in_loop)
                        }
                    }
                }
            }
            ParsedValue::ForEach(directive) => {
                self.walk_node(&directive.source, in_loop);
                if let Some(filter) = &directive.filter {
                    self.walk_node(filter, true);
                }
                self.walk_node(&directive.ret, true);
            }
            ParsedValue::If(directive) => {
                self.walk_node(&directive.condition, in_loop);
                self.walk_node(&directive.then, in_loop);
                if let Some(otherwise) = &directive.otherwise {
                    self.walk_node(otherwise, in_loop);
                }
            }
            ParsedValue::Concat(operand) => self.walk_node(operand, in_loop),
        }
    }

    fn walk_parts(
        &mut self,
        site: &Site<'_>,
        parts: &[TemplatePart],
        optional: bool,
        guard: Option<&[String]>,
    ) {
        for part in parts {
            match part {
                TemplatePart::Text(_) | TemplatePart::Escaped(_) => {}
                TemplatePart::Expression(expr) => self.walk_expr(site, expr, optional, guard),
                TemplatePart::Conditional(block) => {
                    self.walk_expr(site, &block.condition, true, None);
                    let tested = self.guard_path(&block.condition);
                    let guard = tested.as_deref().or(guard);
                    self.walk_parts(site, &block.consequent, optional, guard);
                    self.walk_parts(site, &block.alternate, optional, guard);
                }
            }
        }
    }

    fn walk_expr(&mut self, site: &Site<'_>, expr: &Expr, optional: bool, guard: Option<&[String]>) {
        match &expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Identifier(_) | ExprKind::Member { .. } => {
                match self.reference_segments(site, expr) {
                    Some(key_path) => {
                        self.walk_computed_keys(site, expr, optional, guard);
                        self.record(site, key_path, optional, guard);
                    }
                    None => {
                        if let ExprKind::Member { object, key, .. } = &expr.kind {
                            self.walk_expr(site, object, optional, guard);
                            self.walk_expr(site, key, optional, guard);
                        }
                    }
                }
            }
            ExprKind::Unary { operand, .. } => self.walk_expr(site, operand, optional, guard),
            ExprKind::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => {
                self.walk_expr(site, left, true, guard);
                self.walk_expr(site, right, optional, guard);
            }
            ExprKind::Binary { left, right, .. } => {
                self.walk_expr(site, left, optional, guard);
                self.walk_expr(site, right, optional, guard);
            }
            ExprKind::Ternary {
                condition,
                consequent,
                alternate,
            } => {
                self.walk_expr(site, condition, true, None);
                let tested = self.guard_path(condition);
                let guard = tested.as_deref().or(guard);
                self.walk_expr(site, consequent, optional, guard);
                self.walk_expr(site, alternate, optional, guard);
            }
            ExprKind::HelperCall { args, .. } => {
                for arg in args {
                    self.walk_expr(site, arg, optional, guard);
                }
            }
            ExprKind::Array(items) => {
                for item in items {
                    self.walk_expr(site, item, optional, guard);
                }
            }
        }
    }

    /// Walk the computed keys of a member chain for their own references.
    fn walk_computed_keys(&mut self, site: &Site<'_>, expr: &Expr, optional: bool, guard: Option<&[String]>) {
        if let ExprKind::Member { object, key, .. } = &expr.kind {
            self.walk_computed_keys(site, object, optional, guard);
            if !matches!(key.kind, ExprKind::Literal(_)) {
                self.walk_expr(site, key, optional, guard);
            }
        }
    }

    fn record(&mut self, site: &Site<'_>, key_path: Vec<KeySegment>, optional: bool, guard: Option<&[String]>) {
        if site.in_loop && key_path.first().is_some_and(|first| first.is_key(LOOP_VARIABLE)) {
            return;
        }
        let guarded = guard.is_some_and(|guard| concrete(&key_path).as_deref() == Some(guard));
        let kind = if key_path
            .iter()
            .any(|segment| matches!(segment, KeySegment::Unresolvable(_)))
        {
            ReferenceKind::Unresolvable
        } else {
            ReferenceKind::Resolvable
        };
        self.findings.push(ContextLookupReferenceFinding {
            kind,
            key_path,
            document_path: site.path.clone(),
            optional: optional || guarded,
            template: site.template.raw.clone(),
        });
    }

    /// The key path tested by a condition, when it is a plain reference.
    fn guard_path(&self, condition: &Expr) -> Option<Vec<String>> {
        let mut keys = Vec::new();
        let mut current = condition;
        loop {
            match &current.kind {
                ExprKind::Identifier(name) => {
                    keys.push(name.clone());
                    break;
                }
                ExprKind::Member { object, key, .. } => {
                    match &key.kind {
                        ExprKind::Literal(TemplateValue::String(key)) => keys.push(key.clone()),
                        ExprKind::Literal(number) => keys.push(number.as_index()?.to_string()),
                        _ => return None,
                    }
                    current = object;
                }
                _ => return None,
            }
        }
        keys.reverse();
        Some(keys)
    }

    /// Segments of a member chain rooted at an identifier.
    fn reference_segments(&self, site: &Site<'_>, expr: &Expr) -> Option<Vec<KeySegment>> {
        match &expr.kind {
            ExprKind::Identifier(name) => Some(vec![KeySegment::Key(name.clone())]),
            ExprKind::Member { object, key, .. } => {
                let mut segments = self.reference_segments(site, object)?;
                segments.push(self.key_segment(site, key));
                Some(segments)
            }
            _ => None,
        }
    }

    fn key_segment(&self, site: &Site<'_>, key: &Expr) -> KeySegment {
        match &key.kind {
            ExprKind::Literal(TemplateValue::String(s)) => return KeySegment::Key(s.clone()),
            ExprKind::Literal(number @ TemplateValue::Number(_)) => {
                if let Some(index) = number.as_index() {
                    return KeySegment::Index(index);
                }
            }
            _ => {}
        }

        let unresolvable = |error: TemplateError, resolved: Option<TemplateValue>| {
            KeySegment::Unresolvable(UnresolvableValue {
                error: error
                    .with_span(key.span.clone())
                    .within_template(&site.template.raw)
                    .at_path(site.path),
                resolved,
            })
        };
        let mut evaluator = ExprEvaluator::new(self.context, &self.options);
        let value = match evaluator.eval(key) {
            Ok(Outcome::Value(value)) => evaluator.consume(&value),
            Ok(Outcome::Missing(error)) | Err(error) => return unresolvable(error, None),
            Ok(Outcome::Later) => {
                return unresolvable(
                    TemplateError::lookup("The key of this reference is only available in a later phase"),
                    None,
                );
            }
        };
        match value {
            Some(TemplateValue::String(s)) => KeySegment::Key(s),
            Some(number @ TemplateValue::Number(_)) if number.as_index().is_some() => {
                KeySegment::Index(number.as_index().unwrap_or_default())
            }
            other => unresolvable(
                TemplateError::type_error(format!(
                    "Invalid key type: expected a string or a non-negative integer (got {})",
                    other.as_ref().map_or("undefined", TemplateValue::type_name)
                )),
                other,
            ),
        }
    }
}

/// A reference to another action, used to wire dependency edges.
#[derive(Debug, Clone)]
pub struct ActionTemplateReference {
    pub kind: ActionKind,
    pub name: String,
    /// The full reference path, starting with `actions` or `runtime`.
    pub key_path: Vec<KeySegment>,
    pub document_path: DocumentPath,
}

/// Find every `actions.<kind>.<name>` and `runtime.<services|tasks>.<name>`
/// reference, in document order.
pub fn get_action_template_references(
    root: &ParsedNode,
    context: &Arc<Context>,
) -> TemplateResult<Vec<ActionTemplateReference>> {
    let mut references = Vec::new();
    for finding in get_context_lookup_references(root, context) {
        let Some(namespace) = finding.key_path.first() else {
            continue;
        };
        let label = if namespace.is_key("actions") {
            "action"
        } else if namespace.is_key("runtime") {
            "runtime"
        } else {
            continue;
        };

        let fail = |cause: String| {
            TemplateError::reference(cause)
                .within_template(&finding.template)
                .at_path(&finding.document_path)
        };

        let kind = match finding.key_path.get(1) {
            None => return Err(fail(format!("Found invalid {label} reference (missing kind)."))),
            Some(KeySegment::Unresolvable(value)) if value.resolved_value().is_none() => {
                return Err(value.error());
            }
            Some(KeySegment::Index(_) | KeySegment::Unresolvable(_)) => {
                return Err(fail(format!("Found invalid {label} reference (kind is not a string).")));
            }
            Some(KeySegment::Key(key)) => {
                let kind = if label == "action" {
                    ActionKind::parse(key)
                } else {
                    runtime_kind(key)
                };
                match kind {
                    Some(kind) => kind,
                    None => {
                        return Err(fail(format!(
                            "Found invalid {label} reference (invalid kind '{key}')."
                        )));
                    }
                }
            }
        };

        let name = match finding.key_path.get(2) {
            None => return Err(fail(format!("Found invalid {label} reference (missing name)."))),
            Some(KeySegment::Unresolvable(value)) if value.resolved_value().is_none() => {
                return Err(value.error());
            }
            Some(KeySegment::Index(_) | KeySegment::Unresolvable(_)) => {
                return Err(fail(format!("Found invalid {label} reference (name is not a string).")));
            }
            Some(KeySegment::Key(name)) => name.clone(),
        };

        references.push(ActionTemplateReference {
            kind,
            name,
            key_path: finding.key_path,
            document_path: finding.document_path,
        });
    }
    Ok(references)
}

/// Fail if any required `secrets.<key>` reference in `targets` names a key
/// that is not in `loaded_keys`. Targets are `(config name, document)` pairs.
pub fn check_missing_secret_keys(
    targets: &[(&str, &ParsedNode)],
    context: &Arc<Context>,
    loaded_keys: &[String],
) -> Result<(), SecretsMissingError> {
    let mut missing: IndexMap<String, Vec<String>> = IndexMap::new();
    for (name, document) in targets {
        for finding in get_context_lookup_references(document, context) {
            if finding.optional || !finding.key_path.first().is_some_and(|first| first.is_key("secrets")) {
                continue;
            }
            let Some(KeySegment::Key(key)) = finding.key_path.get(1) else {
                continue;
            };
            if loaded_keys.contains(key) {
                continue;
            }
            let keys = missing.entry(name.to_string()).or_default();
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }
    if missing.is_empty() {
        return Ok(());
    }
    Err(SecretsMissingError {
        missing,
        loaded: loaded_keys.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{ParseOptions, parse_template_collection};
    use crate::collection::ParsedCollection;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(doc: serde_json::Value) -> ParsedCollection {
        parse_template_collection(&doc.into(), &ParseOptions::default()).unwrap()
    }

    fn empty() -> Arc<Context> {
        Arc::new(Context::from_value(json!({}).into()))
    }

    fn paths(findings: &[ContextLookupReferenceFinding]) -> Vec<String> {
        findings
            .iter()
            .map(|f| {
                let path: Vec<String> = f.key_path.iter().map(ToString::to_string).collect();
                format!("{}{}", path.join("."), if f.optional { "?" } else { "" })
            })
            .collect()
    }

    #[test]
    fn test_visit_all_in_document_order() {
        let doc = parse(json!({
            "a": "${var.a}",
            "b": "plain",
            "c": {"$forEach": "${var.list}", "$return": "${item.value}"}
        }));
        let paths: Vec<String> = visit_all(doc.root())
            .iter()
            .map(|node| node.path.to_string())
            .collect();
        assert_eq!(paths, ["a", "c", "c.$forEach", "c.$return"]);
    }

    #[test]
    fn test_references_and_optionality() {
        let doc = parse(json!({
            "a": "${var.a || var.b}",
            "b": "${var.c ? var.c : var.d}",
            "c": "${var.e}?",
            "d": "${upper(var.f)}-${var.list[0]}"
        }));
        let findings = get_context_lookup_references(doc.root(), &empty());
        assert_eq!(
            paths(&findings),
            ["var.a?", "var.b", "var.c?", "var.c?", "var.d", "var.e?", "var.f", "var.list.0"]
        );
    }

    #[test]
    fn test_loop_variable_is_not_a_reference() {
        let doc = parse(json!({"$forEach": "${var.list}", "$return": "${item.value}-${var.x}"}));
        let findings = get_context_lookup_references(doc.root(), &empty());
        assert_eq!(paths(&findings), ["var.list", "var.x"]);
    }

    #[test]
    fn test_computed_keys() {
        let ctx = Arc::new(Context::from_value(json!({"var": {"name": "api"}}).into()));
        let doc = parse(json!({"a": "${actions.build[var.name].outputs}", "b": "${var.map[var.nope]}"}));
        let findings = get_context_lookup_references(doc.root(), &ctx);
        assert_eq!(
            paths(&findings),
            ["var.name", "actions.build.api.outputs", "var.nope", "var.map.<unresolvable>"]
        );
        assert_eq!(findings[3].kind, ReferenceKind::Unresolvable);
        let err = findings[3].key_path[2].as_key().unwrap_err();
        assert_eq!(err.cause, "Could not find key nope under var. Available keys: name.");
    }

    #[test]
    fn test_action_references() {
        let doc = parse(json!({
            "image": "${actions.build.api.outputs.image}",
            "url": "${runtime.services.web.outputs.url}",
            "other": "${var.a}"
        }));
        let references = get_action_template_references(doc.root(), &empty()).unwrap();
        let summary: Vec<(ActionKind, &str)> = references
            .iter()
            .map(|r| (r.kind, r.name.as_str()))
            .collect();
        assert_eq!(summary, [(ActionKind::Build, "api"), (ActionKind::Deploy, "web")]);
    }

    #[test]
    fn test_invalid_action_references() {
        let cases = [
            ("${actions}", "Found invalid action reference (missing kind)."),
            ("${actions[0].x}", "Found invalid action reference (kind is not a string)."),
            ("${actions.foo.x}", "Found invalid action reference (invalid kind 'foo')."),
            ("${actions.build}", "Found invalid action reference (missing name)."),
            ("${actions.build[0]}", "Found invalid action reference (name is not a string)."),
            ("${runtime.modules.x}", "Found invalid runtime reference (invalid kind 'modules')."),
        ];
        for (template, expected) in cases {
            let doc = parse(json!({"a": template}));
            let err = get_action_template_references(doc.root(), &empty()).unwrap_err();
            assert_eq!(err.cause, expected, "for {template}");
            assert_eq!(err.kind, crate::error::ErrorKind::Reference);
        }
    }

    #[test]
    fn test_missing_secrets() {
        let api = parse(json!({"env": {"A": "${secrets.a}", "B": "${secrets.b || 'x'}", "C": "${secrets.c}"}}));
        let web = parse(json!({"token": "${secrets.d}"}));
        let loaded = vec!["c".to_string()];
        let err = check_missing_secret_keys(
            &[("api", &**api.root()), ("web", &**web.root())],
            &empty(),
            &loaded,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The following secret names were referenced in configuration, but are missing from the \
             secrets loaded remotely:\n\napi: a\nweb: d\n\nSecret keys with loaded values: c"
        );

        let ok = parse(json!({"x": "${secrets.c}"}));
        assert!(check_missing_secret_keys(&[("ok", &**ok.root())], &empty(), &loaded).is_ok());
    }
}
