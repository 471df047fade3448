/*
 * evaluation_properties.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 *
 * Behavioural guarantees of template resolution.
 */

use garden_template::{
    Context, ContextBag, ErrorKind, EvalOptions, LazyValue, ParseOptions, Resolved, TemplateLeaf,
    TemplateValue, parse_template_collection, resolve_template_string,
};
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn ctx(value: serde_json::Value) -> Arc<Context> {
    Arc::new(Context::from_value(value.into()))
}

fn resolve(raw: &str, context: serde_json::Value) -> Option<TemplateValue> {
    resolve_template_string(raw, &ctx(context), &EvalOptions::strict()).unwrap()
}

fn lazy(doc: serde_json::Value, context: Arc<Context>) -> LazyValue {
    let parsed = parse_template_collection(&doc.into(), &ParseOptions::default()).unwrap();
    LazyValue::new(parsed.root().clone(), context)
}

fn leaves(resolved: &Resolved) -> Vec<&TemplateLeaf> {
    match resolved {
        Resolved::Leaf(leaf) => vec![leaf],
        Resolved::Array(items) => items.iter().flat_map(leaves).collect(),
        Resolved::Object(map) => map.values().flat_map(leaves).collect(),
    }
}

#[test]
fn test_single_expression_preserves_type() {
    assert_eq!(resolve("${a}", json!({"a": 100})), Some(TemplateValue::Number(100.0)));
    assert_eq!(resolve("foo-${a}", json!({"a": 100})), Some("foo-100".into()));
}

#[test]
fn test_optional_suffix() {
    assert_eq!(resolve("${foo}?", json!({})), None);
    assert_eq!(resolve("${foo}?", json!({"foo": "bar"})), Some("bar".into()));
}

#[test]
fn test_escaped_templates() {
    let unescape = EvalOptions::strict().with_unescape(true);
    assert_eq!(
        resolve_template_string("$${bar}", &ctx(json!({})), &unescape).unwrap(),
        Some("${bar}".into())
    );
    assert_eq!(resolve("$${bar}", json!({})), Some("$${bar}".into()));
    assert_eq!(
        resolve_template_string("$${bar} ${a}", &ctx(json!({"a": 1})), &unescape).unwrap(),
        Some("${bar} 1".into())
    );
}

#[test]
fn test_for_each_over_empty_list() {
    let value = lazy(json!({"$forEach": [], "$return": "${item.value}"}), ctx(json!({})))
        .deep_evaluate_and_unwrap(&EvalOptions::strict())
        .unwrap();
    assert_eq!(value, Some(json!([]).into()));
}

#[test]
fn test_documents_without_templates_round_trip() {
    let doc = json!({
        "name": "api",
        "replicas": 2,
        "ratio": 0.5,
        "enabled": false,
        "tags": ["a", {"b": null}],
        "empty": {}
    });
    let value = lazy(doc.clone(), ctx(json!({})))
        .deep_evaluate_and_unwrap(&EvalOptions::strict())
        .unwrap();
    assert_eq!(value, Some(doc.into()));
}

#[test]
fn test_evaluation_is_idempotent() {
    let value = lazy(
        json!({"a": "${var.x}", "b": {"$forEach": "${var.list}", "$return": "${item.value}-${var.x}"}}),
        ctx(json!({"var": {"x": "y", "list": [1, 2]}})),
    );
    let opts = EvalOptions::strict();
    assert_eq!(value.deep_evaluate(&opts).unwrap(), value.deep_evaluate(&opts).unwrap());
}

#[test]
fn test_for_each_provenance_is_per_item() {
    let resolved = lazy(
        json!({"$forEach": "${var.colors}", "$return": "constant"}),
        ctx(json!({"var": {"colors": ["red", "green", "blue"]}})),
    )
    .deep_evaluate(&EvalOptions::strict())
    .unwrap();

    let inputs: Vec<Vec<&str>> = leaves(&resolved)
        .iter()
        .map(|leaf| leaf.inputs.keys().map(String::as_str).collect())
        .collect();
    assert_eq!(
        inputs,
        vec![vec!["var.colors.0"], vec!["var.colors.1"], vec!["var.colors.2"]]
    );
}

#[test]
fn test_provenance_through_nested_variables() {
    let vars = parse_template_collection(
        &json!({"host": "${var.name}.${var.domain}", "name": "api", "domain": "example.com"}).into(),
        &ParseOptions::default(),
    )
    .unwrap();
    let context = Arc::new(Context::from(
        ContextBag::new().with_template("var", vars.root().clone()),
    ));
    let resolved = lazy(json!({"url": "https://${var.host}"}), context)
        .deep_evaluate(&EvalOptions::strict())
        .unwrap();

    let leaf = leaves(&resolved)[0];
    assert_eq!(leaf.value, Some("https://api.example.com".into()));
    assert_eq!(
        leaf.inputs.keys().map(String::as_str).collect::<Vec<_>>(),
        ["var.domain", "var.host", "var.name"]
    );
}

#[test]
fn test_missing_operand_names_key_and_siblings() {
    let err = resolve_template_string("${a >= b}", &ctx(json!({"a": 123})), &EvalOptions::strict())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Lookup);
    assert_snapshot!(err.to_string(), @"Invalid template string (${a >= b}): Could not find key b. Available keys: a.");
}

#[test]
fn test_or_fallback() {
    assert_eq!(resolve("${a || b}", json!({"b": "abc"})), Some("abc".into()));
    let err = resolve_template_string("${a || b}", &ctx(json!({})), &EvalOptions::strict())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Lookup);
}

#[test]
fn test_legacy_short_circuit_resolves_when_decidable() {
    let legacy = EvalOptions::legacy_partial();
    let context = ctx(json!({"flag": false}));
    assert_eq!(
        resolve_template_string("${flag && missing}", &context, &legacy).unwrap(),
        Some(false.into())
    );
    assert_eq!(
        resolve_template_string("${missing ? 'a' : 'b'}", &context, &legacy).unwrap(),
        Some("b".into())
    );
    assert_eq!(
        resolve_template_string("x-${missing}-${flag}", &context, &legacy).unwrap(),
        Some("x-${missing}-${flag}".into())
    );
}

#[test]
fn test_missing_member_key_is_never_swallowed() {
    let context = ctx(json!({"var": {"map": {"a": 1}}}));
    for options in [EvalOptions::strict(), EvalOptions::legacy_partial()] {
        for raw in ["${var.map[var.missing] || 'x'}", "${var.map[var.missing]}"] {
            let err = resolve_template_string(raw, &context, &options).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Lookup);
            assert_eq!(err.cause, "Could not find key missing under var. Available keys: map.");
            assert_eq!(err.template.as_deref(), Some(raw));
        }
    }
}

#[test]
fn test_missing_helper_argument_is_never_swallowed() {
    let context = ctx(json!({"var": {"name": "api"}}));
    for options in [EvalOptions::strict(), EvalOptions::legacy_partial()] {
        for raw in ["${upper(var.missing) || 'x'}", "prefix-${upper(var.missing)}"] {
            let err = resolve_template_string(raw, &context, &options).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Lookup);
            assert_eq!(err.cause, "Could not find key missing under var. Available keys: name.");
        }
    }
    assert_eq!(
        resolve_template_string("${var.other || upper(var.name)}", &context, &EvalOptions::strict())
            .unwrap(),
        Some("API".into())
    );
}

#[test]
fn test_circular_variables_fail_fast() {
    let vars = parse_template_collection(
        &json!({"a": "${var.b}", "b": {"$merge": "${var.a}"}}).into(),
        &ParseOptions::default(),
    )
    .unwrap();
    let context = Arc::new(Context::from(
        ContextBag::new().with_template("var", vars.root().clone()),
    ));
    let err = resolve_template_string("${var.a}", &context, &EvalOptions::strict().with_max_depth(16))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Recursion);
}
