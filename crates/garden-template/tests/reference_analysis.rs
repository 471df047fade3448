/*
 * reference_analysis.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 *
 * Static analysis of action references and secrets across whole documents.
 */

use garden_template::{
    ActionKind, Context, ContextBag, ErrorKind, KeySegment, ParseOptions, ReferenceKind,
    check_missing_secret_keys, get_action_template_references, get_context_lookup_references,
    parse_template_collection,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn keys(path: &[KeySegment]) -> Vec<String> {
    path.iter().map(ToString::to_string).collect()
}

#[test]
fn test_action_references_with_computed_kind_and_name() {
    let doc = parse_template_collection(
        &json!({
            "spec": {
                "image": "${actions[var.kind][var.name].outputs.image}",
                "deps": {
                    "$forEach": ["db", "cache"],
                    "$return": "${runtime.tasks.migrate.outputs.log}"
                },
                "version": "${actions.Build.api.version}"
            }
        })
        .into(),
        &ParseOptions::default(),
    )
    .unwrap();
    let context = Arc::new(Context::from_value(
        json!({"var": {"kind": "build", "name": "api"}}).into(),
    ));

    let references = get_action_template_references(doc.root(), &context).unwrap();
    let summary: Vec<(ActionKind, String, Vec<String>, String)> = references
        .into_iter()
        .map(|r| (r.kind, r.name, keys(&r.key_path), r.document_path.to_string()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (
                ActionKind::Build,
                "api".to_string(),
                vec!["actions", "build", "api", "outputs", "image"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                "spec.image".to_string()
            ),
            (
                ActionKind::Run,
                "migrate".to_string(),
                vec!["runtime", "tasks", "migrate", "outputs", "log"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                "spec.deps.$return".to_string()
            ),
            (
                ActionKind::Build,
                "api".to_string(),
                vec!["actions", "Build", "api", "version"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                "spec.version".to_string()
            ),
        ]
    );
}

#[test]
fn test_unresolvable_kind_surfaces_lookup_error() {
    let doc = parse_template_collection(
        &json!({"image": "${actions[var.kind].api.outputs.image}"}).into(),
        &ParseOptions::default(),
    )
    .unwrap();
    let context = Arc::new(Context::from_value(json!({"var": {}}).into()));

    let findings = get_context_lookup_references(doc.root(), &context);
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[1].kind, ReferenceKind::Unresolvable);

    let err = get_action_template_references(doc.root(), &context).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid template string (${actions[var.kind].api.outputs.image}): Could not find key kind under var."
    );
}

#[test]
fn test_guarded_secret_references_are_optional() {
    let doc = parse_template_collection(
        &json!({
            "token": "${secrets.token ? secrets.token : 'none'}",
            "password": "${if secrets.password}${secrets.password}${else}unset${endif}",
            "key": "${secrets.apiKey}"
        })
        .into(),
        &ParseOptions::default(),
    )
    .unwrap();
    let context = Arc::new(Context::from_value(json!({}).into()));

    let err = check_missing_secret_keys(&[("backend", &**doc.root())], &context, &[]).unwrap_err();
    assert_eq!(
        err.missing.get("backend").cloned(),
        Some(vec!["apiKey".to_string()])
    );
    assert!(err.to_string().ends_with("Note: No secrets have been loaded. If you have defined secrets for the current project and environment in Garden Cloud, this may indicate a problem with your configuration."));
}

#[test]
fn test_non_string_action_kind_or_name_is_a_reference_error() {
    let context = Arc::new(Context::from_value(json!({"var": {"flag": true}}).into()));
    let cases = [
        ("${actions[true].foo}", "Found invalid action reference (kind is not a string)."),
        ("${actions[var.flag].foo}", "Found invalid action reference (kind is not a string)."),
        ("${actions.build[null].outputs}", "Found invalid action reference (name is not a string)."),
        ("${runtime.services[var.flag]}", "Found invalid runtime reference (name is not a string)."),
    ];
    for (raw, cause) in cases {
        let doc = parse_template_collection(&json!({"a": raw}).into(), &ParseOptions::default())
            .unwrap();
        let err = get_action_template_references(doc.root(), &context).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Reference, "{raw}");
        assert_eq!(err.cause, cause, "{raw}");
    }
}

#[test]
fn test_available_later_keys_are_resolvable_references() {
    let context = Arc::new(Context::from(
        ContextBag::new()
            .with_available_later("var")
            .with_value("names", json!({"a": "api"})),
    ));
    let doc = parse_template_collection(
        &json!({"a": "${var.x}", "b": "${foo[bar]}"}).into(),
        &ParseOptions::default(),
    )
    .unwrap();

    let findings = get_context_lookup_references(doc.root(), &context);
    let summary: Vec<(Vec<String>, ReferenceKind)> = findings
        .iter()
        .map(|f| (keys(&f.key_path), f.kind))
        .collect();
    assert_eq!(
        summary,
        vec![
            (vec!["var".to_string(), "x".to_string()], ReferenceKind::Resolvable),
            (vec!["bar".to_string()], ReferenceKind::Resolvable),
            (
                vec!["foo".to_string(), "<unresolvable>".to_string()],
                ReferenceKind::Unresolvable
            ),
        ]
    );
    let KeySegment::Unresolvable(value) = &findings[2].key_path[1] else {
        panic!("expected an unresolvable segment");
    };
    assert_eq!(value.error().cause, "Could not find key bar. Available keys: names and var.");
}
