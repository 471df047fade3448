/*
 * integration_tests.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 *
 * Integration tests for garden-template using YAML fixtures.
 */

use garden_template::{
    ActionEntry, ActionKind, ActionsView, Context, ContextBag, DocumentPath, EvalOptions,
    LazyValue, ParseOptions, ParsedCollection, SourceDocument, TemplateValue,
    parse_template_collection,
};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

/// Helper to get the path to test fixtures
fn fixture_path(name: &str) -> std::path::PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("test-fixtures").join(name)
}

fn load_fixture(name: &str) -> (String, TemplateValue) {
    let content = std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", name));
    let value: TemplateValue = serde_yaml::from_str(&content).unwrap();
    (content, value)
}

fn variables() -> TemplateValue {
    json!({
        "registry": "registry.example.com",
        "name": "api",
        "tag": "v1.2.0",
        "replicas": 3,
        "commonEnv": {"LOG_LEVEL": "info", "REGION": "eu-west-1"},
        "ports": [80, 22, 443],
        "extraAnnotations": [{"owner": "alice"}],
        "exposed": true,
        "domain": "example.com"
    })
    .into()
}

fn context(api_outputs: Option<IndexMap<String, TemplateValue>>) -> Arc<Context> {
    let build = ActionEntry::new(ActionKind::Build, "api").with_version("v-abc123");
    let build = match api_outputs {
        Some(outputs) => build.with_outputs(outputs),
        None => build.with_outputs_later(),
    };
    Arc::new(Context::from(
        ContextBag::new()
            .with_value("var", variables())
            .with_scope("actions", Context::Actions(ActionsView::actions(vec![build]))),
    ))
}

fn parse(value: &TemplateValue) -> ParsedCollection {
    parse_template_collection(value, &ParseOptions::default()).unwrap()
}

#[test]
fn test_project_fixture_resolves() {
    let (_, doc) = load_fixture("project.garden.yml");
    let mut outputs = IndexMap::new();
    outputs.insert(
        "image".to_string(),
        TemplateValue::from("registry.example.com/api:v-abc123"),
    );

    let value = LazyValue::new(parse(&doc).root().clone(), context(Some(outputs)))
        .deep_evaluate_and_unwrap(&EvalOptions::strict())
        .unwrap()
        .unwrap();

    let expected: TemplateValue = json!({
        "kind": "Deploy",
        "name": "api",
        "image": "registry.example.com/api:v1.2.0",
        "replicas": 3,
        "env": {"LOG_LEVEL": "debug", "REGION": "eu-west-1"},
        "ports": [
            {"name": "port-0", "containerPort": 80},
            {"name": "port-2", "containerPort": 443}
        ],
        "annotations": [{"team": "platform"}, {"owner": "alice"}],
        "ingress": {"hostname": "api.example.com"},
        "dependencies": ["registry.example.com/api:v-abc123"]
    })
    .into();
    assert_eq!(value, expected);
}

#[test]
fn test_outputs_available_later_pass_through() {
    let (_, doc) = load_fixture("project.garden.yml");
    let value = LazyValue::new(parse(&doc).root().clone(), context(None))
        .deep_evaluate_and_unwrap(&EvalOptions::strict())
        .unwrap()
        .unwrap();
    let TemplateValue::Object(map) = value else {
        panic!("expected object");
    };
    assert_eq!(
        map["dependencies"],
        json!(["${actions.build.api.outputs.image}"]).into()
    );
    assert_eq!(map["image"], "registry.example.com/api:v1.2.0".into());
}

#[test]
fn test_broken_fixture_renders_snippet() {
    let (content, doc) = load_fixture("broken.garden.yml");
    let start = content.find("\"${var.registry}").unwrap();
    let end = content[start..].find('\n').map_or(content.len(), |i| start + i);
    let source = Arc::new(
        SourceDocument::new("broken.garden.yml", content.clone())
            .with_location(DocumentPath::root().key("image"), start..end),
    );
    let parsed =
        parse_template_collection(&doc, &ParseOptions::default().with_source(source)).unwrap();

    let err = LazyValue::new(parsed.root().clone(), context(None))
        .deep_evaluate(&EvalOptions::strict())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid template string (${var.registry}/${var.nme}): Could not find key nme under var. \
         Available keys: commonEnv, domain, exposed, extraAnnotations, name, ports, registry, \
         replicas and tag."
    );

    let rendered = err.render();
    assert!(rendered.contains("broken.garden.yml"), "{rendered}");
    assert!(rendered.contains("image: \"${var.registry}/${var.nme}\""), "{rendered}");
    assert!(rendered.contains("Could not find key nme under var."), "{rendered}");
}

#[test]
fn test_legacy_mode_keeps_unresolved_strings() {
    let (_, doc) = load_fixture("broken.garden.yml");
    let value = LazyValue::new(parse(&doc).root().clone(), context(None))
        .deep_evaluate_and_unwrap(&EvalOptions::legacy_partial())
        .unwrap()
        .unwrap();
    assert_eq!(
        value,
        json!({"kind": "Deploy", "name": "api", "image": "${var.registry}/${var.nme}"}).into()
    );
}
