/*
 * integration_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Integration tests for sqlforge-template using test fixtures.
 */

use pretty_assertions::assert_eq;
use serde_json::json;
use sqlforge_template::{FieldRef, Template, TemplateValue, extract_fields};
use std::path::Path;

/// Helper to get the path to test fixtures
fn fixture_path(name: &str) -> std::path::PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("test-fixtures").join(name)
}

/// Helper to load template source from fixtures
fn load_source(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|_| panic!("Failed to load template: {}", name))
}

fn rows(value: serde_json::Value) -> TemplateValue {
    TemplateValue::from(json!({ "Rows": value }))
}

#[test]
fn test_insert_rows_render() {
    let template = Template::compile(&load_source("insert_rows.tmpl")).unwrap();
    let data = rows(json!([
        {"name": "a", "email": "a@x"},
        {"name": "b", "email": "b@x"},
    ]));

    let result = template.render(&data).unwrap();
    assert_eq!(
        result,
        "INSERT INTO staging (name, email) VALUES\n  ('a', 'a@x'),\n  ('b', 'b@x');\n"
    );
}

#[test]
fn test_insert_rows_fields() {
    let fields = extract_fields(&load_source("insert_rows.tmpl")).unwrap();

    assert_eq!(
        fields.fields().collect::<Vec<_>>(),
        vec!["Rows", "Rows[].email", "Rows[].name"]
    );
    assert_eq!(
        fields.variables().collect::<Vec<_>>(),
        vec!["$i", "$length"]
    );
    assert_eq!(
        fields.columns_of("Rows").into_iter().collect::<Vec<_>>(),
        vec!["email", "name"]
    );
}

#[test]
fn test_lookup_in_render() {
    let template = Template::compile(&load_source("lookup_in.tmpl")).unwrap();
    let data = rows(json!([{"articleNo": "A1"}, {"articleNo": "B2"}]));

    let result = template.render(&data).unwrap();
    assert_eq!(
        result,
        "SELECT id, description\nFROM articles\nWHERE article_no IN ('A1', 'B2')\n"
    );
}

#[test]
fn test_static_template_has_no_references() {
    let source = load_source("static.tmpl");
    let fields = extract_fields(&source).unwrap();
    assert!(fields.is_empty());

    let result = Template::compile(&source)
        .unwrap()
        .render(&rows(json!([])))
        .unwrap();
    assert_eq!(result, "SELECT count(*) AS total\nFROM orders\n");
}

#[test]
fn test_literal_template_renders_unchanged() {
    let source = "SELECT *\nFROM t\nWHERE a = 'b';\n";
    let result = Template::compile(source)
        .unwrap()
        .render(&TemplateValue::Null)
        .unwrap();
    assert_eq!(result, source);
}

#[test]
fn test_extraction_is_order_independent() {
    let a = extract_fields("{{ .X }}{{ .Y.Z }}{{ .X }}").unwrap();
    let b = extract_fields("{{ .Y.Z }}{{ .X }}").unwrap();
    assert_eq!(a, b);
    assert!(a.contains(&FieldRef::Field("Y.Z".to_string())));
}

#[test]
fn test_missing_column_fails_at_render() {
    let template = Template::compile("{{ range .Rows }}{{ .Missing }}{{ end }}").unwrap();
    let err = template
        .render(&rows(json!([{"Name": "a"}])))
        .unwrap_err();
    assert!(err.to_string().contains("\"Missing\""), "{err}");
}
