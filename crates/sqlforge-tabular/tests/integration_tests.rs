/*
 * integration_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Integration tests for sqlforge-tabular: load through the registry,
 * write back through the generators.
 */

use pretty_assertions::assert_eq;
use sqlforge_tabular::{
    GenerateOptions, GeneratorRegistry, HeaderCase, LoadOptions, LoaderRegistry, TabularError,
    WriteMode,
};
use std::path::Path;

fn fixture_path(name: &str) -> std::path::PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("test-fixtures").join(name)
}

#[test]
fn test_csv_fixture_round_trip_through_csv_generator() {
    let loaders = LoaderRegistry::new();
    let dataset = loaders
        .load_path(&fixture_path("articles.csv"), &LoadOptions::default())
        .unwrap();
    assert_eq!(dataset.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("articles-out.csv");
    let generators = GeneratorRegistry::new();
    generators
        .for_destination(Some(&out), &GenerateOptions::default())
        .unwrap()
        .generate(dataset.rows())
        .unwrap();

    // Columns come out sorted.
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "Article No,Description\nA1,Bolt\nB2,Nut\n"
    );
}

#[test]
fn test_xlsx_written_then_loaded() {
    let loaders = LoaderRegistry::new();
    let dataset = loaders
        .load_path(&fixture_path("articles.csv"), &LoadOptions::default())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let book = dir.path().join("articles.xlsx");
    let options = GenerateOptions {
        sheet_name: Some("Articles".to_string()),
        mode: WriteMode::Overwrite,
    };
    GeneratorRegistry::new()
        .for_destination(Some(&book), &options)
        .unwrap()
        .generate(dataset.rows())
        .unwrap();

    let reloaded = loaders
        .load_path(
            &book,
            &LoadOptions {
                sheet_name: Some("Articles".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    // XLSX headers are camel-cased on load.
    assert_eq!(
        reloaded.headers(),
        &["articleNo".to_string(), "description".to_string()]
    );
    assert_eq!(reloaded.rows()[1].get("articleNo"), Some("B2"));

    let verbatim = loaders
        .load_path(
            &book,
            &LoadOptions {
                header_case: Some(HeaderCase::Verbatim),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(verbatim.rows()[0].get("Article No"), Some("A1"));
}

#[test]
fn test_stream_matches_file_output() {
    let loaders = LoaderRegistry::new();
    let dataset = loaders
        .load_path(&fixture_path("articles.csv"), &LoadOptions::default())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.csv");
    let generator = GeneratorRegistry::new()
        .for_destination(Some(&out), &GenerateOptions::default())
        .unwrap();
    generator.generate(dataset.rows()).unwrap();

    let mut streamed = Vec::new();
    generator
        .generate_stream(&mut streamed, dataset.rows())
        .unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), streamed);
}

#[test]
fn test_missing_input_file() {
    let err = LoaderRegistry::new()
        .load_path(&fixture_path("does-not-exist.csv"), &LoadOptions::default())
        .unwrap_err();
    assert!(matches!(err, TabularError::Io(_)));
}
