/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Query rendering.
//!
//! Rendering runs in three steps:
//!
//! 1. Compile the template and extract every field it reads.
//! 2. Check each `Rows[].<column>` reference against the input headers,
//!    collecting all missing columns into one error.
//! 3. Substitute with strict missing-key handling.
//!
//! Cell values are inserted verbatim. Templates are trusted, so no SQL
//! quoting or escaping is applied.

use sqlforge_template::Template;

use crate::error::{Error, Result};
use crate::query_data::{QueryData, ROWS_FIELD};

/// Renders query templates against input rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryRenderer {
    camel_cased: bool,
}

impl QueryRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the input headers as camel-cased so missing-field errors say so.
    pub fn with_camel_cased_headers(mut self, camel_cased: bool) -> Self {
        self.camel_cased = camel_cased;
        self
    }

    pub fn render(&self, template_text: &str, data: &QueryData) -> Result<String> {
        let template = Template::compile(template_text).map_err(Error::TemplateSyntax)?;

        let missing = missing_columns(&template, data);
        if !missing.is_empty() {
            return Err(Error::MissingFields {
                columns: missing,
                camel_cased: self.camel_cased,
            });
        }

        template
            .render(&data.to_template_value())
            .map_err(Error::RenderExecution)
    }
}

/// Row columns the template reads that the data does not have, sorted.
///
/// With no rows every referenced column counts as missing.
pub fn missing_columns(template: &Template, data: &QueryData) -> Vec<String> {
    let columns = template.fields().columns_of(ROWS_FIELD);
    match data.first_row() {
        Some(row) => columns
            .into_iter()
            .filter(|column| !row.contains_key(column))
            .collect(),
        None => columns.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlforge_tabular::Row;

    fn data(rows: &[&[(&str, &str)]]) -> QueryData {
        QueryData::new(
            rows.iter()
                .map(|r| r.iter().copied().collect::<Row>())
                .collect(),
        )
    }

    #[test]
    fn test_render_rows() {
        let sql = "SELECT * FROM t WHERE name IN ({{ range $i, $r := .Rows }}{{ if $i }}, {{ end }}'{{ $r.Name }}'{{ end }})";
        let out = QueryRenderer::new()
            .render(sql, &data(&[&[("Name", "a")], &[("Name", "b")]]))
            .unwrap();
        assert_eq!(out, "SELECT * FROM t WHERE name IN ('a', 'b')");
    }

    #[test]
    fn test_missing_column_is_rejected() {
        let err = QueryRenderer::new()
            .render(
                "{{ range .Rows }}{{ .Missing }}{{ end }}",
                &data(&[&[("Name", "a")]]),
            )
            .unwrap_err();
        match err {
            Error::MissingFields { columns, camel_cased } => {
                assert_eq!(columns, vec!["Missing".to_string()]);
                assert!(!camel_cased);
            }
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn test_all_missing_columns_reported() {
        let sql = "{{ range .Rows }}{{ .Zeta }}{{ .Name }}{{ .Alpha }}{{ .Zeta }}{{ end }}";
        let err = QueryRenderer::new()
            .with_camel_cased_headers(true)
            .render(sql, &data(&[&[("Name", "a")]]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing from input data, but specified in query:\n\"Alpha\",\n\"Zeta\"\n[NOTE]: the input data headers gets camelCased"
        );
    }

    #[test]
    fn test_empty_data_with_column_reference_fails() {
        let err = QueryRenderer::new()
            .render("{{ range .Rows }}{{ .Name }}{{ end }}", &QueryData::empty())
            .unwrap_err();
        assert!(matches!(err, Error::MissingFields { columns, .. } if columns == vec!["Name"]));
    }

    #[test]
    fn test_empty_data_without_column_reference() {
        let out = QueryRenderer::new()
            .render(
                "SELECT {{ len .Rows }}{{ range .Rows }}x{{ else }} -- none{{ end }}",
                &QueryData::empty(),
            )
            .unwrap();
        assert_eq!(out, "SELECT 0 -- none");
    }

    #[test]
    fn test_static_template() {
        let out = QueryRenderer::new()
            .render("SELECT 1", &QueryData::empty())
            .unwrap();
        assert_eq!(out, "SELECT 1");
    }

    #[test]
    fn test_syntax_error() {
        let err = QueryRenderer::new()
            .render("SELECT {{ if }}", &QueryData::empty())
            .unwrap_err();
        assert!(matches!(err, Error::TemplateSyntax(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_dynamic_path_fails_at_render() {
        // `.Other` is at the root, so validation cannot see it.
        let err = QueryRenderer::new()
            .render("{{ .Other }}", &data(&[&[("Name", "a")]]))
            .unwrap_err();
        assert!(matches!(err, Error::RenderExecution(_)));
        assert!(err.to_string().contains("map has no entry for key \"Other\""));
    }

    #[test]
    fn test_cells_are_not_escaped() {
        let out = QueryRenderer::new()
            .render(
                "'{{ range .Rows }}{{ .V }}{{ end }}'",
                &data(&[&[("V", "it's")]]),
            )
            .unwrap();
        assert_eq!(out, "'it's'");
    }
}
