/*
 * query_data.rs
 * Copyright (c) 2025 Posit, PBC
 */

use std::collections::BTreeMap;

use sqlforge_tabular::{Dataset, Row};
use sqlforge_template::TemplateValue;

/// Name of the collection templates range over.
pub const ROWS_FIELD: &str = "Rows";

/// Data bound to a query template: the rows of one input file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryData {
    rows: Vec<Row>,
}

impl QueryData {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// No input file.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn first_row(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The template context: `{"Rows": [{column: cell, ...}, ...]}`.
    pub fn to_template_value(&self) -> TemplateValue {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|(k, v)| (k.clone(), TemplateValue::String(v.clone())))
                    .collect::<BTreeMap<_, _>>()
                    .into()
            })
            .collect();
        let mut root = BTreeMap::new();
        root.insert(ROWS_FIELD.to_string(), TemplateValue::List(rows));
        TemplateValue::Map(root)
    }
}

impl From<Dataset> for QueryData {
    fn from(dataset: Dataset) -> Self {
        Self::new(dataset.into_rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_template_value_shape() {
        let row: Row = [("Name", "ann")].into_iter().collect();
        let data = QueryData::new(vec![row]);
        let value = data.to_template_value();
        assert_eq!(
            value.get_path(&["Rows"]).map(TemplateValue::kind_name),
            Some("[]interface {}")
        );
        assert_eq!(value.render(), "map[Rows:[map[Name:ann]]]");
    }

    #[test]
    fn test_empty_has_empty_rows() {
        let value = QueryData::empty().to_template_value();
        assert_eq!(
            value.get_path(&["Rows"]),
            Some(&TemplateValue::List(Vec::new()))
        );
    }
}
