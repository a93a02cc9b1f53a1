/*
 * dataset.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! In-memory tabular data.
//!
//! A [`Row`] maps column names to cell text. Keys iterate in lexicographic
//! order, which is also the column order every generator writes. A
//! [`Dataset`] is the result of one load: the normalized header list and
//! rows that all carry every header.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

/// One record: column name to cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, String>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell, returning the previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(column.into(), value.into())
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    /// Cell text, or `""` when the column is absent.
    pub fn get_or_empty(&self, column: &str) -> &str {
        self.get(column).unwrap_or_default()
    }

    pub fn contains_key(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Column names in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<BTreeMap<String, String>> for Row {
    fn from(map: BTreeMap<String, String>) -> Self {
        Row(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row(iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect())
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Column names of a row set: the sorted keys of the first row.
pub fn columns(rows: &[Row]) -> Vec<String> {
    rows.first()
        .map(|row| row.keys().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Rows loaded from one input source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Row>,
    truncation: Option<String>,
}

impl Dataset {
    /// A dataset with no headers and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build rows from raw records, padding short records with `""`.
    ///
    /// Cells past the last header are dropped. When a header repeats, the
    /// rightmost cell wins.
    pub fn from_records<I, R>(headers: Vec<String>, records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = String>,
    {
        let rows = records
            .into_iter()
            .map(|record| {
                let mut cells = record.into_iter();
                headers
                    .iter()
                    .map(|header| (header.clone(), cells.next().unwrap_or_default()))
                    .collect()
            })
            .collect();
        Dataset {
            headers,
            rows,
            truncation: None,
        }
    }

    /// Record that loading stopped early, keeping the rows read so far.
    pub fn with_truncation(mut self, note: impl Into<String>) -> Self {
        self.truncation = Some(note.into());
        self
    }

    /// Normalized headers in source order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Why loading stopped before the end of the input, if it did.
    pub fn truncation(&self) -> Option<&str> {
        self.truncation.as_deref()
    }
}
