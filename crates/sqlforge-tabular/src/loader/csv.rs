/*
 * loader/csv.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! CSV loader.

use crate::dataset::Dataset;
use crate::error::Result;

use super::{LoadOptions, Loader};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Loads comma-separated files. The first record is the header.
///
/// Records may be shorter or longer than the header. Loading stops at the
/// first record that cannot be read; rows before it are kept and the
/// dataset carries a truncation note.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvLoader;

impl Loader for CsvLoader {
    fn name(&self) -> &str {
        "csv"
    }

    fn extensions(&self) -> &[&str] {
        &["csv"]
    }

    fn load_bytes(&self, bytes: &[u8], options: &LoadOptions) -> Result<Dataset> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let case = options
            .header_case
            .unwrap_or_else(|| self.default_header_case());

        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);
        let mut records = reader.records();

        let headers: Vec<String> = match records.next() {
            None => return Ok(Dataset::empty()),
            Some(header) => header?.iter().map(|h| case.apply(h)).collect(),
        };

        let mut rows = Vec::new();
        let mut truncation = None;
        for record in records {
            match record {
                Ok(record) => rows.push(record.iter().map(str::to_string).collect::<Vec<_>>()),
                Err(err) => {
                    truncation = Some(format!(
                        "stopped reading after {} rows: {err}",
                        rows.len()
                    ));
                    break;
                }
            }
        }

        let dataset = Dataset::from_records(headers, rows);
        Ok(match truncation {
            Some(note) => dataset.with_truncation(note),
            None => dataset,
        })
    }
}
