/*
 * generator/csv.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! CSV generator.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::dataset::{Row, columns};
use crate::error::{Result, TabularError};

use super::Generator;

/// Writes rows as CSV with a header line of sorted column names.
#[derive(Debug, Clone)]
pub struct CsvGenerator {
    destination: PathBuf,
}

impl CsvGenerator {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

impl Generator for CsvGenerator {
    fn name(&self) -> &str {
        "csv"
    }

    fn content_type(&self) -> &str {
        "text/csv"
    }

    fn generate(&self, rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Err(TabularError::EmptyInput);
        }
        let mut file = BufWriter::new(File::create(&self.destination)?);
        self.generate_stream(&mut file, rows)?;
        file.flush()?;
        Ok(())
    }

    fn generate_stream(&self, sink: &mut dyn Write, rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Err(TabularError::EmptyInput);
        }
        let headers = columns(rows);
        let mut writer = ::csv::Writer::from_writer(sink);
        writer
            .write_record(&headers)
            .map_err(TabularError::from_csv)?;
        for row in rows {
            writer
                .write_record(headers.iter().map(|h| row.get_or_empty(h)))
                .map_err(TabularError::from_csv)?;
        }
        writer.flush()?;
        Ok(())
    }
}
