/*
 * generator/table.rs
 * Copyright (c) 2025 Posit, PBC
 */

use std::io::Write;

use tabwriter::TabWriter;

use crate::dataset::{Row, columns};
use crate::error::{Result, TabularError};

use super::Generator;

const SEPARATOR: &str = "--------";

/// Aligned plain-text table, for printing results to a terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableGenerator;

impl TableGenerator {
    /// A table generator whose destination is standard output.
    pub fn stdout() -> Self {
        TableGenerator
    }
}

impl Generator for TableGenerator {
    fn name(&self) -> &str {
        "table"
    }

    fn content_type(&self) -> &str {
        "text/plain"
    }

    fn generate(&self, rows: &[Row]) -> Result<()> {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.generate_stream(&mut lock, rows)
    }

    fn generate_stream(&self, sink: &mut dyn Write, rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Err(TabularError::EmptyInput);
        }
        let headers = columns(rows);
        let mut table = TabWriter::new(sink).minwidth(0).padding(2);

        writeln!(table, "{}", headers.join("\t"))?;
        writeln!(table, "{}", vec![SEPARATOR; headers.len()].join("\t"))?;
        for row in rows {
            let cells: Vec<&str> = headers.iter().map(|h| row.get_or_empty(h)).collect();
            writeln!(table, "{}", cells.join("\t"))?;
        }
        table.flush()?;
        Ok(())
    }
}
