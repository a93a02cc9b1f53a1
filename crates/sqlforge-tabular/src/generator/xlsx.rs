/*
 * generator/xlsx.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! XLSX generator.
//!
//! The writer cannot edit a workbook in place, so an existing destination is
//! read back (every sheet, as cell text) and written out again with the
//! target sheet replaced or extended. Other sheets keep their cell text.

use std::io::Write;
use std::path::{Path, PathBuf};

use calamine::{Reader, Xlsx, open_workbook};
use rust_xlsxwriter::{Workbook, XlsxError};

use crate::dataset::{Row, columns};
use crate::error::Result;
use crate::loader::sheet_rows;

use super::{GenerateOptions, Generator, WriteMode};

type Grid = Vec<Vec<String>>;

/// Writes rows to one worksheet of an Excel workbook.
#[derive(Debug, Clone)]
pub struct XlsxGenerator {
    destination: PathBuf,
    options: GenerateOptions,
}

impl XlsxGenerator {
    pub fn new(destination: impl Into<PathBuf>, options: GenerateOptions) -> Self {
        Self {
            destination: destination.into(),
            options,
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    fn existing_sheets(&self) -> Result<Vec<(String, Grid)>> {
        if !self.destination.exists() {
            return Ok(Vec::new());
        }
        let mut workbook: Xlsx<_> = open_workbook(&self.destination)?;
        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name)?;
            sheets.push((name, sheet_rows(&range)));
        }
        Ok(sheets)
    }
}

impl Generator for XlsxGenerator {
    fn name(&self) -> &str {
        "xlsx"
    }

    fn content_type(&self) -> &str {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    }

    fn allows_empty(&self) -> bool {
        true
    }

    fn generate(&self, rows: &[Row]) -> Result<()> {
        let mut sheets = self.existing_sheets()?;
        let target = self.options.sheet();

        match sheets.iter_mut().find(|(name, _)| name == target) {
            Some((_, grid)) => match self.options.mode {
                WriteMode::Overwrite => *grid = table_grid(rows, true),
                WriteMode::Append => {
                    let with_header = grid.is_empty();
                    grid.extend(table_grid(rows, with_header));
                }
            },
            None => sheets.push((target.to_string(), table_grid(rows, true))),
        }

        let mut workbook = build_workbook(&sheets)?;
        workbook.save(&self.destination)?;
        Ok(())
    }

    fn generate_stream(&self, sink: &mut dyn Write, rows: &[Row]) -> Result<()> {
        let sheets = vec![(self.options.sheet().to_string(), table_grid(rows, true))];
        let mut workbook = build_workbook(&sheets)?;
        sink.write_all(&workbook.save_to_buffer()?)?;
        Ok(())
    }
}

/// Header plus data rows in sorted column order. Empty when there are no rows.
fn table_grid(rows: &[Row], with_header: bool) -> Grid {
    if rows.is_empty() {
        return Vec::new();
    }
    let headers = columns(rows);
    let body = rows.iter().map(|row| {
        headers
            .iter()
            .map(|h| row.get_or_empty(h).to_string())
            .collect()
    });
    if with_header {
        std::iter::once(headers.clone()).chain(body).collect()
    } else {
        body.collect()
    }
}

fn build_workbook(sheets: &[(String, Grid)]) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    for (name, grid) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name)?;
        for (r, cells) in grid.iter().enumerate() {
            for (c, text) in cells.iter().enumerate() {
                if text.is_empty() {
                    continue;
                }
                let (Ok(r), Ok(c)) = (u32::try_from(r), u16::try_from(c)) else {
                    return Err(XlsxError::RowColumnLimitError.into());
                };
                worksheet.write_string(r, c, text)?;
            }
        }
    }
    Ok(workbook)
}
