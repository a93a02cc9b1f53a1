/*
 * loader/xlsx.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! XLSX loader.

use std::io::Cursor;

use calamine::{Data, Range, Reader, Xlsx, open_workbook_from_rs};

use crate::dataset::Dataset;
use crate::error::{Result, TabularError};
use crate::format::HeaderCase;

use super::{LoadOptions, Loader};

/// Loads one worksheet of an Excel workbook.
///
/// Row 1 is the header. Headers are lower-camel-cased unless the options
/// say otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxLoader;

impl Loader for XlsxLoader {
    fn name(&self) -> &str {
        "xlsx"
    }

    fn extensions(&self) -> &[&str] {
        &["xlsx"]
    }

    fn default_header_case(&self) -> HeaderCase {
        HeaderCase::LowerCamel
    }

    fn load_bytes(&self, bytes: &[u8], options: &LoadOptions) -> Result<Dataset> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
        let sheet = select_sheet(&workbook.sheet_names(), options)?;
        let range = workbook.worksheet_range(&sheet)?;

        let mut grid = sheet_rows(&range).into_iter();
        let Some(header_row) = grid.next() else {
            return Ok(Dataset::empty());
        };

        let case = options
            .header_case
            .unwrap_or_else(|| self.default_header_case());
        let headers = header_row.iter().map(|h| case.apply(h)).collect();
        Ok(Dataset::from_records(headers, grid))
    }
}

/// Pick the sheet by name first, then by index.
pub(crate) fn select_sheet(names: &[String], options: &LoadOptions) -> Result<String> {
    match options.sheet_name.as_deref() {
        Some(name) if !name.is_empty() => names
            .iter()
            .find(|n| n.as_str() == name)
            .cloned()
            .ok_or_else(|| TabularError::SheetNotFound(name.to_string())),
        _ => names
            .get(options.sheet_index)
            .cloned()
            .ok_or(TabularError::SheetIndexOutOfRange {
                index: options.sheet_index,
                count: names.len(),
            }),
    }
}

/// Cell text of a worksheet at absolute positions.
///
/// Blank rows above and blank columns left of the used range are kept as
/// empty cells, so row 1 is always the first grid row.
pub(crate) fn sheet_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    let Some((first_row, first_col)) = range.start() else {
        return Vec::new();
    };
    let mut grid: Vec<Vec<String>> = vec![Vec::new(); first_row as usize];
    for row in range.rows() {
        let mut cells = vec![String::new(); first_col as usize];
        cells.extend(row.iter().map(cell_text));
        grid.push(cells);
    }
    grid
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}
