/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for loading and generating tabular data.

use thiserror::Error;

/// Errors that can occur while reading or writing tabular files.
#[derive(Debug, Error)]
pub enum TabularError {
    /// No loader or generator is registered for the file's extension.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// A generator that needs at least one row was given none.
    #[error("no data to generate")]
    EmptyInput,

    /// The requested worksheet does not exist.
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    /// The requested worksheet index is past the last sheet.
    #[error("sheet index {index} out of range (workbook has {count} sheets)")]
    SheetIndexOutOfRange { index: usize, count: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read spreadsheet: {0}")]
    SpreadsheetRead(#[from] calamine::XlsxError),

    #[error("failed to write spreadsheet: {0}")]
    SpreadsheetWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TabularError {
    /// CSV write failures are plain IO failures; report them as such.
    pub(crate) fn from_csv(err: csv::Error) -> Self {
        if !err.is_io_error() {
            return TabularError::Csv(err);
        }
        match err.into_kind() {
            csv::ErrorKind::Io(io) => TabularError::Io(io),
            other => TabularError::Io(std::io::Error::other(format!("{other:?}"))),
        }
    }
}

/// Result type for tabular operations.
pub type Result<T> = std::result::Result<T, TabularError>;
