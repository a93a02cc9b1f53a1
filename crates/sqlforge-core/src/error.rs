/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for the query pipeline.

use sqlforge_tabular::TabularError;
use sqlforge_template::TemplateError;
use thiserror::Error;

/// Errors produced while loading, rendering, executing or generating.
#[derive(Debug, Error)]
pub enum Error {
    /// No loader or generator handles this file.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The template text does not parse.
    #[error("{0}")]
    TemplateSyntax(TemplateError),

    /// The template references columns that the input data lacks.
    #[error("{}", missing_fields_message(columns, *camel_cased))]
    MissingFields {
        /// Sorted, deduplicated column names.
        columns: Vec<String>,
        /// Whether the input headers were camel-cased on load.
        camel_cased: bool,
    },

    /// Substitution failed against data that passed validation.
    #[error("{0}")]
    RenderExecution(TemplateError),

    /// A generator that needs rows was given none.
    #[error("no data to generate")]
    EmptyInput,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other loader or generator failure.
    #[error("{0}")]
    Tabular(TabularError),

    /// The database rejected the connection or the query.
    #[error("query execution failed: {0}")]
    Execution(#[from] sqlx::Error),

    /// Run options could not be parsed.
    #[error("invalid config: {0}")]
    Config(String),

    /// Generation stopped because the consumer went away.
    #[error("generation cancelled")]
    Cancelled,
}

impl Error {
    /// Whether the caller can fix the request that produced this error.
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::UnsupportedFormat(_)
            | Error::TemplateSyntax(_)
            | Error::MissingFields { .. }
            | Error::RenderExecution(_)
            | Error::EmptyInput
            | Error::Config(_) => true,
            Error::Tabular(err) => matches!(
                err,
                TabularError::SheetNotFound(_)
                    | TabularError::SheetIndexOutOfRange { .. }
                    | TabularError::Csv(_)
                    | TabularError::SpreadsheetRead(_)
            ),
            Error::Io(_) | Error::Execution(_) | Error::Cancelled => false,
        }
    }
}

impl From<TabularError> for Error {
    fn from(err: TabularError) -> Self {
        match err {
            TabularError::UnsupportedFormat(name) => Error::UnsupportedFormat(name),
            TabularError::EmptyInput => Error::EmptyInput,
            TabularError::Io(err) => Error::Io(err),
            other => Error::Tabular(other),
        }
    }
}

fn missing_fields_message(columns: &[String], camel_cased: bool) -> String {
    let listed: Vec<String> = columns.iter().map(|c| format!("{c:?}")).collect();
    let mut message = format!(
        "Missing from input data, but specified in query:\n{}",
        listed.join(",\n")
    );
    if camel_cased {
        message.push_str("\n[NOTE]: the input data headers gets camelCased");
    }
    message
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
