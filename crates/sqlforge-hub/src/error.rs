/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for sqlforge-hub

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid multipart form: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Missing sql_file")]
    MissingTemplate,

    #[error("sql_file is not valid UTF-8")]
    TemplateEncoding,

    #[error("config is not valid UTF-8")]
    ConfigEncoding,

    #[error(transparent)]
    Pipeline(#[from] sqlforge_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Multipart(err) => err.status(),
            Error::MissingTemplate | Error::TemplateEncoding | Error::ConfigEncoding => {
                StatusCode::BAD_REQUEST
            }
            Error::Pipeline(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            Error::Pipeline(_) | Error::Io(_) | Error::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlforge_tabular::TabularError> for Error {
    fn from(err: sqlforge_tabular::TabularError) -> Self {
        Error::Pipeline(err.into())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(%status, error = %self, "Request failed");
        (status, self.to_string()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
