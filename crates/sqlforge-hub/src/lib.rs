/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! sqlforge-hub: HTTP surface for sqlforge
//!
//! This crate provides:
//! - `POST /api/query`: multipart upload of a query template (`sql_file`),
//!   optional input data (`values_file`) and run options (`config`); the
//!   query result is streamed back as CSV, XLSX or a text table
//! - `GET /health`: JSON liveness check
//! - Optional static file serving for everything else

pub mod context;
pub mod error;
pub mod server;

pub use context::{DEFAULT_MAX_UPLOAD_BYTES, HubConfig, HubContext, SharedContext};
pub use error::{Error, Result};
pub use server::{build_router, run_server, run_server_until};
