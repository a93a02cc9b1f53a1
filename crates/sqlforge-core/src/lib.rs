/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Query pipeline for sqlforge.
//!
//! - [`QueryRenderer`] validates a template against the input columns and
//!   renders it
//! - [`QueryExecutor`] runs the rendered SQL; [`SqlxExecutor`] is the
//!   database-backed implementation
//! - [`Pipeline`] strings loading, rendering, execution and generation
//!   together for one-shot runs
//! - [`spawn_generation`] streams generator output to an async reader

pub mod error;
pub mod exec;
pub mod options;
pub mod pipeline;
pub mod query_data;
pub mod render;
pub mod stream;

pub use error::{Error, Result};
pub use exec::{QueryExecutor, SqlxExecutor};
pub use options::RunOptions;
pub use pipeline::{LoadedInput, Pipeline, RunSummary};
pub use query_data::{QueryData, ROWS_FIELD};
pub use render::{QueryRenderer, missing_columns};
pub use stream::{PIPE_CAPACITY, spawn_generation};
