/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Hub context - shared state for the server

use std::path::PathBuf;
use std::sync::Arc;

use sqlforge_core::{Pipeline, QueryExecutor};

/// Largest accepted request body.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 << 20;

/// Configuration for the hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Directory served for any path the API does not handle
    pub static_dir: Option<PathBuf>,

    /// Request body limit in bytes
    pub max_upload_bytes: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            static_dir: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Shared context for the hub server.
///
/// Wrapped in `Arc` and shared across all request handlers. Both members are
/// read-only after construction.
#[derive(Debug)]
pub struct HubContext {
    pipeline: Pipeline,
    executor: Arc<dyn QueryExecutor>,
}

pub type SharedContext = Arc<HubContext>;

impl HubContext {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self::with_pipeline(Pipeline::new(), executor)
    }

    pub fn with_pipeline(pipeline: Pipeline, executor: Arc<dyn QueryExecutor>) -> Self {
        Self { pipeline, executor }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn executor(&self) -> &dyn QueryExecutor {
        self.executor.as_ref()
    }
}
