/*
 * loader/mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tabular loaders.
//!
//! A [`Loader`] turns the bytes of one input file into a [`Dataset`].
//! Loaders are chosen by file extension through a [`LoaderRegistry`];
//! supporting a new format means registering another implementation.

mod csv;
mod xlsx;

pub use self::csv::CsvLoader;
pub use self::xlsx::XlsxLoader;

pub(crate) use self::xlsx::sheet_rows;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{Result, TabularError};
use crate::format::{HeaderCase, extension_of, normalize_extension};

/// Options that influence how an input file is read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoadOptions {
    /// Worksheet to read. Takes precedence over `sheet_index`.
    pub sheet_name: Option<String>,
    /// Zero-based worksheet index, used when no name is given.
    pub sheet_index: usize,
    /// Header normalization; `None` uses the loader's default.
    pub header_case: Option<HeaderCase>,
}

/// Reads one tabular format.
///
/// # Thread Safety
///
/// Loaders are stateless and shared across requests through `Arc`.
pub trait Loader: Send + Sync {
    /// Format name, e.g. "csv".
    fn name(&self) -> &str;

    /// Normalized extensions this loader handles.
    fn extensions(&self) -> &[&str];

    /// Header normalization used when the options do not set one.
    fn default_header_case(&self) -> HeaderCase {
        HeaderCase::Verbatim
    }

    /// Parse a complete file.
    fn load_bytes(&self, bytes: &[u8], options: &LoadOptions) -> Result<Dataset>;
}

impl std::fmt::Debug for dyn Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("name", &self.name())
            .field("extensions", &self.extensions())
            .finish()
    }
}

/// Registry of loaders keyed by normalized extension.
#[derive(Debug, Clone)]
pub struct LoaderRegistry {
    loaders: HashMap<String, Arc<dyn Loader>>,
}

impl LoaderRegistry {
    /// Create a registry with the CSV and XLSX loaders.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(CsvLoader));
        registry.register(Arc::new(XlsxLoader));
        registry
    }

    /// Create an empty registry (for testing).
    pub fn empty() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    /// Register a loader under each of its extensions, replacing earlier entries.
    pub fn register(&mut self, loader: Arc<dyn Loader>) {
        for ext in loader.extensions() {
            self.loaders
                .insert(normalize_extension(ext), Arc::clone(&loader));
        }
    }

    /// Get the loader for an extension (with or without the dot, any case).
    pub fn get(&self, extension: &str) -> Option<Arc<dyn Loader>> {
        self.loaders.get(&normalize_extension(extension)).cloned()
    }

    /// Get the loader for a file name or path.
    pub fn for_path(&self, path: &Path) -> Result<Arc<dyn Loader>> {
        extension_of(path)
            .and_then(|ext| self.get(&ext))
            .ok_or_else(|| TabularError::UnsupportedFormat(path.display().to_string()))
    }

    /// Read and load a file from disk.
    pub fn load_path(&self, path: &Path, options: &LoadOptions) -> Result<Dataset> {
        let loader = self.for_path(path)?;
        let bytes = std::fs::read(path)?;
        loader.load_bytes(&bytes, options)
    }

    /// Load uploaded bytes; `filename` only selects the format.
    pub fn load_bytes(&self, filename: &str, bytes: &[u8], options: &LoadOptions) -> Result<Dataset> {
        self.for_path(Path::new(filename))?
            .load_bytes(bytes, options)
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.loaders.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
