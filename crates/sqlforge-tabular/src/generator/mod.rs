/*
 * generator/mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tabular generators.
//!
//! A [`Generator`] serializes result rows either to its configured
//! destination ([`Generator::generate`]) or to any byte sink
//! ([`Generator::generate_stream`]). Every generator orders columns by
//! the sorted keys of the first row.

mod csv;
mod table;
mod xlsx;

pub use self::csv::CsvGenerator;
pub use self::table::TableGenerator;
pub use self::xlsx::XlsxGenerator;

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dataset::Row;
use crate::error::{Result, TabularError};
use crate::format::{extension_of, normalize_extension};

/// Default worksheet written by the XLSX generator.
pub const DEFAULT_SHEET: &str = "Sheet1";

/// How an existing destination is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Replace the target sheet (or file).
    #[default]
    Overwrite,
    /// Add rows below the existing content of the target sheet.
    Append,
}

/// Options that influence how results are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GenerateOptions {
    /// Target worksheet; defaults to [`DEFAULT_SHEET`].
    pub sheet_name: Option<String>,
    pub mode: WriteMode,
}

impl GenerateOptions {
    pub fn sheet(&self) -> &str {
        self.sheet_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SHEET)
    }
}

/// Writes one tabular format.
///
/// # Thread Safety
///
/// Generators are `Send + Sync` so streaming can run them on a blocking
/// worker thread.
pub trait Generator: Send + Sync {
    /// Format name, e.g. "csv".
    fn name(&self) -> &str;

    /// MIME type of the streamed output.
    fn content_type(&self) -> &str;

    /// Write rows to the configured destination.
    fn generate(&self, rows: &[Row]) -> Result<()>;

    /// Write rows to an arbitrary sink.
    fn generate_stream(&self, sink: &mut dyn Write, rows: &[Row]) -> Result<()>;

    /// Whether zero rows produce output instead of [`TabularError::EmptyInput`].
    fn allows_empty(&self) -> bool {
        false
    }
}

impl std::fmt::Debug for dyn Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("name", &self.name())
            .field("content_type", &self.content_type())
            .finish()
    }
}

/// Builds a generator for a destination file.
pub type GeneratorFactory = fn(PathBuf, &GenerateOptions) -> Box<dyn Generator>;

/// Registry of generator constructors keyed by normalized extension.
///
/// With no destination the table generator (stdout) is used.
#[derive(Debug, Clone)]
pub struct GeneratorRegistry {
    factories: HashMap<String, GeneratorFactory>,
}

impl GeneratorRegistry {
    /// Create a registry with the CSV and XLSX generators.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("csv", csv_generator);
        registry.register("xlsx", xlsx_generator);
        registry
    }

    /// Create an empty registry (for testing).
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a constructor for an extension, replacing any earlier one.
    pub fn register(&mut self, extension: &str, factory: GeneratorFactory) {
        self.factories
            .insert(normalize_extension(extension), factory);
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.factories.contains_key(&normalize_extension(extension))
    }

    /// Generator for `destination`: the table printer when `None`, else by extension.
    pub fn for_destination(
        &self,
        destination: Option<&Path>,
        options: &GenerateOptions,
    ) -> Result<Box<dyn Generator>> {
        let Some(path) = destination.filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(Box::new(TableGenerator::stdout()));
        };
        let factory = extension_of(path)
            .and_then(|ext| self.factories.get(&ext).copied())
            .ok_or_else(|| TabularError::UnsupportedFormat(path.display().to_string()))?;
        Ok(factory(path.to_path_buf(), options))
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}

fn csv_generator(path: PathBuf, _options: &GenerateOptions) -> Box<dyn Generator> {
    Box::new(CsvGenerator::new(path))
}

fn xlsx_generator(path: PathBuf, options: &GenerateOptions) -> Box<dyn Generator> {
    Box::new(XlsxGenerator::new(path, options.clone()))
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
