/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tabular input and output for sqlforge.
//!
//! Input files become a [`Dataset`] through a [`LoaderRegistry`]; result
//! rows are written back out through a [`GeneratorRegistry`]. Both
//! registries dispatch on file extension, and both ship with CSV and XLSX
//! implementations. With no output path, results are printed as an aligned
//! text table.
//!
//! ```
//! use sqlforge_tabular::{LoadOptions, LoaderRegistry};
//!
//! let loaders = LoaderRegistry::new();
//! let dataset = loaders
//!     .load_bytes("values.csv", b"id,name\n1,ann\n", &LoadOptions::default())
//!     .unwrap();
//! assert_eq!(dataset.rows()[0].get("name"), Some("ann"));
//! ```

pub mod dataset;
pub mod error;
pub mod format;
pub mod generator;
pub mod loader;

pub use dataset::{Dataset, Row, columns};
pub use error::{Result, TabularError};
pub use format::{HeaderCase, extension_of, normalize_extension};
pub use generator::{
    CsvGenerator, DEFAULT_SHEET, GenerateOptions, Generator, GeneratorFactory, GeneratorRegistry,
    TableGenerator, WriteMode, XlsxGenerator,
};
pub use loader::{CsvLoader, LoadOptions, Loader, LoaderRegistry, XlsxLoader};
