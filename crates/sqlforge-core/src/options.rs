/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Run options.
//!
//! The same keys are accepted from a CLI `--config` file and from the
//! `config` part of an HTTP request:
//!
//! ```yaml
//! sheet-name-in: Articles   # input worksheet, wins over sheet-index-in
//! sheet-index-in: 0
//! header-case: lower-camel  # or verbatim
//! output: result.xlsx       # omit to print a table
//! sheet: Result             # output worksheet
//! mode: append              # or overwrite
//! ```
//!
//! Text is parsed as YAML first and as JSON when that fails.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sqlforge_tabular::{GenerateOptions, HeaderCase, LoadOptions, WriteMode};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RunOptions {
    pub sheet_name_in: Option<String>,
    pub sheet_index_in: usize,
    pub header_case: Option<HeaderCase>,
    pub output: Option<String>,
    pub sheet: Option<String>,
    pub mode: WriteMode,
}

impl RunOptions {
    /// Parse YAML, falling back to JSON. Blank text gives the defaults.
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        match serde_yaml::from_str(text) {
            Ok(options) => Ok(options),
            Err(yaml_err) => serde_json::from_str(text)
                .map_err(|_| Error::Config(yaml_err.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            sheet_name: self.sheet_name_in.clone(),
            sheet_index: self.sheet_index_in,
            header_case: self.header_case,
        }
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            sheet_name: self.sheet.clone(),
            mode: self.mode,
        }
    }

    /// Output destination; `None` (or empty) means print a table.
    pub fn output_path(&self) -> Option<&Path> {
        self.output
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(Path::new)
    }
}
