/*
 * format.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! File-format helpers shared by loaders and generators.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use heck::ToLowerCamelCase;
use serde::{Deserialize, Serialize};

/// Normalize an extension: no leading dot, lower case.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}

/// Normalized extension of `path`, if it has one.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(normalize_extension)
        .filter(|ext| !ext.is_empty())
}

/// How header cells are turned into column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderCase {
    /// Keep the header text as written.
    Verbatim,
    /// `Article No` becomes `articleNo`.
    LowerCamel,
}

impl HeaderCase {
    pub fn apply(self, header: &str) -> String {
        match self {
            HeaderCase::Verbatim => header.to_string(),
            HeaderCase::LowerCamel => header.to_lower_camel_case(),
        }
    }
}

impl fmt::Display for HeaderCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderCase::Verbatim => f.write_str("verbatim"),
            HeaderCase::LowerCamel => f.write_str("lower-camel"),
        }
    }
}

impl FromStr for HeaderCase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verbatim" => Ok(HeaderCase::Verbatim),
            "lower-camel" | "camel" => Ok(HeaderCase::LowerCamel),
            other => Err(format!(
                "invalid header case '{other}' (expected 'verbatim' or 'lower-camel')"
            )),
        }
    }
}
