/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Query template engine for sqlforge.
//!
//! This crate implements the subset of Go's `text/template` language used
//! to author parameterized SQL queries. It supports:
//!
//! - Field and variable interpolation: `{{ .Table }}`, `{{ $row.Name }}`
//! - Conditionals: `{{ if .A }}...{{ else if .B }}...{{ else }}...{{ end }}`
//! - Loops: `{{ range $i, $row := .Rows }}...{{ else }}...{{ end }}`
//! - Context narrowing: `{{ with .Cfg }}...{{ end }}`
//! - Pipelines and helpers: `{{ .Rows | len }}`, `{{ add $i 1 }}`
//! - Trim markers and comments: `{{- /* note */ -}}`
//!
//! # Architecture
//!
//! Besides rendering, a compiled [`Template`] can report every data path it
//! reads ([`Template::fields`]) without evaluating anything. Callers use
//! this to check a template against the columns of a dataset before
//! rendering it.
//!
//! # Example
//!
//! ```
//! use sqlforge_template::{Template, TemplateValue, extract_fields};
//! use serde_json::json;
//!
//! let source = "SELECT * FROM t WHERE name IN ({{ range $i, $r := .Rows }}{{ if $i }}, {{ end }}'{{ $r.Name }}'{{ end }})";
//!
//! let fields = extract_fields(source).unwrap();
//! assert!(fields.contains_field("Rows[].Name"));
//!
//! let data = TemplateValue::from(json!({"Rows": [{"Name": "a"}, {"Name": "b"}]}));
//! let output = Template::compile(source).unwrap().render(&data).unwrap();
//! assert_eq!(output, "SELECT * FROM t WHERE name IN ('a', 'b')");
//! ```

pub mod ast;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod extract;
pub mod funcs;
mod lexer;
pub mod parser;

// Re-export main types at crate root
pub use ast::{Branch, Command, Operand, Pipeline, Span, TemplateNode};
pub use context::TemplateValue;
pub use error::{TemplateError, TemplateResult};
pub use evaluator::MissingKey;
pub use extract::{FieldRef, FieldSet, LENGTH_VARIABLE, extract_fields};
pub use funcs::{Arity, FuncMap, TemplateFn};
pub use parser::Template;
