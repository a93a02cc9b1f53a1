/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template value types.
//!
//! This module defines the data a template is evaluated against. Values
//! follow Go's text/template conventions for truthiness and printing, so
//! existing Go query templates render unchanged.

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A value that can be used in template evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TemplateValue {
    /// A string value.
    String(String),

    /// An integer value.
    Int(i64),

    /// A boolean value.
    Bool(bool),

    /// A list of values.
    List(Vec<TemplateValue>),

    /// A map of string keys to values. Iteration is in key order.
    Map(BTreeMap<String, TemplateValue>),

    /// A null/missing value.
    #[default]
    Null,
}

impl TemplateValue {
    /// Check if this value is "truthy" for conditional evaluation.
    ///
    /// Truthiness rules (matching Go):
    /// - `false`, `0`, nil and empty strings, lists and maps are falsy
    /// - Everything else is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            TemplateValue::String(s) => !s.is_empty(),
            TemplateValue::Int(n) => *n != 0,
            TemplateValue::Bool(b) => *b,
            TemplateValue::List(items) => !items.is_empty(),
            TemplateValue::Map(m) => !m.is_empty(),
            TemplateValue::Null => false,
        }
    }

    /// Get a nested field by path.
    ///
    /// For example, `get_path(&["Rows"])` on the query data returns the row list.
    pub fn get_path(&self, path: &[&str]) -> Option<&TemplateValue> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => match self {
                TemplateValue::Map(m) => m.get(*first).and_then(|v| v.get_path(rest)),
                _ => None,
            },
        }
    }

    /// Type name used in evaluation error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TemplateValue::String(_) => "string",
            TemplateValue::Int(_) => "int",
            TemplateValue::Bool(_) => "bool",
            TemplateValue::List(_) => "[]interface {}",
            TemplateValue::Map(_) => "map[string]interface {}",
            TemplateValue::Null => "nil",
        }
    }

    /// Render this value as action output.
    ///
    /// - String: returned as-is
    /// - Int/Bool: decimal / `true` / `false`
    /// - List: `[a b c]`
    /// - Map: `map[k1:v1 k2:v2]`
    /// - Null: `<no value>`
    pub fn render(&self) -> String {
        match self {
            TemplateValue::Null => "<no value>".to_string(),
            other => {
                let mut out = String::new();
                other.format_into(&mut out);
                out
            }
        }
    }

    fn format_into(&self, out: &mut String) {
        match self {
            TemplateValue::String(s) => out.push_str(s),
            TemplateValue::Int(n) => {
                let _ = write!(out, "{n}");
            }
            TemplateValue::Bool(b) => {
                let _ = write!(out, "{b}");
            }
            TemplateValue::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    item.format_into(out);
                }
                out.push(']');
            }
            TemplateValue::Map(m) => {
                out.push_str("map[");
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(k);
                    out.push(':');
                    v.format_into(out);
                }
                out.push(']');
            }
            TemplateValue::Null => out.push_str("<nil>"),
        }
    }

    /// Format as a nested value (nil prints as `<nil>`), used by `print`.
    pub(crate) fn to_display_string(&self) -> String {
        let mut out = String::new();
        self.format_into(&mut out);
        out
    }

    /// True for strings; `print` only separates operands when neither is a string.
    pub(crate) fn is_string(&self) -> bool {
        matches!(self, TemplateValue::String(_))
    }
}

impl From<&str> for TemplateValue {
    fn from(s: &str) -> Self {
        TemplateValue::String(s.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(s: String) -> Self {
        TemplateValue::String(s)
    }
}

impl From<i64> for TemplateValue {
    fn from(n: i64) -> Self {
        TemplateValue::Int(n)
    }
}

impl From<bool> for TemplateValue {
    fn from(b: bool) -> Self {
        TemplateValue::Bool(b)
    }
}

impl<T: Into<TemplateValue>> From<Vec<T>> for TemplateValue {
    fn from(items: Vec<T>) -> Self {
        TemplateValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<TemplateValue>> From<BTreeMap<String, V>> for TemplateValue {
    fn from(map: BTreeMap<String, V>) -> Self {
        TemplateValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<serde_json::Value> for TemplateValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => TemplateValue::Null,
            serde_json::Value::Bool(b) => TemplateValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => TemplateValue::Int(i),
                None => TemplateValue::String(n.to_string()),
            },
            serde_json::Value::String(s) => TemplateValue::String(s),
            serde_json::Value::Array(items) => {
                TemplateValue::List(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => {
                TemplateValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}
