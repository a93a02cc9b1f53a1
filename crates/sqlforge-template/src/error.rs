/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template parsing and evaluation.

use thiserror::Error;

/// Errors that can occur during template operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    /// Error parsing the template syntax.
    #[error("template:{line}:{column}: {message}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    /// Error executing the template against data.
    #[error("template: {message}")]
    Exec { message: String },
}

impl TemplateError {
    /// Build a parse error at a byte offset of `source`.
    pub(crate) fn parse_at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_col(source, offset);
        TemplateError::Parse {
            message: message.into(),
            line,
            column,
        }
    }

    /// Build an execution error for the source text at `start..end`.
    pub(crate) fn exec_at(source: &str, start: usize, end: usize, message: &str) -> Self {
        let (line, column) = line_col(source, start);
        let snippet = source.get(start..end).unwrap_or_default().trim();
        TemplateError::Exec {
            message: format!("{line}:{column}: executing at <{snippet}>: {message}"),
        }
    }

    /// True for syntax errors, false for execution errors.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, TemplateError::Parse { .. })
    }
}

/// 1-based line and column of a byte offset.
fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(nl) => before[nl + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        assert_eq!(line_col("abc", 0), (1, 1));
        assert_eq!(line_col("abc", 2), (1, 3));
        assert_eq!(line_col("ab\ncd", 3), (2, 1));
        assert_eq!(line_col("ab\ncd", 4), (2, 2));
        assert_eq!(line_col("ab", 99), (1, 3));
    }

    #[test]
    fn test_parse_error_display() {
        let err = TemplateError::parse_at("x\n{{ .A", 2, "unclosed action");
        assert_eq!(err.to_string(), "template:2:1: unclosed action");
        assert!(err.is_parse_error());
        let exec = TemplateError::Exec {
            message: "boom".to_string(),
        };
        assert!(!exec.is_parse_error());
    }

    #[test]
    fn test_exec_error_display() {
        let source = "SELECT {{ .Missing }}";
        let err = TemplateError::exec_at(source, 10, 18, "map has no entry for key \"Missing\"");
        assert_eq!(
            err.to_string(),
            "template: 1:11: executing at <.Missing>: map has no entry for key \"Missing\""
        );
    }
}
