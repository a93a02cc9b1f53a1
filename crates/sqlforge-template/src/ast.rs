/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template AST types.
//!
//! This module defines the abstract syntax tree for parsed templates.
//! Each node records the byte range it was parsed from.

/// Byte range of a node in the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A node in the template AST.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// Literal text to be output as-is.
    Text(Text),

    /// Pipeline evaluation: `{{ .Name }}` or `{{ $x := .Rows }}`
    Action(Action),

    /// Conditional block: `{{ if .A }}...{{ else }}...{{ end }}`
    If(Branch),

    /// Loop: `{{ range $i, $row := .Rows }}...{{ else }}...{{ end }}`
    Range(Branch),

    /// Context narrowing: `{{ with .A }}...{{ else }}...{{ end }}`
    With(Branch),

    /// Comment (not rendered): `{{/* comment */}}`
    Comment(Comment),
}

/// Literal text node.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    /// The literal text content, after trim markers were applied.
    pub text: String,
    pub span: Span,
}

/// Comment node.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// The comment text without the `/*` `*/` markers.
    pub text: String,
    pub span: Span,
}

/// An action that evaluates a pipeline and prints its value.
///
/// Actions that declare or assign variables print nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub pipeline: Pipeline,
    pub span: Span,
}

/// Shared shape of the `if`, `range` and `with` control structures.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// The controlling pipeline.
    pub pipeline: Pipeline,
    /// Nodes evaluated when the pipeline is truthy (or once per element for `range`).
    pub body: Vec<TemplateNode>,
    /// Nodes evaluated otherwise. `else if` / `else with` nest a single control node here.
    pub else_body: Option<Vec<TemplateNode>>,
    pub span: Span,
}

/// A pipeline: optional variable declarations followed by `|`-separated commands.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    /// Declared or assigned variable names, including the leading `$`.
    pub decl: Vec<String>,
    /// True for `$x = ...`, false for `$x := ...`.
    pub is_assign: bool,
    pub commands: Vec<Command>,
    pub span: Span,
}

impl Pipeline {
    /// The single operand of a one-command, one-operand pipeline, if that is its shape.
    pub fn single_operand(&self) -> Option<&Operand> {
        match self.commands.as_slice() {
            [command] if command.args.len() == 1 => command.args.first(),
            _ => None,
        }
    }
}

/// One command of a pipeline: a function call or a single value.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub args: Vec<Operand>,
    pub span: Span,
}

/// An operand inside a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// The cursor: `.`
    Dot,
    /// Field access relative to the cursor: `.Rows` or `.A.B`
    Field(Vec<String>),
    /// Variable with optional field chain: `$`, `$row`, `$row.Name`
    Variable { name: String, fields: Vec<String> },
    /// Helper function name: `len`, `add`
    Function(String),
    /// Field chain on a parenthesized pipeline: `(index .Rows 0).Name`
    Chain {
        base: Box<Operand>,
        fields: Vec<String>,
    },
    /// Parenthesized pipeline: `(len .Rows)`
    Pipeline(Box<Pipeline>),
    String(String),
    Int(i64),
    Bool(bool),
    Nil,
}
