/*
 * lexer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tokenizer for template source.
//!
//! The lexer splits source text into literal text runs and the tokens of
//! each `{{ ... }}` action. Trim markers (`{{- ` and ` -}}`) are applied
//! here, so the parser only ever sees already-trimmed text.

use std::fmt;

use crate::error::{TemplateError, TemplateResult};

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";
const LEFT_COMMENT: &str = "/*";
const RIGHT_COMMENT: &str = "*/";

/// A lexed token with its byte range in the source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub offset: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Text(String),
    Comment(String),
    LeftDelim,
    RightDelim,
    /// `.Name`, stored without the dot.
    Field(String),
    Dot,
    /// `$name`, stored with the `$`.
    Variable(String),
    Identifier(String),
    String(String),
    Int(i64),
    Bool(bool),
    Nil,
    Pipe,
    LeftParen,
    RightParen,
    Declare,
    Assign,
    Comma,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Text(_) => write!(f, "text"),
            TokenKind::Comment(_) => write!(f, "comment"),
            TokenKind::LeftDelim => write!(f, "{{{{"),
            TokenKind::RightDelim => write!(f, "}}}}"),
            TokenKind::Field(name) => write!(f, "<.{name}>"),
            TokenKind::Dot => write!(f, "<.>"),
            TokenKind::Variable(name) => write!(f, "<{name}>"),
            TokenKind::Identifier(name) => write!(f, "<{name}>"),
            TokenKind::String(s) => write!(f, "{s:?}"),
            TokenKind::Int(n) => write!(f, "<{n}>"),
            TokenKind::Bool(b) => write!(f, "<{b}>"),
            TokenKind::Nil => write!(f, "<nil>"),
            TokenKind::Pipe => write!(f, "<|>"),
            TokenKind::LeftParen => write!(f, "<(>"),
            TokenKind::RightParen => write!(f, "<)>"),
            TokenKind::Declare => write!(f, "<:=>"),
            TokenKind::Assign => write!(f, "<=>"),
            TokenKind::Comma => write!(f, "<,>"),
        }
    }
}

/// Tokenize a whole template.
pub(crate) fn tokenize(source: &str) -> TemplateResult<Vec<Token>> {
    Lexer {
        source,
        pos: 0,
        tokens: Vec::new(),
        trim_next_text: false,
    }
    .run()
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    /// Set by a ` -}}` marker: strip leading whitespace of the next text run.
    trim_next_text: bool,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> TemplateResult<Vec<Token>> {
        while self.pos < self.source.len() {
            let rest = &self.source[self.pos..];
            let text_len = rest.find(LEFT_DELIM).unwrap_or(rest.len());
            let delim_at = self.pos + text_len;

            let trim_left = self.source[delim_at..]
                .strip_prefix(LEFT_DELIM)
                .and_then(|after| after.strip_prefix('-'))
                .is_some_and(|after| after.starts_with(is_space));

            let mut text = &rest[..text_len];
            if std::mem::take(&mut self.trim_next_text) {
                text = text.trim_start_matches(is_space);
            }
            if trim_left {
                text = text.trim_end_matches(is_space);
            }
            if !text.is_empty() {
                self.tokens.push(Token {
                    kind: TokenKind::Text(text.to_string()),
                    offset: self.pos,
                    end: delim_at,
                });
            }

            if delim_at >= self.source.len() {
                self.pos = delim_at;
                break;
            }
            self.pos = delim_at + LEFT_DELIM.len() + usize::from(trim_left);
            self.lex_action(delim_at)?;
        }
        Ok(self.tokens)
    }

    fn lex_action(&mut self, delim_at: usize) -> TemplateResult<()> {
        self.skip_space();
        if self.rest().starts_with(LEFT_COMMENT) {
            return self.lex_comment(delim_at);
        }

        self.tokens.push(Token {
            kind: TokenKind::LeftDelim,
            offset: delim_at,
            end: self.pos,
        });

        loop {
            let skipped = self.skip_space();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.error(delim_at, "unclosed action"));
            }
            if skipped > 0 && rest.starts_with("-}}") {
                self.push(TokenKind::RightDelim, 3);
                self.trim_next_text = true;
                return Ok(());
            }
            if rest.starts_with(RIGHT_DELIM) {
                self.push(TokenKind::RightDelim, 2);
                return Ok(());
            }
            self.lex_token()?;
        }
    }

    fn lex_comment(&mut self, delim_at: usize) -> TemplateResult<()> {
        let body_start = self.pos + LEFT_COMMENT.len();
        let Some(close) = self.source[body_start..].find(RIGHT_COMMENT) else {
            return Err(self.error(delim_at, "unclosed comment"));
        };
        let text = self.source[body_start..body_start + close].to_string();
        self.pos = body_start + close + RIGHT_COMMENT.len();

        let skipped = self.skip_space();
        let rest = self.rest();
        let trim_right = skipped > 0 && rest.starts_with("-}}");
        if trim_right {
            self.pos += 3;
        } else if skipped == 0 && rest.starts_with(RIGHT_DELIM) {
            self.pos += 2;
        } else {
            return Err(self.error(self.pos, "comment ends before closing delimiter"));
        }

        self.trim_next_text = trim_right;
        self.tokens.push(Token {
            kind: TokenKind::Comment(text),
            offset: delim_at,
            end: self.pos,
        });
        Ok(())
    }

    fn lex_token(&mut self) -> TemplateResult<()> {
        let rest = self.rest();
        let Some(c) = rest.chars().next() else {
            return Ok(());
        };
        match c {
            '|' => self.push(TokenKind::Pipe, 1),
            '(' => self.push(TokenKind::LeftParen, 1),
            ')' => self.push(TokenKind::RightParen, 1),
            ',' => self.push(TokenKind::Comma, 1),
            '=' => self.push(TokenKind::Assign, 1),
            ':' => {
                if rest.starts_with(":=") {
                    self.push(TokenKind::Declare, 2);
                } else {
                    return Err(self.error(self.pos, "expected :="));
                }
            }
            '"' => self.lex_quoted()?,
            '`' => self.lex_raw()?,
            '$' => {
                let len = 1 + ident_len(&rest[1..]);
                self.push(TokenKind::Variable(rest[..len].to_string()), len);
            }
            '.' => {
                let after = &rest[1..];
                match after.chars().next() {
                    Some(next) if is_ident_start(next) => {
                        let len = ident_len(after);
                        self.push(TokenKind::Field(after[..len].to_string()), 1 + len);
                    }
                    Some(next) if next.is_ascii_digit() => {
                        return Err(self.error(self.pos, "floating-point numbers are not supported"));
                    }
                    _ => self.push(TokenKind::Dot, 1),
                }
            }
            '-' | '+' if rest[1..].starts_with(|n: char| n.is_ascii_digit()) => self.lex_number()?,
            c if c.is_ascii_digit() => self.lex_number()?,
            c if is_ident_start(c) => {
                let len = ident_len(rest);
                let word = &rest[..len];
                let kind = match word {
                    "true" => TokenKind::Bool(true),
                    "false" => TokenKind::Bool(false),
                    "nil" => TokenKind::Nil,
                    _ => TokenKind::Identifier(word.to_string()),
                };
                self.push(kind, len);
            }
            other => {
                return Err(self.error(self.pos, format!("unexpected {other:?} in command")));
            }
        }
        Ok(())
    }

    fn lex_number(&mut self) -> TemplateResult<()> {
        let rest = self.rest();
        let sign = usize::from(rest.starts_with(['-', '+']));
        let digits = rest[sign..]
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(rest.len() - sign);
        let literal = &rest[..sign + digits];
        if rest[sign + digits..].starts_with('.') {
            return Err(self.error(self.pos, "floating-point numbers are not supported"));
        }
        let cleaned = literal.replace('_', "");
        let parsed = if let Some(hex) = cleaned
            .strip_prefix("0x")
            .or_else(|| cleaned.strip_prefix("-0x"))
        {
            i64::from_str_radix(hex, 16).map(|n| if cleaned.starts_with('-') { -n } else { n })
        } else {
            cleaned.parse::<i64>()
        };
        match parsed {
            Ok(n) => {
                self.push(TokenKind::Int(n), literal.len());
                Ok(())
            }
            Err(_) => Err(self.error(self.pos, format!("bad number syntax: {literal:?}"))),
        }
    }

    fn lex_quoted(&mut self) -> TemplateResult<()> {
        let start = self.pos;
        let mut value = String::new();
        let mut chars = self.source[start + 1..].char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.push(TokenKind::String(value), i + 2);
                    return Ok(());
                }
                '\n' => break,
                '\\' => {
                    let Some((_, escaped)) = chars.next() else {
                        break;
                    };
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '\\' => value.push('\\'),
                        '"' => value.push('"'),
                        '\'' => value.push('\''),
                        '0' => value.push('\0'),
                        other => {
                            return Err(self.error(
                                start + 1 + i,
                                format!("unknown escape sequence: \\{other}"),
                            ));
                        }
                    }
                }
                other => value.push(other),
            }
        }
        Err(self.error(start, "unterminated quoted string"))
    }

    fn lex_raw(&mut self) -> TemplateResult<()> {
        let start = self.pos;
        match self.source[start + 1..].find('`') {
            Some(close) => {
                let value = self.source[start + 1..start + 1 + close].to_string();
                self.push(TokenKind::String(value), close + 2);
                Ok(())
            }
            None => Err(self.error(start, "unterminated raw quoted string")),
        }
    }

    fn push(&mut self, kind: TokenKind, len: usize) {
        self.tokens.push(Token {
            kind,
            offset: self.pos,
            end: self.pos + len,
        });
        self.pos += len;
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    /// Skip whitespace, returning the number of bytes skipped.
    fn skip_space(&mut self) -> usize {
        let rest = self.rest();
        let skipped = rest.len() - rest.trim_start_matches(is_space).len();
        self.pos += skipped;
        skipped
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::parse_at(self.source, offset, message)
    }
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn ident_len(s: &str) -> usize {
    s.find(|c: char| !(c == '_' || c.is_alphanumeric()))
        .unwrap_or(s.len())
}
