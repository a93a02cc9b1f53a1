/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template parser.
//!
//! Builds the AST from the token stream produced by the lexer. Like Go's
//! text/template, the parser tracks declared variables and rejects
//! references to undefined variables or unknown functions up front.

use crate::ast::{Action, Branch, Command, Comment, Operand, Pipeline, Span, TemplateNode, Text};
use crate::error::{TemplateError, TemplateResult};
use crate::funcs::FuncMap;
use crate::lexer::{Token, TokenKind, tokenize};

/// A compiled template ready for evaluation.
#[derive(Debug, Clone)]
pub struct Template {
    /// The parsed AST nodes.
    pub(crate) nodes: Vec<TemplateNode>,
    /// Original source text.
    pub(crate) source: String,
    /// Helper functions the template may call.
    pub(crate) funcs: FuncMap,
}

impl Template {
    /// Compile a template from source text with the builtin helper functions.
    ///
    /// # Example
    ///
    /// ```
    /// use sqlforge_template::Template;
    ///
    /// let template = Template::compile("SELECT * FROM t WHERE id = {{ .Id }}").unwrap();
    /// ```
    pub fn compile(source: &str) -> TemplateResult<Self> {
        Self::compile_with_funcs(source, FuncMap::builtin())
    }

    /// Compile a template with a custom helper set.
    pub fn compile_with_funcs(source: &str, funcs: FuncMap) -> TemplateResult<Self> {
        let tokens = tokenize(source)?;
        let nodes = Parser::new(source, tokens, &funcs).parse_template()?;
        Ok(Template {
            nodes,
            source: source.to_string(),
            funcs,
        })
    }

    /// Get the parsed AST nodes.
    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    /// Get the original source text.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// How a node list ended.
enum Stop {
    Eof,
    End,
    Else,
    /// `{{ else if ... }}` or `{{ else with ... }}`; the keyword token is consumed.
    ElseChain(String),
}

#[derive(Clone, Copy, PartialEq)]
enum Control {
    If,
    Range,
    With,
}

impl Control {
    fn keyword(self) -> &'static str {
        match self {
            Control::If => "if",
            Control::Range => "range",
            Control::With => "with",
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    funcs: &'a FuncMap,
    /// Variables in scope, innermost last. `$` is always defined.
    vars: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token>, funcs: &'a FuncMap) -> Self {
        Parser {
            source,
            tokens,
            pos: 0,
            funcs,
            vars: vec!["$".to_string()],
        }
    }

    fn parse_template(mut self) -> TemplateResult<Vec<TemplateNode>> {
        let (nodes, stop) = self.parse_list()?;
        match stop {
            Stop::Eof => Ok(nodes),
            Stop::End => Err(self.error_at_prev("unexpected {{end}}")),
            Stop::Else | Stop::ElseChain(_) => Err(self.error_at_prev("unexpected {{else}}")),
        }
    }

    fn parse_list(&mut self) -> TemplateResult<(Vec<TemplateNode>, Stop)> {
        let mut nodes = Vec::new();
        while let Some(token) = self.next() {
            match token.kind {
                TokenKind::Text(text) => nodes.push(TemplateNode::Text(Text {
                    text,
                    span: Span::new(token.offset, token.end),
                })),
                TokenKind::Comment(text) => nodes.push(TemplateNode::Comment(Comment {
                    text,
                    span: Span::new(token.offset, token.end),
                })),
                TokenKind::LeftDelim => {
                    if let Some(stop) = self.parse_stop()? {
                        return Ok((nodes, stop));
                    }
                    nodes.push(self.parse_action(token.offset)?);
                }
                other => {
                    return Err(self.error(token.offset, format!("unexpected {other}")));
                }
            }
        }
        Ok((nodes, Stop::Eof))
    }

    /// Consume `end`, `else`, `else if` or `else with` after a left delimiter.
    fn parse_stop(&mut self) -> TemplateResult<Option<Stop>> {
        let keyword = match self.peek_kind() {
            Some(TokenKind::Identifier(word)) if word == "end" || word == "else" => word.clone(),
            _ => return Ok(None),
        };
        self.next();
        if keyword == "end" {
            self.expect_right_delim("end")?;
            return Ok(Some(Stop::End));
        }
        match self.peek_kind() {
            Some(TokenKind::Identifier(word)) if word == "if" || word == "with" => {
                let word = word.clone();
                self.next();
                Ok(Some(Stop::ElseChain(word)))
            }
            _ => {
                self.expect_right_delim("else")?;
                Ok(Some(Stop::Else))
            }
        }
    }

    fn parse_action(&mut self, start: usize) -> TemplateResult<TemplateNode> {
        let keyword = match self.peek_kind() {
            Some(TokenKind::Identifier(word)) => Some(word.clone()),
            _ => None,
        };
        if let Some(word) = keyword {
            match word.as_str() {
                "if" => {
                    self.next();
                    return self.parse_control(Control::If, start);
                }
                "range" => {
                    self.next();
                    return self.parse_control(Control::Range, start);
                }
                "with" => {
                    self.next();
                    return self.parse_control(Control::With, start);
                }
                "define" | "template" | "block" | "break" | "continue" => {
                    return Err(self.error(start, format!("{{{{{word}}}}} is not supported")));
                }
                _ => {}
            }
        }
        let pipeline = self.parse_pipeline("command", true)?;
        let end = self.expect_right_delim("command")?;
        Ok(TemplateNode::Action(Action {
            pipeline,
            span: Span::new(start, end),
        }))
    }

    /// Parse `<pipeline>}} body [{{else}} body] {{end}}` after the keyword.
    fn parse_control(&mut self, control: Control, start: usize) -> TemplateResult<TemplateNode> {
        let mark = self.vars.len();
        let keyword = control.keyword();
        let pipeline = self.parse_pipeline(keyword, true)?;
        self.expect_right_delim(keyword)?;

        let (body, stop) = self.parse_list()?;
        let else_body = match stop {
            Stop::End => None,
            Stop::Else => {
                let (else_body, stop) = self.parse_list()?;
                match stop {
                    Stop::End => Some(else_body),
                    Stop::Eof => return Err(self.error(start, format!("unexpected EOF in {keyword}"))),
                    Stop::Else | Stop::ElseChain(_) => {
                        return Err(self.error_at_prev("expected end; found {{else}}"));
                    }
                }
            }
            Stop::ElseChain(chained) => {
                let allowed = matches!(
                    (control, chained.as_str()),
                    (Control::If, "if") | (Control::With, "with")
                );
                if !allowed {
                    return Err(self.error_at_prev(format!(
                        "unexpected {{{{else {chained}}}}} in {keyword}"
                    )));
                }
                let chain_start = self.prev_offset();
                Some(vec![self.parse_control(control, chain_start)?])
            }
            Stop::Eof => return Err(self.error(start, format!("unexpected EOF in {keyword}"))),
        };
        self.vars.truncate(mark);

        let branch = Branch {
            pipeline,
            body,
            else_body,
            span: Span::new(start, self.prev_end()),
        };
        Ok(match control {
            Control::If => TemplateNode::If(branch),
            Control::Range => TemplateNode::Range(branch),
            Control::With => TemplateNode::With(branch),
        })
    }

    /// Parse an optional declaration and the commands of a pipeline.
    ///
    /// Stops before `}}` or `)`, which the caller consumes.
    fn parse_pipeline(&mut self, context: &str, allow_decl: bool) -> TemplateResult<Pipeline> {
        let start = self.peek_offset();
        let mut decl = Vec::new();
        let mut is_assign = false;

        if allow_decl {
            if let Some((names, assign)) = self.parse_decl(context)? {
                decl = names;
                is_assign = assign;
            }
        }

        let mut commands = Vec::new();
        loop {
            match self.peek_kind() {
                None => return Err(self.error(start, "unclosed action")),
                Some(TokenKind::RightDelim | TokenKind::RightParen) => break,
                Some(TokenKind::Pipe) if !commands.is_empty() => {
                    self.next();
                }
                Some(_) => commands.push(self.parse_command(context)?),
            }
        }
        if commands.is_empty() {
            return Err(self.error(start, format!("missing value for {context}")));
        }

        Ok(Pipeline {
            decl,
            is_assign,
            commands,
            span: Span::new(start, self.prev_end()),
        })
    }

    /// Recognize `$x :=`, `$x =` and `$i, $x :=`.
    fn parse_decl(&mut self, context: &str) -> TemplateResult<Option<(Vec<String>, bool)>> {
        let kinds: Vec<&TokenKind> = self.tokens[self.pos..]
            .iter()
            .take(4)
            .map(|t| &t.kind)
            .collect();

        let (names, assign, consumed) = match kinds.as_slice() {
            [TokenKind::Variable(a), TokenKind::Declare, ..] => (vec![a.clone()], false, 2),
            [TokenKind::Variable(a), TokenKind::Assign, ..] => (vec![a.clone()], true, 2),
            [
                TokenKind::Variable(a),
                TokenKind::Comma,
                TokenKind::Variable(b),
                op @ (TokenKind::Declare | TokenKind::Assign),
            ] => {
                if context != "range" {
                    let offset = self.peek_offset();
                    return Err(self.error(offset, format!("too many declarations in {context}")));
                }
                (
                    vec![a.clone(), b.clone()],
                    matches!(op, TokenKind::Assign),
                    4,
                )
            }
            _ => return Ok(None),
        };

        let offset = self.peek_offset();
        self.pos += consumed;
        if assign {
            for name in &names {
                if !self.vars.contains(name) {
                    return Err(self.error(offset, format!("undefined variable \"{name}\"")));
                }
            }
        } else {
            self.vars.extend(names.iter().cloned());
        }
        Ok(Some((names, assign)))
    }

    fn parse_command(&mut self, context: &str) -> TemplateResult<Command> {
        let start = self.peek_offset();
        let mut args = Vec::new();
        loop {
            match self.peek_kind() {
                None => return Err(self.error(start, "unclosed action")),
                Some(TokenKind::RightDelim | TokenKind::RightParen | TokenKind::Pipe) => break,
                Some(_) => args.push(self.parse_operand(context)?),
            }
        }
        if args.is_empty() {
            return Err(self.error(start, "empty command"));
        }
        if args.len() == 1 && args[0] == Operand::Nil {
            return Err(self.error(start, "nil is not a command"));
        }
        Ok(Command {
            args,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn parse_operand(&mut self, context: &str) -> TemplateResult<Operand> {
        let Some(token) = self.next() else {
            return Err(self.error(self.source.len(), "unclosed action"));
        };
        let operand = match token.kind {
            TokenKind::Dot => Operand::Dot,
            TokenKind::Field(name) => {
                let mut fields = vec![name];
                fields.extend(self.adjacent_fields());
                return Ok(Operand::Field(fields));
            }
            TokenKind::Variable(name) => {
                if !self.vars.contains(&name) {
                    return Err(self.error(token.offset, format!("undefined variable \"{name}\"")));
                }
                let fields = self.adjacent_fields();
                return Ok(Operand::Variable { name, fields });
            }
            TokenKind::Identifier(name) => {
                if !self.funcs.contains(&name) {
                    return Err(self.error(token.offset, format!("function \"{name}\" not defined")));
                }
                Operand::Function(name)
            }
            TokenKind::LeftParen => {
                let pipeline = self.parse_pipeline("parenthesized pipeline", false)?;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::RightParen,
                        ..
                    }) => {}
                    _ => return Err(self.error(token.offset, "unclosed left paren")),
                }
                let base = Operand::Pipeline(Box::new(pipeline));
                let fields = self.adjacent_fields();
                if fields.is_empty() {
                    return Ok(base);
                }
                return Ok(Operand::Chain {
                    base: Box::new(base),
                    fields,
                });
            }
            TokenKind::String(s) => Operand::String(s),
            TokenKind::Int(n) => Operand::Int(n),
            TokenKind::Bool(b) => Operand::Bool(b),
            TokenKind::Nil => Operand::Nil,
            other => {
                return Err(self.error(token.offset, format!("unexpected {other} in {context}")));
            }
        };
        if let Some(next) = self.tokens.get(self.pos) {
            if next.offset == token.end && matches!(next.kind, TokenKind::Field(_)) {
                return Err(self.error(next.offset, "unexpected . after term"));
            }
        }
        Ok(operand)
    }

    /// Field tokens that directly follow the previous token, forming a chain.
    fn adjacent_fields(&mut self) -> Vec<String> {
        let mut fields = Vec::new();
        while let Some(token) = self.tokens.get(self.pos) {
            let glued = token.offset == self.prev_end();
            match &token.kind {
                TokenKind::Field(name) if glued => {
                    fields.push(name.clone());
                    self.pos += 1;
                }
                _ => break,
            }
        }
        fields
    }

    fn expect_right_delim(&mut self, context: &str) -> TemplateResult<usize> {
        match self.next() {
            Some(Token {
                kind: TokenKind::RightDelim,
                end,
                ..
            }) => Ok(end),
            Some(token) => Err(self.error(
                token.offset,
                format!("unexpected {} in {context}", token.kind),
            )),
            None => Err(self.error(self.source.len(), "unclosed action")),
        }
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source.len(), |t| t.offset)
    }

    fn prev_offset(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.offset)
    }

    fn prev_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.end)
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::parse_at(self.source, offset, message)
    }

    fn error_at_prev(&self, message: impl Into<String>) -> TemplateError {
        self.error(self.prev_offset(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn field(path: &[&str]) -> Operand {
        Operand::Field(path.iter().map(|s| s.to_string()).collect())
    }

    fn only_action(template: &Template) -> &Pipeline {
        match template.nodes() {
            [TemplateNode::Action(action)] => &action.pipeline,
            other => panic!("expected a single action, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_text_only() {
        let template = Template::compile("SELECT 1").unwrap();
        assert!(matches!(template.nodes(), [TemplateNode::Text(t)] if t.text == "SELECT 1"));
        assert_eq!(template.source(), "SELECT 1");
    }

    #[test]
    fn test_parse_field_chain() {
        let template = Template::compile("{{ .A.B }}").unwrap();
        let pipeline = only_action(&template);
        assert_eq!(pipeline.single_operand(), Some(&field(&["A", "B"])));
    }

    #[test]
    fn test_parse_function_call_and_pipe() {
        let template = Template::compile("{{ .Rows | len }}").unwrap();
        let pipeline = only_action(&template);
        assert_eq!(pipeline.commands.len(), 2);
        assert_eq!(
            pipeline.commands[1].args,
            vec![Operand::Function("len".to_string())]
        );
    }

    #[test]
    fn test_parse_chain_on_parenthesized_pipeline() {
        let template = Template::compile("{{ (index .Rows 0).Name }}").unwrap();
        let pipeline = only_action(&template);
        match pipeline.single_operand() {
            Some(Operand::Chain { fields, .. }) => assert_eq!(fields, &vec!["Name".to_string()]),
            other => panic!("expected chain, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_range_with_two_variables() {
        let template = Template::compile("{{ range $i, $r := .Rows }}{{ $r.Name }}{{ end }}").unwrap();
        match template.nodes() {
            [TemplateNode::Range(branch)] => {
                assert_eq!(branch.pipeline.decl, vec!["$i", "$r"]);
                assert!(!branch.pipeline.is_assign);
                assert!(branch.else_body.is_none());
            }
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_else_if_chain() {
        let template =
            Template::compile("{{ if .A }}a{{ else if .B }}b{{ else }}c{{ end }}").unwrap();
        let [TemplateNode::If(outer)] = template.nodes() else {
            panic!("expected if");
        };
        let else_body = outer.else_body.as_ref().unwrap();
        let [TemplateNode::If(inner)] = else_body.as_slice() else {
            panic!("expected nested if");
        };
        assert!(inner.else_body.is_some());
    }

    #[test]
    fn test_variable_scope_ends_with_control() {
        let err = Template::compile("{{ range $r := .Rows }}{{ end }}{{ $r }}").unwrap_err();
        assert!(err.to_string().contains("undefined variable \"$r\""), "{err}");
    }

    #[test]
    fn test_undefined_function() {
        let err = Template::compile("{{ upper .Name }}").unwrap_err();
        assert_eq!(err.to_string(), "template:1:4: function \"upper\" not defined");
    }

    #[test]
    fn test_unexpected_end_and_missing_end() {
        assert!(Template::compile("{{ end }}").unwrap_err().to_string().contains("unexpected {{end}}"));
        assert!(
            Template::compile("{{ if .A }}x")
                .unwrap_err()
                .to_string()
                .contains("unexpected EOF")
        );
    }

    #[test]
    fn test_else_with_not_allowed_in_if() {
        let err = Template::compile("{{ if .A }}{{ else with .B }}{{ end }}").unwrap_err();
        assert!(err.to_string().contains("else with"), "{err}");
    }

    #[test]
    fn test_unsupported_keywords() {
        let err = Template::compile("{{ define \"x\" }}{{ end }}").unwrap_err();
        assert!(err.to_string().contains("{{define}} is not supported"), "{err}");
    }

    #[test]
    fn test_declarations_outside_range() {
        let err = Template::compile("{{ $a, $b := .X }}").unwrap_err();
        assert!(err.to_string().contains("too many declarations"), "{err}");
        assert!(Template::compile("{{ $a := .X }}{{ $a = .Y }}{{ $a }}").is_ok());
        assert!(Template::compile("{{ $a = .Y }}").is_err());
    }

    #[test]
    fn test_empty_action() {
        let err = Template::compile("{{ }}").unwrap_err();
        assert!(err.to_string().contains("missing value for command"), "{err}");
    }
}
