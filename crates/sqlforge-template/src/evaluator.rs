/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template evaluation engine.
//!
//! This module implements the evaluation of parsed templates against a
//! [`TemplateValue`]. Values borrowed from the input data stay borrowed
//! while the evaluator walks loops and field chains; only computed values
//! (function results, literals) are owned.

use std::borrow::Cow;

use crate::ast::{Branch, Command, Operand, Pipeline, Span, TemplateNode};
use crate::context::TemplateValue;
use crate::error::{TemplateError, TemplateResult};
use crate::funcs::{Arity, FuncMap};
use crate::parser::Template;

/// What a field lookup does when the key is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKey {
    /// Fail the evaluation (`missingkey=error`).
    #[default]
    Error,
    /// Yield a nil value, printed as `<no value>`.
    Zero,
}

impl Template {
    /// Render this template against `data`, failing on any missing key.
    ///
    /// # Arguments
    /// * `data` - The value bound to `.` and `$`
    ///
    /// # Returns
    /// The rendered output string, or an error if evaluation fails.
    pub fn render(&self, data: &TemplateValue) -> TemplateResult<String> {
        self.render_with(data, MissingKey::Error)
    }

    /// Render with an explicit missing-key policy.
    pub fn render_with(&self, data: &TemplateValue, missing: MissingKey) -> TemplateResult<String> {
        let mut evaluator = Evaluator {
            source: &self.source,
            funcs: &self.funcs,
            missing,
            vars: vec![("$".to_string(), Cow::Borrowed(data))],
            out: String::new(),
        };
        evaluator.walk(&self.nodes, &Cow::Borrowed(data))?;
        Ok(evaluator.out)
    }
}

type Value<'d> = Cow<'d, TemplateValue>;

struct Evaluator<'t, 'd> {
    source: &'t str,
    funcs: &'t FuncMap,
    missing: MissingKey,
    /// Variable stack, innermost last.
    vars: Vec<(String, Value<'d>)>,
    out: String,
}

impl<'t, 'd> Evaluator<'t, 'd> {
    fn walk(&mut self, nodes: &'t [TemplateNode], dot: &Value<'d>) -> TemplateResult<()> {
        for node in nodes {
            match node {
                TemplateNode::Text(text) => self.out.push_str(&text.text),
                TemplateNode::Comment(_) => {}
                TemplateNode::Action(action) => {
                    let value = self.eval_pipeline(&action.pipeline, dot)?;
                    if action.pipeline.decl.is_empty() {
                        self.out.push_str(&value.render());
                    }
                }
                TemplateNode::If(branch) => self.walk_if_or_with(branch, dot, false)?,
                TemplateNode::With(branch) => self.walk_if_or_with(branch, dot, true)?,
                TemplateNode::Range(branch) => self.walk_range(branch, dot)?,
            }
        }
        Ok(())
    }

    fn walk_if_or_with(
        &mut self,
        branch: &'t Branch,
        dot: &Value<'d>,
        narrows: bool,
    ) -> TemplateResult<()> {
        let mark = self.vars.len();
        let value = self.eval_pipeline(&branch.pipeline, dot)?;
        let result = if value.is_truthy() {
            if narrows {
                self.walk(&branch.body, &value)
            } else {
                self.walk(&branch.body, dot)
            }
        } else if let Some(else_body) = &branch.else_body {
            self.walk(else_body, dot)
        } else {
            Ok(())
        };
        self.vars.truncate(mark);
        result
    }

    fn walk_range(&mut self, branch: &'t Branch, dot: &Value<'d>) -> TemplateResult<()> {
        let mark = self.vars.len();
        let pipeline = &branch.pipeline;
        let collection = self.eval_commands(pipeline, dot)?;
        let items = self.range_items(collection, pipeline.span)?;

        if items.is_empty() {
            if let Some(else_body) = &branch.else_body {
                self.walk(else_body, dot)?;
            }
            self.vars.truncate(mark);
            return Ok(());
        }

        for (key, elem) in items {
            let iteration = self.vars.len();
            match pipeline.decl.as_slice() {
                [] => {}
                [elem_var] => self.bind(elem_var, elem.clone(), pipeline.is_assign),
                [key_var, elem_var, ..] => {
                    self.bind(key_var, Cow::Owned(key), pipeline.is_assign);
                    self.bind(elem_var, elem.clone(), pipeline.is_assign);
                }
            }
            self.walk(&branch.body, &elem)?;
            self.vars.truncate(iteration);
        }
        self.vars.truncate(mark);
        Ok(())
    }

    /// Key/element pairs of a range collection. Maps iterate in key order.
    fn range_items(
        &self,
        collection: Value<'d>,
        span: Span,
    ) -> TemplateResult<Vec<(TemplateValue, Value<'d>)>> {
        match collection.as_ref() {
            TemplateValue::Int(n) => {
                return Ok((0..*n)
                    .map(|i| (TemplateValue::Int(i), Cow::Owned(TemplateValue::Int(i))))
                    .collect());
            }
            TemplateValue::Null => return Ok(Vec::new()),
            _ => {}
        }
        let items = match collection {
            Cow::Borrowed(TemplateValue::List(items)) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (TemplateValue::Int(i as i64), Cow::Borrowed(v)))
                .collect(),
            Cow::Owned(TemplateValue::List(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (TemplateValue::Int(i as i64), Cow::Owned(v)))
                .collect(),
            Cow::Borrowed(TemplateValue::Map(map)) => map
                .iter()
                .map(|(k, v)| (TemplateValue::String(k.clone()), Cow::Borrowed(v)))
                .collect(),
            Cow::Owned(TemplateValue::Map(map)) => map
                .into_iter()
                .map(|(k, v)| (TemplateValue::String(k), Cow::Owned(v)))
                .collect(),
            other => {
                return Err(self.error(
                    span,
                    &format!("range can't iterate over {}", other.render()),
                ));
            }
        };
        Ok(items)
    }

    /// Evaluate a pipeline and apply its declarations.
    fn eval_pipeline(&mut self, pipeline: &'t Pipeline, dot: &Value<'d>) -> TemplateResult<Value<'d>> {
        let value = self.eval_commands(pipeline, dot)?;
        for name in &pipeline.decl {
            self.bind(name, value.clone(), pipeline.is_assign);
        }
        Ok(value)
    }

    fn eval_commands(&self, pipeline: &'t Pipeline, dot: &Value<'d>) -> TemplateResult<Value<'d>> {
        let mut value: Option<Value<'d>> = None;
        for command in &pipeline.commands {
            value = Some(self.eval_command(command, dot, value)?);
        }
        Ok(value.unwrap_or(Cow::Owned(TemplateValue::Null)))
    }

    fn eval_command(
        &self,
        command: &'t Command,
        dot: &Value<'d>,
        piped: Option<Value<'d>>,
    ) -> TemplateResult<Value<'d>> {
        let Some((first, rest)) = command.args.split_first() else {
            return Err(self.error(command.span, "empty command"));
        };
        if let Operand::Function(name) = first {
            let mut args = Vec::with_capacity(rest.len() + 1);
            for arg in rest {
                args.push(self.eval_arg(arg, dot, command.span)?.into_owned());
            }
            if let Some(piped) = piped {
                args.push(piped.into_owned());
            }
            return self.call(name, &args, command.span).map(Cow::Owned);
        }
        if !rest.is_empty() || piped.is_some() {
            return Err(self.error(command.span, "can't give argument to non-function"));
        }
        self.eval_arg(first, dot, command.span)
    }

    fn eval_arg(&self, operand: &'t Operand, dot: &Value<'d>, span: Span) -> TemplateResult<Value<'d>> {
        match operand {
            Operand::Dot => Ok(dot.clone()),
            Operand::Field(fields) => self.eval_fields(dot.clone(), fields, span),
            Operand::Variable { name, fields } => {
                let value = self.lookup(name, span)?;
                self.eval_fields(value, fields, span)
            }
            Operand::Function(name) => self.call(name, &[], span).map(Cow::Owned),
            Operand::Chain { base, fields } => {
                let value = self.eval_arg(base, dot, span)?;
                self.eval_fields(value, fields, span)
            }
            Operand::Pipeline(pipeline) => self.eval_commands(pipeline, dot),
            Operand::String(s) => Ok(Cow::Owned(TemplateValue::String(s.clone()))),
            Operand::Int(n) => Ok(Cow::Owned(TemplateValue::Int(*n))),
            Operand::Bool(b) => Ok(Cow::Owned(TemplateValue::Bool(*b))),
            Operand::Nil => Ok(Cow::Owned(TemplateValue::Null)),
        }
    }

    fn eval_fields(
        &self,
        mut receiver: Value<'d>,
        fields: &[String],
        span: Span,
    ) -> TemplateResult<Value<'d>> {
        for name in fields {
            receiver = match receiver {
                Cow::Borrowed(value) => match self.field(value, name, span)? {
                    Some(child) => Cow::Borrowed(child),
                    None => Cow::Owned(TemplateValue::Null),
                },
                Cow::Owned(value) => Cow::Owned(
                    self.field(&value, name, span)?
                        .cloned()
                        .unwrap_or_default(),
                ),
            };
        }
        Ok(receiver)
    }

    /// Look up one field. `None` means a missing key tolerated by the policy.
    fn field<'v>(
        &self,
        receiver: &'v TemplateValue,
        name: &str,
        span: Span,
    ) -> TemplateResult<Option<&'v TemplateValue>> {
        match receiver {
            TemplateValue::Map(map) => match map.get(name) {
                Some(child) => Ok(Some(child)),
                None if self.missing == MissingKey::Error => Err(self.error(
                    span,
                    &format!("map has no entry for key \"{name}\""),
                )),
                None => Ok(None),
            },
            TemplateValue::Null if self.missing == MissingKey::Error => Err(self.error(
                span,
                &format!("nil data; no entry for key \"{name}\""),
            )),
            TemplateValue::Null => Ok(None),
            other => Err(self.error(
                span,
                &format!("can't evaluate field {name} in type {}", other.kind_name()),
            )),
        }
    }

    fn call(&self, name: &str, args: &[TemplateValue], span: Span) -> TemplateResult<TemplateValue> {
        let Some((arity, func)) = self.funcs.get(name) else {
            return Err(self.error(span, &format!("function \"{name}\" not defined")));
        };
        if !arity.accepts(args.len()) {
            let want = match arity {
                Arity::Exact(n) => n.to_string(),
                Arity::AtLeast(n) => format!("at least {n}"),
            };
            return Err(self.error(
                span,
                &format!("wrong number of args for {name}: want {want} got {}", args.len()),
            ));
        }
        func(args).map_err(|message| self.error(span, &format!("error calling {name}: {message}")))
    }

    fn lookup(&self, name: &str, span: Span) -> TemplateResult<Value<'d>> {
        self.vars
            .iter()
            .rev()
            .find(|(var, _)| var == name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| self.error(span, &format!("undefined variable: {name}")))
    }

    /// Declare a new variable, or overwrite the innermost one for `=`.
    fn bind(&mut self, name: &str, value: Value<'d>, assign: bool) {
        if assign {
            if let Some(slot) = self.vars.iter_mut().rev().find(|(var, _)| var == name) {
                slot.1 = value;
                return;
            }
        }
        self.vars.push((name.to_string(), value));
    }

    fn error(&self, span: Span, message: &str) -> TemplateError {
        TemplateError::exec_at(self.source, span.start, span.end, message)
    }
}
