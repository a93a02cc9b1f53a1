/*
 * funcs.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Helper functions callable from templates.
//!
//! The builtin set covers the query helpers (`add`, `sub`, `ne`, `len`)
//! and the Go builtins a query author reaches for (`eq`, comparisons,
//! boolean logic, `index`, `print`). A function name that is not in the
//! map is rejected when the template is parsed.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::context::TemplateValue;

/// Signature of a template helper. Errors are plain messages; the
/// evaluator wraps them as `error calling <name>: <message>`.
pub type TemplateFn = fn(&[TemplateValue]) -> Result<TemplateValue, String>;

/// How many arguments a helper accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

#[derive(Clone, Copy)]
struct Entry {
    arity: Arity,
    func: TemplateFn,
}

/// Named helper functions available to a template.
#[derive(Clone, Default)]
pub struct FuncMap {
    funcs: HashMap<String, Entry>,
}

impl std::fmt::Debug for FuncMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names = self.names();
        names.sort_unstable();
        f.debug_struct("FuncMap").field("funcs", &names).finish()
    }
}

impl FuncMap {
    /// The default helper set.
    pub fn builtin() -> Self {
        let mut map = Self::empty();
        map.register("add", Arity::Exact(2), add);
        map.register("sub", Arity::Exact(2), sub);
        map.register("ne", Arity::Exact(2), ne);
        map.register("len", Arity::Exact(1), len);
        map.register("eq", Arity::AtLeast(2), eq);
        map.register("lt", Arity::Exact(2), lt);
        map.register("le", Arity::Exact(2), le);
        map.register("gt", Arity::Exact(2), gt);
        map.register("ge", Arity::Exact(2), ge);
        map.register("and", Arity::AtLeast(1), and);
        map.register("or", Arity::AtLeast(1), or);
        map.register("not", Arity::Exact(1), not);
        map.register("index", Arity::AtLeast(1), index);
        map.register("print", Arity::AtLeast(0), print);
        map
    }

    /// A map with no functions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register (or replace) a helper.
    pub fn register(&mut self, name: impl Into<String>, arity: Arity, func: TemplateFn) {
        self.funcs.insert(name.into(), Entry { arity, func });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// Look up a helper and its arity.
    pub fn get(&self, name: &str) -> Option<(Arity, TemplateFn)> {
        self.funcs.get(name).map(|e| (e.arity, e.func))
    }

    pub fn names(&self) -> Vec<&str> {
        self.funcs.keys().map(String::as_str).collect()
    }
}

fn int_arg(value: &TemplateValue) -> Result<i64, String> {
    match value {
        TemplateValue::Int(n) => Ok(*n),
        other => Err(format!(
            "wrong type for value; expected int; got {}",
            other.kind_name()
        )),
    }
}

fn add(args: &[TemplateValue]) -> Result<TemplateValue, String> {
    let a = int_arg(&args[0])?;
    let b = int_arg(&args[1])?;
    a.checked_add(b)
        .map(TemplateValue::Int)
        .ok_or_else(|| "integer overflow".to_string())
}

fn sub(args: &[TemplateValue]) -> Result<TemplateValue, String> {
    let a = int_arg(&args[0])?;
    let b = int_arg(&args[1])?;
    a.checked_sub(b)
        .map(TemplateValue::Int)
        .ok_or_else(|| "integer overflow".to_string())
}

fn ne(args: &[TemplateValue]) -> Result<TemplateValue, String> {
    Ok(TemplateValue::Bool(args[0] != args[1]))
}

/// Element count of lists and maps; zero for anything else.
fn len(args: &[TemplateValue]) -> Result<TemplateValue, String> {
    let n = match &args[0] {
        TemplateValue::List(items) => items.len(),
        TemplateValue::Map(m) => m.len(),
        _ => 0,
    };
    Ok(TemplateValue::Int(n as i64))
}

fn basic_eq(a: &TemplateValue, b: &TemplateValue) -> Result<bool, String> {
    match (a, b) {
        (TemplateValue::List(_) | TemplateValue::Map(_), _)
        | (_, TemplateValue::List(_) | TemplateValue::Map(_)) => {
            Err("invalid type for comparison".to_string())
        }
        (TemplateValue::Null, other) | (other, TemplateValue::Null) => {
            Ok(matches!(other, TemplateValue::Null))
        }
        (TemplateValue::String(x), TemplateValue::String(y)) => Ok(x == y),
        (TemplateValue::Int(x), TemplateValue::Int(y)) => Ok(x == y),
        (TemplateValue::Bool(x), TemplateValue::Bool(y)) => Ok(x == y),
        _ => Err("incompatible types for comparison".to_string()),
    }
}

/// True when the first argument equals any of the others.
fn eq(args: &[TemplateValue]) -> Result<TemplateValue, String> {
    let (first, rest) = args
        .split_first()
        .ok_or_else(|| "missing argument for comparison".to_string())?;
    for other in rest {
        if basic_eq(first, other)? {
            return Ok(TemplateValue::Bool(true));
        }
    }
    Ok(TemplateValue::Bool(false))
}

fn compare(a: &TemplateValue, b: &TemplateValue) -> Result<Ordering, String> {
    match (a, b) {
        (TemplateValue::Int(x), TemplateValue::Int(y)) => Ok(x.cmp(y)),
        (TemplateValue::String(x), TemplateValue::String(y)) => Ok(x.cmp(y)),
        (TemplateValue::Int(_) | TemplateValue::String(_), TemplateValue::Int(_))
        | (TemplateValue::Int(_) | TemplateValue::String(_), TemplateValue::String(_)) => {
            Err("incompatible types for comparison".to_string())
        }
        _ => Err("invalid type for comparison".to_string()),
    }
}

fn lt(args: &[TemplateValue]) -> Result<TemplateValue, String> {
    Ok(TemplateValue::Bool(compare(&args[0], &args[1])?.is_lt()))
}

fn le(args: &[TemplateValue]) -> Result<TemplateValue, String> {
    Ok(TemplateValue::Bool(compare(&args[0], &args[1])?.is_le()))
}

fn gt(args: &[TemplateValue]) -> Result<TemplateValue, String> {
    Ok(TemplateValue::Bool(compare(&args[0], &args[1])?.is_gt()))
}

fn ge(args: &[TemplateValue]) -> Result<TemplateValue, String> {
    Ok(TemplateValue::Bool(compare(&args[0], &args[1])?.is_ge()))
}

/// First falsy argument, or the last one.
fn and(args: &[TemplateValue]) -> Result<TemplateValue, String> {
    let picked = args
        .iter()
        .find(|v| !v.is_truthy())
        .or_else(|| args.last())
        .cloned()
        .unwrap_or_default();
    Ok(picked)
}

/// First truthy argument, or the last one.
fn or(args: &[TemplateValue]) -> Result<TemplateValue, String> {
    let picked = args
        .iter()
        .find(|v| v.is_truthy())
        .or_else(|| args.last())
        .cloned()
        .unwrap_or_default();
    Ok(picked)
}

fn not(args: &[TemplateValue]) -> Result<TemplateValue, String> {
    Ok(TemplateValue::Bool(!args[0].is_truthy()))
}

fn index(args: &[TemplateValue]) -> Result<TemplateValue, String> {
    let (item, keys) = args
        .split_first()
        .ok_or_else(|| "missing item to index".to_string())?;
    let mut current = item.clone();
    for key in keys {
        current = match (&current, key) {
            (TemplateValue::Null, _) => return Err("index of untyped nil".to_string()),
            (TemplateValue::List(items), TemplateValue::Int(i)) => usize::try_from(*i)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| format!("index out of range: {i}"))?,
            (TemplateValue::List(_), other) => {
                return Err(format!("cannot index slice/array with type {}", other.kind_name()));
            }
            (TemplateValue::Map(m), TemplateValue::String(k)) => match m.get(k) {
                Some(value) => value.clone(),
                None => missing_entry(m),
            },
            (TemplateValue::Map(_), other) => {
                return Err(format!(
                    "value has type {}; should be string",
                    other.kind_name()
                ));
            }
            (other, _) => return Err(format!("can't index item of type {}", other.kind_name())),
        };
    }
    Ok(current)
}

/// Zero value for a key absent from `map`: `""` when every entry is a
/// string (input rows), nil otherwise.
fn missing_entry(map: &BTreeMap<String, TemplateValue>) -> TemplateValue {
    if !map.is_empty() && map.values().all(TemplateValue::is_string) {
        TemplateValue::String(String::new())
    } else {
        TemplateValue::Null
    }
}

/// Concatenate operands, adding spaces between operands when neither is a string.
fn print(args: &[TemplateValue]) -> Result<TemplateValue, String> {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 && !arg.is_string() && !args[i - 1].is_string() {
            out.push(' ');
        }
        out.push_str(&arg.to_display_string());
    }
    Ok(TemplateValue::String(out))
}
