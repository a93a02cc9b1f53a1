/*
 * extract.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Static field extraction.
//!
//! Walks a parsed template and collects every data path it reads, without
//! evaluating anything. Paths are absolute and dotted; `[]` marks "one
//! element of the collection", so `{{ range $row := .Rows }}{{ $row.Name }}`
//! yields `Rows`, `Rows[].Name` and the synthetic variable `$length`.
//!
//! Scoping follows the template language: every node list gets its own
//! frame linked to its parent, so bindings made inside one loop body are
//! never visible to a sibling.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::ast::{Branch, Operand, Pipeline, TemplateNode};
use crate::error::TemplateResult;
use crate::parser::Template;

/// Synthetic loop-length variable recorded for every `range`.
pub const LENGTH_VARIABLE: &str = "$length";

/// A data reference found in a template.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum FieldRef {
    /// Absolute dotted path, e.g. `Rows[].Name`.
    Field(String),
    /// Variable reference that does not resolve to a data path, e.g. `$length`.
    Variable(String),
}

impl FieldRef {
    pub fn as_str(&self) -> &str {
        match self {
            FieldRef::Field(path) | FieldRef::Variable(path) => path,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deduplicated, ordered set of references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldSet(BTreeSet<FieldRef>);

impl FieldSet {
    pub fn iter(&self) -> impl Iterator<Item = &FieldRef> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, reference: &FieldRef) -> bool {
        self.0.contains(reference)
    }

    pub fn contains_field(&self, path: &str) -> bool {
        self.0.contains(&FieldRef::Field(path.to_string()))
    }

    /// Absolute field paths.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|r| match r {
            FieldRef::Field(path) => Some(path.as_str()),
            FieldRef::Variable(_) => None,
        })
    }

    /// Unresolved variable references.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|r| match r {
            FieldRef::Variable(text) => Some(text.as_str()),
            FieldRef::Field(_) => None,
        })
    }

    /// Element fields read from `collection`, with the `collection[].` prefix removed.
    ///
    /// `columns_of("Rows")` on `{Rows, Rows[].Name, Rows[].Id}` returns `{Id, Name}`.
    pub fn columns_of(&self, collection: &str) -> BTreeSet<String> {
        let prefix = format!("{collection}[].");
        self.fields()
            .filter_map(|path| path.strip_prefix(&prefix))
            .map(str::to_string)
            .collect()
    }

    fn insert(&mut self, reference: FieldRef) {
        self.0.insert(reference);
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a FieldRef;
    type IntoIter = std::collections::btree_set::Iter<'a, FieldRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Parse `source` and extract its references. Syntax errors propagate unchanged.
pub fn extract_fields(source: &str) -> TemplateResult<FieldSet> {
    Ok(Template::compile(source)?.fields())
}

impl Template {
    /// All data references of this template.
    pub fn fields(&self) -> FieldSet {
        let mut extractor = Extractor::default();
        extractor.walk_list(&self.nodes, &Scope::root());
        extractor.set
    }
}

/// One frame of the static scope.
///
/// `dot` is the absolute path of the cursor (`Some("")` at the root,
/// `None` when it cannot be resolved). Bindings map variable names to the
/// path they were bound from, or `None` for computed values.
struct Scope<'p> {
    dot: Option<String>,
    vars: Vec<(String, Option<String>)>,
    parent: Option<&'p Scope<'p>>,
}

impl Scope<'static> {
    fn root() -> Self {
        Scope {
            dot: Some(String::new()),
            vars: vec![("$".to_string(), Some(String::new()))],
            parent: None,
        }
    }
}

impl<'p> Scope<'p> {
    fn child(&'p self, dot: Option<String>) -> Scope<'p> {
        Scope {
            dot,
            vars: Vec::new(),
            parent: Some(self),
        }
    }

    /// `None` when the variable is not bound in any frame.
    fn resolve(&self, name: &str) -> Option<&Option<String>> {
        self.vars
            .iter()
            .rev()
            .find(|(var, _)| var == name)
            .map(|(_, path)| path)
            .or_else(|| self.parent.and_then(|parent| parent.resolve(name)))
    }

    fn bind(&mut self, names: &[String], path: Option<String>) {
        for name in names {
            self.vars.push((name.clone(), path.clone()));
        }
    }
}

fn join(base: &str, fields: &[String]) -> String {
    let tail = fields.join(".");
    if base.is_empty() {
        tail
    } else if tail.is_empty() {
        base.to_string()
    } else {
        format!("{base}.{tail}")
    }
}

#[derive(Default)]
struct Extractor {
    set: FieldSet,
}

impl Extractor {
    fn walk_list(&mut self, nodes: &[TemplateNode], parent: &Scope<'_>) {
        let mut frame = parent.child(parent.dot.clone());
        for node in nodes {
            match node {
                TemplateNode::Text(_) | TemplateNode::Comment(_) => {}
                TemplateNode::Action(action) => {
                    let pipeline = &action.pipeline;
                    let path = self.walk_pipeline(pipeline, &frame);
                    if !pipeline.is_assign {
                        frame.bind(&pipeline.decl, path);
                    }
                }
                TemplateNode::If(branch) => self.walk_if(branch, &frame),
                TemplateNode::With(branch) => self.walk_with(branch, &frame),
                TemplateNode::Range(branch) => self.walk_range(branch, &frame),
            }
        }
    }

    fn walk_if(&mut self, branch: &Branch, scope: &Scope<'_>) {
        let mut control = scope.child(scope.dot.clone());
        let path = self.walk_pipeline(&branch.pipeline, &control);
        if !branch.pipeline.is_assign {
            control.bind(&branch.pipeline.decl, path);
        }
        self.walk_list(&branch.body, &control);
        if let Some(else_body) = &branch.else_body {
            self.walk_list(else_body, &control);
        }
    }

    fn walk_with(&mut self, branch: &Branch, scope: &Scope<'_>) {
        let mut control = scope.child(scope.dot.clone());
        let path = self.walk_pipeline(&branch.pipeline, &control);
        if !branch.pipeline.is_assign {
            control.bind(&branch.pipeline.decl, path.clone());
        }
        let body = control.child(path);
        self.walk_list(&branch.body, &body);
        if let Some(else_body) = &branch.else_body {
            self.walk_list(else_body, &control);
        }
    }

    fn walk_range(&mut self, branch: &Branch, scope: &Scope<'_>) {
        let pipeline = &branch.pipeline;
        let control = scope.child(scope.dot.clone());
        let collection = self.walk_range_source(pipeline, &control);
        self.set
            .insert(FieldRef::Variable(LENGTH_VARIABLE.to_string()));

        let element = collection.map(|path| format!("{path}[]"));
        let mut body = control.child(element.clone());
        if !pipeline.is_assign {
            match pipeline.decl.as_slice() {
                [] => {}
                [elem] => body.bind(std::slice::from_ref(elem), element),
                [key, elem, ..] => {
                    body.bind(std::slice::from_ref(key), None);
                    body.bind(std::slice::from_ref(elem), element);
                }
            }
        }
        self.walk_list(&branch.body, &body);
        if let Some(else_body) = &branch.else_body {
            self.walk_list(else_body, scope);
        }
    }

    /// Walk a range pipeline; the collection is the first operand of the first command.
    fn walk_range_source(&mut self, pipeline: &Pipeline, scope: &Scope<'_>) -> Option<String> {
        let mut collection = None;
        for (i, command) in pipeline.commands.iter().enumerate() {
            for (j, arg) in command.args.iter().enumerate() {
                let path = self.walk_operand(arg, scope);
                if i == 0 && j == 0 && !matches!(arg, Operand::Function(_)) {
                    collection = path;
                }
            }
        }
        collection
    }

    /// Walk every operand; returns the path of a single-operand pipeline.
    fn walk_pipeline(&mut self, pipeline: &Pipeline, scope: &Scope<'_>) -> Option<String> {
        let mut paths: Vec<Option<String>> = Vec::new();
        for command in &pipeline.commands {
            for arg in &command.args {
                paths.push(self.walk_operand(arg, scope));
            }
        }
        match (pipeline.single_operand(), paths.pop()) {
            (Some(_), Some(path)) => path,
            _ => None,
        }
    }

    /// Record the references made by one operand and return its path, if static.
    fn walk_operand(&mut self, operand: &Operand, scope: &Scope<'_>) -> Option<String> {
        match operand {
            Operand::Dot => scope.dot.clone(),
            Operand::Field(fields) => {
                let path = join(scope.dot.as_deref()?, fields);
                self.set.insert(FieldRef::Field(path.clone()));
                Some(path)
            }
            Operand::Variable { name, fields } => match scope.resolve(name) {
                Some(Some(base)) => {
                    let path = join(base, fields);
                    if !path.is_empty() {
                        self.set.insert(FieldRef::Field(path.clone()));
                    }
                    Some(path)
                }
                _ => {
                    let text = if fields.is_empty() {
                        name.clone()
                    } else {
                        format!("{name}.{}", fields.join("."))
                    };
                    self.set.insert(FieldRef::Variable(text));
                    None
                }
            },
            Operand::Chain { base, fields } => {
                let path = join(&self.walk_operand(base, scope)?, fields);
                self.set.insert(FieldRef::Field(path.clone()));
                Some(path)
            }
            Operand::Pipeline(pipeline) => self.walk_pipeline(pipeline, scope),
            Operand::Function(_)
            | Operand::String(_)
            | Operand::Int(_)
            | Operand::Bool(_)
            | Operand::Nil => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn refs(source: &str) -> Vec<String> {
        extract_fields(source)
            .unwrap()
            .iter()
            .map(|r| match r {
                FieldRef::Field(p) => format!("field:{p}"),
                FieldRef::Variable(v) => format!("var:{v}"),
            })
            .collect()
    }

    #[test]
    fn test_absolute_fields() {
        assert_eq!(
            refs("SELECT {{ .B }}, {{ .A.C }} FROM {{ .B }}"),
            vec!["field:A.C", "field:B"]
        );
    }

    #[test]
    fn test_no_references() {
        assert!(extract_fields("SELECT 1").unwrap().is_empty());
    }

    #[test]
    fn test_range_variable_binding() {
        assert_eq!(
            refs("{{ range $row := .Rows }}{{ $row.Name }}{{ end }}"),
            vec!["field:Rows", "field:Rows[].Name", "var:$length"]
        );
    }

    #[test]
    fn test_range_dot_binding() {
        assert_eq!(
            refs("{{ range .Rows }}{{ .Id }}{{ end }}"),
            vec!["field:Rows", "field:Rows[].Id", "var:$length"]
        );
    }

    #[test]
    fn test_range_index_and_element() {
        assert_eq!(
            refs("{{ range $i, $r := .Rows }}{{ if $i }},{{ end }}{{ $r.Name }}{{ end }}"),
            vec!["field:Rows", "field:Rows[].Name", "var:$i", "var:$length"]
        );
    }

    #[test]
    fn test_nested_ranges() {
        let source = "{{ range $g := .Groups }}{{ range $m := $g.Members }}{{ $m.Email }}{{ $g.Name }}{{ end }}{{ end }}";
        assert_eq!(
            refs(source),
            vec![
                "field:Groups",
                "field:Groups[].Members",
                "field:Groups[].Members[].Email",
                "field:Groups[].Name",
                "var:$length",
            ]
        );
    }

    #[test]
    fn test_shadowing_and_sibling_isolation() {
        let source = "{{ range $x := .A }}{{ range $x := .B }}{{ $x.In }}{{ end }}{{ $x.Out }}{{ end }}\
                      {{ range $y := .C }}{{ $y.V }}{{ end }}";
        let set = extract_fields(source).unwrap();
        assert!(set.contains_field("B[].In"));
        assert!(set.contains_field("A[].Out"));
        assert!(set.contains_field("C[].V"));
        assert!(!set.contains_field("A[].In"));
    }

    #[test]
    fn test_variable_declared_from_helper_is_synthetic() {
        let source = "{{ $length := len .Rows }}{{ range $i, $r := .Rows }}{{ if ne $i (sub $length 1) }},{{ end }}{{ end }}";
        let set = extract_fields(source).unwrap();
        assert_eq!(set.variables().collect::<Vec<_>>(), vec!["$i", "$length"]);
        assert_eq!(set.fields().collect::<Vec<_>>(), vec!["Rows"]);
    }

    #[test]
    fn test_declared_alias_resolves() {
        assert_eq!(
            refs("{{ $rows := .Rows }}{{ range $rows }}{{ .Name }}{{ end }}"),
            vec!["field:Rows", "field:Rows[].Name", "var:$length"]
        );
    }

    #[test]
    fn test_if_with_branches_all_contribute() {
        let source = "{{ if .Flag }}{{ .A }}{{ else }}{{ .B }}{{ end }}\
                      {{ with .Cfg }}{{ .Table }}{{ else }}{{ .Fallback }}{{ end }}";
        assert_eq!(
            refs(source),
            vec![
                "field:A",
                "field:B",
                "field:Cfg",
                "field:Cfg.Table",
                "field:Fallback",
                "field:Flag",
            ]
        );
    }

    #[test]
    fn test_root_variable() {
        assert_eq!(
            refs("{{ range .Rows }}{{ $.Schema }}.{{ .T }}{{ end }}"),
            vec!["field:Rows", "field:Rows[].T", "field:Schema", "var:$length"]
        );
    }

    #[test]
    fn test_chain_on_parenthesized_field() {
        assert_eq!(refs("{{ (.Cfg).Table }}"), vec!["field:Cfg", "field:Cfg.Table"]);
        // Chains on computed values are not static paths.
        assert_eq!(refs("{{ (index .Rows 0).Name }}"), vec!["field:Rows"]);
    }

    #[test]
    fn test_columns_of() {
        let set = extract_fields("{{ range .Rows }}{{ .B }}{{ .A }}{{ end }}{{ .Other }}").unwrap();
        let columns: Vec<String> = set.columns_of("Rows").into_iter().collect();
        assert_eq!(columns, vec!["A", "B"]);
    }

    #[test]
    fn test_syntax_error_propagates() {
        let err = extract_fields("{{ range .Rows }}").unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_serialize() {
        let set = extract_fields("{{ .A }}").unwrap();
        assert_eq!(
            serde_json::to_string(&set).unwrap(),
            r#"[{"kind":"field","path":"A"}]"#
        );
    }
}
