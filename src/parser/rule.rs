//! Parser rules
//!
//! A [`Rule`] binds a line pattern to a [`Shape`] describing where the
//! captured values land in the structured result, plus a [`Setval`] that
//! renders the reciprocal command.

use indexmap::IndexMap;
use regex::Regex;

use super::setval::Setval;
use crate::error::{Error, Result};
use crate::value::ConfigValue;

/// Named values available while evaluating a shape: the captures of the
/// current line layered over those of every active shared context.
pub type MatchValues = IndexMap<String, String>;

/// Value expression evaluated against [`MatchValues`]
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A constant
    Literal(ConfigValue),
    /// Captured text
    Field(String),
    /// Captured text as an integer; text that is not a number is kept as is
    Int(String),
    /// `true` when the group took part in the match, absent otherwise
    Present(String),
    /// Concatenation of the parts that evaluate, e.g. compound keys
    Join { parts: Vec<Expr>, separator: String },
    /// `then` when the group took part in the match, `otherwise` if not
    Conditional {
        when: String,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    pub fn lit(value: impl Into<ConfigValue>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn field(name: &str) -> Self {
        Expr::Field(name.to_string())
    }

    pub fn int(name: &str) -> Self {
        Expr::Int(name.to_string())
    }

    pub fn present(name: &str) -> Self {
        Expr::Present(name.to_string())
    }

    pub fn join(parts: impl IntoIterator<Item = Expr>, separator: &str) -> Self {
        Expr::Join {
            parts: parts.into_iter().collect(),
            separator: separator.to_string(),
        }
    }

    pub fn when(group: &str, then: Expr, otherwise: Expr) -> Self {
        Expr::Conditional {
            when: group.to_string(),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// Evaluate; `None` means the value is absent and its key is omitted
    pub fn evaluate(&self, values: &MatchValues) -> Option<ConfigValue> {
        match self {
            Expr::Literal(value) => Some(value.clone()),
            Expr::Field(name) => values.get(name).map(|v| ConfigValue::from(v.as_str())),
            Expr::Int(name) => values.get(name).map(|v| match v.parse::<i64>() {
                Ok(n) => ConfigValue::from(n),
                Err(_) => ConfigValue::from(v.as_str()),
            }),
            Expr::Present(name) => values.contains_key(name).then(|| ConfigValue::from(true)),
            Expr::Join { parts, separator } => {
                let texts: Vec<String> = parts
                    .iter()
                    .filter_map(|p| p.evaluate(values))
                    .filter_map(|v| v.key_text())
                    .collect();
                (!texts.is_empty()).then(|| ConfigValue::from(texts.join(separator)))
            }
            Expr::Conditional {
                when,
                then,
                otherwise,
            } => {
                if values.contains_key(when) {
                    then.evaluate(values)
                } else {
                    otherwise.evaluate(values)
                }
            }
        }
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Field(name) | Expr::Int(name) | Expr::Present(name) => out.push(name),
            Expr::Join { parts, .. } => parts.iter().for_each(|p| p.collect_refs(out)),
            Expr::Conditional {
                when,
                then,
                otherwise,
            } => {
                out.push(when);
                then.collect_refs(out);
                otherwise.collect_refs(out);
            }
        }
    }
}

/// Where a match is written into the result tree
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Leaf(Expr),
    Map(Vec<(Expr, Shape)>),
}

impl Shape {
    pub fn leaf(expr: Expr) -> Self {
        Shape::Leaf(expr)
    }

    pub fn map(entries: impl IntoIterator<Item = (Expr, Shape)>) -> Self {
        Shape::Map(entries.into_iter().collect())
    }

    /// A map of literal keys to leaf expressions
    pub fn fields<'a>(entries: impl IntoIterator<Item = (&'a str, Expr)>) -> Self {
        Shape::Map(
            entries
                .into_iter()
                .map(|(key, expr)| (Expr::lit(key), Shape::Leaf(expr)))
                .collect(),
        )
    }

    /// A single entry whose key is computed from the match
    pub fn keyed(key: Expr, inner: Shape) -> Self {
        Shape::Map(vec![(key, inner)])
    }

    /// Nest `inner` under a literal dotted path
    pub fn at(path: &str, inner: Shape) -> Self {
        path.rsplit('.')
            .fold(inner, |acc, segment| Shape::Map(vec![(Expr::lit(segment), acc)]))
    }

    /// Evaluate against the current match
    pub fn evaluate(&self, values: &MatchValues) -> Option<ConfigValue> {
        match self {
            Shape::Leaf(expr) => expr.evaluate(values),
            Shape::Map(entries) => {
                let mut map = crate::value::ConfigMap::new();
                for (key, shape) in entries {
                    let Some(key) = key.evaluate(values).and_then(|k| k.key_text()) else {
                        continue;
                    };
                    if let Some(value) = shape.evaluate(values) {
                        map.insert(key, value);
                    }
                }
                Some(ConfigValue::Map(map))
            }
        }
    }

    pub(crate) fn field_refs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Shape::Leaf(expr) => expr.collect_refs(out),
            Shape::Map(entries) => {
                for (key, shape) in entries {
                    key.collect_refs(out);
                    shape.collect_refs(out);
                }
            }
        }
    }

    /// Keys that are literal strings anywhere in the shape
    pub(crate) fn literal_keys(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_literal_keys(&mut out);
        out
    }

    fn collect_literal_keys(&self, out: &mut Vec<String>) {
        if let Shape::Map(entries) = self {
            for (key, shape) in entries {
                if let Expr::Literal(k) = key {
                    if let Some(text) = k.key_text() {
                        out.push(text);
                    }
                }
                shape.collect_literal_keys(out);
            }
        }
    }
}

/// One parsing/rendering unit of a template
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    pattern: Regex,
    setval: Setval,
    remval: Option<Setval>,
    compval: Option<String>,
    result: Shape,
    shared: bool,
}

impl Rule {
    pub fn builder(name: &str) -> RuleBuilder {
        RuleBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn setval(&self) -> &Setval {
        &self.setval
    }

    pub fn remval(&self) -> Option<&Setval> {
        self.remval.as_ref()
    }

    /// Dotted path compared when diffing; defaults to the rule name
    pub fn compval(&self) -> &str {
        self.compval.as_deref().unwrap_or(&self.name)
    }

    pub fn result(&self) -> &Shape {
        &self.result
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Named groups that took part in a match of `line`
    pub fn captures(&self, line: &str) -> Option<MatchValues> {
        let caps = self.pattern.captures(line)?;
        Some(
            self.pattern
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.to_string(), m.as_str().trim().to_string()))
                })
                .collect(),
        )
    }

    pub(crate) fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.pattern.capture_names().flatten()
    }
}

fn compile(rule: &str, source: &str) -> Result<Setval> {
    Setval::new(source).map_err(|e| Error::rule(rule, format!("bad render template: {}", e)))
}

/// Fallible builder for [`Rule`]
pub struct RuleBuilder {
    name: String,
    pattern: Option<String>,
    setval: Option<String>,
    remval: Option<String>,
    compval: Option<String>,
    result: Option<Shape>,
    shared: bool,
}

impl RuleBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: None,
            setval: None,
            remval: None,
            compval: None,
            result: None,
            shared: false,
        }
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    /// Render template, see [`Setval`]
    pub fn setval(mut self, template: &str) -> Self {
        self.setval = Some(template.to_string());
        self
    }

    /// Alternative template for the negated command
    pub fn remval(mut self, template: &str) -> Self {
        self.remval = Some(template.to_string());
        self
    }

    pub fn compval(mut self, path: &str) -> Self {
        self.compval = Some(path.to_string());
        self
    }

    pub fn result(mut self, shape: Shape) -> Self {
        self.result = Some(shape);
        self
    }

    /// Matches of this rule open a context for deeper-indented lines
    pub fn shared(mut self) -> Self {
        self.shared = true;
        self
    }

    pub fn build(self) -> Result<Rule> {
        let name = self.name;
        if name.is_empty() {
            return Err(Error::rule("<unnamed>", "rule name must not be empty"));
        }
        let pattern = self
            .pattern
            .ok_or_else(|| Error::rule(&name, "missing pattern"))?;
        let pattern = Regex::new(&pattern)
            .map_err(|e| Error::rule(&name, format!("invalid pattern: {}", e)))?;
        let setval = self
            .setval
            .ok_or_else(|| Error::rule(&name, "missing render template"))?;
        let setval = compile(&name, &setval)?;
        let remval = self.remval.map(|r| compile(&name, &r)).transpose()?;
        let result = self
            .result
            .ok_or_else(|| Error::rule(&name, "missing result shape"))?;

        let known: Vec<String> = pattern
            .capture_names()
            .flatten()
            .map(str::to_string)
            .chain(result.literal_keys())
            .collect();
        let mut variables: Vec<String> = setval.variables().into_iter().collect();
        if let Some(remval) = &remval {
            variables.extend(remval.variables());
        }
        variables.sort();
        for variable in &variables {
            let leaf = variable.rsplit('.').next().unwrap_or(variable.as_str());
            if !known.iter().any(|k| k == leaf) {
                return Err(Error::rule(
                    &name,
                    format!("template variable '{}' matches no capture group or result key", variable),
                ));
            }
        }

        Ok(Rule {
            name,
            pattern,
            setval,
            remval,
            compval: self.compval,
            result,
            shared: self.shared,
        })
    }
}
