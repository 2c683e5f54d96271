//! Template engine for line-oriented device configuration.
//!
//! This module provides:
//! - The rule table types ([`Rule`], [`Shape`], [`Expr`], [`Setval`])
//! - [`NetworkTemplate`], which parses configuration text into a
//!   [`ConfigValue`] tree and renders single commands back from one
//!
//! # Parsing
//!
//! Lines are processed top to bottom. Each line is tried against the rules
//! in table order and the first match wins, so a rule shadows every later
//! rule that would match the same line. The matched rule's result shape is
//! evaluated and deep-merged into the output. Lines matching nothing are
//! dropped.
//!
//! A rule marked `shared` opens a context: its captures stay visible to every
//! following line indented deeper than the line that opened it.
//!
//! # Rendering
//!
//! Each rule carries a Jinja template ([`Setval`]) compiled with minijinja
//! when the rule is built. Rendering it against an entity yields the one
//! command that line stands for, or nothing when the entity lacks a value
//! the template prints.
//!
//! ```rust
//! use netres::parser::{Expr, NetworkTemplate, Rule, Shape};
//!
//! let template = NetworkTemplate::new(vec![
//!     Rule::builder("name")
//!         .pattern(r"^interface (?P<name>\S+)$")
//!         .setval("interface {{ name }}")
//!         .result(Shape::keyed(Expr::field("name"), Shape::fields([("name", Expr::field("name"))])))
//!         .shared()
//!         .build()?,
//!     Rule::builder("description")
//!         .pattern(r"^\s+switchport description (?P<description>.+)$")
//!         .setval("switchport description {{ description }}")
//!         .result(Shape::keyed(
//!             Expr::field("name"),
//!             Shape::fields([("description", Expr::field("description"))]),
//!         ))
//!         .build()?,
//! ])?;
//!
//! let parsed = template.parse("interface fc1/1\n  switchport description uplink\n");
//! assert_eq!(
//!     parsed.get_path("fc1/1.description").and_then(|v| v.as_str()),
//!     Some("uplink")
//! );
//! # Ok::<(), netres::Error>(())
//! ```

mod rule;
mod setval;

pub use rule::{Expr, MatchValues, Rule, RuleBuilder, Shape};
pub use setval::Setval;

use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::value::{merge_into, ConfigMap, ConfigValue};

/// Keywords placed in front of rendered commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    /// Prepended to positive commands
    pub set: Option<String>,
    /// Prepended to negated commands
    pub remove: String,
}

impl Default for Prefix {
    fn default() -> Self {
        Self {
            set: None,
            remove: "no".to_string(),
        }
    }
}

/// An ordered rule table with parse and render operations
#[derive(Debug, Clone)]
pub struct NetworkTemplate {
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
    prefix: Prefix,
}

impl NetworkTemplate {
    /// Build a template from rules in match order.
    ///
    /// Rule names must be unique, and every capture name a result shape
    /// reads must be produced by some rule of the table.
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        let mut index = HashMap::with_capacity(rules.len());
        for (i, rule) in rules.iter().enumerate() {
            if index.insert(rule.name().to_string(), i).is_some() {
                return Err(Error::rule(rule.name(), "duplicate rule name"));
            }
        }

        let captures: HashSet<&str> = rules.iter().flat_map(Rule::capture_names).collect();
        for rule in &rules {
            if let Some(missing) = rule
                .result()
                .field_refs()
                .into_iter()
                .find(|field| !captures.contains(field))
            {
                return Err(Error::rule(
                    rule.name(),
                    format!("result reads '{}' which no rule captures", missing),
                ));
            }
        }

        Ok(Self {
            rules,
            index,
            prefix: Prefix::default(),
        })
    }

    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.index.get(name).map(|&i| &self.rules[i])
    }

    /// Parse configuration text
    pub fn parse(&self, text: &str) -> ConfigValue {
        self.parse_lines(text.lines())
    }

    /// Parse a sequence of lines
    pub fn parse_lines<'a>(&self, lines: impl IntoIterator<Item = &'a str>) -> ConfigValue {
        let mut result = ConfigMap::new();
        let mut contexts: Vec<(usize, MatchValues)> = Vec::new();

        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let indent = line.len() - line.trim_start().len();
            while contexts.last().is_some_and(|(depth, _)| *depth >= indent) {
                contexts.pop();
            }

            let Some((rule, captured)) = self
                .rules
                .iter()
                .find_map(|rule| rule.captures(line).map(|c| (rule, c)))
            else {
                trace!(line, "no rule matched, skipping");
                continue;
            };
            trace!(rule = rule.name(), line, "matched");

            let mut values = MatchValues::new();
            for (_, context) in &contexts {
                values.extend(context.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            values.extend(captured.iter().map(|(k, v)| (k.clone(), v.clone())));

            if rule.is_shared() {
                contexts.push((indent, captured));
            }

            if let Some(ConfigValue::Map(parsed)) = rule.result().evaluate(&values) {
                merge_into(&mut result, &parsed);
            }
        }

        ConfigValue::Map(result)
    }

    /// Render one command for `rule_name` from `data`.
    ///
    /// When `negate` is set the rule's negation form is used if it has one,
    /// and the template's negation keyword is prepended. Returns `Ok(None)`
    /// when `data` lacks a field the command needs.
    pub fn render(&self, data: &ConfigValue, rule_name: &str, negate: bool) -> Result<Option<String>> {
        let rule = self
            .rule(rule_name)
            .ok_or_else(|| Error::UnknownRule(rule_name.to_string()))?;

        let setval = match (negate, rule.remval()) {
            (true, Some(remval)) => remval,
            _ => rule.setval(),
        };
        let Some(command) = setval.render(data)? else {
            debug!(rule = rule_name, "nothing to render");
            return Ok(None);
        };
        let command = command.trim();
        if command.is_empty() {
            return Ok(None);
        }

        Ok(Some(match (negate, &self.prefix.set) {
            (true, _) => format!("{} {}", self.prefix.remove, command),
            (false, Some(set)) => format!("{} {}", set, command),
            (false, None) => command.to_string(),
        }))
    }
}
