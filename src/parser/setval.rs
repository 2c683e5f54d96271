//! Command render templates
//!
//! A setval is a Jinja template rendered against the data subtree of one
//! entity:
//!
//! ```text
//! ntp server {{ server }}{% if vrf is defined %} use-vrf {{ vrf }}{% endif %}
//! ```
//!
//! Templates run with strict undefined handling. Printing a value the data
//! lacks makes the whole render absent, so optional parts are guarded with
//! `is defined`.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use minijinja::{Environment, ErrorKind, UndefinedBehavior, Value};

use crate::value::ConfigValue;

const TEMPLATE_NAME: &str = "setval";

/// The render half of a rule, compiled when the rule is built
#[derive(Clone)]
pub struct Setval {
    source: String,
    env: Arc<Environment<'static>>,
}

impl fmt::Debug for Setval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Setval").field(&self.source).finish()
    }
}

impl Setval {
    /// Compile a template
    pub fn new(source: &str) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_template_owned(TEMPLATE_NAME, source.to_string())?;
        Ok(Self {
            source: source.to_string(),
            env: Arc::new(env),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render against a data subtree; `Ok(None)` when a printed value is absent
    pub fn render(&self, data: &ConfigValue) -> Result<Option<String>, minijinja::Error> {
        let template = self.env.get_template(TEMPLATE_NAME)?;
        match template.render(Value::from_serialize(data)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::UndefinedError => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Dotted paths of the variables the template reads
    pub fn variables(&self) -> HashSet<String> {
        self.env
            .get_template(TEMPLATE_NAME)
            .map(|t| t.undeclared_variables(true))
            .unwrap_or_default()
    }
}
