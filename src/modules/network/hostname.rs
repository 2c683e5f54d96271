//! Hostname resource - device hostname management
//!
//! Manages the single `hostname` line of an NX-OS configuration.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::common::{config_value, facts_json, validate_schema};
use crate::diff::ResourceModule;
use crate::error::{Error, Result};
use crate::modules::{Resource, State};
use crate::parser::{Expr, NetworkTemplate, Rule, Shape};
use crate::value::{deep_merge, ConfigValue};

/// Hostname labels: letters, digits, hyphen and underscore, no leading or
/// trailing hyphen
static HOSTNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_]([a-zA-Z0-9_-]{0,61}[a-zA-Z0-9_])?(\.[a-zA-Z0-9_]([a-zA-Z0-9_-]{0,61}[a-zA-Z0-9_])?)*$")
        .expect("Invalid hostname regex")
});

const PARSERS: &[&str] = &["hostname"];

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct HostnameConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hostname: Option<String>,
}

fn template() -> Result<NetworkTemplate> {
    NetworkTemplate::new(vec![Rule::builder("hostname")
        .pattern(r"^hostname (?P<hostname>\S+)$")
        .setval("hostname {{ hostname }}")
        .result(Shape::fields([("hostname", Expr::field("hostname"))]))
        .build()?])
}

/// Resource for the device hostname
#[derive(Debug)]
pub struct HostnameResource {
    template: NetworkTemplate,
}

impl HostnameResource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            template: template()?,
        })
    }

    /// Validate a hostname
    fn validate_hostname(hostname: &str) -> Result<()> {
        if hostname.is_empty() || hostname.len() > 253 {
            return Err(Error::validation(
                "hostname",
                format!("hostname must be 1-253 characters, got {}", hostname.len()),
            ));
        }
        if !HOSTNAME_REGEX.is_match(hostname) {
            return Err(Error::validation(
                "hostname",
                format!("invalid hostname '{}'", hostname),
            ));
        }
        Ok(())
    }
}

impl Resource for HostnameResource {
    fn name(&self) -> &'static str {
        "hostname"
    }

    fn description(&self) -> &'static str {
        "Manage the device hostname"
    }

    fn facts_query(&self) -> &'static str {
        "show running-config | section ^hostname"
    }

    fn parse_facts(&self, text: &str) -> Result<serde_json::Value> {
        Ok(facts_json(&self.template.parse(text)))
    }

    fn validate_config(&self, config: &serde_json::Value) -> Result<serde_json::Value> {
        let normalized = validate_schema::<HostnameConfig>(self.name(), config)?;
        if let Some(hostname) = normalized.get("hostname").and_then(|h| h.as_str()) {
            Self::validate_hostname(hostname)?;
        }
        Ok(normalized)
    }

    fn generate_commands(
        &self,
        want: Option<&serde_json::Value>,
        have: &serde_json::Value,
        state: State,
    ) -> Result<Vec<String>> {
        let have = config_value(Some(have));
        let want = match state {
            State::Deleted => ConfigValue::empty_map(),
            State::Merged => deep_merge(&have, &config_value(want)),
            _ => config_value(want),
        };

        let mut module = ResourceModule::new(&self.template, state);
        module.compare(PARSERS, &want, &have)?;
        Ok(module.into_commands())
    }
}
