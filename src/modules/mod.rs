//! Resource orchestration for netres
//!
//! A resource manages one configuration domain of a device. Every invocation
//! walks the same state machine:
//!
//! ```text
//! INIT -> FACTS -> (gathered | parsed) -> RETURN
//!               -> COMMANDS -> rendered -> RETURN
//!                           -> APPLIED  -> RETURN
//! ```
//!
//! Resources supply the domain knowledge (fact parsing, schema validation and
//! command generation) through the [`Resource`] trait; [`run`] owns the state
//! machine, the device round trips and the shape of the result.

pub mod network;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, info_span};

use crate::connection::{clean_config_output, DeviceConnection};
use crate::diff::facts_diff;
use crate::error::{Error, Result};

/// Requested end state of a resource invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// Add or update the given configuration, never remove anything
    Merged,
    /// Make each given entity match exactly
    Replaced,
    /// Make the whole resource match exactly
    Overridden,
    /// Remove configuration, all of it or the entities given
    Deleted,
    /// Remove the resource's entities wholesale
    Purged,
    /// Report device facts
    Gathered,
    /// Produce commands for the given configuration without a device
    Rendered,
    /// Parse supplied configuration text into facts
    Parsed,
}

impl State {
    pub const ALL: [State; 8] = [
        State::Merged,
        State::Replaced,
        State::Overridden,
        State::Deleted,
        State::Purged,
        State::Gathered,
        State::Rendered,
        State::Parsed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Merged => "merged",
            State::Replaced => "replaced",
            State::Overridden => "overridden",
            State::Deleted => "deleted",
            State::Purged => "purged",
            State::Gathered => "gathered",
            State::Rendered => "rendered",
            State::Parsed => "parsed",
        }
    }

    /// Whether configuration missing from `want` is removed from the device
    pub fn removes_unspecified(&self) -> bool {
        matches!(
            self,
            State::Replaced | State::Overridden | State::Deleted | State::Purged
        )
    }

    /// Whether the state reads from or writes to a device
    pub fn contacts_device(&self) -> bool {
        !matches!(self, State::Rendered | State::Parsed)
    }

    /// Whether the state needs desired configuration
    pub fn requires_config(&self) -> bool {
        matches!(
            self,
            State::Merged | State::Replaced | State::Overridden | State::Rendered
        )
    }

    /// Whether the state generates commands
    pub fn generates_commands(&self) -> bool {
        !matches!(self, State::Gathered | State::Parsed)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        State::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Invalid state: '{}'. Valid options: {}",
                    s,
                    State::ALL.map(|st| st.as_str()).join(", ")
                )
            })
    }
}

/// Context for a resource invocation
#[derive(Debug, Clone, Default)]
pub struct ModuleContext {
    /// Generate and report commands without applying them
    pub check_mode: bool,
    /// Report a before/after diff of the facts
    pub diff_mode: bool,
}

impl ModuleContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    pub fn with_diff_mode(mut self, diff_mode: bool) -> Self {
        self.diff_mode = diff_mode;
        self
    }
}

/// Invocation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceParams {
    /// Desired configuration in the resource's schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    /// Configuration text to parse with state `parsed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_config: Option<String>,
    pub state: State,
}

impl ResourceParams {
    pub fn new(state: State) -> Self {
        Self {
            config: None,
            running_config: None,
            state,
        }
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_running_config(mut self, running_config: impl Into<String>) -> Self {
        self.running_config = Some(running_config.into());
        self
    }
}

/// Result of a resource invocation.
///
/// Exactly one of `commands`, `rendered`, `gathered` and `parsed` is set,
/// depending on the state. `changed` is true iff `commands` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceOutput {
    pub changed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gathered: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed: Option<serde_json::Value>,
    /// Unified diff of `before` and `after` in diff mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

/// A configuration domain managed through parse, compare and render
pub trait Resource: Send + Sync {
    /// Returns the name of the resource
    fn name(&self) -> &'static str;

    /// Returns a description of what the resource manages
    fn description(&self) -> &'static str;

    /// States this resource implements
    fn supported_states(&self) -> &'static [State] {
        &[
            State::Merged,
            State::Replaced,
            State::Overridden,
            State::Deleted,
            State::Gathered,
            State::Rendered,
            State::Parsed,
        ]
    }

    /// Show command returning the configuration this resource parses
    fn facts_query(&self) -> &'static str;

    /// Parse configuration text into facts in the resource's schema
    fn parse_facts(&self, text: &str) -> Result<serde_json::Value>;

    /// Check desired configuration against the schema and normalize it
    fn validate_config(&self, config: &serde_json::Value) -> Result<serde_json::Value>;

    /// Commands converging `have` onto `want` under `state`
    fn generate_commands(
        &self,
        want: Option<&serde_json::Value>,
        have: &serde_json::Value,
        state: State,
    ) -> Result<Vec<String>>;
}

fn fetch_facts(resource: &dyn Resource, connection: &dyn DeviceConnection) -> Result<serde_json::Value> {
    let query = resource.facts_query();
    debug!(host = connection.identifier(), query, "fetching facts");
    let text = connection.get(query)?;
    resource.parse_facts(&clean_config_output(&text))
}

/// Run one resource invocation
pub fn run(
    resource: &dyn Resource,
    params: &ResourceParams,
    connection: Option<&dyn DeviceConnection>,
    context: &ModuleContext,
) -> Result<ResourceOutput> {
    let state = params.state;
    let span = info_span!("resource", name = resource.name(), state = %state);
    let _enter = span.enter();

    if !resource.supported_states().contains(&state) {
        return Err(Error::UnsupportedState {
            resource: resource.name().to_string(),
            state: state.to_string(),
        });
    }
    if state.requires_config() && params.config.is_none() {
        return Err(Error::MissingParameter {
            param: "config".to_string(),
            state: state.to_string(),
        });
    }

    let want = params
        .config
        .as_ref()
        .map(|config| resource.validate_config(config))
        .transpose()?;

    let mut output = ResourceOutput::default();

    // Facts that need no device
    match state {
        State::Parsed => {
            let text = params
                .running_config
                .as_deref()
                .ok_or_else(|| Error::MissingParameter {
                    param: "running_config".to_string(),
                    state: state.to_string(),
                })?;
            output.parsed = Some(resource.parse_facts(&clean_config_output(text))?);
            return Ok(output);
        }
        State::Rendered => {
            let have = resource.parse_facts("")?;
            let commands = resource.generate_commands(want.as_ref(), &have, state)?;
            debug!(count = commands.len(), "rendered commands");
            output.rendered = Some(commands);
            return Ok(output);
        }
        _ => {}
    }

    let connection = connection.ok_or_else(|| Error::MissingConnection(state.to_string()))?;
    let before = fetch_facts(resource, connection)?;

    if !state.generates_commands() {
        output.gathered = Some(before);
        return Ok(output);
    }

    let commands = resource.generate_commands(want.as_ref(), &before, state)?;
    output.changed = !commands.is_empty();
    debug!(count = commands.len(), "generated commands");

    let after = if !output.changed {
        Some(before.clone())
    } else if context.check_mode {
        info!(count = commands.len(), "check mode, not applying");
        None
    } else {
        info!(host = connection.identifier(), count = commands.len(), "applying commands");
        connection
            .edit_config(&commands)
            .map_err(|source| Error::ApplyFailed {
                source,
                before: Some(before.clone()),
                commands: commands.clone(),
            })?;
        Some(fetch_facts(resource, connection)?)
    };

    if context.diff_mode {
        if let Some(after) = &after {
            let diff = facts_diff(&before, after)?;
            if diff.has_changes() {
                output.diff = Some(diff.text);
            }
        }
    }

    output.before = Some(before);
    output.after = after;
    output.commands = Some(commands);
    Ok(output)
}

/// Registry for looking up resources by name
pub struct ResourceRegistry {
    resources: HashMap<String, Arc<dyn Resource>>,
}

impl ResourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            resources: HashMap::new(),
        }
    }

    /// Create a registry with all built-in resources
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        network::register_network_resources(&mut registry)?;
        Ok(registry)
    }

    /// Register a resource
    pub fn register(&mut self, resource: Arc<dyn Resource>) {
        self.resources.insert(resource.name().to_string(), resource);
    }

    /// Get a resource by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Resource>> {
        self.resources.get(name).cloned()
    }

    /// Check if a resource exists
    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    /// All resource names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.resources.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Run a resource by name
    pub fn execute(
        &self,
        name: &str,
        params: &ResourceParams,
        connection: Option<&dyn DeviceConnection>,
        context: &ModuleContext,
    ) -> Result<ResourceOutput> {
        let resource = self
            .get(name)
            .ok_or_else(|| Error::ResourceNotFound(name.to_string()))?;
        run(resource.as_ref(), params, connection, context)
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
