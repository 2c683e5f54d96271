//! Offline connection backed by configuration text
//!
//! Serves a fixed running configuration for every query and records the
//! commands it is asked to apply instead of sending them anywhere.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, trace};

use super::{ConnectionResult, DeviceConnection};

/// Connection that answers queries from text held in memory
#[derive(Debug)]
pub struct StaticConnection {
    /// Identifier for this connection
    identifier: String,
    /// Text returned for any query without a dedicated response
    running_config: String,
    /// Per-query responses
    responses: HashMap<String, String>,
    /// Commands received through `edit_config`
    applied: Mutex<Vec<String>>,
}

impl StaticConnection {
    /// Create a connection serving `running_config`
    pub fn new(identifier: impl Into<String>, running_config: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            running_config: running_config.into(),
            responses: HashMap::new(),
            applied: Mutex::new(Vec::new()),
        }
    }

    /// Answer `command` with `output` instead of the running config
    pub fn with_response(mut self, command: impl Into<String>, output: impl Into<String>) -> Self {
        self.responses.insert(command.into(), output.into());
        self
    }

    /// Commands applied so far, in order
    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().clone()
    }
}

impl DeviceConnection for StaticConnection {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn get(&self, command: &str) -> ConnectionResult<String> {
        trace!(host = %self.identifier, command, "serving query from memory");
        Ok(self
            .responses
            .get(command)
            .unwrap_or(&self.running_config)
            .clone())
    }

    fn edit_config(&self, commands: &[String]) -> ConnectionResult<()> {
        debug!(host = %self.identifier, count = commands.len(), "recording commands");
        self.applied.lock().extend(commands.iter().cloned());
        Ok(())
    }
}
