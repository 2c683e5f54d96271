//! Shared test utilities for the netres test suite.
//!
//! This module provides:
//! - A scripted [`MockConnection`] that serves configuration text and
//!   records applied commands, optionally failing on apply
//! - Running-configuration fixtures for the built-in resources
//! - Small helpers for running resources
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::RwLock;

use netres::connection::{ConnectionError, ConnectionResult, DeviceConnection};
use netres::modules::{ModuleContext, ResourceOutput, ResourceParams, ResourceRegistry, State};

// ============================================================================
// Mock Connection Implementation
// ============================================================================

/// A mock connection for testing purposes.
///
/// Queries are answered from a per-command table, falling back to a default
/// running configuration. Applied commands are recorded and, with
/// `update_on_apply` set, appended to the running configuration so a
/// re-read observes them.
#[derive(Debug)]
pub struct MockConnection {
    identifier: String,
    running_config: RwLock<String>,
    responses: RwLock<HashMap<String, String>>,
    queries: RwLock<Vec<String>>,
    applied: RwLock<Vec<Vec<String>>>,
    fail_on_apply: AtomicBool,
    fail_on_get: AtomicBool,
    update_on_apply: AtomicBool,
    get_count: AtomicU32,
}

impl MockConnection {
    /// Create a new mock connection serving `running_config`.
    pub fn new(identifier: impl Into<String>, running_config: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            running_config: RwLock::new(running_config.into()),
            responses: RwLock::new(HashMap::new()),
            queries: RwLock::new(Vec::new()),
            applied: RwLock::new(Vec::new()),
            fail_on_apply: AtomicBool::new(false),
            fail_on_get: AtomicBool::new(false),
            update_on_apply: AtomicBool::new(false),
            get_count: AtomicU32::new(0),
        }
    }

    /// Answer `command` with `output`.
    pub fn set_response(&self, command: impl Into<String>, output: impl Into<String>) {
        self.responses.write().insert(command.into(), output.into());
    }

    /// Make `edit_config` fail.
    pub fn set_fail_on_apply(&self, fail: bool) {
        self.fail_on_apply.store(fail, Ordering::SeqCst);
    }

    /// Make `get` fail.
    pub fn set_fail_on_get(&self, fail: bool) {
        self.fail_on_get.store(fail, Ordering::SeqCst);
    }

    /// Append applied commands to the running configuration.
    pub fn set_update_on_apply(&self, update: bool) {
        self.update_on_apply.store(update, Ordering::SeqCst);
    }

    /// Replace the running configuration served to later queries.
    pub fn set_running_config(&self, text: impl Into<String>) {
        *self.running_config.write() = text.into();
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries.read().clone()
    }

    /// Number of `get` calls.
    pub fn get_count(&self) -> u32 {
        self.get_count.load(Ordering::SeqCst)
    }

    /// Command batches received through `edit_config`.
    pub fn applied(&self) -> Vec<Vec<String>> {
        self.applied.read().clone()
    }
}

impl DeviceConnection for MockConnection {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn get(&self, command: &str) -> ConnectionResult<String> {
        self.get_count.fetch_add(1, Ordering::SeqCst);
        self.queries.write().push(command.to_string());
        if self.fail_on_get.load(Ordering::SeqCst) {
            return Err(ConnectionError::ConnectionFailed(
                "Mock connection failed".to_string(),
            ));
        }
        if let Some(output) = self.responses.read().get(command) {
            return Ok(output.clone());
        }
        Ok(self.running_config.read().clone())
    }

    fn edit_config(&self, commands: &[String]) -> ConnectionResult<()> {
        if self.fail_on_apply.load(Ordering::SeqCst) {
            return Err(ConnectionError::CommandRejected {
                command: commands.first().cloned().unwrap_or_default(),
                message: "% Invalid command".to_string(),
            });
        }
        self.applied.write().push(commands.to_vec());
        if self.update_on_apply.load(Ordering::SeqCst) {
            let mut text = self.running_config.write();
            for command in commands {
                text.push('\n');
                text.push_str(command);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub const HOSTNAME_CONFIG: &str = "hostname NXOSv-9k\n";

pub const NTP_CONFIG: &str = "\
ntp authenticate
ntp logging
ntp master 8
ntp server 192.0.2.1 prefer use-vrf management key 2
ntp server 192.0.2.2
ntp peer 198.51.100.1 use-vrf default
ntp authentication-key 2 md5 wawyhanx2 7
ntp trusted-key 2
ntp source-interface Ethernet1/1
";

pub const FC_CONFIG: &str = "\
interface fc1/1
  switchport speed 8000
  switchport description uplink
  no shutdown
  analytics type fc-scsi
interface fc1/2
  switchport mode E
interface vfc5
  no shutdown
";

pub const BGP_CONFIG: &str = "\
router bgp 65563
  address-family ipv4 unicast
    default-metric 400
    network 192.0.2.0/24 route-map rmap1
  neighbor 10.0.0.1
    address-family ipv4 unicast
      default-metric 10
  vrf site-1
    address-family ipv4 multicast
      maximum-paths 4
";

// ============================================================================
// Helpers
// ============================================================================

pub fn registry() -> ResourceRegistry {
    ResourceRegistry::with_builtins().expect("built-in resources load")
}

/// Run `resource` with `state` and optional config against `conn`
pub fn run_resource(
    resource: &str,
    state: State,
    config: Option<serde_json::Value>,
    conn: &MockConnection,
) -> netres::Result<ResourceOutput> {
    let mut params = ResourceParams::new(state);
    if let Some(config) = config {
        params = params.with_config(config);
    }
    registry().execute(resource, &params, Some(conn), &ModuleContext::new())
}
