//! Device connection contract.
//!
//! Resource modules never talk to a transport directly. They consume a
//! [`DeviceConnection`], which exposes exactly the two round trips the
//! engine needs: reading configuration text for a show-style query and
//! pushing a list of configuration commands.
//!
//! # Overview
//!
//! A connection is a single-use scoped resource: the caller acquires it,
//! hands it to one resource invocation, and that invocation performs at
//! most one read, one apply, and (after a successful apply) one more read
//! to report the resulting facts. Timeouts and retries belong to the
//! implementation behind this trait.
//!
//! # Example
//!
//! ```rust
//! use netres::connection::{DeviceConnection, StaticConnection};
//!
//! let conn = StaticConnection::new("leaf1", "hostname leaf1\n");
//! assert_eq!(conn.get("show running-config").unwrap(), "hostname leaf1\n");
//!
//! conn.edit_config(&["hostname leaf2".to_string()]).unwrap();
//! assert_eq!(conn.applied(), vec!["hostname leaf2".to_string()]);
//! ```

mod offline;

pub use offline::StaticConnection;

use thiserror::Error;

/// Errors that can occur when talking to a device.
///
/// The engine itself never builds these. They are the vocabulary
/// [`DeviceConnection`] implementations report failures in; a fetch error
/// surfaces as [`Error::Connection`](crate::Error::Connection) and an apply
/// error as [`Error::ApplyFailed`](crate::Error::ApplyFailed).
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Failed to establish the session to the device.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Command execution failed.
    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    /// The device rejected a configuration command.
    #[error("Device rejected '{command}': {message}")]
    CommandRejected {
        /// The offending command
        command: String,
        /// Device error text
        message: String,
    },

    /// Connection or operation timed out.
    #[error("Connection timeout after {0} seconds")]
    Timeout(u64),
}

/// Result type for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Config source and sink for one device.
pub trait DeviceConnection {
    /// Get the connection identifier (hostname or address)
    fn identifier(&self) -> &str;

    /// Return raw configuration text for a show-style query
    fn get(&self, command: &str) -> ConnectionResult<String>;

    /// Apply configuration commands in order
    fn edit_config(&self, commands: &[String]) -> ConnectionResult<()>;
}

impl<T: DeviceConnection + ?Sized> DeviceConnection for &T {
    fn identifier(&self) -> &str {
        (**self).identifier()
    }

    fn get(&self, command: &str) -> ConnectionResult<String> {
        (**self).get(command)
    }

    fn edit_config(&self, commands: &[String]) -> ConnectionResult<()> {
        (**self).edit_config(commands)
    }
}

/// Clean up configuration output (remove command echo, prompts, etc.)
pub fn clean_config_output(output: &str) -> String {
    let mut lines: Vec<&str> = output.lines().collect();

    // Command echo
    if lines
        .first()
        .is_some_and(|first| first.trim_start().starts_with("show "))
    {
        lines.remove(0);
    }

    // Trailing prompt lines
    while let Some(last) = lines.last() {
        let last = last.trim();
        if last.is_empty() || (!last.contains(' ') && (last.ends_with('#') || last.ends_with('>')))
        {
            lines.pop();
        } else {
            break;
        }
    }

    lines.join("\n")
}
