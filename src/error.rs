//! Error types for netres.
//!
//! Errors fall into two groups: programming errors in a resource's rule table,
//! which surface when the resource is constructed, and runtime errors raised
//! while validating input, talking to the device or applying commands.

use crate::connection::ConnectionError;
use thiserror::Error;

/// Result type alias for netres operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for netres.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Rule Table Errors
    // ========================================================================
    /// A rule in a resource's rule table is malformed.
    #[error("Invalid rule '{rule}': {message}")]
    RuleDefinition {
        /// Rule name
        rule: String,
        /// Error message
        message: String,
    },

    /// A render was requested for a rule the template does not define.
    #[error("Template has no rule named '{0}'")]
    UnknownRule(String),

    /// A render template failed for a reason other than absent data.
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    // ========================================================================
    // Invocation Errors
    // ========================================================================
    /// Structured configuration does not match the resource schema.
    #[error("Invalid configuration for '{resource}': {message}")]
    Validation {
        /// Resource name
        resource: String,
        /// Error message
        message: String,
    },

    /// The resource does not implement the requested state.
    #[error("Resource '{resource}' does not support state '{state}'")]
    UnsupportedState {
        /// Resource name
        resource: String,
        /// Requested state
        state: String,
    },

    /// A parameter required by the requested state is missing.
    #[error("Missing required parameter '{param}' for state '{state}'")]
    MissingParameter {
        /// Parameter name
        param: String,
        /// Requested state
        state: String,
    },

    /// The requested state needs a device connection and none was given.
    #[error("State '{0}' requires a device connection")]
    MissingConnection(String),

    /// Resource not found in the registry.
    #[error("Resource '{0}' not found")]
    ResourceNotFound(String),

    /// The device runs BGP under a different ASN than requested.
    #[error(
        "BGP is already configured with ASN {have}; remove it with state purged before configuring ASN {want}"
    )]
    AsnMismatch {
        /// ASN found on the device
        have: String,
        /// ASN requested
        want: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Fetching configuration from the device failed.
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Applying generated commands failed. Carries what was attempted.
    #[error("Failed to apply {} commands: {source}", .commands.len())]
    ApplyFailed {
        /// Transport error
        #[source]
        source: ConnectionError,
        /// Facts gathered before the attempt
        before: Option<serde_json::Value>,
        /// Commands that were sent
        commands: Vec<String>,
    },

    // ========================================================================
    // Conversion Errors
    // ========================================================================
    /// JSON conversion error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML conversion error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a rule definition error.
    pub fn rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Error::RuleDefinition {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Whether this error indicates a bug in a rule table rather than bad input.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Error::RuleDefinition { .. } | Error::UnknownRule(_) | Error::Template(_)
        )
    }
}
