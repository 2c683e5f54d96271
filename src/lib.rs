//! # netres - Declarative Network Resource Configuration
//!
//! netres manages facets of a network device's running configuration
//! (hostname, NTP, Fibre Channel interfaces, BGP address families) as
//! structured data. For each invocation it reads the device configuration,
//! parses it into facts, compares those facts with the desired state and
//! emits the minimal list of native CLI commands that converges the device.
//!
//! ## Core Concepts
//!
//! - **Templates**: ordered regex rules that parse configuration lines into a
//!   structured tree, each paired with a Jinja render template (minijinja)
//!   that turns the tree back into a command
//! - **Resources**: one configuration domain each, with a typed schema and
//!   the command generation logic for that domain
//! - **States**: the diff policy of an invocation (`merged`, `replaced`,
//!   `overridden`, `deleted`, `purged`, `gathered`, `rendered`, `parsed`)
//! - **Connections**: the two round trips to a device, reading configuration
//!   text and applying commands
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         CLI / caller                         │
//! └──────────────────────────────────────────────────────────────┘
//!                                │ ResourceParams
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │              Orchestrator (modules::run, State)              │
//! └──────────────────────────────────────────────────────────────┘
//!          │                     │                      │
//!          ▼                     ▼                      ▼
//! ┌─────────────────┐  ┌───────────────────┐  ┌──────────────────┐
//! │ NetworkTemplate │  │  ResourceModule   │  │ DeviceConnection │
//! │ parse / render  │  │  want vs. have    │  │  get / edit      │
//! └─────────────────┘  └───────────────────┘  └──────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust
//! use netres::prelude::*;
//! use serde_json::json;
//!
//! let registry = ResourceRegistry::with_builtins()?;
//! let params = ResourceParams::new(State::Rendered).with_config(json!({
//!     "servers": [{"server": "192.0.2.10", "prefer": true}]
//! }));
//!
//! let output = registry.execute("ntp_global", &params, None, &ModuleContext::new())?;
//! assert_eq!(output.rendered, Some(vec!["ntp server 192.0.2.10 prefer".to_string()]));
//! # Ok::<(), netres::Error>(())
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::connection::{ConnectionError, DeviceConnection, StaticConnection};
    pub use crate::error::{Error, Result};
    pub use crate::modules::{
        run, ModuleContext, Resource, ResourceOutput, ResourceParams, ResourceRegistry, State,
    };
    pub use crate::parser::{Expr, NetworkTemplate, Rule, Shape};
    pub use crate::value::ConfigValue;
}

// ============================================================================
// Engine
// ============================================================================

/// Structured configuration trees and the merge helpers built on them.
pub mod value;

/// Rule tables and the template engine that parses and renders with them.
pub mod parser;

/// Want/have comparison and before/after fact diffs.
pub mod diff;

// ============================================================================
// Resources and Transport
// ============================================================================

/// Device connection contract and an offline implementation.
pub mod connection;

/// Resource orchestration and the built-in network resources.
pub mod modules;

// ============================================================================
// Support
// ============================================================================

/// Error types and result aliases for netres operations.
pub mod error;

/// Layered tool configuration.
pub mod config;

pub use error::{Error, Result};

/// Returns the current version of netres.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
