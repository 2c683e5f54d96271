//! Network Resource Modules
//!
//! Each resource manages one facet of a Cisco NX-OS running configuration
//! through the same pipeline:
//!
//! ```text
//! +-------------+    parse    +-----------+
//! | device text |------------>|   have    |---+
//! +-------------+  (template) +-----------+   |   +----------------+    +----------+
//!                                             +-->| ResourceModule |--->| commands |
//! +-------------+  validate   +-----------+   |   |    compare     |    +----------+
//! |   config    |------------>|   want    |---+   +----------------+
//! +-------------+  (schema)   +-----------+
//! ```
//!
//! # Resources
//!
//! - `hostname`: system hostname
//! - `ntp_global`: NTP settings, servers, peers and keys
//! - `fc_interfaces`: Fibre Channel interface settings including analytics
//! - `bgp_address_family`: BGP address families, global and per VRF
//!
//! # Example
//!
//! ```rust
//! use netres::connection::StaticConnection;
//! use netres::modules::{ModuleContext, ResourceParams, ResourceRegistry, State};
//! use serde_json::json;
//!
//! let registry = ResourceRegistry::with_builtins()?;
//! let conn = StaticConnection::new("n9k", "hostname NXOSv-9k\n");
//! let params = ResourceParams::new(State::Merged).with_config(json!({"hostname": "NXOSv"}));
//!
//! let output = registry.execute("hostname", &params, Some(&conn), &ModuleContext::new())?;
//! assert_eq!(output.commands, Some(vec!["hostname NXOSv".to_string()]));
//! # Ok::<(), netres::Error>(())
//! ```

pub mod bgp_address_family;
pub mod common;
pub mod fc_interfaces;
pub mod hostname;
pub mod ntp_global;

pub use bgp_address_family::BgpAddressFamilyResource;
pub use fc_interfaces::{analytics_transition, FcInterfacesResource};
pub use hostname::HostnameResource;
pub use ntp_global::NtpGlobalResource;

use crate::error::Result;
use crate::modules::ResourceRegistry;
use std::sync::Arc;

/// Register all network resources with the registry
pub fn register_network_resources(registry: &mut ResourceRegistry) -> Result<()> {
    registry.register(Arc::new(HostnameResource::new()?));
    registry.register(Arc::new(NtpGlobalResource::new()?));
    registry.register(Arc::new(FcInterfacesResource::new()?));
    registry.register(Arc::new(BgpAddressFamilyResource::new()?));
    Ok(())
}

/// Get a list of all available network resource names
pub fn network_resource_names() -> Vec<&'static str> {
    vec![
        "bgp_address_family",
        "fc_interfaces",
        "hostname",
        "ntp_global",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_names() {
        let mut registry = ResourceRegistry::new();
        register_network_resources(&mut registry).unwrap();
        assert_eq!(registry.names(), network_resource_names());
    }
}
