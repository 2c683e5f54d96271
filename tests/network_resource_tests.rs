//! End-to-end resource tests through the orchestrator with a mock device.

mod common;

use common::*;
use netres::modules::{ModuleContext, ResourceParams, State};
use netres::Error;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Device-contacting states
// ============================================================================

#[test]
fn test_merged_applies_and_reports_after() {
    let conn = MockConnection::new("leaf1", HOSTNAME_CONFIG);
    conn.set_update_on_apply(true);

    let output = run_resource("hostname", State::Merged, Some(json!({"hostname": "NXOSv"})), &conn)
        .unwrap();

    assert!(output.changed);
    assert_eq!(output.commands, Some(vec!["hostname NXOSv".to_string()]));
    assert_eq!(output.before, Some(json!({"hostname": "NXOSv-9k"})));
    assert_eq!(output.after, Some(json!({"hostname": "NXOSv"})));
    assert_eq!(conn.applied(), vec![vec!["hostname NXOSv".to_string()]]);
    assert_eq!(conn.get_count(), 2);
    assert!(conn
        .queries()
        .iter()
        .all(|q| q == "show running-config | section ^hostname"));
}

#[test]
fn test_no_change_skips_apply() {
    let conn = MockConnection::new("leaf1", HOSTNAME_CONFIG);
    let output = run_resource(
        "hostname",
        State::Merged,
        Some(json!({"hostname": "NXOSv-9k"})),
        &conn,
    )
    .unwrap();

    assert!(!output.changed);
    assert_eq!(output.commands, Some(vec![]));
    assert_eq!(output.after, output.before);
    assert!(conn.applied().is_empty());
    assert_eq!(conn.get_count(), 1);
}

#[test]
fn test_deleted_without_config() {
    let conn = MockConnection::new("leaf1", HOSTNAME_CONFIG);
    let output = run_resource("hostname", State::Deleted, None, &conn).unwrap();
    assert_eq!(output.commands, Some(vec!["no hostname NXOSv-9k".to_string()]));
}

#[test]
fn test_check_mode_does_not_apply() {
    let conn = MockConnection::new("leaf1", NTP_CONFIG);
    let params = ResourceParams::new(State::Merged).with_config(json!({"passive": true}));
    let context = ModuleContext::new().with_check_mode(true);

    let output = registry()
        .execute("ntp_global", &params, Some(&conn), &context)
        .unwrap();

    assert!(output.changed);
    assert_eq!(output.commands, Some(vec!["ntp passive".to_string()]));
    assert!(output.after.is_none());
    assert!(conn.applied().is_empty());
}

#[test]
fn test_diff_mode_reports_fact_changes() {
    let conn = MockConnection::new("leaf1", HOSTNAME_CONFIG);
    conn.set_update_on_apply(true);
    let params = ResourceParams::new(State::Merged).with_config(json!({"hostname": "spine1"}));
    let context = ModuleContext::new().with_diff_mode(true);

    let output = registry()
        .execute("hostname", &params, Some(&conn), &context)
        .unwrap();

    let diff = output.diff.expect("diff in diff mode");
    assert!(diff.contains("-hostname: NXOSv-9k"));
    assert!(diff.contains("+hostname: spine1"));
}

#[test]
fn test_apply_failure_carries_attempt() {
    let conn = MockConnection::new("leaf1", HOSTNAME_CONFIG);
    conn.set_fail_on_apply(true);

    let err = run_resource("hostname", State::Merged, Some(json!({"hostname": "NXOSv"})), &conn)
        .unwrap_err();

    match err {
        Error::ApplyFailed {
            before, commands, ..
        } => {
            assert_eq!(before, Some(json!({"hostname": "NXOSv-9k"})));
            assert_eq!(commands, vec!["hostname NXOSv"]);
        }
        other => panic!("expected ApplyFailed, got {:?}", other),
    }
}

#[test]
fn test_fetch_failure_is_connection_error() {
    let conn = MockConnection::new("leaf1", HOSTNAME_CONFIG);
    conn.set_fail_on_get(true);
    let err = run_resource("hostname", State::Gathered, None, &conn).unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
}

#[test]
fn test_gathered_strips_echo_and_prompt() {
    let conn = MockConnection::new("leaf1", "");
    conn.set_response(
        "show running-config ntp",
        "show running-config ntp\nntp logging\nntp server 192.0.2.2\nleaf1#\n",
    );

    let output = run_resource("ntp_global", State::Gathered, None, &conn).unwrap();
    assert_eq!(
        output.gathered,
        Some(json!({"logging": true, "servers": [{"server": "192.0.2.2"}]}))
    );
    assert!(!output.changed);
    assert!(output.commands.is_none());
}

#[test]
fn test_overridden_fc_interfaces() {
    let conn = MockConnection::new("mds1", FC_CONFIG);
    let gathered = run_resource("fc_interfaces", State::Gathered, None, &conn)
        .unwrap()
        .gathered
        .unwrap();
    let first = gathered.as_array().unwrap()[0].clone();
    assert_eq!(first["name"], json!("fc1/1"));

    let output =
        run_resource("fc_interfaces", State::Overridden, Some(json!([first])), &conn).unwrap();

    let commands = output.commands.unwrap();
    assert!(commands.contains(&"interface fc1/2".to_string()));
    assert!(!commands.iter().any(|c| c == "interface fc1/1"));
}

#[test]
fn test_overridden_covers_replaced() {
    let conn = MockConnection::new("mds1", FC_CONFIG);
    let want = json!([{"name": "fc1/1", "description": "core", "shutdown": false}]);

    let replaced = run_resource("fc_interfaces", State::Replaced, Some(want.clone()), &conn)
        .unwrap()
        .commands
        .unwrap();
    let overridden = run_resource("fc_interfaces", State::Overridden, Some(want), &conn)
        .unwrap()
        .commands
        .unwrap();

    assert!(!replaced.is_empty());
    assert!(!replaced.iter().any(|c| c == "interface fc1/2"));
    assert!(overridden.iter().any(|c| c == "interface fc1/2"));
    assert_eq!(&overridden[..replaced.len()], &replaced[..]);
}

#[test]
fn test_bgp_gathered_skips_neighbors() {
    let conn = MockConnection::new("leaf1", BGP_CONFIG);
    let output = run_resource("bgp_address_family", State::Gathered, None, &conn).unwrap();
    let gathered = output.gathered.unwrap();

    assert_eq!(gathered["as_number"], json!("65563"));
    let families = gathered["address_family"].as_array().unwrap();
    assert_eq!(families.len(), 2);
    assert_eq!(families[0]["default_metric"], json!(400));
    assert_eq!(families[1]["vrf"], json!("site-1"));
}

#[test]
fn test_bgp_purged() {
    let conn = MockConnection::new("leaf1", BGP_CONFIG);
    let output = run_resource("bgp_address_family", State::Purged, None, &conn).unwrap();
    assert_eq!(output.commands, Some(vec!["no router bgp 65563".to_string()]));
}

#[test]
fn test_bgp_asn_mismatch() {
    let conn = MockConnection::new("leaf1", BGP_CONFIG);
    let want = json!({"as_number": "65000", "address_family": [{"afi": "ipv4", "safi": "unicast"}]});
    let err = run_resource("bgp_address_family", State::Merged, Some(want), &conn).unwrap_err();
    assert!(matches!(err, Error::AsnMismatch { ref have, ref want } if have == "65563" && want == "65000"));
    assert!(conn.applied().is_empty());
}

// ============================================================================
// Offline states
// ============================================================================

#[test]
fn test_rendered_needs_no_connection() {
    let params = ResourceParams::new(State::Rendered).with_config(json!({"hostname": "NXOSv"}));
    let output = registry()
        .execute("hostname", &params, None, &ModuleContext::new())
        .unwrap();
    assert_eq!(output.rendered, Some(vec!["hostname NXOSv".to_string()]));
    assert!(output.commands.is_none());
    assert!(!output.changed);
}

#[test]
fn test_parsed_cleans_output() {
    let params = ResourceParams::new(State::Parsed)
        .with_running_config("show running-config | section ^hostname\nhostname edge7\nedge7#\n");
    let output = registry()
        .execute("hostname", &params, None, &ModuleContext::new())
        .unwrap();
    assert_eq!(output.parsed, Some(json!({"hostname": "edge7"})));
}

// ============================================================================
// Render/parse round trips
// ============================================================================

/// Indent rendered commands the way the device shows them. `headers` lists
/// the context keywords from outermost to innermost.
fn indent_commands(commands: &[String], headers: &[&str]) -> String {
    let mut open: Vec<usize> = Vec::new();
    let mut text = String::new();
    for command in commands {
        let level = headers.iter().position(|h| command.starts_with(h));
        if let Some(level) = level {
            while open.last().is_some_and(|&top| top >= level) {
                open.pop();
            }
        }
        text.push_str(&" ".repeat(open.len() * 2));
        text.push_str(command);
        text.push('\n');
        if let Some(level) = level {
            open.push(level);
        }
    }
    text
}

/// Render `want` offline, parse the rendered text back and return the
/// validated want alongside the parsed facts
fn render_then_parse(
    resource: &str,
    want: serde_json::Value,
    headers: &[&str],
) -> (serde_json::Value, serde_json::Value) {
    let registry = registry();
    let context = ModuleContext::new();

    let rendered = registry
        .execute(
            resource,
            &ResourceParams::new(State::Rendered).with_config(want.clone()),
            None,
            &context,
        )
        .unwrap()
        .rendered
        .unwrap();
    let parsed = registry
        .execute(
            resource,
            &ResourceParams::new(State::Parsed)
                .with_running_config(indent_commands(&rendered, headers)),
            None,
            &context,
        )
        .unwrap()
        .parsed
        .unwrap();
    let validated = registry
        .get(resource)
        .unwrap()
        .validate_config(&want)
        .unwrap();
    (validated, parsed)
}

#[test]
fn test_hostname_round_trip() {
    let (want, parsed) = render_then_parse("hostname", json!({"hostname": "edge-7"}), &[]);
    assert_eq!(parsed, want);
}

#[test]
fn test_ntp_global_round_trip() {
    let want = json!({
        "authenticate": true,
        "logging": true,
        "master": {"stratum": 8},
        "passive": true,
        "source_interface": "Ethernet1/1",
        "authentication_keys": [{"id": 10, "key": "wawyhanx2", "encryption": 7}],
        "peers": [{
            "peer": "192.0.2.1", "prefer": true, "vrf": "default",
            "key_id": 1, "minpoll": 4, "maxpoll": 6
        }],
        "servers": [
            {"server": "192.0.2.2", "vrf": "management", "key_id": 2},
            {"server": "203.0.113.5", "prefer": true, "maxpoll": 10}
        ],
        "trusted_keys": [{"key_id": 1}, {"key_id": 2}]
    });
    let (want, parsed) = render_then_parse("ntp_global", want, &[]);
    assert_eq!(parsed, want);
}

#[test]
fn test_fc_interfaces_round_trip() {
    let want = json!([
        {
            "name": "fc1/1", "description": "to core", "speed": 8000, "mode": "E",
            "trunk_mode": "off", "shutdown": false, "analytics": "fc-all"
        },
        {
            "name": "vfc3", "description": "fcoe", "speed": "auto", "mode": "auto",
            "trunk_mode": "on", "shutdown": true, "analytics": "fc-nvme"
        }
    ]);
    let (want, parsed) = render_then_parse("fc_interfaces", want, &["interface "]);
    assert_eq!(parsed, want);
}

#[test]
fn test_bgp_address_family_round_trip() {
    let want = json!({
        "as_number": 65000,
        "address_family": [
            {
                "afi": "ipv4",
                "safi": "unicast",
                "default_information": {"originate": true},
                "default_metric": 400,
                "maximum_paths": {"parallel_paths": 20, "ibgp": {"parallel_paths": 12}},
                "networks": [
                    {"prefix": "192.0.2.0/24", "route_map": "rmap1"},
                    {"prefix": "198.51.100.0/24"}
                ],
                "redistribute": [
                    {"protocol": "eigrp", "id": 100, "route_map": "rmap2"},
                    {"protocol": "direct", "route_map": "rmap3"}
                ]
            },
            {
                "afi": "ipv4",
                "safi": "multicast",
                "vrf": "blue",
                "maximum_paths": {"ibgp": {"parallel_paths": 4}}
            }
        ]
    });
    let (want, parsed) = render_then_parse(
        "bgp_address_family",
        want,
        &["router bgp ", "vrf ", "address-family "],
    );
    assert_eq!(parsed, want);
}

// ============================================================================
// Invocation errors
// ============================================================================

#[test]
fn test_missing_config() {
    let params = ResourceParams::new(State::Merged);
    let conn = MockConnection::new("leaf1", HOSTNAME_CONFIG);
    let err = registry()
        .execute("hostname", &params, Some(&conn), &ModuleContext::new())
        .unwrap_err();
    assert!(matches!(err, Error::MissingParameter { ref param, .. } if param == "config"));
    assert_eq!(conn.get_count(), 0);
}

#[test]
fn test_missing_running_config() {
    let params = ResourceParams::new(State::Parsed);
    let err = registry()
        .execute("hostname", &params, None, &ModuleContext::new())
        .unwrap_err();
    assert!(matches!(err, Error::MissingParameter { ref param, .. } if param == "running_config"));
}

#[test]
fn test_missing_connection() {
    let params = ResourceParams::new(State::Gathered);
    let err = registry()
        .execute("ntp_global", &params, None, &ModuleContext::new())
        .unwrap_err();
    assert!(matches!(err, Error::MissingConnection(ref state) if state == "gathered"));
}

#[test]
fn test_unsupported_state() {
    let conn = MockConnection::new("leaf1", HOSTNAME_CONFIG);
    let err = run_resource("hostname", State::Purged, None, &conn).unwrap_err();
    assert!(matches!(err, Error::UnsupportedState { .. }));
    assert_eq!(conn.get_count(), 0);
}

#[test]
fn test_unknown_resource() {
    let conn = MockConnection::new("leaf1", "");
    let err = run_resource("vlans", State::Gathered, None, &conn).unwrap_err();
    assert!(matches!(err, Error::ResourceNotFound(ref name) if name == "vlans"));
}

#[test]
fn test_validation_error_before_device_contact() {
    let conn = MockConnection::new("leaf1", NTP_CONFIG);
    let err = run_resource("ntp_global", State::Merged, Some(json!({"bogus": 1})), &conn)
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(conn.get_count(), 0);
}

#[test]
fn test_registry_lists_builtins() {
    assert_eq!(
        registry().names(),
        vec!["bgp_address_family", "fc_interfaces", "hostname", "ntp_global"]
    );
}

// ============================================================================
// Properties
// ============================================================================

fn hostname_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,20}[a-z0-9]"
}

proptest! {
    #[test]
    fn prop_gathered_facts_are_idempotent(name in hostname_strategy()) {
        let conn = MockConnection::new("leaf1", format!("hostname {}\n", name));
        let gathered = run_resource("hostname", State::Gathered, None, &conn)
            .unwrap()
            .gathered
            .unwrap();
        for state in [State::Merged, State::Replaced, State::Overridden] {
            let output = run_resource("hostname", state, Some(gathered.clone()), &conn).unwrap();
            prop_assert!(!output.changed);
            prop_assert_eq!(output.commands, Some(vec![]));
        }
    }

    #[test]
    fn prop_merged_never_negates(
        servers in proptest::collection::vec((1u8..=254, any::<bool>()), 1..5),
    ) {
        let conn = MockConnection::new("leaf1", NTP_CONFIG);
        let servers: Vec<_> = servers
            .into_iter()
            .map(|(octet, prefer)| json!({"server": format!("203.0.113.{}", octet), "prefer": prefer}))
            .collect();
        let output = run_resource(
            "ntp_global",
            State::Merged,
            Some(json!({"servers": servers, "logging": true})),
            &conn,
        )
        .unwrap();
        for command in output.commands.unwrap_or_default() {
            prop_assert!(!command.starts_with("no "), "{}", command);
        }
    }
}
