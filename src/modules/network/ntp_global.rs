//! NTP global resource
//!
//! Manages the `ntp ...` lines of an NX-OS configuration: global switches,
//! the master stratum, source settings, and four keyed collections
//! (servers, peers, authentication keys and trusted keys).

use serde::{Deserialize, Serialize};

use super::common::{
    config_value, entries_at, facts_json, key_list_at, opt_string_or_number, unkey_map_at,
    validate_schema,
};
use crate::diff::ResourceModule;
use crate::error::Result;
use crate::modules::{Resource, State};
use crate::parser::{Expr, NetworkTemplate, Rule, Shape};
use crate::value::{deep_merge, ConfigValue};

/// Scalar settings compared key by key
const PARSERS: &[&str] = &[
    "authenticate",
    "logging",
    "master",
    "passive",
    "source",
    "source_interface",
];

/// Keyed collections: (path and rule name, natural key)
const LISTS: &[(&str, &str)] = &[
    ("authentication_keys", "id"),
    ("peers", "peer"),
    ("servers", "server"),
    ("trusted_keys", "key_id"),
];

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct NtpGlobalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    authenticate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    logging: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    master: Option<Master>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    passive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_interface: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    authentication_keys: Option<Vec<AuthenticationKey>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    peers: Option<Vec<Peer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    servers: Option<Vec<Server>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trusted_keys: Option<Vec<TrustedKey>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Master {
    stratum: u8,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct AuthenticationKey {
    id: u32,
    key: String,
    #[serde(default = "default_encryption")]
    encryption: u8,
}

fn default_encryption() -> u8 {
    7
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Server {
    server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    maxpoll: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    minpoll: Option<u8>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    prefer: bool,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    vrf: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Peer {
    peer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    maxpoll: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    minpoll: Option<u8>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    prefer: bool,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    vrf: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TrustedKey {
    key_id: u32,
}

/// Result shape for one server or peer line, keyed by `field`
fn association(field: &str) -> Shape {
    Shape::at(
        &format!("{}s", field),
        Shape::keyed(
            Expr::field(field),
            Shape::fields([
                (field, Expr::field(field)),
                ("prefer", Expr::present("prefer")),
                ("vrf", Expr::field("vrf")),
                ("key_id", Expr::int("key_id")),
                ("minpoll", Expr::int("minpoll")),
                ("maxpoll", Expr::int("maxpoll")),
            ]),
        ),
    )
}

/// Options of a server or peer line, rendered in the order they parse
const ASSOCIATION_RENDER: &str = "\
{% if prefer is defined and prefer %} prefer{% endif %}\
{% if vrf is defined %} use-vrf {{ vrf }}{% endif %}\
{% if key_id is defined %} key {{ key_id }}{% endif %}\
{% if minpoll is defined %} minpoll {{ minpoll }}{% endif %}\
{% if maxpoll is defined %} maxpoll {{ maxpoll }}{% endif %}";

const ASSOCIATION_OPTIONS: &str = r"(\s+(?P<prefer>prefer))?(\s+use-vrf\s+(?P<vrf>\S+))?(\s+key\s+(?P<key_id>\d+))?(\s+minpoll\s+(?P<minpoll>\d+))?(\s+maxpoll\s+(?P<maxpoll>\d+))?\s*$";

fn template() -> Result<NetworkTemplate> {
    NetworkTemplate::new(vec![
        Rule::builder("authenticate")
            .pattern(r"^ntp authenticate$")
            .setval("ntp authenticate")
            .result(Shape::fields([("authenticate", Expr::lit(true))]))
            .build()?,
        Rule::builder("authentication_keys")
            .pattern(r"^ntp authentication-key (?P<id>\d+) md5 (?P<key>\S+) (?P<encryption>\d+)$")
            .setval("ntp authentication-key {{ id }} md5 {{ key }} {{ encryption }}")
            .result(Shape::at(
                "authentication_keys",
                Shape::keyed(
                    Expr::field("id"),
                    Shape::fields([
                        ("id", Expr::int("id")),
                        ("key", Expr::field("key")),
                        ("encryption", Expr::int("encryption")),
                    ]),
                ),
            ))
            .build()?,
        Rule::builder("logging")
            .pattern(r"^ntp logging$")
            .setval("ntp logging")
            .result(Shape::fields([("logging", Expr::lit(true))]))
            .build()?,
        Rule::builder("master")
            .pattern(r"^ntp master (?P<stratum>\d+)$")
            .setval("ntp master {{ master.stratum }}")
            .remval("ntp master")
            .compval("master.stratum")
            .result(Shape::at(
                "master",
                Shape::fields([("stratum", Expr::int("stratum"))]),
            ))
            .build()?,
        Rule::builder("passive")
            .pattern(r"^ntp passive$")
            .setval("ntp passive")
            .result(Shape::fields([("passive", Expr::lit(true))]))
            .build()?,
        Rule::builder("peers")
            .pattern(&format!(r"^ntp peer (?P<peer>\S+){}", ASSOCIATION_OPTIONS))
            .setval(&["ntp peer {{ peer }}", ASSOCIATION_RENDER].concat())
            .result(association("peer"))
            .build()?,
        Rule::builder("servers")
            .pattern(&format!(r"^ntp server (?P<server>\S+){}", ASSOCIATION_OPTIONS))
            .setval(&["ntp server {{ server }}", ASSOCIATION_RENDER].concat())
            .result(association("server"))
            .build()?,
        Rule::builder("source_interface")
            .pattern(r"^ntp source-interface\s+(?P<source_interface>\S+)$")
            .setval("ntp source-interface {{ source_interface }}")
            .result(Shape::fields([(
                "source_interface",
                Expr::field("source_interface"),
            )]))
            .build()?,
        Rule::builder("source")
            .pattern(r"^ntp source (?P<source>\S+)$")
            .setval("ntp source {{ source }}")
            .result(Shape::fields([("source", Expr::field("source"))]))
            .build()?,
        Rule::builder("trusted_keys")
            .pattern(r"^ntp trusted-key (?P<key_id>\d+)$")
            .setval("ntp trusted-key {{ key_id }}")
            .result(Shape::at(
                "trusted_keys",
                Shape::keyed(
                    Expr::field("key_id"),
                    Shape::fields([("key_id", Expr::int("key_id"))]),
                ),
            ))
            .build()?,
    ])
}

/// Convert facts or config to the keyed tree form
fn keyed_tree(value: Option<&serde_json::Value>) -> ConfigValue {
    let mut tree = config_value(value);
    for (path, key) in LISTS {
        key_list_at(&mut tree, path, &[key]);
    }
    tree
}

/// Resource for global NTP configuration
#[derive(Debug)]
pub struct NtpGlobalResource {
    template: NetworkTemplate,
}

impl NtpGlobalResource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            template: template()?,
        })
    }
}

impl Resource for NtpGlobalResource {
    fn name(&self) -> &'static str {
        "ntp_global"
    }

    fn description(&self) -> &'static str {
        "Manage global NTP configuration"
    }

    fn facts_query(&self) -> &'static str {
        "show running-config ntp"
    }

    fn parse_facts(&self, text: &str) -> Result<serde_json::Value> {
        let mut parsed = self.template.parse(text);
        for (path, _) in LISTS {
            unkey_map_at(&mut parsed, path);
        }
        Ok(facts_json(&parsed))
    }

    fn validate_config(&self, config: &serde_json::Value) -> Result<serde_json::Value> {
        validate_schema::<NtpGlobalConfig>(self.name(), config)
    }

    fn generate_commands(
        &self,
        want: Option<&serde_json::Value>,
        have: &serde_json::Value,
        state: State,
    ) -> Result<Vec<String>> {
        let have = keyed_tree(Some(have));
        let want = match state {
            State::Deleted => ConfigValue::empty_map(),
            State::Merged => deep_merge(&have, &keyed_tree(want)),
            _ => keyed_tree(want),
        };

        let mut module = ResourceModule::new(&self.template, state);
        module.compare(PARSERS, &want, &have)?;
        for (path, _) in LISTS {
            module.compare_list_entries(path, &entries_at(&want, path), &entries_at(&have, path))?;
        }
        Ok(module.into_commands())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const RUNNING: &str = "\
ntp authenticate
ntp authentication-key 10 md5 wawyhanx2 7
ntp logging
ntp master 8
ntp peer 192.0.2.1 prefer use-vrf default key 1 minpoll 4 maxpoll 6
ntp server 192.0.2.2 use-vrf management key 2
ntp server 203.0.113.5
ntp source 198.51.100.1
ntp source-interface  Ethernet1/1
ntp trusted-key 3
ntp access-group peer a1
";

    fn resource() -> NtpGlobalResource {
        NtpGlobalResource::new().unwrap()
    }

    fn commands(want: Option<serde_json::Value>, have: &str, state: State) -> Vec<String> {
        let resource = resource();
        let have = resource.parse_facts(have).unwrap();
        let want = want.map(|w| resource.validate_config(&w).unwrap());
        resource
            .generate_commands(want.as_ref(), &have, state)
            .unwrap()
    }

    #[test]
    fn test_parse_facts() {
        let facts = resource().parse_facts(RUNNING).unwrap();
        assert_eq!(
            facts,
            json!({
                "authenticate": true,
                "authentication_keys": [{"id": 10, "key": "wawyhanx2", "encryption": 7}],
                "logging": true,
                "master": {"stratum": 8},
                "peers": [{
                    "peer": "192.0.2.1", "prefer": true, "vrf": "default",
                    "key_id": 1, "minpoll": 4, "maxpoll": 6
                }],
                "servers": [
                    {"server": "192.0.2.2", "vrf": "management", "key_id": 2},
                    {"server": "203.0.113.5"}
                ],
                "source": "198.51.100.1",
                "source_interface": "Ethernet1/1",
                "trusted_keys": [{"key_id": 3}]
            })
        );
    }

    #[test]
    fn test_gathered_is_idempotent_for_every_state() {
        let facts = resource().parse_facts(RUNNING).unwrap();
        for state in [State::Merged, State::Replaced, State::Overridden] {
            assert!(
                commands(Some(facts.clone()), RUNNING, state).is_empty(),
                "{}",
                state
            );
        }
    }

    #[test]
    fn test_merged() {
        let want = json!({
            "passive": true,
            "master": {"stratum": 4},
            "servers": [{"server": "198.51.100.10", "prefer": true}]
        });
        assert_eq!(
            commands(Some(want), RUNNING, State::Merged),
            vec![
                "ntp master 4",
                "ntp passive",
                "ntp server 198.51.100.10 prefer",
            ]
        );
    }

    #[test]
    fn test_merged_updates_existing_server() {
        let want = json!({"servers": [{"server": "203.0.113.5", "key_id": 4}]});
        assert_eq!(
            commands(Some(want), RUNNING, State::Merged),
            vec!["ntp server 203.0.113.5 key 4"]
        );
    }

    #[test]
    fn test_overridden_servers() {
        let have = "ntp server 192.0.2.10\nntp server 192.0.2.11\n";
        let want = json!({"servers": [{"server": "192.0.2.11"}, {"server": "192.0.2.12"}]});
        assert_eq!(
            commands(Some(want), have, State::Overridden),
            vec!["ntp server 192.0.2.12", "no ntp server 192.0.2.10"]
        );
    }

    #[test]
    fn test_replaced() {
        let want = json!({
            "logging": true,
            "servers": [{"server": "203.0.113.5"}],
            "trusted_keys": [{"key_id": 3}, {"key_id": 4}]
        });
        assert_eq!(
            commands(Some(want), RUNNING, State::Replaced),
            vec![
                "no ntp authenticate",
                "no ntp master",
                "no ntp source 198.51.100.1",
                "no ntp source-interface Ethernet1/1",
                "no ntp authentication-key 10 md5 wawyhanx2 7",
                "no ntp peer 192.0.2.1 prefer use-vrf default key 1 minpoll 4 maxpoll 6",
                "no ntp server 192.0.2.2 use-vrf management key 2",
                "ntp trusted-key 4",
            ]
        );
    }

    #[test]
    fn test_deleted() {
        let deleted = commands(None, RUNNING, State::Deleted);
        assert_eq!(deleted.len(), 10);
        assert!(deleted.iter().all(|c| c.starts_with("no ntp ")));
        assert!(commands(None, "", State::Deleted).is_empty());
    }

    #[test]
    fn test_rendered() {
        let want = json!({
            "authenticate": true,
            "authentication_keys": [{"id": 1, "key": "abc"}],
            "peers": [{"peer": "192.0.2.7", "vrf": 5}]
        });
        assert_eq!(
            commands(Some(want), "", State::Rendered),
            vec![
                "ntp authenticate",
                "ntp authentication-key 1 md5 abc 7",
                "ntp peer 192.0.2.7 use-vrf 5",
            ]
        );
    }

    #[test]
    fn test_validate_config() {
        let resource = resource();
        let normalized = resource
            .validate_config(&json!({"servers": [{"server": "a", "prefer": false}]}))
            .unwrap();
        assert_eq!(normalized, json!({"servers": [{"server": "a"}]}));

        assert!(resource.validate_config(&json!({"servers": [{"prefer": true}]})).is_err());
        assert!(resource.validate_config(&json!({"master": {"stratum": 300}})).is_err());
        assert!(resource.validate_config(&json!({"ntp": true})).is_err());
    }
}
