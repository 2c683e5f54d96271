//! Fibre Channel interfaces resource
//!
//! Manages `interface fcN/M` and `interface vfcN` blocks of an NX-OS/MDS
//! configuration.
//!
//! Two details set this resource apart from a flat key/value diff:
//!
//! - Interfaces have device defaults (`speed auto`, `mode auto`,
//!   `trunk mode on`, `shutdown`) that never appear in the running
//!   configuration. Facts are backfilled with them, and the removing states
//!   reset attributes missing from `want` to them instead of negating.
//! - The running configuration spells analytics as two independent lines,
//!   `analytics type fc-scsi` and `analytics type fc-nvme`, or as the
//!   `analytics type fc-all` shorthand; facts fold them into one `analytics`
//!   value and changes follow [`analytics_transition`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::common::{config_value, facts_json, opt_string_or_number, validate_schema};
use crate::diff::ResourceModule;
use crate::error::{Error, Result};
use crate::modules::{Resource, State};
use crate::parser::{Expr, NetworkTemplate, Rule, Shape};
use crate::value::{deep_merge, list_to_keyed, ConfigMap, ConfigValue};

static INTERFACE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(fc\d+/\d+|vfc\d+)$").expect("Invalid interface name regex"));

const PARSERS: &[&str] = &["description", "speed", "mode", "trunk_mode", "shutdown"];

const ANALYTICS_SCSI: &str = "fc-scsi";
const ANALYTICS_NVME: &str = "fc-nvme";
const ANALYTICS_ALL: &str = "fc-all";

/// Analytics commands taking an interface from `have` to `want`.
///
/// Values are `fc-scsi`, `fc-nvme`, `fc-all` or empty for none. Going from
/// none to `fc-scsi` emits `analytics type fc-all`.
// TODO: confirm on MDS hardware whether none -> fc-scsi should send
// `analytics type fc-scsi` instead.
pub fn analytics_transition(want: &str, have: &str) -> &'static [&'static str] {
    match (want, have) {
        (w, h) if w == h => &[],
        ("", ANALYTICS_SCSI) => &["no analytics type fc-scsi"],
        ("", ANALYTICS_NVME) => &["no analytics type fc-nvme"],
        ("", ANALYTICS_ALL) => &["no analytics type fc-all"],
        (ANALYTICS_SCSI, "") => &["analytics type fc-all"],
        (ANALYTICS_SCSI, ANALYTICS_NVME) => &["no analytics type fc-nvme", "analytics type fc-scsi"],
        (ANALYTICS_SCSI, ANALYTICS_ALL) => &["no analytics type fc-nvme"],
        (ANALYTICS_NVME, "") => &["analytics type fc-nvme"],
        (ANALYTICS_NVME, ANALYTICS_SCSI) => &["no analytics type fc-scsi", "analytics type fc-nvme"],
        (ANALYTICS_NVME, ANALYTICS_ALL) => &["no analytics type fc-scsi"],
        (ANALYTICS_ALL, _) => &["analytics type fc-all"],
        _ => &[],
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum Analytics {
    #[serde(rename = "fc-scsi")]
    Scsi,
    #[serde(rename = "fc-nvme")]
    Nvme,
    #[serde(rename = "fc-all")]
    All,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TrunkMode {
    On,
    Off,
    Auto,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct FcInterface {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    speed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trunk_mode: Option<TrunkMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shutdown: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    analytics: Option<Analytics>,
}

/// Attribute defaults of an interface
fn defaults() -> [(&'static str, ConfigValue); 4] {
    [
        ("speed", ConfigValue::from("auto")),
        ("mode", ConfigValue::from("auto")),
        ("trunk_mode", ConfigValue::from("on")),
        ("shutdown", ConfigValue::from(true)),
    ]
}

/// Fill missing attributes of an interface entry with their defaults
fn with_defaults(entry: &ConfigValue) -> ConfigValue {
    let mut entry = entry.clone();
    if let Some(map) = entry.as_map_mut() {
        for (key, value) in defaults() {
            map.entry(key.to_string()).or_insert(value);
        }
    }
    entry
}

/// An interface entry holding nothing but its name and the defaults
fn reset_entry(name: &str) -> ConfigValue {
    let mut map = ConfigMap::new();
    map.insert("name".to_string(), ConfigValue::from(name));
    with_defaults(&ConfigValue::Map(map))
}

fn interface_shape(entries: Shape) -> Shape {
    Shape::keyed(Expr::field("name"), entries)
}

fn template() -> Result<NetworkTemplate> {
    NetworkTemplate::new(vec![
        Rule::builder("name")
            .pattern(r"^interface (?P<name>(fc\d+/\d+|vfc\d+))$")
            .setval("interface {{ name }}")
            .result(interface_shape(Shape::fields([("name", Expr::field("name"))])))
            .shared()
            .build()?,
        Rule::builder("description")
            .pattern(r"^\s+switchport description (?P<description>.+?)\s*$")
            .setval("switchport description {{ description }}")
            .result(interface_shape(Shape::fields([(
                "description",
                Expr::field("description"),
            )])))
            .build()?,
        Rule::builder("speed")
            .pattern(r"^\s+switchport speed (?P<speed>\S+)$")
            .setval("switchport speed {{ speed }}")
            .result(interface_shape(Shape::fields([("speed", Expr::field("speed"))])))
            .build()?,
        Rule::builder("trunk_mode")
            .pattern(r"^\s+switchport trunk mode (?P<trunk_mode>\S+)$")
            .setval("switchport trunk mode {{ trunk_mode }}")
            .result(interface_shape(Shape::fields([(
                "trunk_mode",
                Expr::field("trunk_mode"),
            )])))
            .build()?,
        Rule::builder("mode")
            .pattern(r"^\s+switchport mode (?P<mode>\S+)$")
            .setval("switchport mode {{ mode }}")
            .result(interface_shape(Shape::fields([("mode", Expr::field("mode"))])))
            .build()?,
        Rule::builder("shutdown")
            .pattern(r"^\s+(?P<negate>no\s+)?shutdown$")
            .setval("shutdown")
            .result(interface_shape(Shape::fields([(
                "shutdown",
                Expr::when("negate", Expr::lit(false), Expr::lit(true)),
            )])))
            .build()?,
        Rule::builder("analytics_all")
            .pattern(r"^\s+analytics type fc-all$")
            .setval("analytics type fc-all")
            .result(interface_shape(Shape::fields([
                ("analytics_scsi", Expr::lit(true)),
                ("analytics_nvme", Expr::lit(true)),
            ])))
            .build()?,
        Rule::builder("analytics_scsi")
            .pattern(r"^\s+analytics type fc-scsi$")
            .setval("analytics type fc-scsi")
            .result(interface_shape(Shape::fields([("analytics_scsi", Expr::lit(true))])))
            .build()?,
        Rule::builder("analytics_nvme")
            .pattern(r"^\s+analytics type fc-nvme$")
            .setval("analytics type fc-nvme")
            .result(interface_shape(Shape::fields([("analytics_nvme", Expr::lit(true))])))
            .build()?,
    ])
}

/// Fold raw analytics flags and backfill defaults
fn post_process(entry: &ConfigValue) -> ConfigValue {
    let mut entry = with_defaults(entry);
    let Some(map) = entry.as_map_mut() else {
        return entry;
    };
    let scsi = map.shift_remove("analytics_scsi").is_some();
    let nvme = map.shift_remove("analytics_nvme").is_some();
    let analytics = match (scsi, nvme) {
        (true, true) => Some(ANALYTICS_ALL),
        (true, false) => Some(ANALYTICS_SCSI),
        (false, true) => Some(ANALYTICS_NVME),
        (false, false) => None,
    };
    if let Some(value) = analytics {
        map.insert("analytics".to_string(), ConfigValue::from(value));
    }
    entry
}

/// Resource for Fibre Channel interfaces
#[derive(Debug)]
pub struct FcInterfacesResource {
    template: NetworkTemplate,
}

impl FcInterfacesResource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            template: template()?,
        })
    }

    /// Commands for one interface, inside its `interface` context
    fn compare_interface(&self, module: &mut ResourceModule<'_>, want: &ConfigValue, have: &ConfigValue) -> Result<()> {
        let Some(name) = want
            .get_path("name")
            .or_else(|| have.get_path("name"))
            .and_then(ConfigValue::as_str)
        else {
            return Ok(());
        };

        module.in_context(format!("interface {}", name), |m| {
            m.compare(PARSERS, want, have)?;
            let analytics = |v: &ConfigValue| {
                v.get_path("analytics")
                    .and_then(ConfigValue::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            for command in analytics_transition(&analytics(want), &analytics(have)) {
                m.push(*command);
            }
            Ok(())
        })?;
        Ok(())
    }
}

impl Resource for FcInterfacesResource {
    fn name(&self) -> &'static str {
        "fc_interfaces"
    }

    fn description(&self) -> &'static str {
        "Manage Fibre Channel interface configuration"
    }

    fn facts_query(&self) -> &'static str {
        "show running-config interface"
    }

    fn parse_facts(&self, text: &str) -> Result<serde_json::Value> {
        let parsed = self.template.parse(text);
        let interfaces = parsed
            .as_map()
            .map(|m| m.values().map(|entry| facts_json(&post_process(entry))).collect())
            .unwrap_or_default();
        Ok(serde_json::Value::Array(interfaces))
    }

    fn validate_config(&self, config: &serde_json::Value) -> Result<serde_json::Value> {
        let normalized = validate_schema::<Vec<FcInterface>>(self.name(), config)?;
        if let Some(interfaces) = normalized.as_array() {
            for name in interfaces.iter().filter_map(|i| i.get("name")?.as_str()) {
                if !INTERFACE_NAME.is_match(name) {
                    return Err(Error::validation(
                        self.name(),
                        format!("'{}' is not a Fibre Channel interface name", name),
                    ));
                }
            }
        }
        Ok(normalized)
    }

    fn generate_commands(
        &self,
        want: Option<&serde_json::Value>,
        have: &serde_json::Value,
        state: State,
    ) -> Result<Vec<String>> {
        let haved = list_to_keyed(Some(&config_value(Some(have))), &["name"]);
        let mut wantd = list_to_keyed(Some(&config_value(want)), &["name"]);

        match state {
            State::Merged | State::Rendered => {
                for (name, entry) in wantd.iter_mut() {
                    if let Some(existing) = haved.get(name) {
                        *entry = deep_merge(existing, entry);
                    }
                }
            }
            State::Replaced | State::Overridden => {
                for entry in wantd.values_mut() {
                    *entry = with_defaults(entry);
                }
            }
            State::Deleted => {
                let targets: Vec<String> = if wantd.is_empty() {
                    haved.keys().cloned().collect()
                } else {
                    wantd.keys().filter(|k| haved.contains_key(*k)).cloned().collect()
                };
                wantd = targets.iter().map(|name| (name.clone(), reset_entry(name))).collect();
            }
            _ => {}
        }

        debug!(interfaces = wantd.len(), %state, "comparing interfaces");
        let mut module = ResourceModule::new(&self.template, state);
        module.compare_keyed(&wantd, &haved, state == State::Overridden, |m, wentry, hentry| {
            let name = wentry
                .get_path("name")
                .or_else(|| hentry.get_path("name"))
                .and_then(ConfigValue::as_str)
                .unwrap_or_default();
            // Interfaces missing from the running config sit at their defaults,
            // and overridden resets the ones want does not list.
            let wentry = if wentry.is_empty() {
                reset_entry(name)
            } else {
                wentry.clone()
            };
            let hentry = if hentry.is_empty() && state != State::Rendered {
                reset_entry(name)
            } else {
                hentry.clone()
            };
            self.compare_interface(m, &wentry, &hentry)
        })?;
        Ok(module.into_commands())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const RUNNING: &str = "\
interface fc1/1
  switchport speed 8000
  switchport description uplink to core
  no shutdown
  analytics type fc-scsi
interface fc1/2
  switchport mode E
  switchport trunk mode off
interface fc1/3
  analytics type fc-scsi
  analytics type fc-nvme
  no shutdown
interface Ethernet1/1
  description not fibre channel
  no shutdown
";

    fn resource() -> FcInterfacesResource {
        FcInterfacesResource::new().unwrap()
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
    fn test_parse_facts_folds_analytics_and_backfills() {
        let facts = resource().parse_facts(RUNNING).unwrap();
        assert_eq!(
            facts,
            json!([
                {
                    "name": "fc1/1", "speed": "8000", "description": "uplink to core",
                    "shutdown": false, "analytics": "fc-scsi", "mode": "auto", "trunk_mode": "on"
                },
                {
                    "name": "fc1/2", "mode": "E", "trunk_mode": "off",
                    "speed": "auto", "shutdown": true
                },
                {
                    "name": "fc1/3", "analytics": "fc-all", "shutdown": false,
                    "speed": "auto", "mode": "auto", "trunk_mode": "on"
                }
            ])
        );
        assert_eq!(resource().parse_facts("").unwrap(), json!([]));
    }

    #[test]
    fn test_parse_analytics_shorthand() {
        let facts = resource()
            .parse_facts("interface fc1/4\n  analytics type fc-all\n  no shutdown\n")
            .unwrap();
        assert_eq!(facts[0]["analytics"], json!("fc-all"));
    }

    #[test]
    fn test_analytics_transition_table() {
        let values = ["", "fc-scsi", "fc-nvme", "fc-all"];
        let expected: [[&[&str]; 4]; 4] = [
            // want "": have "", scsi, nvme, all
            [
                &[],
                &["no analytics type fc-scsi"],
                &["no analytics type fc-nvme"],
                &["no analytics type fc-all"],
            ],
            // want fc-scsi
            [
                &["analytics type fc-all"],
                &[],
                &["no analytics type fc-nvme", "analytics type fc-scsi"],
                &["no analytics type fc-nvme"],
            ],
            // want fc-nvme
            [
                &["analytics type fc-nvme"],
                &["no analytics type fc-scsi", "analytics type fc-nvme"],
                &[],
                &["no analytics type fc-scsi"],
            ],
            // want fc-all
            [
                &["analytics type fc-all"],
                &["analytics type fc-all"],
                &["analytics type fc-all"],
                &[],
            ],
        ];
        for (w, want) in values.iter().enumerate() {
            for (h, have) in values.iter().enumerate() {
                assert_eq!(
                    analytics_transition(want, have),
                    expected[w][h],
                    "want={:?} have={:?}",
                    want,
                    have
                );
            }
        }
    }

    #[test]
    fn test_merged_analytics_change() {
        let want = json!([{"name": "fc1/1", "analytics": "fc-nvme"}]);
        assert_eq!(
            commands(Some(want), RUNNING, State::Merged),
            vec![
                "interface fc1/1",
                "no analytics type fc-scsi",
                "analytics type fc-nvme",
            ]
        );
    }

    #[test]
    fn test_merged_attributes() {
        let want = json!([
            {"name": "fc1/2", "description": "isl", "shutdown": false, "speed": 16000},
            {"name": "fc1/3", "mode": "auto"}
        ]);
        assert_eq!(
            commands(Some(want), RUNNING, State::Merged),
            vec![
                "interface fc1/2",
                "switchport description isl",
                "switchport speed 16000",
                "no shutdown",
            ]
        );
    }

    #[test]
    fn test_replaced_resets_to_defaults() {
        let want = json!([{"name": "fc1/1", "description": "uplink to core"}]);
        assert_eq!(
            commands(Some(want), RUNNING, State::Replaced),
            vec![
                "interface fc1/1",
                "switchport speed auto",
                "shutdown",
                "no analytics type fc-scsi",
            ]
        );
    }

    #[test]
    fn test_overridden_resets_unlisted_interfaces() {
        let want = json!([{"name": "fc1/1", "speed": "8000", "description": "uplink to core",
                           "shutdown": false, "analytics": "fc-scsi"}]);
        assert_eq!(
            commands(Some(want), RUNNING, State::Overridden),
            vec![
                "interface fc1/2",
                "switchport mode auto",
                "switchport trunk mode on",
                "interface fc1/3",
                "shutdown",
                "no analytics type fc-all",
            ]
        );
    }

    #[test]
    fn test_deleted_named_and_all() {
        let want = json!([{"name": "fc1/2"}, {"name": "fc9/9"}]);
        assert_eq!(
            commands(Some(want), RUNNING, State::Deleted),
            vec![
                "interface fc1/2",
                "switchport mode auto",
                "switchport trunk mode on",
            ]
        );

        let all = commands(None, RUNNING, State::Deleted);
        assert_eq!(all.iter().filter(|c| c.starts_with("interface ")).count(), 3);
        assert!(all.contains(&"no switchport description uplink to core".to_string()));
    }

    #[test]
    fn test_idempotent_with_gathered_facts() {
        let facts = resource().parse_facts(RUNNING).unwrap();
        for state in [State::Merged, State::Replaced, State::Overridden] {
            assert!(commands(Some(facts.clone()), RUNNING, state).is_empty(), "{}", state);
        }
    }

    #[test]
    fn test_rendered() {
        let want = json!([{"name": "vfc3", "description": "fcoe", "shutdown": false}]);
        assert_eq!(
            commands(Some(want), "", State::Rendered),
            vec!["interface vfc3", "switchport description fcoe", "no shutdown"]
        );
    }

    #[test]
    fn test_validate_config() {
        let resource = resource();
        assert!(resource
            .validate_config(&json!([{"name": "Ethernet1/1"}]))
            .is_err());
        assert!(resource
            .validate_config(&json!([{"name": "fc1/1", "analytics": "fc-other"}]))
            .is_err());
        assert!(resource
            .validate_config(&json!([{"name": "fc1/1", "trunk_mode": "sideways"}]))
            .is_err());
        assert!(resource.validate_config(&json!({"name": "fc1/1"})).is_err());
    }
}
