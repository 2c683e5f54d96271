//! BGP address family resource
//!
//! Manages the `address-family` blocks under `router bgp`, both global and
//! per VRF. Neighbor address families are left to a neighbor resource and
//! skipped while gathering facts.
//!
//! Facts look like:
//!
//! ```yaml
//! as_number: "65563"
//! address_family:
//!   - afi: ipv4
//!     safi: unicast
//!     default_metric: 400
//!     networks:
//!       - prefix: 192.0.2.0/24
//!         route_map: rmap1
//!   - afi: ipv4
//!     safi: unicast
//!     vrf: site-1
//!     maximum_paths:
//!       ibgp:
//!         parallel_paths: 12
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::common::{
    config_value, entries_at, facts_json, key_list_at, opt_string_or_number, string_or_number,
    unkey_map_at, validate_schema,
};
use crate::diff::ResourceModule;
use crate::error::{Error, Result};
use crate::modules::{Resource, State};
use crate::parser::{Expr, NetworkTemplate, Rule, Shape};
use crate::value::{deep_merge, ConfigMap, ConfigValue};

/// Natural key of an address family
const AF_KEY: &[&str] = &["afi", "safi", "vrf"];

const PARSERS: &[&str] = &[
    "default_information",
    "default_metric",
    "maximum_paths",
    "maximum_paths_ibgp",
];

/// Keyed collections inside an address family: (path and rule name, key)
const LISTS: &[(&str, &[&str])] = &[
    ("networks", &["prefix"]),
    ("redistribute", &["protocol", "id"]),
];

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct BgpAddressFamilyConfig {
    #[serde(deserialize_with = "string_or_number")]
    as_number: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    address_family: Vec<AddressFamily>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Afi {
    Ipv4,
    Ipv6,
    L2vpn,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum Safi {
    Unicast,
    Multicast,
    Evpn,
    Mvpn,
    LabeledUnicast,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct AddressFamily {
    afi: Afi,
    safi: Safi,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vrf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_information: Option<DefaultInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_metric: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    maximum_paths: Option<MaximumPaths>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    networks: Vec<Network>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    redistribute: Vec<Redistribute>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefaultInformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    originate: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MaximumPaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parallel_paths: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ibgp: Option<IbgpPaths>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct IbgpPaths {
    parallel_paths: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Network {
    prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    route_map: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Redistribute {
    protocol: String,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    id: Option<String>,
    route_map: String,
}

/// Shape of an address family child, keyed like the family itself
fn af_shape(inner: Shape) -> Shape {
    Shape::at(
        "address_family",
        Shape::keyed(
            Expr::join(AF_KEY.iter().map(|f| Expr::field(f)), "_"),
            inner,
        ),
    )
}

fn template() -> Result<NetworkTemplate> {
    NetworkTemplate::new(vec![
        Rule::builder("as_number")
            .pattern(r"^router bgp (?P<as_number>\S+)$")
            .setval("router bgp {{ as_number }}")
            .result(Shape::fields([("as_number", Expr::field("as_number"))]))
            .shared()
            .build()?,
        Rule::builder("address_family")
            .pattern(r"^\s*(?:vrf (?P<vrf>\S+) )?address-family (?P<afi>\S+) (?P<safi>\S+)$")
            .setval("address-family {{ afi }} {{ safi }}")
            .result(af_shape(Shape::fields([
                ("afi", Expr::field("afi")),
                ("safi", Expr::field("safi")),
                ("vrf", Expr::field("vrf")),
            ])))
            .shared()
            .build()?,
        Rule::builder("default_information")
            .pattern(r"^\s+default-information originate$")
            .setval("default-information originate")
            .compval("default_information.originate")
            .result(af_shape(Shape::at(
                "default_information",
                Shape::fields([("originate", Expr::lit(true))]),
            )))
            .build()?,
        Rule::builder("default_metric")
            .pattern(r"^\s+default-metric (?P<default_metric>\d+)$")
            .setval("default-metric {{ default_metric }}")
            .result(af_shape(Shape::fields([(
                "default_metric",
                Expr::int("default_metric"),
            )])))
            .build()?,
        Rule::builder("maximum_paths")
            .pattern(r"^\s+maximum-paths (?P<parallel_paths>\d+)$")
            .setval("maximum-paths {{ maximum_paths.parallel_paths }}")
            .compval("maximum_paths.parallel_paths")
            .result(af_shape(Shape::at(
                "maximum_paths",
                Shape::fields([("parallel_paths", Expr::int("parallel_paths"))]),
            )))
            .build()?,
        Rule::builder("maximum_paths_ibgp")
            .pattern(r"^\s+maximum-paths ibgp (?P<parallel_paths>\d+)$")
            .setval("maximum-paths ibgp {{ maximum_paths.ibgp.parallel_paths }}")
            .compval("maximum_paths.ibgp.parallel_paths")
            .result(af_shape(Shape::at(
                "maximum_paths.ibgp",
                Shape::fields([("parallel_paths", Expr::int("parallel_paths"))]),
            )))
            .build()?,
        Rule::builder("networks")
            .pattern(r"^\s+network (?P<prefix>\S+)(?:\s+route-map (?P<route_map>\S+))?$")
            .setval("network {{ prefix }}{% if route_map is defined %} route-map {{ route_map }}{% endif %}")
            .result(af_shape(Shape::at(
                "networks",
                Shape::keyed(
                    Expr::field("prefix"),
                    Shape::fields([
                        ("prefix", Expr::field("prefix")),
                        ("route_map", Expr::field("route_map")),
                    ]),
                ),
            )))
            .build()?,
        Rule::builder("redistribute")
            .pattern(r"^\s+redistribute (?P<protocol>\S+)(?:\s+(?P<id>\S+))?\s+route-map (?P<route_map>\S+)$")
            .setval("redistribute {{ protocol }}{% if id is defined %} {{ id }}{% endif %} route-map {{ route_map }}")
            .result(af_shape(Shape::at(
                "redistribute",
                Shape::keyed(
                    Expr::join([Expr::field("protocol"), Expr::field("id")], "_"),
                    Shape::fields([
                        ("protocol", Expr::field("protocol")),
                        ("id", Expr::field("id")),
                        ("route_map", Expr::field("route_map")),
                    ]),
                ),
            )))
            .build()?,
    ])
}

/// Rewrite `router bgp` output so every address family is a top-level
/// context of its own.
///
/// `vrf` lines are folded into the `address-family` lines below them, which
/// move up to the `vrf` line's indentation. `neighbor` blocks are dropped.
fn flatten(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut vrf: Option<(usize, String)> = None;
    let mut skip_below: Option<usize> = None;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }
        let indent = line.len() - trimmed.len();

        if let Some(depth) = skip_below {
            if indent > depth {
                continue;
            }
            skip_below = None;
        }
        if vrf.as_ref().is_some_and(|(depth, _)| indent <= *depth) {
            vrf = None;
        }

        if trimmed.starts_with("neighbor ") {
            skip_below = Some(indent);
        } else if let Some(name) = trimmed.strip_prefix("vrf ") {
            vrf = Some((indent, name.trim().to_string()));
        } else {
            match &vrf {
                Some((depth, name)) if trimmed.starts_with("address-family ") => {
                    lines.push(format!("{}vrf {} {}", " ".repeat(*depth), name, trimmed));
                }
                _ => lines.push(line.to_string()),
            }
        }
    }
    lines
}

fn vrf_of(entry: &ConfigValue) -> Option<&str> {
    entry.get_path("vrf").and_then(ConfigValue::as_str)
}

fn asn_of(tree: &ConfigValue) -> Option<String> {
    tree.get_path("as_number").and_then(ConfigValue::key_text)
}

/// Convert user-facing facts into the keyed form the compare engine uses
fn keyed_tree(value: Option<&serde_json::Value>) -> ConfigValue {
    let mut tree = config_value(value);
    key_list_at(&mut tree, "address_family", AF_KEY);
    if let Some(ConfigValue::Map(families)) = tree
        .as_map_mut()
        .and_then(|m| m.get_mut("address_family"))
    {
        for family in families.values_mut() {
            for (path, key) in LISTS {
                key_list_at(family, path, key);
            }
        }
    }
    tree
}

/// Resource for BGP address families
#[derive(Debug)]
pub struct BgpAddressFamilyResource {
    template: NetworkTemplate,
}

impl BgpAddressFamilyResource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            template: template()?,
        })
    }

    /// Commands for one address family present in `want`
    fn compare_family(
        &self,
        module: &mut ResourceModule<'_>,
        want: &ConfigValue,
        have: Option<&ConfigValue>,
    ) -> Result<()> {
        let Some(header) = self.template.render(want, "address_family", false)? else {
            return Ok(());
        };
        let empty = ConfigValue::empty_map();
        let have = have.unwrap_or(&empty);

        // A new family is configuration in its own right.
        module.in_contexts(vec![header], have.is_empty(), |m| {
            m.compare(PARSERS, want, have)?;
            for (path, _) in LISTS {
                m.compare_list_entries(path, &entries_at(want, path), &entries_at(have, path))?;
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Updates and removals of the families that belong to `vrf`
    fn compare_vrf(
        &self,
        module: &mut ResourceModule<'_>,
        vrf: Option<&str>,
        updates: &[(&ConfigValue, Option<&ConfigValue>)],
        removals: &[&ConfigValue],
    ) -> Result<()> {
        for (want, have) in updates.iter().filter(|(w, _)| vrf_of(w) == vrf) {
            self.compare_family(module, want, *have)?;
        }
        for have in removals.iter().filter(|h| vrf_of(h) == vrf) {
            module.addcmd(have, "address_family", true)?;
        }
        Ok(())
    }
}

impl Resource for BgpAddressFamilyResource {
    fn name(&self) -> &'static str {
        "bgp_address_family"
    }

    fn description(&self) -> &'static str {
        "Manage BGP address family configuration, globally and per VRF"
    }

    fn supported_states(&self) -> &'static [State] {
        &State::ALL
    }

    fn facts_query(&self) -> &'static str {
        "show running-config | section \"^router bgp\""
    }

    fn parse_facts(&self, text: &str) -> Result<serde_json::Value> {
        let lines = flatten(text);
        let mut tree = self.template.parse_lines(lines.iter().map(String::as_str));
        if let Some(ConfigValue::Map(families)) = tree
            .as_map_mut()
            .and_then(|m| m.get_mut("address_family"))
        {
            for family in families.values_mut() {
                for (path, _) in LISTS {
                    unkey_map_at(family, path);
                }
            }
        }
        unkey_map_at(&mut tree, "address_family");
        Ok(facts_json(&tree))
    }

    fn validate_config(&self, config: &serde_json::Value) -> Result<serde_json::Value> {
        validate_schema::<BgpAddressFamilyConfig>(self.name(), config)
    }

    fn generate_commands(
        &self,
        want: Option<&serde_json::Value>,
        have: &serde_json::Value,
        state: State,
    ) -> Result<Vec<String>> {
        let want = keyed_tree(want);
        let have = keyed_tree(Some(have));
        let want_asn = asn_of(&want);
        let have_asn = asn_of(&have);

        if let (Some(w), Some(h)) = (&want_asn, &have_asn) {
            if w != h {
                if matches!(state, State::Deleted | State::Purged) {
                    warn!(have = %h, want = %w, %state, "ASN mismatch, leaving BGP untouched");
                    return Ok(Vec::new());
                }
                return Err(Error::AsnMismatch {
                    have: h.clone(),
                    want: w.clone(),
                });
            }
        }
        let Some(asn) = want_asn.or_else(|| have_asn.clone()) else {
            return Ok(Vec::new());
        };

        let mut module = ResourceModule::new(&self.template, state);
        if state == State::Purged {
            if have_asn.is_some() {
                module.addcmd(&have, "as_number", true)?;
            }
            return Ok(module.into_commands());
        }

        let haved: ConfigMap = entries_at(&have, "address_family").into_owned();
        let mut wantd: ConfigMap = entries_at(&want, "address_family").into_owned();
        if state == State::Merged {
            for (key, entry) in wantd.iter_mut() {
                if let Some(existing) = haved.get(key) {
                    *entry = deep_merge(existing, entry);
                }
            }
        }

        let removals: Vec<&ConfigValue> = match state {
            State::Deleted if wantd.is_empty() => haved.values().collect(),
            State::Deleted => haved
                .iter()
                .filter(|(key, _)| wantd.contains_key(*key))
                .map(|(_, entry)| entry)
                .collect(),
            State::Overridden => haved
                .iter()
                .filter(|(key, _)| !wantd.contains_key(*key))
                .map(|(_, entry)| entry)
                .collect(),
            _ => Vec::new(),
        };
        let updates: Vec<(&ConfigValue, Option<&ConfigValue>)> = if state == State::Deleted {
            Vec::new()
        } else {
            wantd.iter().map(|(key, entry)| (entry, haved.get(key))).collect()
        };

        // Default VRF first so its families are not entered from a vrf context.
        let mut vrfs: Vec<Option<&str>> = vec![None];
        for entry in updates.iter().map(|(w, _)| *w).chain(removals.iter().copied()) {
            let vrf = vrf_of(entry);
            if !vrfs.contains(&vrf) {
                vrfs.push(vrf);
            }
        }
        debug!(%asn, updates = updates.len(), removals = removals.len(), %state, "comparing address families");

        module.in_context(format!("router bgp {}", asn), |m| {
            for vrf in vrfs.iter().copied() {
                match vrf {
                    Some(name) => {
                        m.in_context(format!("vrf {}", name), |m| {
                            self.compare_vrf(m, Some(name), &updates, &removals)
                        })?;
                    }
                    None => self.compare_vrf(m, None, &updates, &removals)?,
                }
            }
            Ok(())
        })?;
        Ok(module.into_commands())
    }
}
