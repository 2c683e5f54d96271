//! Structured configuration values
//!
//! Facts parsed from a device and configuration supplied by the operator are
//! both represented as a [`ConfigValue`] tree. The tree is an explicit sum type
//! so merge and comparison logic can match exhaustively on its shape.
//!
//! Paths into a tree are dotted strings (`"maximum_paths.ibgp.parallel_paths"`).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered mapping used for every map node in a [`ConfigValue`] tree.
pub type ConfigMap = IndexMap<String, ConfigValue>;

/// A leaf value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Str(s) => write!(f, "{}", s),
        }
    }
}

/// A node in a structured configuration tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Scalar(Scalar),
    List(Vec<ConfigValue>),
    Map(ConfigMap),
}

impl Default for ConfigValue {
    fn default() -> Self {
        ConfigValue::Map(ConfigMap::new())
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for ConfigValue {
    fn from(n: i64) -> Self {
        ConfigValue::Scalar(Scalar::Int(n))
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Scalar(Scalar::Str(s.to_string()))
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Scalar(Scalar::Str(s))
    }
}

impl From<ConfigMap> for ConfigValue {
    fn from(map: ConfigMap) -> Self {
        ConfigValue::Map(map)
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(list: Vec<ConfigValue>) -> Self {
        ConfigValue::List(list)
    }
}

impl ConfigValue {
    /// An empty map node
    pub fn empty_map() -> Self {
        ConfigValue::Map(ConfigMap::new())
    }

    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut ConfigMap> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Scalar(Scalar::Int(n)) => Some(*n),
            ConfigValue::Scalar(Scalar::Str(s)) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, ConfigValue::Scalar(Scalar::Bool(_)))
    }

    /// True for empty maps and empty lists
    pub fn is_empty(&self) -> bool {
        match self {
            ConfigValue::Map(m) => m.is_empty(),
            ConfigValue::List(l) => l.is_empty(),
            ConfigValue::Scalar(_) => false,
        }
    }

    /// Text usable as a map key
    pub fn key_text(&self) -> Option<String> {
        match self {
            ConfigValue::Scalar(s) => Some(s.to_string()),
            _ => None,
        }
    }

    /// Look up a dotted path
    pub fn get_path(&self, path: &str) -> Option<&ConfigValue> {
        let mut current = self;
        for segment in path.split('.') {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    /// Write `value` at a dotted path, creating intermediate maps.
    ///
    /// Non-map nodes found along the path are replaced by maps.
    pub fn set_path(&mut self, path: &str, value: ConfigValue) {
        let mut segments = path.split('.').peekable();
        let mut current = self;
        while let Some(segment) = segments.next() {
            if !matches!(current, ConfigValue::Map(_)) {
                *current = ConfigValue::empty_map();
            }
            let ConfigValue::Map(map) = current else {
                unreachable!("node was just replaced by a map")
            };
            if segments.peek().is_none() {
                map.insert(segment.to_string(), value);
                return;
            }
            current = map
                .entry(segment.to_string())
                .or_insert_with(ConfigValue::empty_map);
        }
    }

    /// Remove and return the value at a dotted path
    pub fn remove_path(&mut self, path: &str) -> Option<ConfigValue> {
        match path.rsplit_once('.') {
            Some((parent, leaf)) => self
                .get_path_mut(parent)?
                .as_map_mut()?
                .shift_remove(leaf),
            None => self.as_map_mut()?.shift_remove(path),
        }
    }

    fn get_path_mut(&mut self, path: &str) -> Option<&mut ConfigValue> {
        let mut current = self;
        for segment in path.split('.') {
            current = current.as_map_mut()?.get_mut(segment)?;
        }
        Some(current)
    }

    /// Convert from JSON, dropping `null` members.
    ///
    /// Returns `None` for `null` itself. Non-integral numbers are kept as text.
    pub fn from_json(value: &serde_json::Value) -> Option<ConfigValue> {
        use serde_json::Value;
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(ConfigValue::from(*b)),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => ConfigValue::from(i),
                None => ConfigValue::from(n.to_string()),
            }),
            Value::String(s) => Some(ConfigValue::from(s.as_str())),
            Value::Array(items) => Some(ConfigValue::List(
                items.iter().filter_map(ConfigValue::from_json).collect(),
            )),
            Value::Object(members) => Some(ConfigValue::Map(
                members
                    .iter()
                    .filter_map(|(k, v)| ConfigValue::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            ConfigValue::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            ConfigValue::Scalar(Scalar::Int(n)) => Value::from(*n),
            ConfigValue::Scalar(Scalar::Str(s)) => Value::String(s.clone()),
            ConfigValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            ConfigValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Deep-merge `other` over `base`.
///
/// Maps merge key by key, lists are unioned preserving `base` order, and
/// for anything else `other` wins.
pub fn deep_merge(base: &ConfigValue, other: &ConfigValue) -> ConfigValue {
    match (base, other) {
        (ConfigValue::Map(b), ConfigValue::Map(o)) => ConfigValue::Map(merge_maps(b, o)),
        (ConfigValue::List(b), ConfigValue::List(o)) => {
            let mut merged = b.clone();
            for item in o {
                if !merged.contains(item) {
                    merged.push(item.clone());
                }
            }
            ConfigValue::List(merged)
        }
        (_, o) => o.clone(),
    }
}

/// Map-level variant of [`deep_merge`]
pub fn merge_maps(base: &ConfigMap, other: &ConfigMap) -> ConfigMap {
    let mut merged = base.clone();
    merge_into(&mut merged, other);
    merged
}

/// Merge `other` into `target` in place
pub fn merge_into(target: &mut ConfigMap, other: &ConfigMap) {
    for (key, value) in other {
        match target.get_mut(key) {
            Some(existing) => {
                let merged = deep_merge(existing, value);
                *existing = merged;
            }
            None => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Recursively drop empty maps and lists.
///
/// Returns `None` when the value itself ends up empty.
pub fn remove_empties(value: &ConfigValue) -> Option<ConfigValue> {
    match value {
        ConfigValue::Map(map) => {
            let pruned: ConfigMap = map
                .iter()
                .filter_map(|(k, v)| remove_empties(v).map(|v| (k.clone(), v)))
                .collect();
            (!pruned.is_empty()).then_some(ConfigValue::Map(pruned))
        }
        ConfigValue::List(items) => {
            let pruned: Vec<ConfigValue> = items.iter().filter_map(remove_empties).collect();
            (!pruned.is_empty()).then_some(ConfigValue::List(pruned))
        }
        scalar => Some(scalar.clone()),
    }
}

/// Index a list of maps by the text of one or more key fields.
///
/// Multiple key fields are joined with `_`; a missing field contributes
/// nothing. Entries without any key field are skipped.
pub fn list_to_keyed(list: Option<&ConfigValue>, key_fields: &[&str]) -> ConfigMap {
    let mut keyed = ConfigMap::new();
    let Some(items) = list.and_then(ConfigValue::as_list) else {
        return keyed;
    };
    for item in items {
        let parts: Vec<String> = key_fields
            .iter()
            .filter_map(|field| item.get_path(field).and_then(ConfigValue::key_text))
            .collect();
        if parts.is_empty() {
            continue;
        }
        keyed.insert(parts.join("_"), item.clone());
    }
    keyed
}

/// Flatten a keyed map back to a list, preserving insertion order
pub fn keyed_to_list(keyed: &ConfigMap) -> ConfigValue {
    ConfigValue::List(keyed.values().cloned().collect())
}
