//! Common helpers shared by the network resources
//!
//! Facts travel through [`Resource`](crate::modules::Resource) as JSON in
//! each resource's user-facing schema, where entities are lists. Inside a
//! resource they are converted to [`ConfigValue`] trees with those lists
//! keyed by their natural keys, which is the form the template engine
//! produces and the compare engine reconciles.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::{keyed_to_list, list_to_keyed, remove_empties, ConfigMap, ConfigValue};

/// Check `config` against the typed schema `T` and return it normalized.
///
/// Unknown fields, wrong types and missing required fields are reported as
/// validation errors naming the resource.
pub fn validate_schema<T>(resource: &str, config: &serde_json::Value) -> Result<serde_json::Value>
where
    T: DeserializeOwned + Serialize,
{
    let typed: T =
        serde_json::from_value(config.clone()).map_err(|e| Error::validation(resource, e.to_string()))?;
    Ok(serde_json::to_value(typed)?)
}

/// Convert optional JSON into a tree, treating absence as an empty map
pub fn config_value(value: Option<&serde_json::Value>) -> ConfigValue {
    value
        .and_then(ConfigValue::from_json)
        .unwrap_or_else(ConfigValue::empty_map)
}

/// Entities of the list at `path`, keyed by `key_fields`
pub fn keyed_entries(value: &ConfigValue, path: &str, key_fields: &[&str]) -> ConfigMap {
    list_to_keyed(value.get_path(path), key_fields)
}

/// Replace the list at `path` by its keyed form, in place
pub fn key_list_at(value: &mut ConfigValue, path: &str, key_fields: &[&str]) {
    if value.get_path(path).is_some() {
        let keyed = keyed_entries(value, path, key_fields);
        value.set_path(path, ConfigValue::Map(keyed));
    }
}

/// Replace the keyed map at `path` by a list of its entries, in place
pub fn unkey_map_at(value: &mut ConfigValue, path: &str) {
    if let Some(ConfigValue::Map(keyed)) = value.get_path(path) {
        let list = keyed_to_list(keyed);
        value.set_path(path, list);
    }
}

/// Keyed entries under `path`, empty when absent
pub fn entries_at<'a>(value: &'a ConfigValue, path: &str) -> std::borrow::Cow<'a, ConfigMap> {
    match value.get_path(path).and_then(ConfigValue::as_map) {
        Some(map) => std::borrow::Cow::Borrowed(map),
        None => std::borrow::Cow::Owned(ConfigMap::new()),
    }
}

/// Prune empties and convert to JSON; an empty tree becomes `{}`
pub fn facts_json(value: &ConfigValue) -> serde_json::Value {
    remove_empties(value)
        .map(|v| v.to_json())
        .unwrap_or_else(|| serde_json::json!({}))
}

/// Deserialize a string that may have been written as a number
pub fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Str(s) if s.trim().is_empty() => Err(de::Error::custom("value must not be empty")),
        Raw::Str(s) => Ok(s),
        Raw::Int(n) => Ok(n.to_string()),
    }
}

/// Optional variant of [`string_or_number`]
pub fn opt_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrap(#[serde(deserialize_with = "string_or_number")] String);

    Option::<Wrap>::deserialize(deserializer).map(|w| w.map(|Wrap(s)| s))
}
