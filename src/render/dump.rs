// src/render/dump.rs
//! The whole entity graph as JSON, for eyeballing what was collected.

use crate::model::Host;
use serde_json::Value;

/// The host as a JSON tree. Nothing is filtered or renamed.
pub fn to_json(host: &Host) -> Value {
    serde_json::to_value(host).unwrap_or_else(|e| Value::String(e.to_string()))
}

/// Pretty-printed [`to_json`].
pub fn dump(host: &Host) -> String {
    serde_json::to_string_pretty(&to_json(host)).unwrap_or_default()
}
