// src/model.rs
//! The entity graph filled in by one collection pass.
//!
//! Host → Device (by module id, joined to other commands by bus id) →
//! internal interfaces (by port) and external interfaces (by MAC).

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// A metadata value. Text is quoted in line protocol, numbers are not.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Text(String),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Text(s) if s.is_empty())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

pub type Metadata = BTreeMap<String, Value>;
pub type Counters = BTreeMap<String, i64>;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Host {
    pub hostname: String,
    pub meta: Metadata,
    pub devices: Vec<Device>,
}

impl Host {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Self::default()
        }
    }

    /// Adds an empty device. Refuses a module id or bus id that is already
    /// known, since both must stay unique for the bus id join to work.
    pub fn add_device(&mut self, module_id: &str, bus_id: &str) -> bool {
        if let Some(existing) = self
            .devices
            .iter()
            .find(|d| d.module_id == module_id || d.bus_id == bus_id)
        {
            warn!(
                "ignoring module {module_id} at {bus_id}: clashes with module {} at {}",
                existing.module_id, existing.bus_id
            );
            return false;
        }
        self.devices.push(Device::new(module_id, bus_id));
        true
    }

    pub fn device(&self, module_id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.module_id == module_id)
    }

    /// The join every collector performs to attach its findings.
    pub fn device_by_bus_id_mut(&mut self, bus_id: &str) -> Option<&mut Device> {
        self.devices
            .iter_mut()
            .find(|d| d.bus_id.eq_ignore_ascii_case(bus_id))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Device {
    pub module_id: String,
    pub bus_id: String,
    pub meta: Metadata,
    pub stats: Counters,
    pub internal: BTreeMap<u32, InternalInterface>,
    pub external: BTreeMap<String, ExternalInterface>,
}

impl Device {
    pub fn new(module_id: impl Into<String>, bus_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            bus_id: bus_id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct InternalInterface {
    pub meta: Metadata,
    pub stats: Counters,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ExternalInterface {
    pub meta: Metadata,
    pub stats: Counters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_device_keeps_ids_unique() {
        let mut host = Host::new("gaudi-01");
        assert!(host.add_device("0", "0000:4d:00.0"));
        assert!(!host.add_device("0", "0000:4e:00.0"));
        assert!(!host.add_device("1", "0000:4d:00.0"));
        assert!(host.add_device("1", "0000:4e:00.0"));
        assert_eq!(host.devices.len(), 2);
    }

    #[test]
    fn test_join_by_bus_id() {
        let mut host = Host::new("gaudi-01");
        host.add_device("3", "0000:34:00.0");
        host.add_device("6", "0000:9a:00.0");

        let device = host.device_by_bus_id_mut("0000:9A:00.0").unwrap();
        device.stats.insert("util".into(), 12);

        assert_eq!(host.device("6").unwrap().stats["util"], 12);
        assert!(host.device("3").unwrap().stats.is_empty());
        assert!(host.device_by_bus_id_mut("0000:b3:00.0").is_none());
    }

    #[test]
    fn test_value() {
        assert!(Value::from("").is_empty());
        assert!(!Value::Int(0).is_empty());
        assert_eq!(Value::from("HL-225").to_string(), "HL-225");
        assert_eq!(Value::Int(1600).to_string(), "1600");
    }
}
