// src/collector/registry.rs
//! Which Gaudi modules this host has, and where they sit on the PCI bus.

use super::Collector;
use crate::exec::CommandRunner;
use crate::model::Host;
use sysinfo::System;
use tracing::{info, warn};

pub const MODULE_LISTING_CMD: &str = "hl-smi -Q module_id,bus_id -f csv,noheader";

/// Module id to bus id on an HLS-Gaudi2 board. Does not change between boots,
/// and keeps working when a degraded module reports its id as N/A.
pub const STATIC_BUS_MAP: [(&str, &str); 8] = [
    ("3", "0000:34:00.0"),
    ("2", "0000:33:00.0"),
    ("6", "0000:9a:00.0"),
    ("0", "0000:4d:00.0"),
    ("7", "0000:9b:00.0"),
    ("1", "0000:4e:00.0"),
    ("4", "0000:b3:00.0"),
    ("5", "0000:b4:00.0"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Discovery {
    /// Ask `hl-smi` for the module list.
    #[default]
    Live,
    /// Use [`STATIC_BUS_MAP`].
    Static,
}

/// Name this host reports itself under.
pub fn local_hostname() -> String {
    System::host_name().unwrap_or_else(|| "unknown".to_string())
}

/// Parses `module_id, bus_id` CSV lines. Malformed lines are skipped.
pub fn parse_module_listing(text: &str) -> Vec<(String, String)> {
    let mut modules = Vec::new();

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let mut cols = line.split(',').map(str::trim);
        match (cols.next(), cols.next()) {
            (Some(module_id), Some(bus_id)) if !module_id.is_empty() && !bus_id.is_empty() => {
                modules.push((module_id.to_string(), bus_id.to_string()));
            }
            _ => warn!("unexpected module listing line: {line:?}"),
        }
    }

    modules
}

impl<R: CommandRunner> Collector<R> {
    /// Module id → bus id pairs, in the order the tool lists them. Empty if
    /// live discovery fails.
    pub async fn discover_devices(&self, mode: Discovery) -> Vec<(String, String)> {
        info!("getting module ids and bus ids ({mode:?})");
        match mode {
            Discovery::Static => STATIC_BUS_MAP
                .iter()
                .map(|(m, b)| (m.to_string(), b.to_string()))
                .collect(),
            Discovery::Live => self
                .query(MODULE_LISTING_CMD)
                .await
                .map(|out| parse_module_listing(&out))
                .unwrap_or_default(),
        }
    }

    /// A host with one empty device per discovered module.
    pub async fn discover(&self, hostname: &str, mode: Discovery) -> Host {
        let mut host = Host::new(hostname);
        for (module_id, bus_id) in self.discover_devices(mode).await {
            host.add_device(&module_id, &bus_id);
        }
        info!("{} devices on {hostname}", host.devices.len());
        host
    }
}
