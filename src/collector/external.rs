// src/collector/external.rs
//! External NICs of each Gaudi: state from sysfs, neighbours from LLDP and,
//! in full mode, the `ethtool -S` counter dump.

use super::Collector;
use crate::error::{CollectError, Result};
use crate::exec::CommandRunner;
use crate::extract::{self, Counter};
use crate::model::{Counters, Device, ExternalInterface, Host, Metadata};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// NICs of a module live under `<root>/<bus_id>/net/<nic>`.
pub const SYSFS_NET_ROOT: &str = "/sys/bus/pci/drivers/habanalabs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalMode {
    /// State, speed, neighbour and carrier counts only.
    StatusOnly,
    /// Everything, plus the `ethtool -S` counters.
    FullStats,
}

pub fn lldp_cmd(nic: &str) -> String {
    format!("sudo lldptool -t -n -i {nic}")
}

pub fn ethtool_cmd(nic: &str) -> String {
    format!("ethtool -S {nic}")
}

fn read_attr(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| CollectError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// NIC names under `net_dir`, sorted.
pub fn list_nics(net_dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(net_dir).map_err(|source| CollectError::Read {
        path: net_dir.to_path_buf(),
        source,
    })?;

    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names)
}

/// Peer switch details from `lldptool -t -n`. The value of each TLV sits on
/// the line after its label.
pub fn parse_lldp(output: &str) -> Metadata {
    let lines: Vec<&str> = output.lines().collect();
    let mut meta = Metadata::new();

    for (i, line) in lines.iter().enumerate() {
        let next = lines
            .get(i + 1)
            .map(|l| l.trim())
            .filter(|l| !l.is_empty());

        if line.contains("System Name") {
            if let Some(name) = next {
                meta.insert("peer_name".into(), name.into());
            }
        }
        if line.contains("Port ID TLV") {
            if let Some(port) = next {
                let port = port.strip_prefix("Ifname:").unwrap_or(port).trim();
                meta.insert("peer_intf".into(), port.into());
            }
        }
        if line.contains("System capabilities") && line.contains("ridge") {
            meta.insert("peer_type".into(), "switch".into());
        }
        if line.contains("Management Address") {
            if let Some(addr) = next.and_then(|l| l.strip_prefix("IPv4:")) {
                meta.insert("peer".into(), addr.trim().into());
            }
        }
    }
    meta
}

/// `ethtool -S` counters. The `NIC statistics:` banner is skipped.
pub fn parse_nic_stats(output: &str) -> Counters {
    let mut stats = Counters::new();
    for line in output.lines().filter(|l| !l.contains("NIC")) {
        match extract::counter(line) {
            Some(Counter::Value(name, value)) => {
                stats.insert(name, value);
            }
            Some(Counter::Redundant(name)) => debug!("skip {name}"),
            Some(Counter::Malformed(name)) => warn!("counter {name}: value is not an integer"),
            None => {}
        }
    }
    stats
}

fn read_logged(path: &Path) -> Option<String> {
    match read_attr(path) {
        Ok(value) => Some(value),
        Err(e) => {
            error!("{e}");
            None
        }
    }
}

fn read_count(path: &Path) -> Option<i64> {
    let raw = read_logged(path)?;
    match raw.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("{}: not a counter: {raw:?}", path.display());
            None
        }
    }
}

impl<R: CommandRunner> Collector<R> {
    pub async fn collect_external_interfaces(&self, host: &mut Host, mode: ExternalMode) {
        info!("getting Gaudi external interface stats ({mode:?})");

        for device in &mut host.devices {
            self.collect_device_nics(device, mode).await;
        }
    }

    async fn collect_device_nics(&self, device: &mut Device, mode: ExternalMode) {
        let net_dir: PathBuf = self.sysfs_root.join(&device.bus_id).join("net");
        let nics = match list_nics(&net_dir) {
            Ok(nics) => nics,
            Err(e) => {
                error!("{e}");
                return;
            }
        };

        for nic in nics {
            let nic_dir = net_dir.join(&nic);
            let Some(mac) = read_logged(&nic_dir.join("address")).filter(|m| !m.is_empty()) else {
                continue;
            };

            let intf = self.collect_nic(&nic, &nic_dir, mode).await;
            device.external.insert(mac, intf);
        }
    }

    async fn collect_nic(&self, nic: &str, nic_dir: &Path, mode: ExternalMode) -> ExternalInterface {
        let mut intf = ExternalInterface::default();
        intf.meta.insert("intf".into(), nic.into());

        if let Some(state) = read_logged(&nic_dir.join("operstate")) {
            if state == "up" {
                if let Some(speed) = read_logged(&nic_dir.join("speed")) {
                    intf.meta.insert("oper_speed".into(), speed.into());
                }
            }
            intf.meta.insert("oper_state".into(), state.into());
        }

        if let Some(out) = self.query(&lldp_cmd(nic)).await {
            intf.meta.extend(parse_lldp(&out));
        }

        if let Some(n) = read_count(&nic_dir.join("carrier_down_count")) {
            intf.stats.insert("cdc".into(), n);
        }
        if let Some(n) = read_count(&nic_dir.join("carrier_up_count")) {
            intf.stats.insert("cuc".into(), n);
        }

        if mode == ExternalMode::StatusOnly {
            debug!("collecting only status, no stats: {nic}");
            return intf;
        }

        if let Some(out) = self.query(&ethtool_cmd(nic)).await {
            intf.stats.extend(parse_nic_stats(&out));
        }
        intf
    }
}
