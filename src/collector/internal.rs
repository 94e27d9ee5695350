// src/collector/internal.rs
//! Internal (Gaudi to Gaudi) fabric ports: link state from `hl-smi -n link`,
//! counters from `hl-smi -n stats`. Slow, about 30s for a full board.

use super::Collector;
use crate::error::CollectError;
use crate::exec::CommandRunner;
use crate::extract::{self, Counter};
use crate::model::{Counters, Device, Host};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

pub fn link_cmd(bus_id: &str) -> String {
    format!("hl-smi -n link -i {bus_id}")
}

pub fn stats_cmd(bus_id: &str) -> String {
    format!("hl-smi -n stats -i {bus_id}")
}

/// `port 7: UP` lines to port → state.
pub fn parse_link_status(output: &str) -> BTreeMap<u32, String> {
    output
        .lines()
        .filter_map(extract::port_state)
        .map(|(port, state)| (port, state.to_string()))
        .collect()
}

/// Counter blocks, each headed by `port <N>:`. Counters seen before the
/// first header belong to no port and are dropped.
pub fn parse_port_stats(output: &str) -> BTreeMap<u32, Counters> {
    let mut ports: BTreeMap<u32, Counters> = BTreeMap::new();
    let mut current: Option<u32> = None;

    for line in output.lines() {
        if let Some(port) = extract::port_header(line) {
            ports.entry(port).or_default();
            current = Some(port);
            continue;
        }
        match (extract::counter(line), current) {
            (Some(Counter::Value(name, value)), Some(port)) => {
                ports.entry(port).or_default().insert(name, value);
            }
            (Some(Counter::Value(name, _)), None) => debug!("counter {name} outside any port"),
            (Some(Counter::Redundant(name)), _) => debug!("skip {name}"),
            (Some(Counter::Malformed(name)), _) => warn!("counter {name}: value is not an integer"),
            (None, _) => {}
        }
    }
    ports
}

/// Seeds one interface per port with its operational state.
pub fn apply_link_status(device: &mut Device, links: BTreeMap<u32, String>) {
    for (port, state) in links {
        let intf = device.internal.entry(port).or_default();
        intf.meta.insert("oper_state".into(), state.into());
    }
}

/// Attaches counters to ports already seeded from link status. Ports without
/// link status are reported as errors and left out.
pub fn apply_port_stats(
    device: &mut Device,
    stats: BTreeMap<u32, Counters>,
) -> Vec<CollectError> {
    let mut errors = Vec::new();
    for (port, counters) in stats {
        match device.internal.get_mut(&port) {
            Some(intf) => intf.stats.extend(counters),
            None => errors.push(CollectError::UnknownPort {
                bus_id: device.bus_id.clone(),
                port,
            }),
        }
    }
    errors
}

impl<R: CommandRunner> Collector<R> {
    pub async fn collect_internal_interfaces(&self, host: &mut Host) {
        info!("getting Gaudi internal interface stats");

        for device in &mut host.devices {
            let Some(links) = self.query(&link_cmd(&device.bus_id)).await else {
                continue;
            };
            apply_link_status(device, parse_link_status(&links));

            let Some(stats) = self.query(&stats_cmd(&device.bus_id)).await else {
                continue;
            };
            for e in apply_port_stats(device, parse_port_stats(&stats)) {
                error!("{e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "port 7: UP\nport 9: UP\nport 10:        DOWN\nsome banner\n";

    const STATS: &str = "\
port 7:
    pcs_local_faults: 0
    pcs_remote_faults: 2
    pre_FEC_SER_exp (negative): 5
    Congestion Q err: 1
    etherStatsOctets: 123456
    etherStatsPkts1519toMaxOctets: 10
port 9:
    pcs_local_faults: 1
    spmu_state: n/a
";

    #[test]
    fn test_parse_link_status() {
        let links = parse_link_status(LINK);
        assert_eq!(links.len(), 3);
        assert_eq!(links[&7], "UP");
        assert_eq!(links[&10], "DOWN");
    }

    #[test]
    fn test_parse_port_stats() {
        let ports = parse_port_stats(STATS);
        assert_eq!(ports.len(), 2);

        let p7 = &ports[&7];
        assert_eq!(p7["pcs_remote_faults"], 2);
        assert_eq!(p7["pre_FEC_SER_exp_negative"], 5);
        assert_eq!(p7["Congestion_Q_err"], 1);
        assert!(!p7.contains_key("etherStatsOctets"));
        assert!(!p7.contains_key("etherStatsPkts1519toMaxOctets"));

        let p9 = &ports[&9];
        assert_eq!(p9["pcs_local_faults"], 1);
        assert!(!p9.contains_key("spmu_state"));
    }

    #[test]
    fn test_counters_before_first_port_are_dropped() {
        let ports = parse_port_stats("stray: 4\nport 1:\n  a: 1\n");
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[&1].len(), 1);
    }

    #[test]
    fn test_stats_for_unknown_port_are_reported() {
        let mut device = Device::new("0", "0000:4d:00.0");
        apply_link_status(&mut device, parse_link_status("port 7: UP\n"));

        let stats = parse_port_stats("port 7:\n  a: 1\nport 8:\n  a: 2\n");
        let errors = apply_port_stats(&mut device, stats);

        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], CollectError::UnknownPort { port: 8, .. }));
        assert_eq!(device.internal.len(), 1);
        assert_eq!(device.internal[&7].stats["a"], 1);
    }
}
