// src/collector/stats.rs
//! Runtime stats from the `hl-smi` status table: temperature, utilization,
//! power, memory and uncorrectable errors.

use super::Collector;
use crate::exec::CommandRunner;
use crate::extract::{self, Extractor};
use crate::model::{Counters, Host};
use tracing::{debug, info, warn};

pub const STATUS_CMD: &str = "hl-smi";

/// Rows of the status table between devices.
pub const SECTION_DELIMITER: &str = "-------------------------------";

/// Anything hotter is a sensor glitch (readings like 505712272 C happen).
pub const MAX_TEMPERATURE: i64 = 300;

fn fields() -> [&'static Extractor; 6] {
    [
        &extract::UTILIZATION,
        &extract::POWER,
        &extract::POWER_CAP,
        &extract::MEMORY,
        &extract::MEMORY_CAP,
        &extract::UNCORRECTABLE,
    ]
}

/// Stats for the device at `bus_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSection {
    pub bus_id: String,
    pub stats: Counters,
}

/// Splits the status table into one section per device. Sections with no
/// bus id are dropped. A section reporting an implausible temperature comes
/// back with empty stats.
pub fn parse_status(output: &str) -> Vec<StatusSection> {
    let Some(table) = extract::region(output, "Compute M", "Compute Processes") else {
        warn!("{STATUS_CMD}: no device table in output");
        return Vec::new();
    };

    let mut sections = Vec::new();
    for section in table.split(SECTION_DELIMITER) {
        let Some(bus_id) = extract::BUS_ID.extract(section) else {
            continue;
        };

        let mut stats = Counters::new();
        for field in fields() {
            if let Some(value) = field.extract_int(section) {
                stats.insert(field.name().to_string(), value);
            }
        }

        if let Some(raw) = extract::TEMPERATURE.extract(section) {
            match raw.parse::<i64>() {
                Ok(t) if t <= MAX_TEMPERATURE => {
                    stats.insert(extract::TEMPERATURE.name().to_string(), t);
                }
                _ => {
                    warn!("temperature out of bound > {MAX_TEMPERATURE} C for {bus_id}: {raw}");
                    stats.clear();
                }
            }
        }

        sections.push(StatusSection {
            bus_id: bus_id.to_string(),
            stats,
        });
    }
    sections
}

impl<R: CommandRunner> Collector<R> {
    pub async fn collect_stats(&self, host: &mut Host) {
        info!("getting Gaudi stats");
        let Some(output) = self.query(STATUS_CMD).await else {
            return;
        };

        for section in parse_status(&output) {
            match host.device_by_bus_id_mut(&section.bus_id) {
                Some(device) => device.stats.extend(section.stats),
                None => debug!("stats for unknown bus {}", section.bus_id),
            }
        }
    }
}
