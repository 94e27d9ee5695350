// src/collector/metadata.rs
//! Slow-changing facts: OS and CPU of the host, model/serial/driver/clock of
//! each card. Worth collecting hourly, not every few seconds.

use super::Collector;
use crate::exec::CommandRunner;
use crate::extract::{self, Extractor};
use crate::model::{Host, Metadata, Value};
use tracing::{debug, info, warn};

pub const OS_RELEASE_CMD: &str = "cat /etc/os-release";
pub const LSCPU_CMD: &str = "lscpu";
pub const NPROC_CMD: &str = "nproc";
pub const QUERY_CMD: &str = "hl-smi -q";

/// Start of each per-device block in `hl-smi -q`, e.g. `[0] AIP (accel0)`.
pub const CHUNK_DELIMITER: &str = "] AIP";

fn fields() -> [&'static Extractor; 3] {
    [
        &extract::PRODUCT_NAME,
        &extract::SERIAL_NUMBER,
        &extract::MODULE_STATUS,
    ]
}

/// Metadata of the device at `bus_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceChunk {
    pub bus_id: String,
    pub meta: Metadata,
}

/// Splits `hl-smi -q` into per-device metadata. The driver version is
/// reported once for the host and copied into every chunk.
pub fn parse_query(output: &str) -> Vec<DeviceChunk> {
    let driver_version = extract::DRIVER_VERSION.extract(output);

    output
        .split(CHUNK_DELIMITER)
        .filter_map(|chunk| {
            let bus_id = extract::BUS_ID_FIELD.extract(chunk)?;

            let mut meta = Metadata::new();
            if let Some(version) = driver_version {
                meta.insert("driver_version".into(), version.into());
            }
            for field in fields() {
                if let Some(value) = field.extract(chunk) {
                    meta.insert(field.name().into(), value.into());
                }
            }
            if let Some(raw) = extract::SOC_CLOCK.extract(chunk) {
                match raw.parse::<i64>() {
                    Ok(mhz) => {
                        meta.insert(extract::SOC_CLOCK.name().into(), Value::Int(mhz));
                    }
                    Err(_) => warn!("{bus_id}: unexpected soc clock {raw:?}"),
                }
            }
            Some(DeviceChunk {
                bus_id: bus_id.to_string(),
                meta,
            })
        })
        .collect()
}

impl<R: CommandRunner> Collector<R> {
    pub async fn collect_metadata(&self, host: &mut Host) {
        info!("getting metadata");
        self.collect_host_metadata(host).await;

        let Some(output) = self.query(QUERY_CMD).await else {
            return;
        };
        for chunk in parse_query(&output) {
            match host.device_by_bus_id_mut(&chunk.bus_id) {
                Some(device) => device.meta.extend(chunk.meta),
                None => debug!("metadata for unknown bus {}", chunk.bus_id),
            }
        }
    }

    async fn collect_host_metadata(&self, host: &mut Host) {
        if let Some(out) = self.query(OS_RELEASE_CMD).await {
            if let Some(name) = extract::OS_PRETTY_NAME.extract(&out) {
                host.meta.insert("os_release".into(), name.into());
            }
        }

        if let Some(out) = self.query(LSCPU_CMD).await {
            if let Some(model) = extract::CPU_MODEL.extract(&out) {
                host.meta.insert("cpu_model".into(), model.into());
            }
        }

        if let Some(out) = self.query(NPROC_CMD).await {
            match out.trim().parse::<i64>() {
                Ok(n) => {
                    host.meta.insert("num_cpu".into(), Value::Int(n));
                }
                Err(_) => warn!("{NPROC_CMD}: unexpected output {out:?}"),
            }
        }
    }
}
