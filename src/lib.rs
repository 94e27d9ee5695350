// src/lib.rs
//! Telemetry from Intel Gaudi servers.
//!
//! A pass discovers the Gaudi modules of the host, runs `hl-smi`, `ethtool`,
//! `lldptool` and reads sysfs to fill a [`model::Host`], then renders it as
//! InfluxDB line protocol or as a JSON dump.

pub mod cli;
pub mod collector;
pub mod error;
pub mod exec;
pub mod extract;
pub mod model;
pub mod render;

pub use collector::{Collector, Discovery, ExternalMode, Plan};
pub use error::CollectError;
#[cfg(any(test, feature = "testing"))]
pub use exec::CannedRunner;
pub use exec::{CommandRunner, SystemRunner};
pub use model::Host;
