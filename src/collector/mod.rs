// src/collector/mod.rs
//! Collection passes over a Gaudi host.
//!
//! [`Collector::discover_devices`] must run first; the other passes each fill
//! their own part of the [`Host`](crate::model::Host) and may run in any order.

pub mod external;
pub mod internal;
pub mod metadata;
pub mod registry;
pub mod stats;

pub use external::{ExternalMode, SYSFS_NET_ROOT};
pub use registry::{Discovery, STATIC_BUS_MAP, local_hostname};

use crate::exec::CommandRunner;
use crate::model::Host;
use std::path::PathBuf;
use tracing::error;

/// Which passes to run after discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Plan {
    pub discovery: Discovery,
    pub stats: bool,
    pub metadata: bool,
    pub internal: bool,
    pub external: Option<ExternalMode>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        !self.stats && !self.metadata && !self.internal && self.external.is_none()
    }
}

/// Runs the diagnostic tools through `R` and folds their output into a host.
#[derive(Debug)]
pub struct Collector<R> {
    runner: R,
    sysfs_root: PathBuf,
}

impl<R: CommandRunner> Collector<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            sysfs_root: PathBuf::from(SYSFS_NET_ROOT),
        }
    }

    /// Points NIC discovery at another directory laid out like
    /// `/sys/bus/pci/drivers/habanalabs`.
    pub fn with_sysfs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sysfs_root = root.into();
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// One acquisition pass: discovery, then every pass `plan` asks for.
    pub async fn run(&self, hostname: &str, plan: &Plan) -> Host {
        let mut host = self.discover(hostname, plan.discovery).await;

        if plan.stats {
            self.collect_stats(&mut host).await;
        }
        if plan.metadata {
            self.collect_metadata(&mut host).await;
        }
        if plan.internal {
            self.collect_internal_interfaces(&mut host).await;
        }
        if let Some(mode) = plan.external {
            self.collect_external_interfaces(&mut host, mode).await;
        }
        host
    }

    /// Output of `command`, or `None` after logging why it is unavailable.
    async fn query(&self, command: &str) -> Option<String> {
        match self.runner.run(command).await {
            Ok(output) => Some(output),
            Err(e) => {
                error!("{e}");
                None
            }
        }
    }
}
