// src/cli.rs
//! Command line of the `gaudimon` binary.

use crate::collector::{Discovery, ExternalMode, Plan, SYSFS_NET_ROOT};
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use tracing::Level;

pub const USAGE_HINT: &str = "Try -h option for usage help";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Everything collected, as JSON.
    #[value(name = "dict", alias = "structured-dump")]
    Dict,
    /// InfluxDB line protocol, for Telegraf's exec input.
    #[value(name = "influxdb-lp", alias = "line-protocol")]
    InfluxdbLp,
}

/// Gather information/stats from Intel Gaudi servers and print them in
/// formats like InfluxDB line protocol. Uses hl-smi and other OS utilities.
#[derive(Debug, Parser)]
#[command(name = "gaudimon", version, about)]
pub struct Args {
    /// Output format
    #[arg(value_enum)]
    pub output_format: OutputFormat,

    /// Collect card stats like power usage, utilization, temperature.
    /// OK to run at a fine granularity of 5s.
    #[arg(short = 's', long = "stats")]
    pub stats: bool,

    /// Collect card metadata like serial, model, etc. Not expected to
    /// change, so run at 1h or longer.
    #[arg(short = 'm', long = "meta")]
    pub meta: bool,

    /// Collect internal interface stats. Takes about 30s, so run at 60s or
    /// longer.
    #[arg(long = "iis")]
    pub int_intf_stats: bool,

    /// Collect external interface stats.
    #[arg(long = "eis")]
    pub ext_intf_stats: bool,

    /// External interface status only, no stats.
    #[arg(long = "eist")]
    pub ext_intf_status: bool,

    /// Use the static module id to bus id mapping. Useful when a module id
    /// reads N/A.
    #[arg(long = "sobm")]
    pub sobm: bool,

    /// -v warn, -vv info, -vvv debug, -vvvv debug plus raw command output.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Append logs to this file instead of stderr.
    #[arg(long, env = "GAUDIMON_LOG_FILE", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Directory holding the habanalabs PCI devices.
    #[arg(long, default_value = SYSFS_NET_ROOT, hide = true)]
    pub sysfs_root: PathBuf,
}

impl Args {
    pub fn plan(&self) -> Plan {
        let external = if self.ext_intf_status {
            Some(ExternalMode::StatusOnly)
        } else if self.ext_intf_stats {
            Some(ExternalMode::FullStats)
        } else {
            None
        };

        Plan {
            discovery: if self.sobm {
                Discovery::Static
            } else {
                Discovery::Live
            },
            stats: self.stats,
            metadata: self.meta,
            internal: self.int_intf_stats,
            external,
        }
    }

    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 | 1 => Level::WARN,
            2 => Level::INFO,
            3 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("gaudimon").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_stats_plan() {
        let args = parse(&["influxdb-lp", "-s"]);
        assert_eq!(args.output_format, OutputFormat::InfluxdbLp);
        let plan = args.plan();
        assert!(plan.stats && !plan.metadata && !plan.internal);
        assert_eq!(plan.external, None);
        assert_eq!(plan.discovery, Discovery::Live);
    }

    #[test]
    fn test_status_only_wins_over_full_stats() {
        let plan = parse(&["dict", "--eis", "--eist", "--sobm"]).plan();
        assert_eq!(plan.external, Some(ExternalMode::StatusOnly));
        assert_eq!(plan.discovery, Discovery::Static);
        assert_eq!(
            parse(&["dict", "--eis"]).plan().external,
            Some(ExternalMode::FullStats)
        );
    }

    #[test]
    fn test_format_aliases() {
        assert_eq!(parse(&["line-protocol"]).output_format, OutputFormat::InfluxdbLp);
        assert_eq!(parse(&["structured-dump"]).output_format, OutputFormat::Dict);
        assert!(Args::try_parse_from(["gaudimon", "csv"]).is_err());
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(parse(&["dict"]).log_level(), Level::WARN);
        assert_eq!(parse(&["dict", "-v"]).log_level(), Level::WARN);
        assert_eq!(parse(&["dict", "-vv"]).log_level(), Level::INFO);
        assert_eq!(parse(&["dict", "-vvv"]).log_level(), Level::DEBUG);
        assert_eq!(parse(&["dict", "-vvvv"]).log_level(), Level::TRACE);
    }

    #[test]
    fn test_nothing_selected() {
        assert!(parse(&["dict"]).plan().is_empty());
        assert!(!parse(&["dict", "--iis"]).plan().is_empty());
    }
}
