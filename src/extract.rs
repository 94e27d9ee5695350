// src/extract.rs
//! Field extractors for the free-text output of `hl-smi`, `lscpu`,
//! `/etc/os-release`, `ethtool` and friends.
//!
//! Every extractor answers `None` when its field is missing or blank, so a
//! change in one tool's output format costs one field instead of the pass.

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

/// A named regex whose first capture group (or whole match, if it has no
/// groups) is the value of one field.
#[derive(Debug)]
pub struct Extractor {
    name: &'static str,
    pattern: &'static str,
    regex: OnceCell<Regex>,
}

impl Extractor {
    pub const fn new(name: &'static str, pattern: &'static str) -> Self {
        Self {
            name,
            pattern,
            regex: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn regex(&self) -> &Regex {
        self.regex.get_or_init(|| {
            Regex::new(self.pattern)
                .unwrap_or_else(|e| panic!("extractor {}: bad pattern: {e}", self.name))
        })
    }

    /// First non-blank match in `text`, trimmed.
    pub fn extract<'t>(&self, text: &'t str) -> Option<&'t str> {
        let caps = self.regex().captures(text)?;
        let value = caps.get(1).or_else(|| caps.get(0))?.as_str().trim();
        (!value.is_empty()).then_some(value)
    }

    /// Like [`Extractor::extract`] but parsed as an integer. A value that does
    /// not parse counts as missing.
    pub fn extract_int(&self, text: &str) -> Option<i64> {
        self.extract(text)?.parse().ok()
    }
}

// hl-smi status table
pub static BUS_ID: Extractor = Extractor::new(
    "bus_id",
    r"(?i)\b([0-9a-f]{4}:[0-9a-f]{2}:[0-9a-f]{2}\.[0-7])\b",
);
pub static TEMPERATURE: Extractor = Extractor::new("temperature", r"(\d+)C\b");
pub static UTILIZATION: Extractor = Extractor::new("util", r"(\d+)%");
pub static POWER: Extractor = Extractor::new("pwr", r"(\d+)W[ \t]*/");
pub static POWER_CAP: Extractor = Extractor::new("pwr_max", r"/[ \t]*(\d+)W[ \t]*\|");
pub static MEMORY: Extractor = Extractor::new("mem", r"(\d+)MiB[ \t]*/");
pub static MEMORY_CAP: Extractor = Extractor::new("mem_max", r"/[ \t]*(\d+)MiB[ \t]*\|");
pub static UNCORRECTABLE: Extractor =
    Extractor::new("un_ecc", r"\|[ \t]+(\d+)[ \t]+\|\r?\n\|");

// hl-smi -q
pub static DRIVER_VERSION: Extractor = Extractor::new(
    "driver_version",
    r"(?im)^[ \t]*Driver Version[^:\n]*:[ \t]*(.*?)[ \t]*$",
);
pub static BUS_ID_FIELD: Extractor =
    Extractor::new("bus_id", r"(?im)^[ \t]*Bus Id[^:\n]*:[ \t]*(.*?)[ \t]*$");
pub static PRODUCT_NAME: Extractor = Extractor::new(
    "gaudi_model",
    r"(?im)^[ \t]*Product Name[^:\n]*:[ \t]*(.*?)[ \t]*$",
);
pub static SERIAL_NUMBER: Extractor = Extractor::new(
    "serial",
    r"(?im)^[ \t]*Serial Number[^:\n]*:[ \t]*(.*?)[ \t]*$",
);
pub static MODULE_STATUS: Extractor = Extractor::new(
    "status",
    r"(?im)^[ \t]*Module status[^:\n]*:[ \t]*(.*?)[ \t]*$",
);
pub static SOC_CLOCK: Extractor =
    Extractor::new("clock", r"(?i)\][ \t]*soc[^:\n]*:[ \t]*(\d+)[ \t]*MHz");

// host
pub static OS_PRETTY_NAME: Extractor =
    Extractor::new("os_release", r#"(?m)^PRETTY_NAME="?(.*?)"?[ \t]*$"#);
pub static CPU_MODEL: Extractor =
    Extractor::new("cpu_model", r"(?im)^[ \t]*Model name:[ \t]*(.*?)[ \t]*$");

static PORT_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*port\s+(\d+)\s*:\s*$").expect("port header pattern"));
static PORT_STATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*port\s+(\d+)\s*:\s*(\S+)\s*$").expect("port state pattern")
});

/// Counters that have a more precise counterpart and are never reported.
/// `etherStatsOctets`/`etherStatsPkts` are covered by the OctetsReceivedOK /
/// aFramesReceivedOK family, the size buckets duplicate In and Out.
pub const REDUNDANT_COUNTERS: [&str; 9] = [
    "etherStatsOctets",
    "etherStatsPkts",
    "etherStatsPkts64Octets",
    "etherStatsPkts65to127Octets",
    "etherStatsPkts128to255Octets",
    "etherStatsPkts256to511Octets",
    "etherStatsPkts512to1023Octets",
    "etherStatsPkts1024to1518Octets",
    "etherStatsPkts1519toMaxOctets",
];

pub fn is_redundant(counter: &str) -> bool {
    REDUNDANT_COUNTERS.contains(&counter)
}

/// `port 7:` on a line of its own, as used for stats blocks.
pub fn port_header(line: &str) -> Option<u32> {
    PORT_HEADER.captures(line)?.get(1)?.as_str().parse().ok()
}

/// `port 7:   UP` from `hl-smi -n link`.
pub fn port_state(line: &str) -> Option<(u32, &str)> {
    let caps = PORT_STATE.captures(line)?;
    let port = caps.get(1)?.as_str().parse().ok()?;
    Some((port, caps.get(2)?.as_str()))
}

/// Turns `pre_FEC_SER_exp (negative)` into `pre_FEC_SER_exp_negative`.
pub fn normalize_counter_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .replace(['(', ')'], "")
}

/// What a `name: value` counter line turned out to be.
#[derive(Debug, PartialEq, Eq)]
pub enum Counter {
    Value(String, i64),
    Redundant(String),
    /// Name found but the value is not an integer.
    Malformed(String),
}

/// Parses a `name: value` line. `None` if the line has no colon or no name.
pub fn counter(line: &str) -> Option<Counter> {
    let (raw_name, raw_value) = line.rsplit_once(':')?;
    let name = normalize_counter_name(raw_name);
    if name.is_empty() {
        return None;
    }
    if is_redundant(&name) {
        return Some(Counter::Redundant(name));
    }
    match raw_value.trim().parse() {
        Ok(value) => Some(Counter::Value(name, value)),
        Err(_) => Some(Counter::Malformed(name)),
    }
}

/// The part of `text` starting at `start` and ending before `end`. A missing
/// `end` runs to the end of the text; a missing `start` yields nothing.
pub fn region<'t>(text: &'t str, start: &str, end: &str) -> Option<&'t str> {
    let from = text.find(start)?;
    let rest = &text[from..];
    Some(rest.find(end).map_or(rest, |to| &rest[..to]))
}
