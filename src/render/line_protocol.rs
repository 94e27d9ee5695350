// src/render/line_protocol.rs
//! InfluxDB line protocol.
//!
//! * measurement names, tag keys, tag values and field keys are never quoted
//! * string field values are double quoted, numbers are not
//! * empty values are left out, `key=` and `key=""` break the parser
//!
//! `GaudiMon,host=h,oam_id=0,bus_id=0000:4d:00.0 gaudi_model="HL-225",temperature=45`

use crate::model::{Counters, Host, Metadata, Value};
use std::fmt::Write;

pub const DEVICE_MEASUREMENT: &str = "GaudiMon";
pub const INTERNAL_MEASUREMENT: &str = "GaudiIntIntf";
pub const EXTERNAL_MEASUREMENT: &str = "GaudiExtIntf";

fn escape_key(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// One record being assembled.
struct Line {
    series: String,
    fields: Vec<String>,
}

impl Line {
    fn new(measurement: &str, hostname: &str) -> Self {
        let mut line = Self {
            series: escape_key(measurement),
            fields: Vec::new(),
        };
        line.tag("host", hostname);
        line
    }

    fn tag(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            let _ = write!(self.series, ",{}={}", escape_key(key), escape_key(value));
        }
    }

    fn field(&mut self, key: &str, value: &Value) {
        let rendered = match value {
            _ if value.is_empty() => return,
            Value::Int(n) => n.to_string(),
            Value::Text(s) => quote(s),
        };
        self.fields.push(format!("{}={rendered}", escape_key(key)));
    }

    fn meta_fields(&mut self, meta: &Metadata) {
        for (key, value) in meta {
            self.field(key, value);
        }
    }

    fn counter_fields(&mut self, stats: &Counters) {
        for (key, n) in stats {
            self.fields.push(format!("{}={n}", escape_key(key)));
        }
    }

    fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    fn write_to(self, out: &mut String) {
        let _ = writeln!(out, "{} {}", self.series, self.fields.join(","));
    }
}

/// Device lines, then internal interface lines, then external interface
/// lines. Records without fields are not written.
pub fn render(host: &Host) -> String {
    let mut devices = String::new();
    let mut internal = String::new();
    let mut external = String::new();

    for device in &host.devices {
        let mut line = Line::new(DEVICE_MEASUREMENT, &host.hostname);
        line.tag("oam_id", &device.module_id);
        line.tag("bus_id", &device.bus_id);
        line.meta_fields(&device.meta);
        line.counter_fields(&device.stats);
        if line.has_fields() {
            line.meta_fields(&host.meta);
            line.write_to(&mut devices);
        }

        for (port, intf) in &device.internal {
            let mut line = Line::new(INTERNAL_MEASUREMENT, &host.hostname);
            line.tag("bus_id", &device.bus_id);
            line.tag("oam_id", &device.module_id);
            line.tag("intf", &port.to_string());
            for (key, value) in &intf.meta {
                if key == "oper_state" {
                    line.tag(key, &value.to_string());
                } else {
                    line.field(key, value);
                }
            }
            line.counter_fields(&intf.stats);
            if line.has_fields() {
                line.write_to(&mut internal);
            }
        }

        for (mac, intf) in &device.external {
            let mut line = Line::new(EXTERNAL_MEASUREMENT, &host.hostname);
            line.tag("bus_id", &device.bus_id);
            line.tag("oam_id", &device.module_id);
            for (key, value) in &intf.meta {
                line.tag(key, &value.to_string());
            }
            line.counter_fields(&intf.stats);
            line.field("mac", &Value::from(mac.as_str()));
            line.write_to(&mut external);
        }
    }

    devices + &internal + &external
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Device, ExternalInterface, InternalInterface};

    fn host() -> Host {
        let mut host = Host::new("gaudi-01");
        host.meta.insert("os_release".into(), "Ubuntu 22.04.4 LTS".into());
        host.meta.insert("num_cpu".into(), Value::Int(224));
        host
    }

    #[test]
    fn test_device_line() {
        let mut host = host();
        let mut device = Device::new("0", "0000:4d:00.0");
        device.meta.insert("gaudi_model".into(), "HL-225".into());
        device.meta.insert("clock".into(), Value::Int(1600));
        device.meta.insert("serial".into(), "".into());
        device.stats.insert("temperature".into(), 45);
        host.devices.push(device);

        assert_eq!(
            render(&host),
            "GaudiMon,host=gaudi-01,oam_id=0,bus_id=0000:4d:00.0 \
             clock=1600,gaudi_model=\"HL-225\",temperature=45,num_cpu=224,os_release=\"Ubuntu 22.04.4 LTS\"\n"
        );
    }

    #[test]
    fn test_device_without_fields_is_skipped() {
        let mut host = host();
        let mut device = Device::new("0", "0000:4d:00.0");
        device.meta.insert("status".into(), "".into());
        host.devices.push(device);
        assert_eq!(render(&host), "");
    }

    #[test]
    fn test_internal_interface_line() {
        let mut host = Host::new("gaudi-01");
        let mut device = Device::new("2", "0000:33:00.0");
        let mut intf = InternalInterface::default();
        intf.meta.insert("oper_state".into(), "UP".into());
        intf.stats.insert("pcs_local_faults".into(), 0);
        intf.stats.insert("Congestion_Q_err".into(), 4);
        device.internal.insert(9, intf);
        device.internal.insert(10, InternalInterface::default());
        host.devices.push(device);

        assert_eq!(
            render(&host),
            "GaudiIntIntf,host=gaudi-01,bus_id=0000:33:00.0,oam_id=2,intf=9,oper_state=UP \
             Congestion_Q_err=4,pcs_local_faults=0\n"
        );
    }

    #[test]
    fn test_external_interface_line() {
        let mut host = Host::new("gaudi-01");
        let mut device = Device::new("2", "0000:33:00.0");
        let mut intf = ExternalInterface::default();
        intf.meta.insert("intf".into(), "hbn0".into());
        intf.meta.insert("oper_state".into(), "down".into());
        intf.meta.insert("peer_name".into(), "leaf sw,7".into());
        intf.stats.insert("cuc".into(), 3);
        device.external.insert("b0:fd:0b:d5:1c:3a".into(), intf);
        host.devices.push(device);

        assert_eq!(
            render(&host),
            "GaudiExtIntf,host=gaudi-01,bus_id=0000:33:00.0,oam_id=2,intf=hbn0,oper_state=down,peer_name=leaf\\ sw\\,7 \
             cuc=3,mac=\"b0:fd:0b:d5:1c:3a\"\n"
        );
    }

    #[test]
    fn test_line_order() {
        let mut host = Host::new("h");
        for (id, bus) in [("0", "0000:4d:00.0"), ("1", "0000:4e:00.0")] {
            let mut device = Device::new(id, bus);
            device.stats.insert("util".into(), 1);
            let mut port = InternalInterface::default();
            port.stats.insert("a".into(), 1);
            device.internal.insert(0, port);
            device.external.insert(format!("mac{id}"), ExternalInterface::default());
            host.devices.push(device);
        }

        let out = render(&host);
        let measurements: Vec<&str> = out
            .lines()
            .map(|l| l.split(',').next().unwrap_or_default())
            .collect();
        assert_eq!(
            measurements,
            [
                "GaudiMon",
                "GaudiMon",
                "GaudiIntIntf",
                "GaudiIntIntf",
                "GaudiExtIntf",
                "GaudiExtIntf"
            ]
        );
    }

    #[test]
    fn test_text_clock_is_quoted() {
        let mut host = Host::new("h");
        let mut device = Device::new("0", "0000:4d:00.0");
        device.meta.insert("clock".into(), "1600 / 1800".into());
        host.devices.push(device);
        assert_eq!(
            render(&host),
            "GaudiMon,host=h,oam_id=0,bus_id=0000:4d:00.0 clock=\"1600 / 1800\"\n"
        );
    }

    #[test]
    fn test_string_fields_are_escaped() {
        let mut host = Host::new("h");
        let mut device = Device::new("0", "b");
        device.meta.insert("status".into(), r#"say "hi" \o/"#.into());
        host.devices.push(device);
        assert!(render(&host).contains(r#"status="say \"hi\" \\o/""#));
    }
}
