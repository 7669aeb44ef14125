use crate::fetcher::Snapshot;

const UNAVAILABLE: &str = "N/A";

/// Display-ready view of one telemetry snapshot.
///
/// Text fields always hold something printable; the parsed charge and load
/// are `None` when the raw value was missing or non-numeric, in which case
/// the label still shows the raw text but the bar resets to zero.
#[derive(Debug)]
pub struct Readout {
    pub status: String,
    pub charge_text: String,
    pub charge: Option<i64>,
    pub runtime_minutes: String,
    pub input_voltage: String,
    pub output_voltage: String,
    pub load_text: String,
    pub load: Option<i64>,
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub test_result: String,
}

impl Readout {
    pub fn new() -> Readout {
        return Readout {
            status: UNAVAILABLE.to_string(),
            charge_text: UNAVAILABLE.to_string(),
            charge: None,
            runtime_minutes: UNAVAILABLE.to_string(),
            input_voltage: UNAVAILABLE.to_string(),
            output_voltage: UNAVAILABLE.to_string(),
            load_text: UNAVAILABLE.to_string(),
            load: None,
            manufacturer: UNAVAILABLE.to_string(),
            model: UNAVAILABLE.to_string(),
            serial: UNAVAILABLE.to_string(),
            test_result: UNAVAILABLE.to_string(),
        };
    }

    pub fn from_snapshot(data: &Snapshot) -> Readout {
        let charge_text = field(data, "battery.charge");
        let charge = charge_text.parse::<i64>().ok();
        let load_text = field(data, "ups.load");
        let load = load_text.parse::<i64>().ok();

        return Readout {
            status: field(data, "ups.status"),
            charge_text,
            charge,
            runtime_minutes: runtime_text(data.get("battery.runtime")),
            input_voltage: field(data, "input.voltage"),
            output_voltage: field(data, "output.voltage"),
            load_text,
            load,
            manufacturer: field(data, "device.mfr"),
            model: field(data, "device.model"),
            serial: field(data, "device.serial"),
            test_result: field(data, "ups.test.result"),
        };
    }
}

fn field(data: &Snapshot, key: &str) -> String {
    data.get(key)
        .cloned()
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}

/// `battery.runtime` is reported in seconds; shown as minutes to one
/// decimal place. A non-numeric value is shown as-is.
fn runtime_text(raw: Option<&String>) -> String {
    match raw {
        Some(seconds) => match runtime_minutes(seconds) {
            Some(minutes) => format!("{:.1}", minutes),
            None => seconds.clone(),
        },
        None => UNAVAILABLE.to_string(),
    }
}

pub fn runtime_minutes(seconds: &str) -> Option<f64> {
    let seconds: i64 = seconds.parse().ok()?;
    Some((seconds as f64 / 60.0 * 10.0).round() / 10.0)
}
