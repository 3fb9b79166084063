//! Decimal unit ladder used to render bit rates
//!
//! Every step is exactly 1000x the previous one. Binary (1024) scaling is
//! never used here: speed-test results are quoted in decimal units.

pub const B: f64 = 1.0;
pub const KB: f64 = B * 1000.0;
pub const MB: f64 = KB * 1000.0;
pub const GB: f64 = MB * 1000.0;
pub const TB: f64 = GB * 1000.0;
pub const PB: f64 = TB * 1000.0;
pub const EB: f64 = PB * 1000.0;
pub const ZB: f64 = EB * 1000.0;
pub const YB: f64 = ZB * 1000.0;

/// Units ordered from largest to smallest, paired with their suffix.
const LADDER: [(f64, &str); 8] = [
    (YB, "YBps"),
    (ZB, "ZBps"),
    (EB, "EBps"),
    (PB, "Pbps"),
    (TB, "Tbps"),
    (GB, "Gbps"),
    (MB, "Mbps"),
    (KB, "Kbps"),
];

const BASE_SUFFIX: &str = "Bps";

/// Pick the largest unit the rate reaches and return the scaled value with its suffix.
///
/// A rate sitting exactly on a threshold is promoted to that unit, so `1000.0`
/// scales to `(1.0, "Kbps")`. Anything below 1 Kbps, including zero and NaN,
/// stays in the base unit.
pub fn scale_rate(rate: f64) -> (f64, &'static str) {
    LADDER
        .iter()
        .find(|(threshold, _)| rate >= *threshold)
        .map(|(threshold, suffix)| (rate / threshold, *suffix))
        .unwrap_or((rate, BASE_SUFFIX))
}

/// Render a bits-per-second figure with two decimals and a unit suffix.
pub fn format_rate(rate: f64) -> String {
    let (value, suffix) = scale_rate(rate);
    format!("{:.2} {}", value, suffix)
}
