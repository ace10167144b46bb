//! Display formatting and health classification.

use crate::metrics::data::{ApiState, RadioLink, ThrottleStatus};
use serde::{Deserialize, Serialize};

/// Shown for any absent value.
pub const UNAVAILABLE: &str = "unavailable";

/// Three-level health of one displayed fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthClass {
    Healthy,
    Degraded,
    Failed,
}

impl HealthClass {
    /// CSS class of the badge.
    pub fn badge(&self) -> &'static str {
        match self {
            HealthClass::Healthy => "badge ok",
            HealthClass::Degraded => "badge warn",
            HealthClass::Failed => "badge err",
        }
    }
}

pub fn service_health(state: &str) -> HealthClass {
    match state {
        "active" => HealthClass::Healthy,
        "failed" => HealthClass::Failed,
        _ => HealthClass::Degraded,
    }
}

pub fn api_health(state: ApiState) -> HealthClass {
    match state {
        ApiState::Ok => HealthClass::Healthy,
        ApiState::Unavailable => HealthClass::Failed,
        ApiState::Unknown => HealthClass::Degraded,
    }
}

pub fn path_health(ready: Option<bool>) -> HealthClass {
    match ready {
        Some(true) => HealthClass::Healthy,
        Some(false) => HealthClass::Failed,
        None => HealthClass::Degraded,
    }
}

pub fn throttle_health(status: Option<&ThrottleStatus>) -> HealthClass {
    match status {
        Some(s) if s.is_throttled => HealthClass::Failed,
        Some(_) => HealthClass::Healthy,
        None => HealthClass::Degraded,
    }
}

/// Human-readable byte rate, scaled by 1024 up to GB/s.
pub fn format_rate(bytes_per_sec: f64) -> String {
    const UNITS: [&str; 4] = ["B/s", "KB/s", "MB/s", "GB/s"];
    let mut value = bytes_per_sec;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

pub fn format_optional_rate(rate: Option<f64>) -> String {
    rate.map(format_rate).unwrap_or_else(|| UNAVAILABLE.to_string())
}

pub fn format_percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}%", v))
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}

pub fn format_temperature(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1} C", v))
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}

pub fn format_voltage(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.4} V", v))
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}

pub fn format_count(value: Option<usize>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}

/// "TX a, RX b", or whichever side is known.
pub fn format_wifi_rate(link: Option<&RadioLink>) -> String {
    let Some(link) = link else {
        return UNAVAILABLE.to_string();
    };
    match (link.tx_bitrate.is_empty(), link.rx_bitrate.is_empty()) {
        (false, false) => format!("TX {}, RX {}", link.tx_bitrate, link.rx_bitrate),
        (false, true) => format!("TX {}", link.tx_bitrate),
        (true, false) => format!("RX {}", link.rx_bitrate),
        (true, true) => UNAVAILABLE.to_string(),
    }
}

pub fn format_throttle(status: Option<&ThrottleStatus>) -> String {
    match status {
        None => UNAVAILABLE.to_string(),
        Some(s) if s.flags.is_empty() => "no".to_string(),
        Some(s) => format!("yes ({})", s.flags.join(", ")),
    }
}
