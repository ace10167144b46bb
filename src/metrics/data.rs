//! Data structures for telemetry snapshots.
//!
//! Every optional field is either a concrete value or `None`; a zero never
//! stands in for "unknown". Each `None` is paired with a warning in the
//! collector's [`Collected::warnings`].

use serde::{Deserialize, Serialize};

/// One collector's result for a single request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collected<T> {
    /// Best-effort snapshot
    pub snapshot: T,
    /// One entry per degraded fact, in probe order
    pub warnings: Vec<String>,
}

impl<T> Collected<T> {
    pub fn new(snapshot: T, warnings: Vec<String>) -> Self {
        Self { snapshot, warnings }
    }
}

/// CPU load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputeSnapshot {
    /// Utilization over the sampling interval (0.0 to 100.0)
    pub cpu_usage_percent: Option<f64>,
}

/// SoC temperature, supply voltage and firmware throttling state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThermalSnapshot {
    /// SoC temperature in Celsius
    pub temperature_c: Option<f64>,
    /// Core supply voltage in volts
    pub voltage_v: Option<f64>,
    /// Decoded `get_throttled` bitmask
    pub throttled: Option<ThrottleStatus>,
}

/// Decoded firmware throttling bitmask.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleStatus {
    /// Raw bitfield as reported by the firmware
    pub raw: u32,
    /// True iff any known condition bit is set
    pub is_throttled: bool,
    /// Names of the set conditions, lowest bit first
    pub flags: Vec<String>,
}

/// Reachability of the MediaMTX API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiState {
    Ok,
    Unavailable,
    #[default]
    Unknown,
}

impl ApiState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiState::Ok => "ok",
            ApiState::Unavailable => "unavailable",
            ApiState::Unknown => "unknown",
        }
    }
}

/// State of the streaming service and its camera path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    /// Supervisor state ("active", "failed", ...; "unknown" if not determined)
    pub service_state: String,
    /// Whether the status API answered
    pub api_state: ApiState,
    /// Path resource queried on the API
    pub path_name: String,
    /// Whether the path has a ready source
    pub path_ready: Option<bool>,
    /// Number of readers attached to the path
    pub readers: Option<usize>,
    /// Number of tracks published on the path
    pub tracks: Option<usize>,
    /// Source type label ("unknown" until the API answers, "none" if no source)
    pub source_type: String,
}

impl ServiceSnapshot {
    /// Snapshot before any probe has run.
    pub fn unknown(path_name: impl Into<String>) -> Self {
        Self {
            service_state: "unknown".to_string(),
            api_state: ApiState::Unknown,
            path_name: path_name.into(),
            path_ready: None,
            readers: None,
            tracks: None,
            source_type: "unknown".to_string(),
        }
    }
}

/// Throughput and radio quality of the active interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    /// Selected interface name, empty if none could be determined
    pub interface: String,
    /// Non-loopback IPv4 address of the interface
    pub ipv4: Option<String>,
    /// Receive rate in bytes per second
    pub rx_bytes_per_sec: Option<f64>,
    /// Transmit rate in bytes per second
    pub tx_bytes_per_sec: Option<f64>,
    /// Present only when the interface is wireless
    pub wireless: Option<WirelessInfo>,
}

/// Radio fields of a wireless interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirelessInfo {
    /// e.g. "54/70 (-42 dBm)"
    pub link_quality: String,
    /// Link details from the radio tool
    pub link: Option<RadioLink>,
}

/// Association details reported by `iw`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioLink {
    pub ssid: String,
    pub tx_bitrate: String,
    pub rx_bitrate: String,
}

/// Static device identification, resolved once per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub hostname: String,
    /// Board model from the device tree
    pub model: String,
    /// Camera sensor, e.g. "Pi Camera v3 (imx708)"
    pub camera: String,
    pub os_name: String,
    pub os_version: String,
    /// Display label derived from os-release
    pub os_label: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            hostname: "unknown".to_string(),
            model: "unknown".to_string(),
            camera: "Unknown camera".to_string(),
            os_name: "unknown".to_string(),
            os_version: "unknown".to_string(),
            os_label: "unknown".to_string(),
        }
    }
}

/// All collectors' results for one request, in collection order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryReport {
    pub compute: Collected<ComputeSnapshot>,
    pub thermal: Collected<ThermalSnapshot>,
    pub service: Collected<ServiceSnapshot>,
    pub network: Collected<NetworkSnapshot>,
    pub device: DeviceInfo,
}

impl TelemetryReport {
    /// All warnings, collector order preserved.
    pub fn warnings(&self) -> impl Iterator<Item = &String> {
        self.compute
            .warnings
            .iter()
            .chain(&self.thermal.warnings)
            .chain(&self.service.warnings)
            .chain(&self.network.warnings)
    }
}
