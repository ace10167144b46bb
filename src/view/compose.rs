//! Merge of all snapshots into one presentation structure.

use crate::camera::{update::resolution_label, ConfigReading, UpdateStatus};
use crate::metrics::data::{DeviceInfo, TelemetryReport};
use crate::view::format::*;
use chrono::{DateTime, Local};
use serde::Serialize;

/// Format of timestamps shown on the page.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A displayed value with its health badge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Badge {
    pub label: String,
    pub health: HealthClass,
    pub class: &'static str,
}

impl Badge {
    fn new(label: impl Into<String>, health: HealthClass) -> Self {
        Self {
            label: label.into(),
            health,
            class: health.badge(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsView {
    pub cpu_usage: String,
    pub temperature: String,
    pub voltage: String,
    pub throttled: Badge,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceView {
    pub service: Badge,
    pub api: Badge,
    pub path_name: String,
    pub path_ready: Badge,
    pub readers: String,
    pub tracks: String,
    pub source_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkView {
    pub interface: String,
    pub ipv4: String,
    pub rx_rate: String,
    pub tx_rate: String,
    pub is_wireless: bool,
    pub ssid: String,
    pub link_quality: String,
    pub wifi_rate: String,
}

/// Update banner shown after a form submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub code: &'static str,
    pub message: &'static str,
    pub class: &'static str,
}

impl From<UpdateStatus> for Notice {
    fn from(status: UpdateStatus) -> Self {
        Self {
            code: status.as_code(),
            message: status.message(),
            class: status.class(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraView {
    pub vflip: bool,
    pub hflip: bool,
    /// Form value of the resolution selector
    pub resolution: String,
    pub awb: String,
    pub mode: String,
    pub af_mode: String,
    /// Empty when the document has no lens position
    pub lens_position: String,
    pub last_updated: String,
    pub notice: Option<Notice>,
}

/// Everything the dashboard shows for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub generated_at: String,
    pub device: DeviceInfo,
    pub metrics: MetricsView,
    pub service: ServiceView,
    pub network: NetworkView,
    pub camera: CameraView,
    pub warnings: Vec<String>,
}

fn or_unavailable(value: &str) -> String {
    if value.is_empty() {
        UNAVAILABLE.to_string()
    } else {
        value.to_string()
    }
}

fn yes_no(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => UNAVAILABLE,
    }
}

/// Build the view. Pure: no IO, never fails.
pub fn compose(
    report: &TelemetryReport,
    camera: &ConfigReading,
    update: Option<UpdateStatus>,
    generated_at: DateTime<Local>,
) -> StatusView {
    let thermal = &report.thermal.snapshot;
    let service = &report.service.snapshot;
    let network = &report.network.snapshot;
    let wireless = network.wireless.as_ref();
    let link = wireless.and_then(|w| w.link.as_ref());
    let config = &camera.config;

    let metrics = MetricsView {
        cpu_usage: format_percent(report.compute.snapshot.cpu_usage_percent),
        temperature: format_temperature(thermal.temperature_c),
        voltage: format_voltage(thermal.voltage_v),
        throttled: Badge::new(
            format_throttle(thermal.throttled.as_ref()),
            throttle_health(thermal.throttled.as_ref()),
        ),
    };

    let service_view = ServiceView {
        service: Badge::new(&service.service_state, service_health(&service.service_state)),
        api: Badge::new(service.api_state.as_str(), api_health(service.api_state)),
        path_name: service.path_name.clone(),
        path_ready: Badge::new(yes_no(service.path_ready), path_health(service.path_ready)),
        readers: format_count(service.readers),
        tracks: format_count(service.tracks),
        source_type: service.source_type.clone(),
    };

    let network_view = NetworkView {
        interface: or_unavailable(&network.interface),
        ipv4: network.ipv4.clone().unwrap_or_else(|| UNAVAILABLE.to_string()),
        rx_rate: format_optional_rate(network.rx_bytes_per_sec),
        tx_rate: format_optional_rate(network.tx_bytes_per_sec),
        is_wireless: wireless.is_some(),
        ssid: link.map(|l| or_unavailable(&l.ssid)).unwrap_or_else(|| UNAVAILABLE.to_string()),
        link_quality: wireless
            .map(|w| or_unavailable(&w.link_quality))
            .unwrap_or_else(|| UNAVAILABLE.to_string()),
        wifi_rate: format_wifi_rate(link),
    };

    let camera_view = CameraView {
        vflip: config.vflip,
        hflip: config.hflip,
        resolution: resolution_label(config.width, config.height),
        awb: config.awb.clone(),
        mode: config.mode.clone(),
        af_mode: config.af_mode.clone(),
        lens_position: config
            .lens_position
            .value()
            .map(|v| v.to_string())
            .unwrap_or_default(),
        last_updated: camera
            .last_updated
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| "never".to_string()),
        notice: update.map(Notice::from),
    };

    let warnings = report
        .warnings()
        .chain(&camera.warnings)
        .cloned()
        .collect();

    StatusView {
        generated_at: generated_at.format(TIMESTAMP_FORMAT).to_string(),
        device: report.device.clone(),
        metrics,
        service: service_view,
        network: network_view,
        camera: camera_view,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraConfig, LensPosition};
    use crate::metrics::data::*;
    use chrono::TimeZone;

    fn report() -> TelemetryReport {
        TelemetryReport {
            compute: Collected::new(
                ComputeSnapshot {
                    cpu_usage_percent: Some(12.34),
                },
                vec![],
            ),
            thermal: Collected::new(
                ThermalSnapshot {
                    temperature_c: None,
                    voltage_v: Some(0.8563),
                    throttled: None,
                },
                vec!["Temperature unavailable: boom".into()],
            ),
            service: Collected::new(
                ServiceSnapshot {
                    service_state: "active".into(),
                    api_state: ApiState::Ok,
                    path_name: "cam".into(),
                    path_ready: Some(true),
                    readers: Some(2),
                    tracks: Some(1),
                    source_type: "rpiCameraSource".into(),
                },
                vec![],
            ),
            network: Collected::new(
                NetworkSnapshot {
                    interface: "wlan0".into(),
                    ipv4: Some("192.168.1.20".into()),
                    rx_bytes_per_sec: Some(1536.0),
                    tx_bytes_per_sec: None,
                    wireless: Some(WirelessInfo {
                        link_quality: "54/70 (-56 dBm)".into(),
                        link: Some(RadioLink {
                            ssid: "home".into(),
                            tx_bitrate: "72.2 MBit/s".into(),
                            rx_bitrate: String::new(),
                        }),
                    }),
                },
                vec!["Network rates unavailable: x".into()],
            ),
            device: DeviceInfo::default(),
        }
    }

    #[test]
    fn test_compose_formats_every_section() {
        let reading = ConfigReading {
            config: CameraConfig {
                vflip: true,
                awb: "auto".into(),
                lens_position: LensPosition::Set(2.5),
                ..CameraConfig::default().with_resolution(1920, 1080)
            },
            last_updated: None,
            warnings: vec!["Camera config unavailable: y".into()],
        };
        let at = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let view = compose(&report(), &reading, Some(UpdateStatus::Saved), at);

        assert_eq!(view.generated_at, "2024-05-01 12:30:00");
        assert_eq!(view.metrics.cpu_usage, "12.3%");
        assert_eq!(view.metrics.temperature, UNAVAILABLE);
        assert_eq!(view.metrics.voltage, "0.8563 V");
        assert_eq!(view.metrics.throttled.class, "badge warn");
        assert_eq!(view.service.service.class, "badge ok");
        assert_eq!(view.service.readers, "2");
        assert_eq!(view.network.rx_rate, "1.5 KB/s");
        assert_eq!(view.network.tx_rate, UNAVAILABLE);
        assert_eq!(view.network.wifi_rate, "TX 72.2 MBit/s");
        assert_eq!(view.camera.resolution, "1920x1080");
        assert_eq!(view.camera.lens_position, "2.5");
        assert_eq!(view.camera.last_updated, "never");
        assert_eq!(view.camera.notice.as_ref().map(|n| n.class), Some("notice ok"));
        assert_eq!(
            view.warnings,
            vec![
                "Temperature unavailable: boom",
                "Network rates unavailable: x",
                "Camera config unavailable: y",
            ]
        );
    }
}
