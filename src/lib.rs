//! # picam_status - Raspberry Pi camera status service
//!
//! A small status service for a Raspberry Pi running the MediaMTX streaming
//! daemon with a camera attached. Each request samples the device, the
//! streaming service and the network, and reads the camera settings from
//! MediaMTX's YAML configuration, which can also be edited through the page.
//!
//! ## Features
//!
//! - **Partial-failure telemetry**: every probe degrades to an absent value
//!   plus a warning; a broken sensor never takes the page down
//! - **Camera settings editor**: a fixed set of `rpiCamera*` keys under one
//!   path entry, saved with a timestamped backup and an atomic swap
//! - **Web dashboard**: a static page rendering the JSON status API
//! - **Library + Binary**: use as a crate or standalone application
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use picam_status::{start_web_server, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::default()
//!         .with_port(8080)
//!         .with_config_path("/usr/local/etc/mediamtx.yml");
//!     start_web_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod camera;
pub mod error;
pub mod metrics;
pub mod view;
pub mod web;

// Re-export public API
pub use camera::{CameraConfig, CameraForm, CameraStore, ConfigReading, LensPosition, UpdateStatus};
pub use error::{ConfigError, ProbeError, Result, SystemError};
pub use metrics::{
    data::{DeviceInfo, TelemetryReport},
    Deadline, LinuxProbes, Probes, StatusCollector,
};
pub use view::{compose, StatusView};
pub use web::{create_app, start_web_server, AppState, ServiceConfig};

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8080;
