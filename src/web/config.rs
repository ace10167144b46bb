//! Service configuration.

use crate::camera::{CameraStore, DEFAULT_CONFIG_PATH, DEFAULT_PATH_NAME};
use crate::error::{Result, SystemError};
use crate::metrics::collector::DEFAULT_REQUEST_DEADLINE;
use crate::metrics::compute::DEFAULT_CPU_SAMPLE;
use crate::metrics::network::DEFAULT_NET_SAMPLE;
use crate::metrics::service::{DEFAULT_API_URL, DEFAULT_SERVICE_UNIT};
use crate::metrics::probes::MAX_DEADLINE;
use crate::metrics::StatusCollector;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the status service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Host to bind the server to
    pub host: String,
    /// Port to bind the server to
    pub port: u16,
    /// Whether to enable CORS
    pub enable_cors: bool,
    /// Base URL of the MediaMTX API
    pub api_url: String,
    /// MediaMTX path entry holding the camera
    pub path_name: String,
    /// systemd unit of the streaming service
    pub service_unit: String,
    /// MediaMTX configuration document
    pub config_path: PathBuf,
    /// Deadline shared by all probes of one request
    pub request_deadline_ms: u64,
    pub cpu_sample_ms: u64,
    pub net_sample_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_WEB_PORT,
            enable_cors: false,
            api_url: DEFAULT_API_URL.to_string(),
            path_name: DEFAULT_PATH_NAME.to_string(),
            service_unit: DEFAULT_SERVICE_UNIT.to_string(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            request_deadline_ms: DEFAULT_REQUEST_DEADLINE.as_millis() as u64,
            cpu_sample_ms: DEFAULT_CPU_SAMPLE.as_millis() as u64,
            net_sample_ms: DEFAULT_NET_SAMPLE.as_millis() as u64,
        }
    }
}

impl ServiceConfig {
    /// Create a new configuration with custom host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enable or disable CORS.
    pub fn with_cors(mut self, enable_cors: bool) -> Self {
        self.enable_cors = enable_cors;
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_path_name(mut self, path_name: impl Into<String>) -> Self {
        self.path_name = path_name.into();
        self
    }

    pub fn with_service_unit(mut self, unit: impl Into<String>) -> Self {
        self.service_unit = unit.into();
        self
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Set the per-request probe deadline in milliseconds.
    pub fn with_request_deadline_ms(mut self, ms: u64) -> Self {
        self.request_deadline_ms = ms;
        self
    }

    /// Set the CPU and network sampling intervals in milliseconds.
    pub fn with_sample_intervals_ms(mut self, cpu_ms: u64, net_ms: u64) -> Self {
        self.cpu_sample_ms = cpu_ms;
        self.net_sample_ms = net_ms;
        self
    }

    /// Get the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check the values that cannot be caught by the type system.
    pub fn validate(&self) -> Result<()> {
        if self.request_deadline_ms == 0 {
            return Err(SystemError::config_error("request deadline must be positive"));
        }
        let max_ms = MAX_DEADLINE.as_millis() as u64;
        if self.request_deadline_ms > max_ms {
            return Err(SystemError::config_error(format!(
                "request deadline {}ms exceeds the {}ms limit",
                self.request_deadline_ms, max_ms
            )));
        }
        let sampling = self.cpu_sample_ms.saturating_add(self.net_sample_ms);
        if sampling >= self.request_deadline_ms {
            return Err(SystemError::config_error(format!(
                "sampling intervals ({}ms) leave no room in the {}ms request deadline",
                sampling, self.request_deadline_ms
            )));
        }
        Ok(())
    }

    /// Telemetry collector for the local host.
    pub fn build_collector(&self) -> Result<StatusCollector> {
        let collector = StatusCollector::new(&self.api_url, &self.service_unit, &self.path_name)
            .map_err(|e| SystemError::config_error(format!("MediaMTX API client: {}", e)))?;
        Ok(collector
            .with_deadline(Duration::from_millis(self.request_deadline_ms))
            .with_cpu_sample(Duration::from_millis(self.cpu_sample_ms))
            .with_network_sample(Duration::from_millis(self.net_sample_ms)))
    }

    pub fn camera_store(&self) -> CameraStore {
        CameraStore::new(&self.config_path, &self.path_name)
    }
}
