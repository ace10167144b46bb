//! Streaming service reachability: supervisor state and the MediaMTX path API.

use crate::error::{ProbeError, ProbeResult};
use crate::metrics::data::{ApiState, Collected, ServiceSnapshot};
use crate::metrics::traits::{Collector, ProbeContext, Probes};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default MediaMTX API base URL.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:9997";
/// Default systemd unit of the streaming daemon.
pub const DEFAULT_SERVICE_UNIT: &str = "mediamtx";
/// Per-request timeout of the path status call.
pub const API_TIMEOUT: Duration = Duration::from_secs(2);

/// Fields of `GET /v3/paths/get/<name>` this service reads.
#[derive(Debug, Deserialize)]
struct PathResponse {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    source: Option<PathSource>,
    #[serde(default)]
    readers: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    tracks: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct PathSource {
    #[serde(rename = "type", default)]
    kind: String,
}

/// Runtime state of one MediaMTX path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStatus {
    pub ready: bool,
    /// Source type, "none" when no source is attached
    pub source_type: String,
    pub readers: usize,
    pub tracks: usize,
}

impl PathStatus {
    fn from_response(response: PathResponse) -> Self {
        let source_type = response
            .source
            .map(|source| source.kind)
            .filter(|kind| !kind.is_empty())
            .unwrap_or_else(|| "none".to_string());

        Self {
            ready: response.ready,
            source_type,
            readers: response.readers.map_or(0, |r| r.len()),
            tracks: response.tracks.map_or(0, |t| t.len()),
        }
    }
}

/// Thin client for the MediaMTX control API.
#[derive(Debug, Clone)]
pub struct MediaApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl MediaApiClient {
    /// Build a client with the default request timeout.
    pub fn new(base_url: impl Into<String>) -> ProbeResult<Self> {
        Self::with_timeout(base_url, API_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> ProbeResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// URL of the path status resource; the path name is escaped as one segment.
    pub fn path_url(&self, path_name: &str) -> ProbeResult<Url> {
        let mut url = Url::parse(self.base_url.trim_end_matches('/'))
            .map_err(|e| ProbeError::parse("API URL", e))?;
        url.path_segments_mut()
            .map_err(|_| ProbeError::parse("API URL", "cannot be a base"))?
            .pop_if_empty()
            .extend(["v3", "paths", "get", path_name]);
        Ok(url)
    }

    /// Query the status of one path.
    ///
    /// 404 maps to [`ProbeError::NotFound`]; any other non-2xx status maps to
    /// [`ProbeError::UnexpectedStatus`].
    pub async fn path_status(&self, path_name: &str) -> ProbeResult<PathStatus> {
        let url = self.path_url(path_name)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProbeError::NotFound(format!("path {:?}", path_name)));
        }
        if !status.is_success() {
            return Err(ProbeError::UnexpectedStatus(status));
        }

        let body: PathResponse = response.json().await?;
        Ok(PathStatus::from_response(body))
    }
}

/// Supervisor state from `systemctl is-active` output.
///
/// Non-empty output is the state even when the command failed, since the
/// supervisor reports e.g. "failed" or "inactive" with a non-zero exit.
pub fn service_state_from_output(
    success: bool,
    status: &str,
    combined_output: &str,
) -> ProbeResult<String> {
    let state = combined_output.trim();
    if !state.is_empty() {
        return Ok(state.to_string());
    }
    if !success {
        return Err(ProbeError::CommandFailed {
            program: "systemctl".to_string(),
            status: status.to_string(),
        });
    }
    Err(ProbeError::Empty("status"))
}

/// Remote-service collector.
#[derive(Debug, Clone)]
pub struct ServiceCollector {
    api: MediaApiClient,
    unit: String,
    path_name: String,
}

impl ServiceCollector {
    pub fn new(api: MediaApiClient, unit: impl Into<String>, path_name: impl Into<String>) -> Self {
        Self {
            api,
            unit: unit.into(),
            path_name: path_name.into(),
        }
    }

    pub async fn service_state<P: Probes>(&self, ctx: &ProbeContext<'_, P>) -> ProbeResult<String> {
        let output = ctx
            .run_command("systemctl", &["is-active", self.unit.as_str()])
            .await?;
        let combined = format!("{}{}", output.stdout, output.stderr);
        service_state_from_output(output.success, &output.status, &combined)
    }
}

impl Collector for ServiceCollector {
    type Snapshot = ServiceSnapshot;

    async fn collect<P: Probes>(&self, ctx: &ProbeContext<'_, P>) -> Collected<ServiceSnapshot> {
        let mut snapshot = ServiceSnapshot::unknown(self.path_name.clone());
        let mut warnings = Vec::new();

        match self.service_state(ctx).await {
            Ok(state) => snapshot.service_state = state,
            Err(err) => warnings.push(format!("MediaMTX service status unavailable: {}", err)),
        }

        if self.path_name.is_empty() {
            warnings.push("MediaMTX API query skipped: no path name configured".to_string());
            return Collected::new(snapshot, warnings);
        }

        match ctx.deadline.guard(self.api.path_status(&self.path_name)).await {
            Ok(path) => {
                snapshot.api_state = ApiState::Ok;
                snapshot.path_ready = Some(path.ready);
                snapshot.source_type = path.source_type;
                snapshot.readers = Some(path.readers);
                snapshot.tracks = Some(path.tracks);
            }
            Err(err) => {
                debug!("MediaMTX API probe failed: {}", err);
                snapshot.api_state = ApiState::Unavailable;
                warnings.push(format!("MediaMTX API unavailable: {}", err));
            }
        }

        Collected::new(snapshot, warnings)
    }
}
