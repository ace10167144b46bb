//! HTTP handlers for the dashboard, status API and camera form.

use crate::camera::{CameraForm, ConfigReading, UpdateStatus};
use crate::metrics::Probes;
use crate::view::{compose, StatusView};
use crate::web::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, Json, Redirect},
    Form,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

/// Query string of the status page and API.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    /// Outcome code of the last camera update
    pub camera: Option<String>,
}

async fn read_camera_state<P: Probes + 'static>(state: &AppState<P>) -> ConfigReading {
    let store = state.store.clone();
    match tokio::task::spawn_blocking(move || store.read_state()).await {
        Ok(reading) => reading,
        Err(e) => {
            error!("camera config task failed: {}", e);
            ConfigReading {
                warnings: vec![format!("Camera config unavailable: {}", e)],
                ..Default::default()
            }
        }
    }
}

/// Composed status for one request.
pub async fn api_status<P: Probes + 'static>(
    State(state): State<AppState<P>>,
    Query(query): Query<StatusQuery>,
) -> Json<StatusView> {
    let report = state.collector.collect().await;
    let camera = read_camera_state(&state).await;
    let update = query.camera.as_deref().and_then(UpdateStatus::from_code);
    Json(compose(&report, &camera, update, Local::now()))
}

/// Apply the submitted camera settings and redirect back to the page.
pub async fn update_camera<P: Probes + 'static>(
    State(state): State<AppState<P>>,
    Form(form): Form<CameraForm>,
) -> Redirect {
    let status = match form.validate() {
        Err(status) => {
            info!("camera update rejected: {}", status.as_code());
            status
        }
        Ok(config) => {
            let store = state.store.clone();
            match tokio::task::spawn_blocking(move || store.save(&config)).await {
                Ok(Ok(())) => UpdateStatus::Saved,
                Ok(Err(e)) => {
                    error!("Failed to save camera configuration: {}", e);
                    UpdateStatus::SaveError
                }
                Err(e) => {
                    error!("camera save task failed: {}", e);
                    UpdateStatus::SaveError
                }
            }
        }
    };
    Redirect::to(&format!("/?camera={}", status.as_code()))
}

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "picam-status",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Serve the dashboard page; it renders `/api/status` client-side.
pub async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

/// Fallback for unknown routes.
pub async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}

const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Pi Camera Status</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Ubuntu, sans-serif;
            background: #f3f4f6;
            color: #1f2937;
            padding: 20px;
        }

        .container { max-width: 1100px; margin: 0 auto; }

        .header { margin-bottom: 24px; }
        .header h1 { font-size: 2rem; }
        .header p { color: #6b7280; }

        .grid {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(300px, 1fr));
            gap: 16px;
            margin-bottom: 16px;
        }

        .card {
            background: white;
            border-radius: 10px;
            padding: 20px;
            box-shadow: 0 4px 12px rgba(0,0,0,0.06);
        }

        .card h3 { margin-bottom: 12px; color: #374151; }

        .metric {
            display: flex;
            justify-content: space-between;
            padding: 6px 0;
            border-bottom: 1px solid #eee;
        }
        .metric:last-child { border-bottom: none; }
        .metric-label { color: #6b7280; }
        .metric-value { font-weight: 600; }

        .badge { padding: 2px 8px; border-radius: 999px; font-size: 0.85rem; }
        .badge.ok { background: #d1fae5; color: #065f46; }
        .badge.warn { background: #fef3c7; color: #92400e; }
        .badge.err { background: #fee2e2; color: #991b1b; }

        .notice { padding: 10px 14px; border-radius: 8px; margin-bottom: 16px; }
        .notice.ok { background: #d1fae5; }
        .notice.err { background: #fee2e2; }

        .warnings li { margin-left: 18px; color: #92400e; }

        form label { display: block; margin: 8px 0 4px; color: #6b7280; }
        form select, form input[type=text] { width: 100%; padding: 6px; }
        form button { margin-top: 12px; padding: 8px 16px; }
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>Pi Camera Status</h1>
            <p id="subtitle">Loading...</p>
        </div>
        <div id="notice"></div>
        <div class="grid">
            <div class="card"><h3>System</h3><div id="system"></div></div>
            <div class="card"><h3>Streaming</h3><div id="service"></div></div>
            <div class="card"><h3>Network</h3><div id="network"></div></div>
            <div class="card">
                <h3>Camera</h3>
                <form method="post" action="/camera-config">
                    <label><input type="checkbox" name="rpiCameraVFlip" id="vflip"> Vertical flip</label>
                    <label><input type="checkbox" name="rpiCameraHFlip" id="hflip"> Horizontal flip</label>
                    <label for="resolution">Resolution</label>
                    <select name="resolution" id="resolution">
                        <option value="">default</option>
                        <option value="1280x720">1280x720</option>
                        <option value="1920x1080">1920x1080</option>
                    </select>
                    <label for="awb">White balance</label>
                    <select name="rpiCameraAWB" id="awb">
                        <option value="">default</option>
                        <option>auto</option><option>incandescent</option><option>tungsten</option>
                        <option>fluorescent</option><option>indoor</option><option>daylight</option>
                        <option>cloudy</option><option>custom</option>
                    </select>
                    <label for="mode">Sensor mode</label>
                    <select name="rpiCameraMode" id="mode">
                        <option value="">default</option>
                        <option>2304:1296:10:P</option>
                        <option>1536:864:10:P</option>
                    </select>
                    <label for="afmode">Autofocus</label>
                    <select name="rpiCameraAfMode" id="afmode">
                        <option value="">default</option>
                        <option>auto</option><option>manual</option><option>continuous</option>
                    </select>
                    <label for="lens">Lens position</label>
                    <input type="text" name="rpiCameraLensPosition" id="lens">
                    <button type="submit">Save</button>
                </form>
                <p class="metric-label" id="updated"></p>
            </div>
        </div>
        <div class="card"><h3>Warnings</h3><ul class="warnings" id="warnings"></ul></div>
    </div>

    <script>
        function esc(value) {
            const div = document.createElement('div');
            div.textContent = String(value);
            return div.innerHTML;
        }

        function row(label, value) {
            return '<div class="metric"><span class="metric-label">' + esc(label) +
                '</span><span class="metric-value">' + value + '</span></div>';
        }

        function badge(b) {
            return '<span class="' + esc(b.class) + '">' + esc(b.label) + '</span>';
        }

        function render(v) {
            document.getElementById('subtitle').textContent =
                v.device.hostname + ' - ' + v.device.model + ' - generated ' + v.generated_at;

            document.getElementById('system').innerHTML =
                row('OS', esc(v.device.os_label)) +
                row('Camera', esc(v.device.camera)) +
                row('CPU', esc(v.metrics.cpu_usage)) +
                row('Temperature', esc(v.metrics.temperature)) +
                row('Voltage', esc(v.metrics.voltage)) +
                row('Throttled', badge(v.metrics.throttled));

            document.getElementById('service').innerHTML =
                row('Service', badge(v.service.service)) +
                row('API', badge(v.service.api)) +
                row('Path ' + v.service.path_name, badge(v.service.path_ready)) +
                row('Source', esc(v.service.source_type)) +
                row('Readers', esc(v.service.readers)) +
                row('Tracks', esc(v.service.tracks));

            let net = row('Interface', esc(v.network.interface)) +
                row('IPv4', esc(v.network.ipv4)) +
                row('RX', esc(v.network.rx_rate)) +
                row('TX', esc(v.network.tx_rate));
            if (v.network.is_wireless) {
                net += row('SSID', esc(v.network.ssid)) +
                    row('Link quality', esc(v.network.link_quality)) +
                    row('Bitrate', esc(v.network.wifi_rate));
            }
            document.getElementById('network').innerHTML = net;

            const cam = v.camera;
            document.getElementById('vflip').checked = cam.vflip;
            document.getElementById('hflip').checked = cam.hflip;
            document.getElementById('resolution').value = cam.resolution;
            document.getElementById('awb').value = cam.awb;
            document.getElementById('mode').value = cam.mode;
            document.getElementById('afmode').value = cam.af_mode;
            document.getElementById('lens').value = cam.lens_position;
            document.getElementById('updated').textContent = 'Last updated: ' + cam.last_updated;

            document.getElementById('notice').innerHTML = cam.notice
                ? '<div class="' + esc(cam.notice.class) + '">' + esc(cam.notice.message) + '</div>'
                : '';

            document.getElementById('warnings').innerHTML = v.warnings.length
                ? v.warnings.map(w => '<li>' + esc(w) + '</li>').join('')
                : '<li>none</li>';
        }

        async function refresh() {
            const camera = new URLSearchParams(window.location.search).get('camera');
            const url = '/api/status' + (camera ? '?camera=' + encodeURIComponent(camera) : '');
            try {
                const response = await fetch(url);
                render(await response.json());
            } catch (e) {
                document.getElementById('subtitle').textContent = 'Status unavailable: ' + e;
            }
        }

        refresh();
    </script>
</body>
</html>"#;
