use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    routing::get,
    Router,
};
use picam_status::{
    camera::{
        config::KEY_LENS_POSITION,
        store::{last_modified, load_camera_config, save_camera_config},
        CameraConfig, CameraStore, LensPosition,
    },
    error::{ConfigError, ProbeError, ProbeResult},
    metrics::{
        data::ApiState,
        device::DeviceCollector,
        network::NetworkCollector,
        probes::{CommandOutput, Deadline, InterfaceInfo, PROC_NET_DEV, PROC_NET_ROUTE, PROC_NET_WIRELESS, PROC_STAT},
        service::{MediaApiClient, ServiceCollector},
        Collector, ProbeContext, Probes, StatusCollector,
    },
    view::format_rate,
    create_app, AppState, ServiceConfig,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tower::ServiceExt;

/// Canned probe outputs. File reads pop their queue and repeat the last entry.
#[derive(Default)]
struct FakeProbes {
    files: Mutex<HashMap<PathBuf, VecDeque<String>>>,
    commands: HashMap<String, CommandOutput>,
    hanging: HashSet<String>,
    interfaces: Vec<InterfaceInfo>,
    ran: Mutex<Vec<String>>,
}

impl FakeProbes {
    fn file(self, path: &str, contents: &[&str]) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), contents.iter().map(|s| s.to_string()).collect());
        self
    }

    fn command(mut self, line: &str, stdout: &str) -> Self {
        self.commands.insert(
            line.to_string(),
            CommandOutput {
                success: true,
                status: "exit status: 0".to_string(),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        );
        self
    }

    fn hanging(mut self, line: &str) -> Self {
        self.hanging.insert(line.to_string());
        self
    }

    fn ran(&self) -> Vec<String> {
        self.ran.lock().unwrap().clone()
    }

    fn interface(mut self, name: &str, ip: Ipv4Addr) -> Self {
        self.interfaces.push(InterfaceInfo {
            name: name.to_string(),
            is_up: true,
            is_loopback: false,
            ipv4: vec![ip],
        });
        self
    }
}

impl Probes for FakeProbes {
    async fn read_file(&self, path: &Path) -> ProbeResult<String> {
        let mut files = self.files.lock().unwrap();
        let queue = files.get_mut(path).filter(|q| !q.is_empty());
        match queue {
            Some(queue) if queue.len() > 1 => Ok(queue.pop_front().unwrap()),
            Some(queue) => Ok(queue[0].clone()),
            None => Err(ProbeError::io(
                path,
                std::io::Error::from(std::io::ErrorKind::NotFound),
            )),
        }
    }

    async fn run_command(&self, program: &str, args: &[&str]) -> ProbeResult<CommandOutput> {
        let line = format!("{} {}", program, args.join(" "));
        self.ran.lock().unwrap().push(line.clone());
        if self.hanging.contains(&line) {
            std::future::pending::<()>().await;
        }
        self.commands.get(&line).cloned().ok_or_else(|| ProbeError::Spawn {
            program: program.to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }

    fn interfaces(&self) -> ProbeResult<Vec<InterfaceInfo>> {
        Ok(self.interfaces.clone())
    }
}

const PATH_OK_BODY: &str = r#"{"name":"cam","ready":true,"source":{"type":"rpiCameraSource","id":""},
    "readers":[{"type":"rtspSession","id":"a"},{"type":"webRTCSession","id":"b"}],"tracks":["H264"]}"#;

/// Serve a fixed answer for every path query on an ephemeral port.
async fn spawn_api(status: StatusCode, body: &'static str) -> String {
    let app = Router::new().route(
        "/v3/paths/get/:name",
        get(move || async move { (status, body) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn healthy_probes() -> FakeProbes {
    FakeProbes::default()
        .file(
            PROC_STAT,
            &["cpu  50 0 50 100 0 0 0 0 0 0\n", "cpu  150 0 100 150 0 0 0 0 0 0\n"],
        )
        .file(
            PROC_NET_ROUTE,
            &["Iface\tDestination\tGateway\tFlags\nwlan0\t00000000\t0101A8C0\t0003\n"],
        )
        .file(
            PROC_NET_DEV,
            &[
                "Inter-|   Receive\n face |bytes\n  wlan0: 1000 10 0 0 0 0 0 0 5000 20 0 0 0 0 0 0\n",
                "Inter-|   Receive\n face |bytes\n  wlan0: 2024 12 0 0 0 0 0 0 5512 22 0 0 0 0 0 0\n",
            ],
        )
        .file(
            PROC_NET_WIRELESS,
            &["Inter-| sta-|   Quality\n face | tus | link level noise\n wlan0: 0000   54.  -56.  -256 0 0 0 0 0 0\n"],
        )
        .command("vcgencmd measure_temp", "temp=48.3'C\n")
        .command("vcgencmd measure_volts", "volt=0.8563V\n")
        .command("vcgencmd get_throttled", "throttled=0x50005\n")
        .command("systemctl is-active mediamtx", "active\n")
        .command(
            "iw dev wlan0 link",
            "Connected to aa:bb:cc:dd:ee:ff (on wlan0)\n\tSSID: home\n\ttx bitrate: 72.2 MBit/s\n\trx bitrate: 65.0 MBit/s\n",
        )
        .interface("wlan0", Ipv4Addr::new(192, 168, 1, 20))
}

fn collector(probes: FakeProbes, api_url: &str, path_name: &str) -> StatusCollector<FakeProbes> {
    let api = MediaApiClient::new(api_url).unwrap();
    StatusCollector::with_probes(probes, ServiceCollector::new(api, "mediamtx", path_name))
        .with_cpu_sample(Duration::from_millis(10))
        .with_network_sample(Duration::from_millis(100))
        .with_device(DeviceCollector::new(vec![]))
}

#[tokio::test]
async fn test_full_collection_without_warnings() {
    let api = spawn_api(StatusCode::OK, PATH_OK_BODY).await;
    let report = collector(healthy_probes(), &api, "cam").collect().await;

    assert_eq!(report.warnings().count(), 0, "{:?}", report.warnings().collect::<Vec<_>>());
    assert_eq!(report.compute.snapshot.cpu_usage_percent, Some(75.0));

    let thermal = &report.thermal.snapshot;
    assert_eq!(thermal.temperature_c, Some(48.3));
    assert_eq!(thermal.voltage_v, Some(0.8563));
    let throttled = thermal.throttled.as_ref().unwrap();
    assert!(throttled.is_throttled);
    assert_eq!(throttled.flags.len(), 4);

    let service = &report.service.snapshot;
    assert_eq!(service.service_state, "active");
    assert_eq!(service.api_state, ApiState::Ok);
    assert_eq!(service.path_ready, Some(true));
    assert_eq!(service.readers, Some(2));
    assert_eq!(service.tracks, Some(1));
    assert_eq!(service.source_type, "rpiCameraSource");

    let network = &report.network.snapshot;
    assert_eq!(network.interface, "wlan0");
    assert_eq!(network.ipv4.as_deref(), Some("192.168.1.20"));
    assert_eq!(network.rx_bytes_per_sec.map(format_rate).as_deref(), Some("10.0 KB/s"));
    assert_eq!(network.tx_bytes_per_sec.map(format_rate).as_deref(), Some("5.0 KB/s"));
    let wireless = network.wireless.as_ref().unwrap();
    assert_eq!(wireless.link_quality, "54/70 (-56 dBm)");
    assert_eq!(wireless.link.as_ref().unwrap().ssid, "home");

    assert_eq!(report.device.model, "unknown");
    assert_eq!(report.device.camera, "Unknown camera");
}

#[tokio::test]
async fn test_every_probe_failing_degrades_to_warnings() {
    let api = spawn_api(StatusCode::NOT_FOUND, "path not found").await;
    let report = collector(FakeProbes::default(), &api, "cam").collect().await;

    assert_eq!(report.compute.snapshot.cpu_usage_percent, None);
    assert_eq!(report.thermal.snapshot.throttled, None);
    assert_eq!(report.service.snapshot.api_state, ApiState::Unavailable);
    assert_eq!(report.service.snapshot.path_ready, None);
    assert_eq!(report.network.snapshot.interface, "");

    let warnings: Vec<&String> = report.warnings().collect();
    let prefixes = [
        "CPU usage unavailable",
        "Temperature unavailable",
        "Voltage unavailable",
        "Throttling status unavailable",
        "MediaMTX service status unavailable",
        "MediaMTX API unavailable",
        "Default route unavailable",
        "Network interface unavailable",
    ];
    assert_eq!(warnings.len(), prefixes.len(), "{:?}", warnings);
    for (warning, prefix) in warnings.iter().zip(prefixes) {
        assert!(warning.starts_with(prefix), "{} should start with {}", warning, prefix);
    }
    assert!(warnings[5].ends_with("not found"));
}

#[tokio::test]
async fn test_api_status_codes() {
    let ok = spawn_api(StatusCode::OK, PATH_OK_BODY).await;
    let missing = spawn_api(StatusCode::NOT_FOUND, "").await;
    let broken = spawn_api(StatusCode::INTERNAL_SERVER_ERROR, "boom").await;

    let status = MediaApiClient::new(ok).unwrap().path_status("cam").await.unwrap();
    assert!(status.ready);
    assert_eq!(status.readers, 2);

    let err = MediaApiClient::new(missing).unwrap().path_status("cam").await.unwrap_err();
    assert!(matches!(err, ProbeError::NotFound(_)));

    let err = MediaApiClient::new(broken).unwrap().path_status("cam").await.unwrap_err();
    assert!(matches!(err, ProbeError::UnexpectedStatus(code) if code == StatusCode::INTERNAL_SERVER_ERROR));
}

#[tokio::test]
async fn test_api_error_yields_single_warning() {
    let broken = spawn_api(StatusCode::INTERNAL_SERVER_ERROR, "boom").await;
    let probes = FakeProbes::default().command("systemctl is-active mediamtx", "active\n");
    let service = ServiceCollector::new(MediaApiClient::new(broken).unwrap(), "mediamtx", "cam");

    let ctx = ProbeContext::new(&probes, Deadline::after(Duration::from_secs(2)));
    let collected = service.collect(&ctx).await;

    assert_eq!(collected.snapshot.service_state, "active");
    assert_eq!(collected.snapshot.api_state, ApiState::Unavailable);
    assert_eq!(collected.snapshot.readers, None);
    assert_eq!(collected.warnings.len(), 1);
    assert!(collected.warnings[0].contains("500"));
}

#[tokio::test]
async fn test_empty_path_name_skips_api() {
    let probes = FakeProbes::default().command("systemctl is-active mediamtx", "active\n");
    let service = ServiceCollector::new(MediaApiClient::new("http://127.0.0.1:9").unwrap(), "mediamtx", "");

    let ctx = ProbeContext::new(&probes, Deadline::after(Duration::from_secs(2)));
    let collected = service.collect(&ctx).await;

    assert_eq!(collected.snapshot.api_state, ApiState::Unknown);
    assert_eq!(collected.warnings.len(), 1);
    assert!(collected.warnings[0].contains("skipped"));
}

#[tokio::test]
async fn test_hanging_probe_is_abandoned_at_deadline() {
    let probes = healthy_probes().hanging("vcgencmd measure_temp");
    let collector = collector(probes, "http://127.0.0.1:9", "cam").with_deadline(Duration::from_millis(300));

    let started = Instant::now();
    let report = collector.collect().await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(report.compute.snapshot.cpu_usage_percent, Some(75.0));
    assert_eq!(report.thermal.snapshot.temperature_c, None);
    assert_eq!(
        report.thermal.warnings[0],
        "Temperature unavailable: deadline exceeded"
    );
}

#[tokio::test]
async fn test_wired_interface_skips_radio_details() {
    let probes = FakeProbes::default()
        .file(
            PROC_NET_ROUTE,
            &["Iface\tDestination\tGateway\tFlags\neth0\t00000000\t0101A8C0\t0003\n"],
        )
        .file(
            PROC_NET_DEV,
            &[
                "Inter-|   Receive\n face |bytes\n  eth0: 1000 10 0 0 0 0 0 0 5000 20 0 0 0 0 0 0\n",
                "Inter-|   Receive\n face |bytes\n  eth0: 3048 12 0 0 0 0 0 0 6024 22 0 0 0 0 0 0\n",
            ],
        )
        .file(
            PROC_NET_WIRELESS,
            &["Inter-| sta-|   Quality\n face | tus | link level noise\n wlan0: 0000   54.  -56.  -256 0 0 0 0 0 0\n"],
        )
        .command("iw dev eth0 link", "Not connected.\n")
        .interface("eth0", Ipv4Addr::new(10, 0, 0, 7));

    let ctx = ProbeContext::new(&probes, Deadline::after(Duration::from_secs(2)));
    let collected = NetworkCollector::new(Duration::from_millis(100)).collect(&ctx).await;

    let network = &collected.snapshot;
    assert_eq!(network.interface, "eth0");
    assert_eq!(network.ipv4.as_deref(), Some("10.0.0.7"));
    assert!(network.wireless.is_none());
    assert!(collected.warnings.is_empty(), "{:?}", collected.warnings);
    assert!(!collected.warnings.iter().any(|w| w.contains("WiFi details unavailable")));
    assert!(!probes.ran().iter().any(|line| line.starts_with("iw ")), "{:?}", probes.ran());
}

const DOC: &str = "\
logLevel: info
api: yes
paths:
  cam:
    source: rpiCamera
    rpiCameraVFlip: false
    rpiCameraWidth: 1280
    rpiCameraHeight: 720
    rpiCameraLensPosition: 1.0
  doorbell:
    source: rtsp://10.0.0.5/stream
    sourceOnDemand: true
";

fn write_doc(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mediamtx.yml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn test_save_then_load_round_trip() {
    let (_dir, path) = write_doc(DOC);
    let config = CameraConfig {
        vflip: true,
        hflip: true,
        awb: "daylight".into(),
        mode: "2304:1296:10:P".into(),
        af_mode: "manual".into(),
        lens_position: LensPosition::Set(2.5),
        ..CameraConfig::default().with_resolution(1920, 1080)
    };

    save_camera_config(&path, "cam", &config).unwrap();
    assert_eq!(load_camera_config(&path, "cam").unwrap(), config);
    assert!(fs::read_to_string(&path).unwrap().contains("rpiCameraLensPosition: 2.5"));
}

#[test]
fn test_unset_fields_are_removed() {
    let (_dir, path) = write_doc(DOC);
    save_camera_config(&path, "cam", &CameraConfig::default()).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(!text.contains("rpiCameraWidth"));
    assert!(!text.contains("rpiCameraHeight"));
    assert!(text.contains("rpiCameraHFlip: false"));
    // Untouched lens position survives.
    assert_eq!(
        load_camera_config(&path, "cam").unwrap().lens_position,
        LensPosition::Set(1.0)
    );

    let cleared = CameraConfig {
        lens_position: LensPosition::Cleared,
        ..Default::default()
    };
    save_camera_config(&path, "cam", &cleared).unwrap();
    assert!(!fs::read_to_string(&path).unwrap().contains(KEY_LENS_POSITION));
}

const COMMENTED_DOC: &str = "\
# MediaMTX configuration
logLevel: info   # verbose while testing
api: yes

paths:
  # camera path
  cam:
    source: rpiCamera   # keep this
    rpiCameraWidth: 1920
    rpiCameraHeight: 1080
  doorbell:
    source: \"rtsp://10.0.0.5/stream\"
    sourceOnDemand: yes
";

#[test]
fn test_save_preserves_unrelated_content() {
    let (_dir, path) = write_doc(COMMENTED_DOC);
    save_camera_config(&path, "cam", &CameraConfig::default().with_resolution(1280, 720)).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let expected = COMMENTED_DOC.replace(
        "    rpiCameraWidth: 1920\n    rpiCameraHeight: 1080\n",
        "    rpiCameraWidth: 1280\n    rpiCameraHeight: 720\n    rpiCameraVFlip: false\n    rpiCameraHFlip: false\n",
    );
    assert_eq!(text, expected);
    assert!(text.starts_with("# MediaMTX configuration\n"));
    assert!(text.contains("  # camera path\n"));
    assert!(text.contains("    source: rpiCamera   # keep this\n"));
}

#[test]
fn test_save_leaves_backup() {
    let (dir, path) = write_doc(DOC);
    save_camera_config(&path, "cam", &CameraConfig::default()).unwrap();

    let backups: Vec<PathBuf> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.to_string_lossy().contains("mediamtx.yml.bak-"))
        .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(fs::read_to_string(&backups[0]).unwrap(), DOC);
}

#[test]
fn test_invalid_values_fail_load() {
    let (_dir, path) = write_doc("paths:\n  cam:\n    rpiCameraVFlip: maybe\n");
    let err = load_camera_config(&path, "cam").unwrap_err();
    assert!(err.to_string().contains("invalid value for rpiCameraVFlip"));

    let (_dir, path) = write_doc("paths:\n  cam:\n    rpiCameraHeight: [720]\n");
    let err = load_camera_config(&path, "cam").unwrap_err();
    assert!(err.to_string().contains("invalid value for rpiCameraHeight"));
}

#[test]
fn test_missing_path_fails_without_writing() {
    let (dir, path) = write_doc(DOC);
    let err = save_camera_config(&path, "front", &CameraConfig::default()).unwrap_err();
    assert!(matches!(err, ConfigError::PathNotFound(ref name) if name == "front"));
    assert_eq!(fs::read_to_string(&path).unwrap(), DOC);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_last_modified() {
    let (dir, path) = write_doc(DOC);
    assert!(last_modified(&path).unwrap().is_some());
    assert!(last_modified(&dir.path().join("absent.yml")).unwrap().is_none());
}

fn test_app(config_path: &Path) -> Router {
    let config = ServiceConfig::default()
        .with_config_path(config_path)
        .with_request_deadline_ms(500);
    let state = AppState::new(
        collector(FakeProbes::default(), "http://127.0.0.1:9", "cam"),
        CameraStore::new(config_path, "cam"),
    );
    create_app(&config, state)
}

fn form_request(body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/camera-config")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

#[tokio::test]
async fn test_invalid_update_short_circuits() {
    let (_dir, path) = write_doc(DOC);
    let app = test_app(&path);

    let response = app.oneshot(form_request("rpiCameraAWB=sunset&resolution=1280x720")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?camera=invalid-awb");
    assert_eq!(fs::read_to_string(&path).unwrap(), DOC);
}

#[tokio::test]
async fn test_valid_update_saves() {
    let (_dir, path) = write_doc(DOC);
    let app = test_app(&path);

    let response = app
        .oneshot(form_request(
            "rpiCameraVFlip=on&resolution=1920x1080&rpiCameraAWB=cloudy&rpiCameraMode=&rpiCameraLensPosition=3%2C5",
        ))
        .await
        .unwrap();
    assert_eq!(location(&response), "/?camera=saved");

    let saved = load_camera_config(&path, "cam").unwrap();
    assert!(saved.vflip);
    assert!(!saved.hflip);
    assert_eq!((saved.width, saved.height), (1920, 1080));
    assert_eq!(saved.awb, "cloudy");
    assert_eq!(saved.lens_position, LensPosition::Set(3.5));
}

#[tokio::test]
async fn test_update_without_document_reports_save_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir.path().join("absent.yml"));

    let response = app.oneshot(form_request("resolution=1280x720")).await.unwrap();
    assert_eq!(location(&response), "/?camera=save-error");
}

#[tokio::test]
async fn test_status_endpoint_composes_view() {
    let (_dir, path) = write_doc(DOC);
    let app = test_app(&path);

    let response = app
        .oneshot(Request::get("/api/status?camera=saved").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let view: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(view["camera"]["notice"]["code"], "saved");
    assert_eq!(view["camera"]["resolution"], "1280x720");
    assert_eq!(view["camera"]["lens_position"], "1");
    assert_eq!(view["metrics"]["cpu_usage"], "unavailable");
    assert_eq!(view["service"]["api"]["class"], "badge err");
    assert!(view["warnings"].as_array().unwrap().len() >= 8);
}

#[tokio::test]
async fn test_health_and_dashboard_routes() {
    let (_dir, path) = write_doc(DOC);

    let response = test_app(&path)
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = test_app(&path)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = test_app(&path)
        .oneshot(Request::get("/nowhere").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
