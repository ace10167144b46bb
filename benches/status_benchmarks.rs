use chrono::Local;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use picam_status::{
    camera::{edit, store, update::parse_lens_position, CameraConfig, ConfigReading, LensPosition},
    compose,
    metrics::{
        compute::{cpu_utilization, parse_proc_stat},
        data::*,
        network::{parse_net_dev, parse_wireless},
        thermal::decode_throttled,
    },
    view::format_rate,
    UpdateStatus,
};
use std::fs;

const DOC: &str = "\
logLevel: info
paths:
  cam:
    source: rpiCamera
    rpiCameraVFlip: false
    rpiCameraWidth: 1280
    rpiCameraHeight: 720
  doorbell:
    source: rtsp://10.0.0.5/stream
";

const NET_DEV: &str = "Inter-|   Receive\n face |bytes\n    lo: 1 1 0 0 0 0 0 0 1 1 0 0 0 0 0 0\n  eth0: 98765 10 0 0 0 0 0 0 54321 20 0 0 0 0 0 0\n  wlan0: 1000 10 0 0 0 0 0 0 5000 20 0 0 0 0 0 0\n";

fn sample_report() -> TelemetryReport {
    TelemetryReport {
        compute: Collected::new(
            ComputeSnapshot {
                cpu_usage_percent: Some(23.4),
            },
            vec![],
        ),
        thermal: Collected::new(
            ThermalSnapshot {
                temperature_c: Some(51.2),
                voltage_v: Some(0.8563),
                throttled: Some(decode_throttled(0x50005)),
            },
            vec![],
        ),
        service: Collected::new(ServiceSnapshot::unknown("cam"), vec!["MediaMTX API unavailable: x".into()]),
        network: Collected::new(
            NetworkSnapshot {
                interface: "wlan0".into(),
                ipv4: Some("192.168.1.20".into()),
                rx_bytes_per_sec: Some(153_600.0),
                tx_bytes_per_sec: Some(2_400_000.0),
                wireless: None,
            },
            vec![],
        ),
        device: DeviceInfo::default(),
    }
}

/// Benchmark procfs parsing
fn bench_procfs_parsing(c: &mut Criterion) {
    let first = "cpu  50 0 50 100 0 0 0 0 0 0\ncpu0 1 2 3 4 5 6 7\n";
    let second = "cpu  150 0 100 150 0 0 0 0 0 0\ncpu0 1 2 3 4 5 6 7\n";

    c.bench_function("cpu_utilization", |b| {
        b.iter(|| {
            let a = parse_proc_stat(first).expect("Should parse");
            let b = parse_proc_stat(second).expect("Should parse");
            cpu_utilization(a, b).expect("Should compute")
        })
    });

    c.bench_function("net_dev_parsing", |b| {
        b.iter(|| parse_net_dev(NET_DEV, "wlan0").expect("Should parse"))
    });

    let wireless = "Inter-| sta-|   Quality\n face | tus | link level noise\n wlan0: 0000   54.  -56.  -256 0 0 0 0 0 0\n";
    c.bench_function("wireless_parsing", |b| {
        b.iter(|| parse_wireless(wireless, "wlan0").expect("Should parse"))
    });
}

/// Benchmark rate formatting across unit boundaries
fn bench_format_rate(c: &mut Criterion) {
    for rate in [900.0, 1536.0, 5.0 * 1024.0 * 1024.0].iter() {
        c.bench_with_input(BenchmarkId::new("format_rate", rate), rate, |b, &rate| {
            b.iter(|| format_rate(rate))
        });
    }
}

/// Benchmark lens position parsing
fn bench_lens_parsing(c: &mut Criterion) {
    c.bench_function("lens_position_parsing", |b| {
        b.iter(|| {
            parse_lens_position("1,25");
            parse_lens_position("1.2.3")
        })
    });
}

/// Benchmark view composition and its JSON encoding
fn bench_compose(c: &mut Criterion) {
    let report = sample_report();
    let reading = ConfigReading::default();
    let now = Local::now();

    c.bench_function("compose_view", |b| {
        b.iter(|| compose(&report, &reading, Some(UpdateStatus::Saved), now))
    });

    let view = compose(&report, &reading, None, now);
    c.bench_function("view_json_serialization", |b| {
        b.iter(|| serde_json::to_string(&view).expect("Should serialize"))
    });
}

/// Benchmark the in-place document edit
fn bench_document_edit(c: &mut Criterion) {
    let config = CameraConfig {
        vflip: true,
        awb: "daylight".into(),
        lens_position: LensPosition::Set(2.5),
        ..CameraConfig::default().with_resolution(1920, 1080)
    };

    c.bench_function("document_edit", |b| {
        b.iter(|| edit::apply_camera_config(DOC, "cam", &config).expect("Should edit"))
    });
}

/// Benchmark a full save including backup and swap
fn bench_atomic_save(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let path = dir.path().join("mediamtx.yml");
    fs::write(&path, DOC).expect("Should write document");
    let config = CameraConfig::default().with_resolution(1280, 720);

    c.bench_function("atomic_save", |b| {
        b.iter(|| store::save_camera_config(&path, "cam", &config).expect("Should save"))
    });
}

criterion_group!(
    benches,
    bench_procfs_parsing,
    bench_format_rate,
    bench_lens_parsing,
    bench_compose,
    bench_document_edit,
    bench_atomic_save
);
criterion_main!(benches);
