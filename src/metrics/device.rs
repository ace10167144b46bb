//! Static device identification: board model, camera sensor, OS label.

use crate::metrics::data::DeviceInfo;
use crate::metrics::probes::{DEVICE_MODEL_PATHS, OS_RELEASE};
use crate::metrics::traits::{ProbeContext, Probes};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use sysinfo::System;
use tracing::debug;

/// Sensor codes searched for in the device tree, in priority order.
pub const CAMERA_CODES: [&str; 4] = ["imx708", "imx477", "imx219", "ov5647"];

/// Device tree roots scanned for camera overlays.
pub const DEVICE_TREE_ROOTS: [&str; 2] = ["/sys/firmware/devicetree/base", "/proc/device-tree"];

/// Bytes read from each device tree property.
const PROPERTY_PREFIX_LIMIT: u64 = 8192;

/// Parse `KEY=value` lines of an os-release file.
pub fn parse_os_release(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.trim_matches('"').to_string()))
        .collect()
}

/// Display label: PRETTY_NAME, else "NAME VERSION", else whichever is known.
pub fn build_os_label(pretty: &str, name: &str, version: &str) -> String {
    if !pretty.is_empty() {
        return pretty.to_string();
    }
    match (name, version) {
        ("unknown", "unknown") => "unknown".to_string(),
        (name, "unknown") => name.to_string(),
        ("unknown", version) => version.to_string(),
        (name, version) => format!("{} {}", name, version),
    }
}

/// First known sensor code contained in `data`, case-insensitively.
pub fn extract_camera_code(data: &str) -> Option<&'static str> {
    let lower = data.to_lowercase();
    CAMERA_CODES.iter().copied().find(|code| lower.contains(code))
}

/// Friendly name for a sensor code.
pub fn camera_model_name(code: &str) -> String {
    match code {
        "ov5647" => "Pi Camera v1 (ov5647)".to_string(),
        "imx219" => "Pi Camera v2 (imx219)".to_string(),
        "imx477" => "HQ Camera (imx477)".to_string(),
        "imx708" => "Pi Camera v3 (imx708)".to_string(),
        other => format!("Unknown camera ({})", other),
    }
}

fn read_prefix(path: &Path) -> std::io::Result<String> {
    let mut buf = Vec::new();
    fs::File::open(path)?
        .take(PROPERTY_PREFIX_LIMIT)
        .read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn scan_dir(dir: &Path) -> Option<&'static str> {
    let entries = fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();
        // Device tree symlinks point back up the tree.
        if file_type.is_symlink() {
            continue;
        }
        let found = if file_type.is_dir() {
            scan_dir(&path)
        } else {
            read_prefix(&path).ok().and_then(|data| extract_camera_code(&data))
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Walk each device tree root until a sensor code is found.
pub fn find_camera_code(roots: &[PathBuf]) -> Option<&'static str> {
    roots.iter().find_map(|root| {
        let resolved = fs::canonicalize(root).ok()?;
        scan_dir(&resolved)
    })
}

/// Device/OS collector. Nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct DeviceCollector {
    device_tree_roots: Vec<PathBuf>,
}

impl Default for DeviceCollector {
    fn default() -> Self {
        Self::new(DEVICE_TREE_ROOTS.iter().map(PathBuf::from).collect())
    }
}

impl DeviceCollector {
    pub fn new(device_tree_roots: Vec<PathBuf>) -> Self {
        Self { device_tree_roots }
    }

    async fn device_model<P: Probes>(&self, ctx: &ProbeContext<'_, P>) -> String {
        for path in DEVICE_MODEL_PATHS {
            if let Ok(content) = ctx.read_file(Path::new(path)).await {
                let model = content.trim_end_matches('\0').trim();
                if !model.is_empty() {
                    return model.to_string();
                }
            }
        }
        "unknown".to_string()
    }

    async fn camera_model<P: Probes>(&self, ctx: &ProbeContext<'_, P>) -> String {
        let roots = self.device_tree_roots.clone();
        let handle = tokio::task::spawn_blocking(move || find_camera_code(&roots));
        match ctx.deadline.guard(async { Ok(handle.await) }).await {
            Ok(Ok(Some(code))) => camera_model_name(code),
            Ok(Ok(None)) => "Unknown camera".to_string(),
            Ok(Err(err)) => {
                debug!("camera scan task failed: {}", err);
                "Unknown camera".to_string()
            }
            Err(err) => {
                debug!("camera scan abandoned: {}", err);
                "Unknown camera".to_string()
            }
        }
    }

    /// Resolve all device strings for this call.
    pub async fn collect<P: Probes>(&self, ctx: &ProbeContext<'_, P>) -> DeviceInfo {
        let fields = match ctx.read_file(Path::new(OS_RELEASE)).await {
            Ok(content) => parse_os_release(&content),
            Err(err) => {
                debug!("os-release unavailable: {}", err);
                HashMap::new()
            }
        };
        let field = |key: &str| fields.get(key).filter(|v| !v.is_empty()).cloned();

        let os_name = field("NAME").unwrap_or_else(|| "unknown".to_string());
        let os_version = field("VERSION")
            .or_else(|| field("VERSION_ID"))
            .unwrap_or_else(|| "unknown".to_string());
        let pretty = field("PRETTY_NAME").unwrap_or_default();

        DeviceInfo {
            hostname: System::host_name()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
            model: self.device_model(ctx).await,
            camera: self.camera_model(ctx).await,
            os_label: build_os_label(&pretty, &os_name, &os_version),
            os_name,
            os_version,
        }
    }
}
