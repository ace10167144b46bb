//! Load and save of the camera settings with atomic backup-and-swap.

use crate::camera::config::CameraConfig;
use crate::camera::{document, edit};
use crate::error::ConfigError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, PersistError};
use tracing::{debug, info, warn};

/// Default location of the MediaMTX configuration document.
pub const DEFAULT_CONFIG_PATH: &str = "/usr/local/etc/mediamtx.yml";

/// Load the camera settings for `path_name`.
pub fn load_camera_config(path: &Path, path_name: &str) -> Result<CameraConfig, ConfigError> {
    let text = fs::read_to_string(path)?;
    let root = document::parse(&text)?;
    let node = document::find_path_node(&root, path_name)?;
    document::read_camera_config(node)
}

/// Apply `config` to the document at `path` and replace it atomically.
///
/// The file is re-read on every call; whatever another writer saved in the
/// meantime is the base of this edit.
pub fn save_camera_config(path: &Path, path_name: &str, config: &CameraConfig) -> Result<(), ConfigError> {
    let text = fs::read_to_string(path)?;
    let edited = edit::apply_camera_config(&text, path_name, config)?;
    commit(path, path_name, &edited)?;
    info!("camera configuration for {:?} saved to {}", path_name, path.display());
    Ok(())
}

/// Re-parse `edited`, read the path entry back, and only then swap it into
/// place.
fn commit(path: &Path, path_name: &str, edited: &str) -> Result<(), ConfigError> {
    let root = serde_yaml::from_str::<serde_yaml::Value>(edited).map_err(ConfigError::Validation)?;
    document::read_camera_config(document::find_path_node(&root, path_name)?)?;
    persist_atomically(path, edited.as_bytes())
}

/// `<file>.bak-YYYYmmdd-HHMMSS` next to `path`.
pub fn backup_path(path: &Path, at: DateTime<Local>) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".bak-{}", at.format("%Y%m%d-%H%M%S")));
    PathBuf::from(name)
}

fn persist_error(path: &Path, source: io::Error) -> ConfigError {
    ConfigError::Persist {
        path: path.display().to_string(),
        source,
    }
}

/// Write `contents` to a temp file beside `path`, move the original to a
/// timestamped backup, then move the temp file into place.
fn persist_atomically(path: &Path, contents: &[u8]) -> Result<(), ConfigError> {
    persist_with(path, contents, |tmp, target| tmp.persist(target).map(drop))
}

/// [`persist_atomically`] with the final move supplied by the caller. When
/// `replace` fails the backup is moved back to `path`.
fn persist_with<F>(path: &Path, contents: &[u8], replace: F) -> Result<(), ConfigError>
where
    F: FnOnce(NamedTempFile, &Path) -> Result<(), PersistError>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let prefix = format!(
        "{}.tmp-",
        path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
    );

    // Dropping `tmp` on any early return removes the temp file.
    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .tempfile_in(dir)
        .map_err(|e| persist_error(path, e))?;
    tmp.write_all(contents).map_err(|e| persist_error(path, e))?;
    tmp.as_file().sync_all().map_err(|e| persist_error(path, e))?;

    let metadata = fs::metadata(path).map_err(|e| persist_error(path, e))?;
    fs::set_permissions(tmp.path(), metadata.permissions()).map_err(|e| persist_error(path, e))?;

    let backup = backup_path(path, Local::now());
    fs::rename(path, &backup).map_err(|e| persist_error(path, e))?;
    debug!("previous configuration moved to {}", backup.display());

    if let Err(err) = replace(tmp, path) {
        warn!(
            "replacing {} failed, restoring {}: {}",
            path.display(),
            backup.display(),
            err.error
        );
        if let Err(restore) = fs::rename(&backup, path) {
            warn!("restoring {} failed: {}", path.display(), restore);
        }
        return Err(persist_error(path, err.error));
    }
    Ok(())
}

/// Modification time of the document; `None` when it does not exist.
pub fn last_modified(path: &Path) -> Result<Option<DateTime<Local>>, ConfigError> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(Some(DateTime::<Local>::from(metadata.modified()?))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Camera settings plus everything that went wrong reading them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigReading {
    pub config: CameraConfig,
    pub last_updated: Option<DateTime<Local>>,
    pub warnings: Vec<String>,
}

/// Location of the camera settings: document path and path entry name.
#[derive(Debug, Clone)]
pub struct CameraStore {
    config_path: PathBuf,
    path_name: String,
}

impl CameraStore {
    pub fn new(config_path: impl Into<PathBuf>, path_name: impl Into<String>) -> Self {
        Self {
            config_path: config_path.into(),
            path_name: path_name.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn path_name(&self) -> &str {
        &self.path_name
    }

    pub fn load(&self) -> Result<CameraConfig, ConfigError> {
        load_camera_config(&self.config_path, &self.path_name)
    }

    pub fn save(&self, config: &CameraConfig) -> Result<(), ConfigError> {
        save_camera_config(&self.config_path, &self.path_name, config)
    }

    pub fn last_modified(&self) -> Result<Option<DateTime<Local>>, ConfigError> {
        last_modified(&self.config_path)
    }

    /// Load settings and mtime, turning failures into warnings.
    pub fn read_state(&self) -> ConfigReading {
        let mut warnings = Vec::new();

        let config = self.load().unwrap_or_else(|err| {
            debug!("camera config load failed: {}", err);
            warnings.push(format!("Camera config unavailable: {}", err));
            CameraConfig::default()
        });

        let last_updated = self.last_modified().unwrap_or_else(|err| {
            debug!("camera config mtime failed: {}", err);
            warnings.push(format!("Camera update time unavailable: {}", err));
            None
        });

        ConfigReading {
            config,
            last_updated,
            warnings,
        }
    }
}
