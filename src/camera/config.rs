//! The editable camera settings.

use serde::{Deserialize, Serialize};

pub const KEY_VFLIP: &str = "rpiCameraVFlip";
pub const KEY_HFLIP: &str = "rpiCameraHFlip";
pub const KEY_WIDTH: &str = "rpiCameraWidth";
pub const KEY_HEIGHT: &str = "rpiCameraHeight";
pub const KEY_AWB: &str = "rpiCameraAWB";
pub const KEY_MODE: &str = "rpiCameraMode";
pub const KEY_AF_MODE: &str = "rpiCameraAfMode";
pub const KEY_LENS_POSITION: &str = "rpiCameraLensPosition";

/// Default MediaMTX path entry holding the camera keys.
pub const DEFAULT_PATH_NAME: &str = "cam";

/// Lens position edit intent.
///
/// A plain `Option<f64>` cannot tell "leave the key alone" from "delete the
/// key", so the cleared state is explicit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum LensPosition {
    /// Leave whatever the document holds
    #[default]
    Untouched,
    /// Write this value
    Set(f64),
    /// Remove the key
    Cleared,
}

impl LensPosition {
    /// The value, if one is set.
    pub fn value(&self) -> Option<f64> {
        match self {
            LensPosition::Set(value) => Some(*value),
            _ => None,
        }
    }
}

/// Camera keys under the configured MediaMTX path.
///
/// Zero and the empty string mean "not set"; saving a "not set" field
/// removes its key from the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub vflip: bool,
    pub hflip: bool,
    pub width: u32,
    pub height: u32,
    /// Auto white balance mode
    pub awb: String,
    /// Sensor mode descriptor, e.g. "2304:1296:10:P"
    pub mode: String,
    /// Autofocus mode
    pub af_mode: String,
    pub lens_position: LensPosition,
}

impl CameraConfig {
    /// Set both resolution fields.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}
