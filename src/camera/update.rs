//! Validation of camera update requests and their outcome codes.

use crate::camera::config::{CameraConfig, LensPosition};
use serde::{Deserialize, Serialize};

/// Selectable resolutions as `(width, height)`.
pub const RESOLUTIONS: [(u32, u32); 2] = [(1280, 720), (1920, 1080)];

/// Allowed auto white balance modes.
pub const AWB_MODES: [&str; 8] = [
    "auto",
    "incandescent",
    "tungsten",
    "fluorescent",
    "indoor",
    "daylight",
    "cloudy",
    "custom",
];

/// Allowed sensor modes.
pub const SENSOR_MODES: [&str; 2] = ["2304:1296:10:P", "1536:864:10:P"];

/// Allowed autofocus modes.
pub const AF_MODES: [&str; 3] = ["auto", "manual", "continuous"];

/// Outcome of an update request, carried through the redirect as a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateStatus {
    Saved,
    SaveError,
    InvalidResolution,
    InvalidAwb,
    InvalidMode,
    InvalidAfMode,
    InvalidLensPosition,
}

impl UpdateStatus {
    /// Code used in the `camera` query parameter.
    pub fn as_code(&self) -> &'static str {
        match self {
            UpdateStatus::Saved => "saved",
            UpdateStatus::SaveError => "save-error",
            UpdateStatus::InvalidResolution => "invalid-resolution",
            UpdateStatus::InvalidAwb => "invalid-awb",
            UpdateStatus::InvalidMode => "invalid-mode",
            UpdateStatus::InvalidAfMode => "invalid-af-mode",
            UpdateStatus::InvalidLensPosition => "invalid-lens-position",
        }
    }

    /// Inverse of [`as_code`](Self::as_code); unknown codes are ignored.
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "saved" => UpdateStatus::Saved,
            "save-error" => UpdateStatus::SaveError,
            "invalid-resolution" => UpdateStatus::InvalidResolution,
            "invalid-awb" => UpdateStatus::InvalidAwb,
            "invalid-mode" => UpdateStatus::InvalidMode,
            "invalid-af-mode" => UpdateStatus::InvalidAfMode,
            "invalid-lens-position" => UpdateStatus::InvalidLensPosition,
            _ => return None,
        })
    }

    pub fn message(&self) -> &'static str {
        match self {
            UpdateStatus::Saved => "Camera configuration saved.",
            UpdateStatus::SaveError => "Failed to save camera configuration.",
            UpdateStatus::InvalidResolution => "Invalid resolution selection.",
            UpdateStatus::InvalidAwb => "Invalid AWB selection.",
            UpdateStatus::InvalidMode => "Invalid camera mode selection.",
            UpdateStatus::InvalidAfMode => "Invalid autofocus mode selection.",
            UpdateStatus::InvalidLensPosition => "Invalid lens position value.",
        }
    }

    /// CSS class of the notice banner.
    pub fn class(&self) -> &'static str {
        match self {
            UpdateStatus::Saved => "notice ok",
            _ => "notice err",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UpdateStatus::Saved)
    }
}

/// Parse a lens position typed by a person.
///
/// Either `.` or `,` is accepted as decimal separator, but at most one
/// separator may appear in total.
pub fn parse_lens_position(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let separators = trimmed.chars().filter(|c| *c == '.' || *c == ',').count();
    if separators > 1 {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse `WIDTHxHEIGHT` against the allow-list. Empty means "not set".
pub fn parse_resolution(input: &str) -> Option<(u32, u32)> {
    if input.is_empty() {
        return Some((0, 0));
    }
    let (w, h) = input.split_once('x')?;
    let parsed = (w.parse().ok()?, h.parse().ok()?);
    RESOLUTIONS.contains(&parsed).then_some(parsed)
}

/// Form value for a width/height pair, empty when not one of the choices.
pub fn resolution_label(width: u32, height: u32) -> String {
    if RESOLUTIONS.contains(&(width, height)) {
        format!("{}x{}", width, height)
    } else {
        String::new()
    }
}

fn allowed(value: &str, choices: &[&str]) -> bool {
    value.is_empty() || choices.contains(&value)
}

pub fn is_valid_awb(value: &str) -> bool {
    allowed(value, &AWB_MODES)
}

pub fn is_valid_mode(value: &str) -> bool {
    allowed(value, &SENSOR_MODES)
}

pub fn is_valid_af_mode(value: &str) -> bool {
    allowed(value, &AF_MODES)
}

/// Raw fields of the camera settings form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CameraForm {
    #[serde(rename = "rpiCameraVFlip")]
    pub vflip: Option<String>,
    #[serde(rename = "rpiCameraHFlip")]
    pub hflip: Option<String>,
    pub resolution: Option<String>,
    #[serde(rename = "rpiCameraAWB")]
    pub awb: Option<String>,
    #[serde(rename = "rpiCameraMode")]
    pub mode: Option<String>,
    #[serde(rename = "rpiCameraAfMode")]
    pub af_mode: Option<String>,
    #[serde(rename = "rpiCameraLensPosition")]
    pub lens_position: Option<String>,
}

fn checkbox(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).is_some_and(|v| !v.is_empty())
}

fn field(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

impl CameraForm {
    /// Check every field against its allow-list.
    ///
    /// The first invalid field decides the returned status.
    pub fn validate(&self) -> Result<CameraConfig, UpdateStatus> {
        let (width, height) =
            parse_resolution(&field(&self.resolution)).ok_or(UpdateStatus::InvalidResolution)?;

        let awb = field(&self.awb);
        if !is_valid_awb(&awb) {
            return Err(UpdateStatus::InvalidAwb);
        }
        let mode = field(&self.mode);
        if !is_valid_mode(&mode) {
            return Err(UpdateStatus::InvalidMode);
        }
        let af_mode = field(&self.af_mode);
        if !is_valid_af_mode(&af_mode) {
            return Err(UpdateStatus::InvalidAfMode);
        }

        let lens_position = match self.lens_position.as_deref().map(str::trim) {
            None => LensPosition::Untouched,
            Some("") => LensPosition::Cleared,
            Some(text) => LensPosition::Set(
                parse_lens_position(text).ok_or(UpdateStatus::InvalidLensPosition)?,
            ),
        };

        Ok(CameraConfig {
            vflip: checkbox(&self.vflip),
            hflip: checkbox(&self.hflip),
            width,
            height,
            awb,
            mode,
            af_mode,
            lens_position,
        })
    }
}
