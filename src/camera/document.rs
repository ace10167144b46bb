//! Typed key access on the YAML tree of the MediaMTX configuration.
//!
//! Reads go through a generic [`Value`] tree; writes happen on the text in
//! [`crate::camera::edit`].

use crate::camera::config::*;
use crate::error::ConfigError;
use serde_yaml::{Mapping, Value};

/// Parse a document into a tree.
pub fn parse(text: &str) -> Result<Value, ConfigError> {
    serde_yaml::from_str(text).map_err(ConfigError::Parse)
}

fn root_mapping(root: &Value) -> Result<&Mapping, ConfigError> {
    root.as_mapping().ok_or(ConfigError::InvalidRoot)
}

/// Locate `paths.<name>`.
pub fn find_path_node<'a>(root: &'a Value, name: &str) -> Result<&'a Mapping, ConfigError> {
    let paths = root_mapping(root)?
        .get("paths")
        .and_then(Value::as_mapping)
        .ok_or(ConfigError::PathsNotFound)?;
    paths
        .get(name)
        .and_then(Value::as_mapping)
        .ok_or_else(|| ConfigError::PathNotFound(name.to_string()))
}

fn untagged(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untagged(&tagged.value),
        other => other,
    }
}

/// Scalar text of a present value; `Ok(None)` for null or blank.
fn scalar_text(
    mapping: &Mapping,
    key: &'static str,
    expected: &'static str,
) -> Result<Option<String>, ConfigError> {
    let text = match mapping.get(key).map(untagged) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(_) => return Err(ConfigError::InvalidValue { key, expected }),
    };
    Ok(Some(text).filter(|t| !t.is_empty()))
}

fn parse_bool_literal(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Read a boolean key.
pub fn get_bool(mapping: &Mapping, key: &'static str) -> Result<Option<bool>, ConfigError> {
    const EXPECTED: &str = "a boolean";
    match scalar_text(mapping, key, EXPECTED)? {
        None => Ok(None),
        Some(text) => parse_bool_literal(&text)
            .map(Some)
            .ok_or(ConfigError::InvalidValue { key, expected: EXPECTED }),
    }
}

/// Read a non-negative integer key.
pub fn get_u32(mapping: &Mapping, key: &'static str) -> Result<Option<u32>, ConfigError> {
    const EXPECTED: &str = "an integer";
    match scalar_text(mapping, key, EXPECTED)? {
        None => Ok(None),
        Some(text) => text
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, expected: EXPECTED }),
    }
}

/// Read a floating-point key.
pub fn get_f64(mapping: &Mapping, key: &'static str) -> Result<Option<f64>, ConfigError> {
    const EXPECTED: &str = "a number";
    match scalar_text(mapping, key, EXPECTED)? {
        None => Ok(None),
        Some(text) => text
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or(ConfigError::InvalidValue { key, expected: EXPECTED }),
    }
}

/// Read a string key.
pub fn get_string(mapping: &Mapping, key: &'static str) -> Result<Option<String>, ConfigError> {
    scalar_text(mapping, key, "a string")
}

/// Read every recognized key into a [`CameraConfig`].
pub fn read_camera_config(node: &Mapping) -> Result<CameraConfig, ConfigError> {
    let lens_position = match get_f64(node, KEY_LENS_POSITION)? {
        Some(value) => LensPosition::Set(value),
        None => LensPosition::Untouched,
    };

    Ok(CameraConfig {
        vflip: get_bool(node, KEY_VFLIP)?.unwrap_or(false),
        hflip: get_bool(node, KEY_HFLIP)?.unwrap_or(false),
        width: get_u32(node, KEY_WIDTH)?.unwrap_or(0),
        height: get_u32(node, KEY_HEIGHT)?.unwrap_or(0),
        awb: get_string(node, KEY_AWB)?.unwrap_or_default(),
        mode: get_string(node, KEY_MODE)?.unwrap_or_default(),
        af_mode: get_string(node, KEY_AF_MODE)?.unwrap_or_default(),
        lens_position,
    })
}
