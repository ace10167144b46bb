//! Camera settings stored in the MediaMTX configuration document.
//!
//! Only a fixed set of `rpiCamera*` keys under one path entry is read or
//! written; the rest of the document is carried through untouched.

pub mod config;
pub mod document;
pub mod edit;
pub mod store;
pub mod update;

pub use config::{CameraConfig, LensPosition, DEFAULT_PATH_NAME};
pub use store::{CameraStore, ConfigReading, DEFAULT_CONFIG_PATH};
pub use update::{CameraForm, UpdateStatus};
