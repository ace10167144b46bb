//! Presentation of the collected status.

pub mod compose;
pub mod format;

pub use compose::{compose, StatusView};
pub use format::{format_rate, HealthClass};
