//! Telemetry probes, collectors and snapshot types.
//!
//! This module samples CPU load, SoC temperature and throttling, the
//! streaming service's state, network throughput and radio quality, and
//! static device identification. Each collector degrades independently.

pub mod collector;
pub mod compute;
pub mod data;
pub mod device;
pub mod network;
pub mod probes;
pub mod service;
pub mod thermal;
pub mod traits;

// Re-export commonly used items
pub use collector::StatusCollector;
pub use data::{Collected, TelemetryReport};
pub use probes::{Deadline, LinuxProbes};
pub use traits::{Collector, ProbeContext, Probes};
