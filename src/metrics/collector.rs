//! Per-request telemetry aggregation.

use crate::error::ProbeResult;
use crate::metrics::{
    compute::CpuCollector,
    data::TelemetryReport,
    device::DeviceCollector,
    network::NetworkCollector,
    probes::{Deadline, LinuxProbes},
    service::{MediaApiClient, ServiceCollector},
    thermal::ThermalCollector,
    traits::{Collector, ProbeContext, Probes},
};
use std::time::Duration;
use tracing::debug;

/// Default deadline shared by all probes of one request.
pub const DEFAULT_REQUEST_DEADLINE: Duration = Duration::from_secs(2);

/// Runs every collector once per request.
///
/// Collectors run sequentially under one shared [`Deadline`]; a probe that
/// is still in flight when it expires is abandoned and reported as a
/// warning. Nothing here ever fails the whole report.
#[derive(Debug, Clone)]
pub struct StatusCollector<P = LinuxProbes> {
    probes: P,
    cpu: CpuCollector,
    thermal: ThermalCollector,
    service: ServiceCollector,
    network: NetworkCollector,
    device: DeviceCollector,
    deadline: Duration,
}

impl StatusCollector<LinuxProbes> {
    /// Collector against the local host with default sampling intervals.
    pub fn new(api_url: &str, service_unit: &str, path_name: &str) -> ProbeResult<Self> {
        let api = MediaApiClient::new(api_url)?;
        Ok(Self::with_probes(
            LinuxProbes::new(),
            ServiceCollector::new(api, service_unit, path_name),
        ))
    }
}

impl<P: Probes> StatusCollector<P> {
    /// Collector over arbitrary probes, default intervals.
    pub fn with_probes(probes: P, service: ServiceCollector) -> Self {
        Self {
            probes,
            cpu: CpuCollector::default(),
            thermal: ThermalCollector::new(),
            service,
            network: NetworkCollector::default(),
            device: DeviceCollector::default(),
            deadline: DEFAULT_REQUEST_DEADLINE,
        }
    }

    /// Set the CPU sampling interval.
    pub fn with_cpu_sample(mut self, interval: Duration) -> Self {
        self.cpu = CpuCollector::new(interval);
        self
    }

    /// Set the network sampling interval.
    pub fn with_network_sample(mut self, interval: Duration) -> Self {
        self.network = NetworkCollector::new(interval);
        self
    }

    /// Set the per-request deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Set the device collector (e.g. different device tree roots).
    pub fn with_device(mut self, device: DeviceCollector) -> Self {
        self.device = device;
        self
    }

    /// The probes this collector runs against.
    pub fn probes(&self) -> &P {
        &self.probes
    }

    /// Collect one report under a fresh deadline.
    pub async fn collect(&self) -> TelemetryReport {
        self.collect_with_deadline(Deadline::after(self.deadline)).await
    }

    /// Collect one report under the caller's deadline.
    pub async fn collect_with_deadline(&self, deadline: Deadline) -> TelemetryReport {
        let ctx = ProbeContext::new(&self.probes, deadline);

        let compute = self.cpu.collect(&ctx).await;
        let thermal = self.thermal.collect(&ctx).await;
        let service = self.service.collect(&ctx).await;
        let network = self.network.collect(&ctx).await;
        let device = self.device.collect(&ctx).await;

        let report = TelemetryReport {
            compute,
            thermal,
            service,
            network,
            device,
        };
        debug!("telemetry collected with {} warnings", report.warnings().count());
        report
    }
}
