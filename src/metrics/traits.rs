//! Traits for telemetry collection.

use crate::error::ProbeResult;
use crate::metrics::data::Collected;
use crate::metrics::probes::{CommandOutput, Deadline, InterfaceInfo};
use std::future::Future;
use std::path::Path;

/// Access to the host's external fact sources.
///
/// Each method wraps exactly one primitive (a file read, a command
/// invocation, the interface address table) and returns a single value or an
/// error. Collectors never touch the host directly, which keeps them testable
/// against canned outputs.
pub trait Probes: Send + Sync {
    /// Read a whole file (usually a procfs pseudo-file) as text.
    fn read_file(&self, path: &Path) -> impl Future<Output = ProbeResult<String>> + Send;

    /// Run a command to completion and capture its output.
    ///
    /// A non-zero exit is not an error at this level; the caller decides.
    fn run_command(
        &self,
        program: &str,
        args: &[&str],
    ) -> impl Future<Output = ProbeResult<CommandOutput>> + Send;

    /// List network interfaces with their flags and IPv4 addresses.
    fn interfaces(&self) -> ProbeResult<Vec<InterfaceInfo>>;
}

/// Everything a collector needs for one request.
pub struct ProbeContext<'a, P> {
    pub probes: &'a P,
    pub deadline: Deadline,
}

impl<'a, P: Probes> ProbeContext<'a, P> {
    /// Create a context sharing one deadline across all collectors.
    pub fn new(probes: &'a P, deadline: Deadline) -> Self {
        Self { probes, deadline }
    }

    /// Read a file, abandoning the read if the deadline expires.
    pub async fn read_file(&self, path: &Path) -> ProbeResult<String> {
        self.deadline.guard(self.probes.read_file(path)).await
    }

    /// Run a command, abandoning it if the deadline expires.
    pub async fn run_command(&self, program: &str, args: &[&str]) -> ProbeResult<CommandOutput> {
        self.deadline
            .guard(self.probes.run_command(program, args))
            .await
    }
}

/// One telemetry domain.
///
/// `collect` never fails: every probe failure becomes an absent field plus
/// one warning, in probe invocation order.
pub trait Collector {
    /// The domain snapshot produced by this collector.
    type Snapshot;

    /// Run this collector's probes once.
    fn collect<P: Probes>(
        &self,
        ctx: &ProbeContext<'_, P>,
    ) -> impl Future<Output = Collected<Self::Snapshot>> + Send;
}
