//! CPU utilization from two samples of `/proc/stat`.

use crate::error::{ProbeError, ProbeResult};
use crate::metrics::data::{Collected, ComputeSnapshot};
use crate::metrics::probes::PROC_STAT;
use crate::metrics::traits::{Collector, ProbeContext, Probes};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default wait between the two counter samples.
pub const DEFAULT_CPU_SAMPLE: Duration = Duration::from_millis(150);

/// Cumulative tick counters of the aggregate `cpu` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub idle: u64,
    pub total: u64,
}

/// Parse the first line of `/proc/stat`.
pub fn parse_proc_stat(content: &str) -> ProbeResult<CpuTimes> {
    let line = content.lines().next().ok_or(ProbeError::Empty("/proc/stat"))?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 || fields[0] != "cpu" {
        return Err(ProbeError::UnexpectedOutput(line.to_string()));
    }

    let mut total: u64 = 0;
    for field in &fields[1..] {
        let value = field
            .parse::<u64>()
            .map_err(|e| ProbeError::parse("/proc/stat", e))?;
        total = total.saturating_add(value);
    }
    let idle = fields[4]
        .parse::<u64>()
        .map_err(|e| ProbeError::parse("/proc/stat idle", e))?;

    Ok(CpuTimes { idle, total })
}

/// Utilization in percent between two samples.
///
/// A counter that went backwards or a non-positive total delta is an error,
/// never a zero or wrapped value.
pub fn cpu_utilization(first: CpuTimes, second: CpuTimes) -> ProbeResult<f64> {
    let idle_delta = second
        .idle
        .checked_sub(first.idle)
        .ok_or(ProbeError::InvalidSample("CPU"))?;
    let total_delta = second
        .total
        .checked_sub(first.total)
        .ok_or(ProbeError::InvalidSample("CPU"))?;
    if total_delta == 0 {
        return Err(ProbeError::InvalidSample("CPU"));
    }

    let usage = (1.0 - idle_delta as f64 / total_delta as f64) * 100.0;
    Ok(usage.clamp(0.0, 100.0))
}

/// Compute-load collector.
#[derive(Debug, Clone)]
pub struct CpuCollector {
    sample_interval: Duration,
}

impl Default for CpuCollector {
    fn default() -> Self {
        Self::new(DEFAULT_CPU_SAMPLE)
    }
}

impl CpuCollector {
    pub fn new(sample_interval: Duration) -> Self {
        Self { sample_interval }
    }

    /// Sample the counters twice and compute utilization.
    pub async fn usage_percent<P: Probes>(&self, ctx: &ProbeContext<'_, P>) -> ProbeResult<f64> {
        let path = Path::new(PROC_STAT);
        let first = parse_proc_stat(&ctx.read_file(path).await?)?;
        ctx.deadline.sleep(self.sample_interval).await?;
        let second = parse_proc_stat(&ctx.read_file(path).await?)?;
        cpu_utilization(first, second)
    }
}

impl Collector for CpuCollector {
    type Snapshot = ComputeSnapshot;

    async fn collect<P: Probes>(&self, ctx: &ProbeContext<'_, P>) -> Collected<ComputeSnapshot> {
        let mut snapshot = ComputeSnapshot::default();
        let mut warnings = Vec::new();

        match self.usage_percent(ctx).await {
            Ok(usage) => snapshot.cpu_usage_percent = Some(usage),
            Err(err) => {
                debug!("CPU usage probe failed: {}", err);
                warnings.push(format!("CPU usage unavailable: {}", err));
            }
        }

        Collected::new(snapshot, warnings)
    }
}
