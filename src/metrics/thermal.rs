//! Temperature, voltage and throttling via the VideoCore `vcgencmd` tool.

use crate::error::{ProbeError, ProbeResult};
use crate::metrics::data::{Collected, ThermalSnapshot, ThrottleStatus};
use crate::metrics::traits::{Collector, ProbeContext, Probes};
use tracing::debug;

const VCGENCMD: &str = "vcgencmd";

/// Throttle condition bits, lowest first.
///
/// Bits 0-3 report the current state; bits 16-19 are sticky since boot.
pub const THROTTLE_FLAGS: [(u32, &str); 8] = [
    (1 << 0, "under-voltage"),
    (1 << 1, "arm frequency capped"),
    (1 << 2, "currently throttled"),
    (1 << 3, "soft temperature limit"),
    (1 << 16, "under-voltage has occurred"),
    (1 << 17, "arm frequency capping has occurred"),
    (1 << 18, "throttling has occurred"),
    (1 << 19, "soft temperature limit has occurred"),
];

/// Parse `<prefix><float><suffix>`, e.g. `temp=46.8'C`.
pub fn parse_prefixed_float(output: &str, prefix: &str, suffix: &str) -> ProbeResult<f64> {
    let output = output.trim();
    let value = output
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(suffix))
        .ok_or_else(|| ProbeError::UnexpectedOutput(output.to_string()))?;
    value.parse::<f64>().map_err(|e| ProbeError::parse("value", e))
}

/// Parse `<prefix>0x<hex>` (the `0x` is optional).
pub fn parse_prefixed_hex(output: &str, prefix: &str) -> ProbeResult<u32> {
    let output = output.trim();
    let value = output
        .strip_prefix(prefix)
        .ok_or_else(|| ProbeError::UnexpectedOutput(output.to_string()))?;
    let value = value.strip_prefix("0x").unwrap_or(value);
    u32::from_str_radix(value, 16).map_err(|e| ProbeError::parse("hex value", e))
}

/// Decode a `get_throttled` bitmask into named conditions.
pub fn decode_throttled(raw: u32) -> ThrottleStatus {
    let flags: Vec<String> = THROTTLE_FLAGS
        .iter()
        .filter(|(bit, _)| raw & bit != 0)
        .map(|(_, name)| name.to_string())
        .collect();

    ThrottleStatus {
        raw,
        is_throttled: !flags.is_empty(),
        flags,
    }
}

/// Thermal/power collector.
#[derive(Debug, Clone, Default)]
pub struct ThermalCollector;

impl ThermalCollector {
    pub fn new() -> Self {
        Self
    }

    async fn vcgencmd<P: Probes>(&self, ctx: &ProbeContext<'_, P>, arg: &str) -> ProbeResult<String> {
        let output = ctx.run_command(VCGENCMD, &[arg]).await?;
        if !output.success {
            return Err(ProbeError::CommandFailed {
                program: VCGENCMD.to_string(),
                status: output.status,
            });
        }
        Ok(output.stdout.trim().to_string())
    }

    pub async fn temperature_c<P: Probes>(&self, ctx: &ProbeContext<'_, P>) -> ProbeResult<f64> {
        let out = self.vcgencmd(ctx, "measure_temp").await?;
        parse_prefixed_float(&out, "temp=", "'C")
    }

    pub async fn voltage_v<P: Probes>(&self, ctx: &ProbeContext<'_, P>) -> ProbeResult<f64> {
        let out = self.vcgencmd(ctx, "measure_volts").await?;
        parse_prefixed_float(&out, "volt=", "V")
    }

    pub async fn throttled<P: Probes>(&self, ctx: &ProbeContext<'_, P>) -> ProbeResult<ThrottleStatus> {
        let out = self.vcgencmd(ctx, "get_throttled").await?;
        parse_prefixed_hex(&out, "throttled=").map(decode_throttled)
    }
}

impl Collector for ThermalCollector {
    type Snapshot = ThermalSnapshot;

    async fn collect<P: Probes>(&self, ctx: &ProbeContext<'_, P>) -> Collected<ThermalSnapshot> {
        let mut snapshot = ThermalSnapshot::default();
        let mut warnings = Vec::new();

        match self.temperature_c(ctx).await {
            Ok(v) => snapshot.temperature_c = Some(v),
            Err(err) => warnings.push(format!("Temperature unavailable: {}", err)),
        }
        match self.voltage_v(ctx).await {
            Ok(v) => snapshot.voltage_v = Some(v),
            Err(err) => warnings.push(format!("Voltage unavailable: {}", err)),
        }
        match self.throttled(ctx).await {
            Ok(v) => snapshot.throttled = Some(v),
            Err(err) => warnings.push(format!("Throttling status unavailable: {}", err)),
        }

        if !warnings.is_empty() {
            debug!("thermal collector degraded: {:?}", warnings);
        }
        Collected::new(snapshot, warnings)
    }
}
