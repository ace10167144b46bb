//! Active interface selection, throughput and wireless link quality.

use crate::error::{ProbeError, ProbeResult};
use crate::metrics::data::{Collected, NetworkSnapshot, RadioLink, WirelessInfo};
use crate::metrics::probes::{InterfaceInfo, PROC_NET_DEV, PROC_NET_ROUTE, PROC_NET_WIRELESS};
use crate::metrics::traits::{Collector, ProbeContext, Probes};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default wait between the two byte-counter samples.
pub const DEFAULT_NET_SAMPLE: Duration = Duration::from_millis(200);

/// Interface owning the default route (destination `00000000`), if any.
pub fn parse_default_route(content: &str) -> Option<String> {
    content
        .lines()
        .skip(1)
        .map(|line| line.split_whitespace().collect::<Vec<_>>())
        .find(|fields| fields.len() >= 2 && fields[1] == "00000000")
        .map(|fields| fields[0].to_string())
}

/// First interface that is up, not loopback, and carries an IPv4 address.
pub fn first_active_interface(interfaces: &[InterfaceInfo]) -> Option<&InterfaceInfo> {
    interfaces
        .iter()
        .find(|iface| iface.is_up && !iface.is_loopback && !iface.ipv4.is_empty())
}

fn is_table_header(line: &str) -> bool {
    line.is_empty() || line.starts_with("Inter-") || line.starts_with("face")
}

/// Parse one `/proc/net/dev` line; `Ok(None)` if it belongs to another interface.
pub fn parse_net_dev_line(line: &str, iface: &str) -> ProbeResult<Option<(u64, u64)>> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 17 || fields[0].trim_end_matches(':') != iface {
        return Ok(None);
    }
    let rx = fields[1]
        .parse::<u64>()
        .map_err(|e| ProbeError::parse("rx bytes", e))?;
    let tx = fields[9]
        .parse::<u64>()
        .map_err(|e| ProbeError::parse("tx bytes", e))?;
    Ok(Some((rx, tx)))
}

/// Receive/transmit byte counters of `iface` from `/proc/net/dev` content.
pub fn parse_net_dev(content: &str, iface: &str) -> ProbeResult<(u64, u64)> {
    for line in content.lines().map(str::trim) {
        if is_table_header(line) {
            continue;
        }
        if let Some(counters) = parse_net_dev_line(line, iface)? {
            return Ok(counters);
        }
    }
    Err(ProbeError::Interfaces(format!("{} not in /proc/net/dev", iface)))
}

/// Byte rates between two counter samples taken `interval` apart.
pub fn byte_rates(first: (u64, u64), second: (u64, u64), interval: Duration) -> ProbeResult<(f64, f64)> {
    let rx = second
        .0
        .checked_sub(first.0)
        .ok_or(ProbeError::InvalidSample("/proc/net/dev"))?;
    let tx = second
        .1
        .checked_sub(first.1)
        .ok_or(ProbeError::InvalidSample("/proc/net/dev"))?;
    let seconds = interval.as_secs_f64();
    if seconds <= 0.0 {
        return Err(ProbeError::InvalidSample("duration"));
    }
    Ok((rx as f64 / seconds, tx as f64 / seconds))
}

fn parse_wireless_value(value: &str) -> ProbeResult<f64> {
    value
        .trim_end_matches('.')
        .parse::<f64>()
        .map_err(|e| ProbeError::parse("wireless value", e))
}

/// Parse one `/proc/net/wireless` line into a quality label.
pub fn parse_wireless_line(line: &str, iface: &str) -> ProbeResult<Option<String>> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 || fields[0].trim_end_matches(':') != iface {
        return Ok(None);
    }
    let link = parse_wireless_value(fields[2])?;
    let level = parse_wireless_value(fields[3])?;

    let mut quality = format!("{:.0}/70", link);
    if level != 0.0 && level > -200.0 {
        quality = format!("{} ({:.0} dBm)", quality, level);
    }
    Ok(Some(quality))
}

/// Link quality of `iface`; `Ok(None)` means the interface is not wireless.
pub fn parse_wireless(content: &str, iface: &str) -> ProbeResult<Option<String>> {
    for line in content.lines().map(str::trim) {
        if is_table_header(line) {
            continue;
        }
        if let Some(quality) = parse_wireless_line(line, iface)? {
            return Ok(Some(quality));
        }
    }
    Ok(None)
}

/// Parse `iw dev <iface> link` output.
pub fn parse_iw_link(output: &str) -> ProbeResult<RadioLink> {
    let output = output.trim();
    if output.is_empty() {
        return Err(ProbeError::Empty("iw output"));
    }
    if output.contains("Not connected") {
        return Ok(RadioLink {
            ssid: "disconnected".to_string(),
            ..Default::default()
        });
    }

    let mut link = RadioLink::default();
    for line in output.lines().map(str::trim) {
        if let Some(ssid) = line.strip_prefix("SSID:") {
            link.ssid = ssid.trim().to_string();
        } else if let Some(rate) = line.strip_prefix("tx bitrate:") {
            link.tx_bitrate = rate.trim().to_string();
        } else if let Some(rate) = line.strip_prefix("rx bitrate:") {
            link.rx_bitrate = rate.trim().to_string();
        }
    }
    Ok(link)
}

/// Network collector.
#[derive(Debug, Clone)]
pub struct NetworkCollector {
    sample_interval: Duration,
}

impl Default for NetworkCollector {
    fn default() -> Self {
        Self::new(DEFAULT_NET_SAMPLE)
    }
}

impl NetworkCollector {
    pub fn new(sample_interval: Duration) -> Self {
        Self { sample_interval }
    }

    pub async fn default_route_interface<P: Probes>(
        &self,
        ctx: &ProbeContext<'_, P>,
    ) -> ProbeResult<Option<String>> {
        let content = ctx.read_file(Path::new(PROC_NET_ROUTE)).await?;
        if content.lines().next().is_none() {
            return Err(ProbeError::Empty("/proc/net/route"));
        }
        Ok(parse_default_route(&content))
    }

    async fn read_counters<P: Probes>(&self, ctx: &ProbeContext<'_, P>, iface: &str) -> ProbeResult<(u64, u64)> {
        let content = ctx.read_file(Path::new(PROC_NET_DEV)).await?;
        parse_net_dev(&content, iface)
    }

    /// Sample byte counters twice and compute (rx, tx) bytes per second.
    pub async fn sample_rates<P: Probes>(
        &self,
        ctx: &ProbeContext<'_, P>,
        iface: &str,
    ) -> ProbeResult<(f64, f64)> {
        let first = self.read_counters(ctx, iface).await?;
        ctx.deadline.sleep(self.sample_interval).await?;
        let second = self.read_counters(ctx, iface).await?;
        byte_rates(first, second, self.sample_interval)
    }

    pub async fn link_quality<P: Probes>(
        &self,
        ctx: &ProbeContext<'_, P>,
        iface: &str,
    ) -> ProbeResult<Option<String>> {
        let content = ctx.read_file(Path::new(PROC_NET_WIRELESS)).await?;
        parse_wireless(&content, iface)
    }

    pub async fn radio_link<P: Probes>(&self, ctx: &ProbeContext<'_, P>, iface: &str) -> ProbeResult<RadioLink> {
        let output = ctx.run_command("iw", &["dev", iface, "link"]).await?;
        if !output.success {
            return Err(ProbeError::CommandFailed {
                program: "iw".to_string(),
                status: output.status,
            });
        }
        parse_iw_link(&output.stdout)
    }
}

impl Collector for NetworkCollector {
    type Snapshot = NetworkSnapshot;

    async fn collect<P: Probes>(&self, ctx: &ProbeContext<'_, P>) -> Collected<NetworkSnapshot> {
        let mut snapshot = NetworkSnapshot::default();
        let mut warnings = Vec::new();

        let mut iface = match self.default_route_interface(ctx).await {
            Ok(iface) => iface,
            Err(err) => {
                warnings.push(format!("Default route unavailable: {}", err));
                None
            }
        };

        let interfaces = ctx.probes.interfaces();
        if iface.is_none() {
            iface = interfaces
                .as_ref()
                .ok()
                .and_then(|list| first_active_interface(list))
                .map(|info| info.name.clone());
        }

        let Some(iface) = iface else {
            warnings.push("Network interface unavailable".to_string());
            return Collected::new(snapshot, warnings);
        };
        debug!("selected network interface {}", iface);
        snapshot.interface = iface.clone();

        match &interfaces {
            Ok(list) => match list
                .iter()
                .find(|info| info.name == iface)
                .and_then(InterfaceInfo::routable_ipv4)
            {
                Some(ip) => snapshot.ipv4 = Some(ip.to_string()),
                None => warnings.push("IP address unavailable: no IPv4 found".to_string()),
            },
            Err(err) => warnings.push(format!("IP address unavailable: {}", err)),
        }

        match self.sample_rates(ctx, &iface).await {
            Ok((rx, tx)) => {
                snapshot.rx_bytes_per_sec = Some(rx);
                snapshot.tx_bytes_per_sec = Some(tx);
            }
            Err(err) => warnings.push(format!("Network rates unavailable: {}", err)),
        }

        let quality = match self.link_quality(ctx, &iface).await {
            Ok(quality) => quality,
            Err(err) => {
                warnings.push(format!("WiFi quality unavailable: {}", err));
                None
            }
        };

        // Radio commands are only issued against interfaces known to be wireless.
        if let Some(link_quality) = quality {
            let link = match self.radio_link(ctx, &iface).await {
                Ok(link) => Some(link),
                Err(err) => {
                    warnings.push(format!("WiFi details unavailable: {}", err));
                    None
                }
            };
            snapshot.wireless = Some(WirelessInfo { link_quality, link });
        }

        Collected::new(snapshot, warnings)
    }
}
