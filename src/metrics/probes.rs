//! Probe primitives backed by the local Linux host.

use crate::error::{ProbeError, ProbeResult};
use crate::metrics::traits::Probes;
use nix::ifaddrs::getifaddrs;
use nix::net::if_::InterfaceFlags;
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::{self, Instant};

/// Aggregate CPU tick counters.
pub const PROC_STAT: &str = "/proc/stat";
/// Kernel routing table.
pub const PROC_NET_ROUTE: &str = "/proc/net/route";
/// Per-interface byte counters.
pub const PROC_NET_DEV: &str = "/proc/net/dev";
/// Wireless link quality table.
pub const PROC_NET_WIRELESS: &str = "/proc/net/wireless";
/// OS identification file.
pub const OS_RELEASE: &str = "/etc/os-release";
/// Device tree model candidates, in lookup order.
pub const DEVICE_MODEL_PATHS: [&str; 2] = [
    "/proc/device-tree/model",
    "/sys/firmware/devicetree/base/model",
];

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the process exited with status zero
    pub success: bool,
    /// Human-readable exit status
    pub status: String,
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

/// One network interface as seen by `getifaddrs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: String,
    pub is_up: bool,
    pub is_loopback: bool,
    pub ipv4: Vec<Ipv4Addr>,
}

impl InterfaceInfo {
    /// First IPv4 address that is not a loopback address.
    pub fn routable_ipv4(&self) -> Option<Ipv4Addr> {
        self.ipv4.iter().copied().find(|ip| !ip.is_loopback())
    }
}

/// Longest deadline a request may carry; longer timeouts are clamped.
pub const MAX_DEADLINE: Duration = Duration::from_secs(3600);

/// A shared per-request deadline.
///
/// Every probe and every sampling wait of one request runs under the same
/// instant; when it passes, the in-flight future is dropped and reported as
/// [`ProbeError::DeadlineExceeded`].
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// A deadline `timeout` from now, at most [`MAX_DEADLINE`] away.
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout.min(MAX_DEADLINE),
        }
    }

    /// The instant at which probes are abandoned.
    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Drive `fut` to completion unless the deadline passes first.
    pub async fn guard<T, F>(&self, fut: F) -> ProbeResult<T>
    where
        F: Future<Output = ProbeResult<T>>,
    {
        match time::timeout_at(self.at, fut).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::DeadlineExceeded),
        }
    }

    /// Wait between two samples; cancelled by the deadline.
    pub async fn sleep(&self, duration: Duration) -> ProbeResult<()> {
        self.guard(async {
            time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}

/// [`Probes`] implementation for the machine the service runs on.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxProbes;

impl LinuxProbes {
    pub fn new() -> Self {
        Self
    }
}

impl Probes for LinuxProbes {
    async fn read_file(&self, path: &Path) -> ProbeResult<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ProbeError::io(path, source))
    }

    async fn run_command(&self, program: &str, args: &[&str]) -> ProbeResult<CommandOutput> {
        // Dropped futures (deadline, client disconnect) must not leave children running.
        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProbeError::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn interfaces(&self) -> ProbeResult<Vec<InterfaceInfo>> {
        let addrs = getifaddrs().map_err(|e| ProbeError::Interfaces(e.to_string()))?;
        let mut interfaces: Vec<InterfaceInfo> = Vec::new();

        for addr in addrs {
            let index = match interfaces
                .iter()
                .position(|iface| iface.name == addr.interface_name)
            {
                Some(index) => index,
                None => {
                    interfaces.push(InterfaceInfo {
                        name: addr.interface_name.clone(),
                        is_up: addr.flags.contains(InterfaceFlags::IFF_UP),
                        is_loopback: addr.flags.contains(InterfaceFlags::IFF_LOOPBACK),
                        ipv4: Vec::new(),
                    });
                    interfaces.len() - 1
                }
            };

            if let Some(sin) = addr.address.as_ref().and_then(|a| a.as_sockaddr_in()) {
                interfaces[index].ipv4.push(*SocketAddrV4::from(*sin).ip());
            }
        }

        Ok(interfaces)
    }
}
