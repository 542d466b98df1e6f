pub mod gpu;
pub mod system;
pub mod temperature;

use std::path::Path;

use sysinfo::{System, SystemExt};
use tracing::warn;

use crate::exec::CommandRunner;
use crate::snapshot::{Snapshot, AGENT_SOURCE};
use self::system::collect_host;
use self::temperature::{detect_temperature, TempSources, THERMAL_ZONE_PATH};

/// Host operating system family, used to gate detection strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
    MacOs,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" => Self::Linux,
            "windows" => Self::Windows,
            "macos" => Self::MacOs,
            _ => Self::Other,
        }
    }
}

/// One full collection pass. Every section is independently guarded: a
/// probe that yields nothing leaves its section `unavailable` and the rest
/// of the snapshot intact. Blocks for about a second (CPU sampling window).
pub fn collect_snapshot(runner: &dyn CommandRunner) -> Snapshot {
    let mut system = System::new_all();
    let host = collect_host(&mut system);

    if !host.cpu.status.is_ok() {
        warn!("cpu section unavailable");
    }
    if !host.memory.status.is_ok() {
        warn!("memory section unavailable");
    }

    let temperature = detect_temperature(
        Platform::current(),
        &host.cpu.vendor,
        &TempSources {
            sensors: &host.sensors,
            runner,
            thermal_zone: Path::new(THERMAL_ZONE_PATH),
        },
    );
    let gpu = gpu::probe_gpus(runner);

    Snapshot {
        timestamp: utc_timestamp(),
        platform: std::env::consts::OS.to_string(),
        system: host.system,
        cpu: host.cpu,
        memory: host.memory,
        disk: host.disk,
        network: host.network,
        temperature,
        gpu,
        source: AGENT_SOURCE.to_string(),
    }
}

/// RFC3339 UTC, second precision.
fn utc_timestamp() -> String {
    humantime::format_rfc3339_seconds(std::time::SystemTime::now()).to_string()
}
