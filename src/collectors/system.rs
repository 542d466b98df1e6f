use std::time::Duration;

use sysinfo::{ComponentExt, CpuExt, DiskExt, NetworkExt, NetworksExt, System, SystemExt};

use crate::collectors::temperature::SensorReading;
use crate::snapshot::{CpuInfo, DiskInfo, MemoryInfo, NetworkInfo, SectionStatus, SystemInfo};

/// Window over which instantaneous CPU usage is sampled. Every collection
/// blocks for this long.
pub const CPU_SAMPLE_WINDOW: Duration = Duration::from_secs(1);

/// All sections the OS-metrics provider can fill, plus the native sensor
/// readings handed to the temperature chain.
pub struct HostSections {
    pub system: SystemInfo,
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub disk: Vec<DiskInfo>,
    pub network: Vec<NetworkInfo>,
    pub sensors: Vec<SensorReading>,
}

pub fn collect_host(system: &mut System) -> HostSections {
    // Two refreshes bracketing a real delay; usage percent is computed
    // from the delta.
    system.refresh_cpu();
    std::thread::sleep(CPU_SAMPLE_WINDOW);
    system.refresh_cpu();
    system.refresh_memory();
    system.refresh_disks_list();
    system.refresh_disks();
    system.refresh_networks_list();
    system.refresh_networks();
    system.refresh_components_list();
    system.refresh_components();

    let info = SystemInfo {
        os: system.name().unwrap_or_default(),
        hostname: system.host_name().unwrap_or_default(),
        uptime_seconds: system.uptime(),
        kernel: system.kernel_version().unwrap_or_default(),
    };

    let disk = build_disk_entries(system.disks().iter().map(|d| MountUsage {
        device: d.mount_point().to_string_lossy().to_string(),
        filesystem: String::from_utf8_lossy(d.file_system()).to_string(),
        total_bytes: d.total_space(),
        available_bytes: d.available_space(),
    }));

    let network = build_network_entries(
        system
            .networks()
            .iter()
            .map(|(iface, data)| (iface.clone(), data.total_received(), data.total_transmitted())),
    );

    let sensors = system
        .components()
        .iter()
        .map(|c| SensorReading {
            label: c.label().to_string(),
            celsius: c.temperature() as f64,
        })
        .filter(|s| s.celsius > 0.0)
        .collect();

    HostSections {
        system: info,
        cpu: build_cpu_info(system),
        memory: build_memory_info(system),
        disk,
        network,
        sensors,
    }
}

fn build_cpu_info(system: &System) -> CpuInfo {
    let cpus = system.cpus();
    let usage = if cpus.is_empty() {
        0.0
    } else {
        cpus.iter().map(|c| c.cpu_usage() as f64).sum::<f64>() / cpus.len() as f64
    };
    let load = system.load_average();

    CpuInfo {
        usage_percent: usage,
        logical_processors: cpus.len() as u32,
        load_1: load.one,
        load_5: load.five,
        load_15: load.fifteen,
        vendor: cpus
            .first()
            .map(|c| c.vendor_id().to_string())
            .unwrap_or_default(),
        model: cpus.first().map(|c| c.brand().to_string()).unwrap_or_default(),
        status: if cpus.is_empty() {
            SectionStatus::Unavailable
        } else {
            SectionStatus::Ok
        },
    }
}

fn build_memory_info(system: &System) -> MemoryInfo {
    let total = system.total_memory();
    let used = system.used_memory();

    MemoryInfo {
        total_mb: bytes_to_mb(total),
        used_mb: bytes_to_mb(used),
        free_mb: bytes_to_mb(system.free_memory()),
        available_mb: bytes_to_mb(system.available_memory()),
        usage_percent: if total > 0 {
            used as f64 / total as f64 * 100.0
        } else {
            0.0
        },
        status: if total > 0 {
            SectionStatus::Ok
        } else {
            SectionStatus::Unavailable
        },
    }
}

pub(crate) struct MountUsage {
    pub device: String,
    pub filesystem: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

/// Mounts whose usage cannot be read report zero capacity; those are
/// dropped silently and enumeration continues with the rest.
fn build_disk_entries(mounts: impl IntoIterator<Item = MountUsage>) -> Vec<DiskInfo> {
    mounts
        .into_iter()
        .filter(|m| m.total_bytes > 0)
        .map(|m| {
            let used = m.total_bytes.saturating_sub(m.available_bytes);
            DiskInfo {
                device: m.device,
                filesystem: m.filesystem,
                total_gb: bytes_to_gb(m.total_bytes),
                used_gb: bytes_to_gb(used),
                used_percent: used as f64 / m.total_bytes as f64 * 100.0,
            }
        })
        .collect()
}

/// Interface counters sorted by name; the provider yields them in hash
/// order.
fn build_network_entries(
    counters: impl IntoIterator<Item = (String, u64, u64)>,
) -> Vec<NetworkInfo> {
    let mut entries: Vec<NetworkInfo> = counters
        .into_iter()
        .map(|(iface, rx_bytes, tx_bytes)| NetworkInfo {
            iface,
            rx_bytes,
            tx_bytes,
        })
        .collect();
    entries.sort_by(|a, b| a.iface.cmp(&b.iface));
    entries
}

fn bytes_to_mb(bytes: u64) -> u64 {
    bytes / 1024 / 1024
}

fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0 / 1024.0
}
