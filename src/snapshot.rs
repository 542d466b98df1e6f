use serde::{Deserialize, Serialize};

/// Agent identifier stamped into every snapshot and the /health payload.
pub const AGENT_SOURCE: &str = "hostprobe";

/// Per-section availability flag. `Unavailable` means the probe produced no
/// reading; zeroed numeric fields next to it carry no meaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionStatus {
    Ok,
    #[default]
    Unavailable,
}

impl SectionStatus {
    pub fn is_ok(self) -> bool {
        matches!(self, SectionStatus::Ok)
    }
}

/// One full collection result. Built once per aggregator invocation and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: String,
    pub platform: String,
    pub system: SystemInfo,
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub disk: Vec<DiskInfo>,
    pub network: Vec<NetworkInfo>,
    pub temperature: TemperatureInfo,
    pub gpu: GpuInfo,
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub hostname: String,
    pub uptime_seconds: u64,
    pub kernel: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    pub usage_percent: f64,
    pub logical_processors: u32,
    pub load_1: f64,
    pub load_5: f64,
    pub load_15: f64,
    pub vendor: String,
    pub model: String,
    pub status: SectionStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total_mb: u64,
    pub used_mb: u64,
    pub free_mb: u64,
    pub available_mb: u64,
    pub usage_percent: f64,
    pub status: SectionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskInfo {
    pub device: String,
    pub filesystem: String,
    pub total_gb: f64,
    pub used_gb: f64,
    pub used_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub iface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// CPU/GPU temperature readings. `cpu_celsius` of 0 together with
/// `status: unavailable` means "no reading", not 0°C.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureInfo {
    pub cpu_celsius: i64,
    pub cpu_vendor: String,
    pub gpu_celsius: i64,
    pub gpu_vendor: String,
    pub status: SectionStatus,
}

impl TemperatureInfo {
    pub fn unavailable(cpu_vendor: &str) -> Self {
        Self {
            cpu_vendor: cpu_vendor.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub status: SectionStatus,
    pub count: usize,
    pub devices: Vec<GpuDevice>,
}

impl GpuInfo {
    /// `count` always equals `devices.len()`; status is `ok` only when at
    /// least one device was enumerated.
    pub fn from_devices(devices: Vec<GpuDevice>) -> Self {
        let status = if devices.is_empty() {
            SectionStatus::Unavailable
        } else {
            SectionStatus::Ok
        };
        Self {
            status,
            count: devices.len(),
            devices,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuDevice {
    pub vendor: String,
    pub model: String,
    pub utilization_percent: u64,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub temperature_celsius: u64,
    pub status: SectionStatus,
}

/// Fully-populated snapshot used by tests across the crate.
#[cfg(test)]
pub(crate) fn sample_snapshot() -> Snapshot {
    Snapshot {
        timestamp: "2026-08-06T12:00:00Z".to_string(),
        platform: "linux".to_string(),
        system: SystemInfo {
            os: "Ubuntu".to_string(),
            hostname: "node-1".to_string(),
            uptime_seconds: 3600,
            kernel: "6.8.0".to_string(),
        },
        cpu: CpuInfo {
            usage_percent: 12.5,
            logical_processors: 8,
            load_1: 0.4,
            load_5: 0.3,
            load_15: 0.2,
            vendor: "GenuineIntel".to_string(),
            model: "Intel(R) Core(TM) i7".to_string(),
            status: SectionStatus::Ok,
        },
        memory: MemoryInfo {
            total_mb: 16384,
            used_mb: 8192,
            free_mb: 4096,
            available_mb: 8000,
            usage_percent: 50.0,
            status: SectionStatus::Ok,
        },
        disk: vec![DiskInfo {
            device: "/".to_string(),
            filesystem: "ext4".to_string(),
            total_gb: 100.0,
            used_gb: 40.0,
            used_percent: 40.0,
        }],
        network: vec![NetworkInfo {
            iface: "eth0".to_string(),
            rx_bytes: 1024,
            tx_bytes: 2048,
        }],
        temperature: TemperatureInfo {
            cpu_celsius: 48,
            cpu_vendor: "GenuineIntel".to_string(),
            gpu_celsius: 0,
            gpu_vendor: String::new(),
            status: SectionStatus::Ok,
        },
        gpu: GpuInfo::from_devices(vec![GpuDevice {
            vendor: "NVIDIA".to_string(),
            model: "Tesla T4".to_string(),
            utilization_percent: 45,
            memory_used_mb: 2048,
            memory_total_mb: 16384,
            temperature_celsius: 63,
            status: SectionStatus::Ok,
        }]),
        source: AGENT_SOURCE.to_string(),
    }
}
