use std::path::Path;

use tracing::debug;

use crate::collectors::Platform;
use crate::exec::CommandRunner;
use crate::snapshot::{SectionStatus, TemperatureInfo};

/// Default Linux thermal zone node, millidegrees Celsius.
pub const THERMAL_ZONE_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

/// A labeled reading from the native sensor API.
#[derive(Debug, Clone)]
pub struct SensorReading {
    pub label: String,
    pub celsius: f64,
}

/// Everything the fallback chain may consult: pre-extracted native sensor
/// readings, the external-tool runner, and the thermal zone file location
/// (parameterized so tests never touch the real /sys).
pub struct TempSources<'a> {
    pub sensors: &'a [SensorReading],
    pub runner: &'a dyn CommandRunner,
    pub thermal_zone: &'a Path,
}

struct Strategy {
    name: &'static str,
    applies: fn(Platform) -> bool,
    probe: fn(&TempSources) -> Option<i64>,
}

fn any_platform(_: Platform) -> bool {
    true
}
fn linux_only(platform: Platform) -> bool {
    platform == Platform::Linux
}
fn windows_only(platform: Platform) -> bool {
    platform == Platform::Windows
}
fn macos_only(platform: Platform) -> bool {
    platform == Platform::MacOs
}

/// Detection order. First strategy producing a plausible reading wins;
/// the rest are skipped.
const STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "native",
        applies: any_platform,
        probe: native_sensors,
    },
    Strategy {
        name: "wmi",
        applies: windows_only,
        probe: wmi_thermal,
    },
    Strategy {
        name: "lm-sensors",
        applies: linux_only,
        probe: lm_sensors,
    },
    Strategy {
        name: "thermal-zone",
        applies: linux_only,
        probe: thermal_zone,
    },
    Strategy {
        name: "ohm",
        applies: windows_only,
        probe: open_hardware_monitor,
    },
    Strategy {
        name: "osx-cpu-temp",
        applies: macos_only,
        probe: osx_cpu_temp,
    },
    Strategy {
        name: "smc",
        applies: macos_only,
        probe: smc_proximity,
    },
];

/// Best-effort CPU temperature. Exhausting every strategy is the normal
/// outcome on hosts without exposed sensors, not an error.
pub fn detect_temperature(
    platform: Platform,
    cpu_vendor: &str,
    sources: &TempSources,
) -> TemperatureInfo {
    for strategy in STRATEGIES {
        if !(strategy.applies)(platform) {
            continue;
        }
        if let Some(celsius) = (strategy.probe)(sources) {
            debug!(strategy = strategy.name, celsius, "cpu temperature detected");
            return TemperatureInfo {
                cpu_celsius: celsius,
                cpu_vendor: cpu_vendor.to_string(),
                gpu_celsius: 0,
                gpu_vendor: String::new(),
                status: SectionStatus::Ok,
            };
        }
    }

    debug!("no temperature strategy produced a reading");
    TemperatureInfo::unavailable(cpu_vendor)
}

/// Plausible CPU temperature band, both ends exclusive. Exactly 0 reads as
/// a sensor returning nothing; >= 150 is garbage.
fn plausible(celsius: i64) -> bool {
    celsius > 0 && celsius < 150
}

fn plausible_f(celsius: f64) -> bool {
    celsius > 0.0 && celsius < 150.0
}

const CPU_MARKERS: &[&str] = &["cpu", "package", "tctl", "tdie", "coretemp", "k10temp"];
const GPU_MARKERS: &[&str] = &["gpu", "nvidia", "amdgpu", "radeon"];

/// Hottest plausible reading among components labeled like a CPU sensor.
fn native_sensors(sources: &TempSources) -> Option<i64> {
    sources
        .sensors
        .iter()
        .filter(|s| plausible_f(s.celsius))
        .filter(|s| {
            let label = s.label.to_lowercase();
            CPU_MARKERS.iter().any(|m| label.contains(m))
                && !GPU_MARKERS.iter().any(|m| label.contains(m))
        })
        .map(|s| s.celsius)
        .max_by(|a, b| a.total_cmp(b))
        .map(|celsius| celsius as i64)
}

fn wmi_thermal(sources: &TempSources) -> Option<i64> {
    let queries: [(&str, &[&str]); 2] = [
        (
            "CurrentTemperature",
            &[
                "/namespace:\\\\root\\wmi",
                "PATH",
                "MSAcpi_ThermalZoneTemperature",
                "GET",
                "CurrentTemperature",
            ],
        ),
        (
            "CurrentReading",
            &["path", "Win32_TemperatureProbe", "get", "CurrentReading"],
        ),
    ];

    for (column, args) in queries {
        let Ok(output) = sources.runner.run("wmic", args) else {
            continue;
        };
        if let Some(celsius) = parse_wmi_output(&output, column) {
            return Some(celsius);
        }
    }
    None
}

fn parse_wmi_output(output: &str, column: &str) -> Option<i64> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(column))
        .filter_map(|line| line.parse::<i64>().ok())
        .map(tenths_kelvin_to_celsius)
        .find(|&celsius| plausible(celsius))
}

/// WMI reports tenths of a degree Kelvin. Integer conversion drops the
/// fractional .15 of the offset.
fn tenths_kelvin_to_celsius(raw: i64) -> i64 {
    raw / 10 - 273
}

fn lm_sensors(sources: &TempSources) -> Option<i64> {
    let output = sources.runner.run("sensors", &["-u"]).ok()?;
    parse_sensors_output(&output)
}

/// Machine-readable `sensors -u` output: temperature inputs look like
/// `  temp1_input: 48.000` under coretemp/k10temp blocks.
fn parse_sensors_output(output: &str) -> Option<i64> {
    output
        .lines()
        .filter(|line| line.contains("_input:") && (line.contains("temp") || line.contains("Core")))
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter_map(|field| field.parse::<f64>().ok())
        .find(|&celsius| plausible_f(celsius))
        .map(|celsius| celsius as i64)
}

fn thermal_zone(sources: &TempSources) -> Option<i64> {
    let raw = std::fs::read_to_string(sources.thermal_zone).ok()?;
    parse_thermal_zone(&raw)
}

fn parse_thermal_zone(raw: &str) -> Option<i64> {
    let millidegrees = raw.trim().parse::<i64>().ok()?;
    let celsius = millidegrees / 1000;
    plausible(celsius).then_some(celsius)
}

fn open_hardware_monitor(sources: &TempSources) -> Option<i64> {
    let output = sources
        .runner
        .run("OpenHardwareMonitorCLI.exe", &["/cpu"])
        .ok()?;
    parse_ohm_output(&output)
}

fn parse_ohm_output(output: &str) -> Option<i64> {
    output
        .lines()
        .filter(|line| line.to_lowercase().contains("temperature"))
        .flat_map(|line| line.split_whitespace())
        .filter_map(|field| field.trim_end_matches("°C").parse::<f64>().ok())
        .find(|&celsius| plausible_f(celsius))
        .map(|celsius| celsius as i64)
}

fn osx_cpu_temp(sources: &TempSources) -> Option<i64> {
    let output = sources.runner.run("osx-cpu-temp", &[]).ok()?;
    parse_degree_token(&output)
}

/// Expects a single `<float>°C` token, e.g. `61.8°C`.
fn parse_degree_token(output: &str) -> Option<i64> {
    let celsius = output.trim().trim_end_matches("°C").parse::<f64>().ok()?;
    plausible_f(celsius).then(|| celsius as i64)
}

fn smc_proximity(sources: &TempSources) -> Option<i64> {
    let output = sources.runner.run("smc", &["-k", "TC0P", "-r"]).ok()?;
    parse_smc_output(&output)
}

fn parse_smc_output(output: &str) -> Option<i64> {
    output
        .lines()
        .filter(|line| line.contains("bytes"))
        .flat_map(|line| line.split_whitespace())
        .filter_map(|field| field.parse::<f64>().ok())
        .find(|&celsius| plausible_f(celsius))
        .map(|celsius| celsius as i64)
}
