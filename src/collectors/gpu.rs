use tracing::debug;

use crate::exec::CommandRunner;
use crate::snapshot::{GpuDevice, GpuInfo, SectionStatus};

const NVIDIA_SMI_ARGS: &[&str] = &[
    "--query-gpu=name,utilization.gpu,memory.used,memory.total,temperature.gpu",
    "--format=csv,noheader,nounits",
];

/// Enumerate discrete GPUs through nvidia-smi. A missing or failing tool
/// degrades to an empty, unavailable section; it never errors.
pub fn probe_gpus(runner: &dyn CommandRunner) -> GpuInfo {
    match runner.run("nvidia-smi", NVIDIA_SMI_ARGS) {
        Ok(output) => GpuInfo::from_devices(parse_nvidia_smi(&output)),
        Err(err) => {
            debug!(error = %err, "nvidia-smi unavailable");
            GpuInfo::from_devices(Vec::new())
        }
    }
}

fn parse_nvidia_smi(output: &str) -> Vec<GpuDevice> {
    output.lines().filter_map(parse_device_line).collect()
}

fn parse_device_line(line: &str) -> Option<GpuDevice> {
    let fields: Vec<&str> = line.split(", ").collect();
    if fields.len() < 5 {
        return None;
    }
    Some(GpuDevice {
        vendor: "NVIDIA".to_string(),
        model: fields[0].trim().to_string(),
        utilization_percent: parse_count(fields[1]),
        memory_used_mb: parse_count(fields[2]),
        memory_total_mb: parse_count(fields[3]),
        temperature_celsius: parse_count(fields[4]),
        status: SectionStatus::Ok,
    })
}

/// Lenient numeric parse: nvidia-smi prints `[N/A]` for some fields on some
/// boards; those become zero instead of dropping the whole line.
fn parse_count(field: &str) -> u64 {
    field.trim().parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::FakeRunner;

    #[test]
    fn single_device_line_is_parsed() {
        let runner = FakeRunner::failing().with("nvidia-smi", "Tesla T4, 45, 2048, 16384, 63\n");
        let gpu = probe_gpus(&runner);

        assert_eq!(gpu.status, SectionStatus::Ok);
        assert_eq!(gpu.count, 1);
        assert_eq!(
            gpu.devices[0],
            GpuDevice {
                vendor: "NVIDIA".to_string(),
                model: "Tesla T4".to_string(),
                utilization_percent: 45,
                memory_used_mb: 2048,
                memory_total_mb: 16384,
                temperature_celsius: 63,
                status: SectionStatus::Ok,
            }
        );
    }

    #[test]
    fn tool_failure_degrades_to_empty_section() {
        let runner = FakeRunner::failing();
        let gpu = probe_gpus(&runner);

        assert_eq!(gpu.status, SectionStatus::Unavailable);
        assert_eq!(gpu.count, 0);
        assert!(gpu.devices.is_empty());
    }

    #[test]
    fn short_lines_are_skipped() {
        let output = "Tesla T4, 45, 2048, 16384, 63\nbroken line\nRTX A6000, 10, 512, 49140, 41\n";
        let devices = parse_nvidia_smi(output);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].model, "Tesla T4");
        assert_eq!(devices[1].model, "RTX A6000");
    }

    #[test]
    fn malformed_numbers_default_to_zero() {
        let devices = parse_nvidia_smi("Tesla T4, [N/A], 2048, 16384, 63\n");
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].utilization_percent, 0);
        assert_eq!(devices[0].memory_used_mb, 2048);
    }

    #[test]
    fn empty_output_is_unavailable() {
        let runner = FakeRunner::failing().with("nvidia-smi", "");
        let gpu = probe_gpus(&runner);
        assert_eq!(gpu.status, SectionStatus::Unavailable);
        assert_eq!(gpu.count, 0);
    }
}
