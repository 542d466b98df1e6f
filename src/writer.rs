use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::collectors::collect_snapshot;
use crate::config::Config;
use crate::exec::CommandRunner;
use crate::snapshot::Snapshot;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("snapshot collection task failed: {0}")]
    Collect(#[from] tokio::task::JoinError),
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Periodic snapshot writer. Collects and persists once immediately, then
/// every `interval_secs` until the shutdown signal fires. A failed cycle is
/// logged and the schedule continues.
pub async fn run(
    cfg: Arc<Config>,
    runner: Arc<dyn CommandRunner>,
    mut shutdown: watch::Receiver<bool>,
) {
    let path = cfg.output_path();
    let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        path = %path.display(),
        interval_secs = cfg.interval_secs,
        "starting periodic snapshot writer"
    );

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("snapshot writer received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                if let Err(err) = run_cycle(runner.clone(), &path).await {
                    error!(error = %err, "snapshot write cycle failed");
                }
            }
        }
    }
}

/// Exactly one collect-and-persist cycle.
pub async fn run_cycle(runner: Arc<dyn CommandRunner>, path: &Path) -> Result<(), WriteError> {
    let snapshot =
        tokio::task::spawn_blocking(move || collect_snapshot(runner.as_ref())).await?;
    write_snapshot(path, &snapshot)
}

/// Persist a snapshot as pretty-printed JSON. The data goes to a sibling
/// temp file first and is renamed into place, so a failed write leaves the
/// previous file intact (single slot, last write wins).
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), WriteError> {
    let data = serde_json::to_string_pretty(snapshot)?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data).map_err(|source| WriteError::Io {
        path: tmp.display().to_string(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        WriteError::Io {
            path: path.display().to_string(),
            source,
        }
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::FakeRunner;
    use crate::snapshot::sample_snapshot;
    use std::path::PathBuf;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hostprobe-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn written_file_round_trips() {
        let dir = scratch_dir("writer-rt");
        let path = dir.join("latest.json");
        let snapshot = sample_snapshot();

        write_snapshot(&path, &snapshot).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        // pretty-printed with 2-space indentation
        assert!(text.contains("\n  \"platform\""));
        let parsed: Snapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, snapshot);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn repeated_writes_keep_a_single_slot() {
        let dir = scratch_dir("writer-slot");
        let path = dir.join("latest.json");

        let mut first = sample_snapshot();
        first.timestamp = "2026-08-06T12:00:00Z".to_string();
        let mut second = sample_snapshot();
        second.timestamp = "2026-08-06T12:01:00Z".to_string();

        write_snapshot(&path, &first).unwrap();
        write_snapshot(&path, &second).unwrap();

        let parsed: Snapshot =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, second);

        // no temp files or history left behind
        let entries: Vec<_> = fs::read_dir(&dir).unwrap().collect();
        assert_eq!(entries.len(), 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn failed_write_leaves_previous_content() {
        let dir = scratch_dir("writer-fail");
        let path = dir.join("latest.json");

        let first = sample_snapshot();
        write_snapshot(&path, &first).unwrap();

        // block the temp file slot so the next write fails before the rename
        let tmp = path.with_extension("json.tmp");
        fs::create_dir(&tmp).unwrap();

        let mut second = sample_snapshot();
        second.timestamp = "2026-08-06T13:00:00Z".to_string();
        let err = write_snapshot(&path, &second).expect_err("write must fail");
        assert!(matches!(err, WriteError::Io { .. }));

        let parsed: Snapshot =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, first);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn one_cycle_persists_a_snapshot() {
        let dir = scratch_dir("writer-cycle");
        let path = dir.join("latest.json");

        let runner: Arc<dyn CommandRunner> = Arc::new(FakeRunner::failing());
        run_cycle(runner, &path).await.unwrap();

        let parsed: Snapshot =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.gpu.count, parsed.gpu.devices.len());

        fs::remove_dir_all(&dir).unwrap();
    }
}
