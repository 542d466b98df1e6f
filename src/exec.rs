use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Upper bound for any single external tool invocation. A hung tool costs
/// one request or one write cycle at most this long.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("'{program}' did not exit within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
    #[error("'{program}' exited with status {code:?}")]
    NonZero { program: String, code: Option<i32> },
    #[error("failed to read output of '{program}': {source}")]
    Output {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Narrow seam for invoking external diagnostic tools. Probes depend on this
/// trait so tests can substitute canned output instead of spawning processes.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ExecError>;
}

/// Production runner: spawns the process, polls for exit with a deadline and
/// kills it on timeout. Stdout is drained after exit; the tools invoked here
/// emit well under the pipe buffer.
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ExecError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(ExecError::Timeout {
                            program: program.to_string(),
                            timeout: self.timeout,
                        });
                    }
                    std::thread::sleep(Duration::from_millis(25));
                }
                Err(source) => {
                    let _ = child.kill();
                    return Err(ExecError::Output {
                        program: program.to_string(),
                        source,
                    });
                }
            }
        };

        let mut stdout = Vec::new();
        if let Some(mut pipe) = child.stdout.take() {
            pipe.read_to_end(&mut stdout)
                .map_err(|source| ExecError::Output {
                    program: program.to_string(),
                    source,
                })?;
        }

        if !status.success() {
            return Err(ExecError::NonZero {
                program: program.to_string(),
                code: status.code(),
            });
        }

        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_spawn_error() {
        let runner = SystemRunner::new();
        let err = runner
            .run("hostprobe-no-such-binary", &[])
            .expect_err("binary must not exist");
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout() {
        let runner = SystemRunner::new();
        let out = runner.run("echo", &["hello"]).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_error() {
        let runner = SystemRunner::new();
        let err = runner.run("false", &[]).expect_err("false exits 1");
        assert!(matches!(err, ExecError::NonZero { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn hung_process_times_out() {
        let runner = SystemRunner::with_timeout(Duration::from_millis(200));
        let start = Instant::now();
        let err = runner.run("sleep", &["30"]).expect_err("must time out");
        assert!(matches!(err, ExecError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
