use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub listen: String,
    pub interval_secs: u64,
    pub output_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8889".to_string(),
            interval_secs: 60,
            output_file: "latest.json".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("config validation error: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.trim().is_empty() {
            return Err(ConfigError::Validation("listen is required".to_string()));
        }
        if SocketAddr::from_str(&self.listen).is_err() {
            return Err(ConfigError::Validation(
                "listen must be a valid host:port address".to_string(),
            ));
        }
        if self.interval_secs < 1 {
            return Err(ConfigError::Validation(
                "interval_secs must be >= 1".to_string(),
            ));
        }
        if self.output_file.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output_file is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn port(&self) -> u16 {
        SocketAddr::from_str(&self.listen)
            .map(|addr| addr.port())
            .unwrap_or(0)
    }

    /// Where the periodic writer persists snapshots. Relative names land
    /// next to the running binary, falling back to the working directory
    /// when the executable path cannot be resolved.
    pub fn output_path(&self) -> PathBuf {
        let file = Path::new(&self.output_file);
        if file.is_absolute() {
            return file.to_path_buf();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(file)))
            .unwrap_or_else(|| file.to_path_buf())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        cfg.validate().expect("defaults must validate");
        assert_eq!(cfg.port(), 8889);
        assert_eq!(cfg.interval_secs, 60);
    }

    #[test]
    fn rejects_bad_listen_address() {
        let cfg = Config {
            listen: "not-an-address".to_string(),
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_zero_interval() {
        let cfg = Config {
            interval_secs: 0,
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_empty_output_file() {
        let cfg = Config {
            output_file: "  ".to_string(),
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let cfg: Config = serde_yaml::from_str("listen: \"127.0.0.1:9100\"").unwrap();
        assert_eq!(cfg.listen, "127.0.0.1:9100");
        assert_eq!(cfg.interval_secs, 60);
        assert_eq!(cfg.output_file, "latest.json");
    }

    #[test]
    fn example_yaml_parses_and_validates() {
        let cfg: Config = serde_yaml::from_str(Config::example_yaml()).unwrap();
        cfg.validate().expect("example config must validate");
    }

    #[cfg(unix)]
    #[test]
    fn absolute_output_path_is_kept() {
        let cfg = Config {
            output_file: "/var/lib/hostprobe/latest.json".to_string(),
            ..Config::default()
        };
        assert_eq!(
            cfg.output_path(),
            PathBuf::from("/var/lib/hostprobe/latest.json")
        );
    }
}
