use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracker_core::RegistrySettings;
use tracker_engine::{RetryPolicy, SchedulerSettings, SourceSettings, TrackerSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("could not write config {path:?}: {message}")]
    Write { path: PathBuf, message: String },
    #[error("invalid config {path:?}: {field} must be greater than zero")]
    Zero { path: PathBuf, field: &'static str },
}

/// On-disk tracker configuration (RON). Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub base_url: String,
    pub visible_interval_ms: u64,
    pub hidden_interval_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub stall_factor: u32,
    pub cancel_confirm_polls: u32,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub log_file: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8181/api".to_string(),
            visible_interval_ms: 1000,
            hidden_interval_ms: 10_000,
            max_retries: 2,
            retry_base_delay_ms: 500,
            stall_factor: 2,
            cancel_confirm_polls: 5,
            connect_timeout_ms: 5000,
            request_timeout_ms: 15_000,
            log_file: PathBuf::from("opwatch.log"),
        }
    }
}

impl TrackerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate(path)?;
        Ok(config)
    }

    /// Intervals, the stall factor and the confirm-poll count must be non-zero.
    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let counts = [
            ("visible_interval_ms", self.visible_interval_ms),
            ("hidden_interval_ms", self.hidden_interval_ms),
            ("stall_factor", u64::from(self.stall_factor)),
            ("cancel_confirm_polls", u64::from(self.cancel_confirm_polls)),
        ];
        match counts.into_iter().find(|(_, value)| *value == 0) {
            Some((field, _)) => Err(ConfigError::Zero {
                path: path.to_path_buf(),
                field,
            }),
            None => Ok(()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(self, pretty).map_err(|err| ConfigError::Write {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        fs::write(path, content).map_err(|err| ConfigError::Write {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    pub fn source_settings(&self) -> SourceSettings {
        SourceSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            scheduler: SchedulerSettings {
                visible_interval: Duration::from_millis(self.visible_interval_ms),
                hidden_interval: Duration::from_millis(self.hidden_interval_ms),
                stall_factor: self.stall_factor,
            },
            retry: RetryPolicy {
                max_retries: self.max_retries,
                base_delay: Duration::from_millis(self.retry_base_delay_ms),
            },
            registry: RegistrySettings {
                cancel_confirm_polls: self.cancel_confirm_polls,
            },
            ..TrackerSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("opwatch.ron");
        fs::write(&path, r#"(base_url: "http://backend:9000/api", hidden_interval_ms: 30000)"#)
            .unwrap();

        let config = TrackerConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "http://backend:9000/api");
        assert_eq!(config.hidden_interval_ms, 30_000);
        assert_eq!(config.visible_interval_ms, 1000);
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn save_then_load_returns_same_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("opwatch.ron");
        let config = TrackerConfig {
            cancel_confirm_polls: 9,
            ..TrackerConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(TrackerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_and_malformed_files_are_reported() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.ron");
        assert!(matches!(
            TrackerConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));

        let broken = temp.path().join("broken.ron");
        fs::write(&broken, "(base_url: ").unwrap();
        assert!(matches!(
            TrackerConfig::load(&broken),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn zero_intervals_and_factors_are_rejected() {
        let temp = TempDir::new().unwrap();
        for (body, field) in [
            ("(visible_interval_ms: 0)", "visible_interval_ms"),
            ("(hidden_interval_ms: 0)", "hidden_interval_ms"),
            ("(stall_factor: 0)", "stall_factor"),
            ("(cancel_confirm_polls: 0)", "cancel_confirm_polls"),
        ] {
            let path = temp.path().join(format!("{field}.ron"));
            fs::write(&path, body).unwrap();
            match TrackerConfig::load(&path) {
                Err(ConfigError::Zero { field: rejected, .. }) => assert_eq!(rejected, field),
                other => panic!("expected {field} to be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn settings_follow_the_file() {
        let config = TrackerConfig {
            visible_interval_ms: 250,
            stall_factor: 3,
            ..TrackerConfig::default()
        };
        let settings = config.tracker_settings();
        assert_eq!(settings.scheduler.visible_interval, Duration::from_millis(250));
        assert_eq!(settings.scheduler.stall_factor, 3);
        assert_eq!(settings.retry.base_delay, Duration::from_millis(500));
        assert_eq!(config.source_settings().request_timeout, Duration::from_secs(15));
    }
}
