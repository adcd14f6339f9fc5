//! Notification delivery configuration.
//!
//! Loaded once at process startup. The sink choice is fixed for the life of
//! the worker built from it.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

/// Default worker poll interval.
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Default maximum number of events claimed per cycle.
const DEFAULT_BATCH_SIZE: u32 = 50;

/// Default target for the file sink.
const DEFAULT_FILE_PATH: &str = "logs/notifications.log";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for invalid notification configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable was set to a value that could not be parsed.
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    /// A variable required by the selected sink is missing.
    #[error("{var} must be set when NOTIFICATIONS_SINK={sink}")]
    Missing { var: &'static str, sink: SinkKind },
}

// ---------------------------------------------------------------------------
// SinkKind
// ---------------------------------------------------------------------------

/// Which delivery target the worker renders events to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Console,
    File,
    Webhook,
}

impl SinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SinkKind::Console => "console",
            SinkKind::File => "file",
            SinkKind::Webhook => "webhook",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SinkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" | "log" => Ok(SinkKind::Console),
            "file" => Ok(SinkKind::File),
            "webhook" => Ok(SinkKind::Webhook),
            _ => Err(ConfigError::InvalidValue {
                var: "NOTIFICATIONS_SINK",
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationConfig
// ---------------------------------------------------------------------------

/// Configuration for the outbox publisher and delivery worker.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// Whether callers should publish and the worker should run at all.
    pub enabled: bool,
    /// Active delivery target.
    pub sink: SinkKind,
    /// Time between poll cycles.
    pub poll_interval: Duration,
    /// Maximum events claimed per cycle.
    pub batch_size: u32,
    /// Append-only log file used by the file sink.
    pub file_path: PathBuf,
    /// Endpoint used by the webhook sink.
    pub webhook_url: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sink: SinkKind::Console,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            batch_size: DEFAULT_BATCH_SIZE,
            file_path: PathBuf::from(DEFAULT_FILE_PATH),
            webhook_url: None,
        }
    }
}

impl NotificationConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                         | Default                  |
    /// |----------------------------------|--------------------------|
    /// | `NOTIFICATIONS_ENABLED`          | `false`                  |
    /// | `NOTIFICATIONS_SINK`             | `console`                |
    /// | `NOTIFICATIONS_POLL_INTERVAL_MS` | `5000`                   |
    /// | `NOTIFICATIONS_BATCH_SIZE`       | `50`                     |
    /// | `NOTIFICATIONS_FILE_PATH`        | `logs/notifications.log` |
    /// | `NOTIFICATIONS_WEBHOOK_URL`      | required for `webhook`   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let enabled = match lookup("NOTIFICATIONS_ENABLED") {
            Some(v) => parse_bool("NOTIFICATIONS_ENABLED", &v)?,
            None => defaults.enabled,
        };

        let sink = match lookup("NOTIFICATIONS_SINK") {
            Some(v) => v.parse()?,
            None => defaults.sink,
        };

        let poll_interval = match lookup("NOTIFICATIONS_POLL_INTERVAL_MS") {
            Some(v) => Duration::from_millis(parse_positive("NOTIFICATIONS_POLL_INTERVAL_MS", &v)?),
            None => defaults.poll_interval,
        };

        let batch_size = match lookup("NOTIFICATIONS_BATCH_SIZE") {
            Some(v) => {
                let n = parse_positive("NOTIFICATIONS_BATCH_SIZE", &v)?;
                u32::try_from(n).map_err(|_| ConfigError::InvalidValue {
                    var: "NOTIFICATIONS_BATCH_SIZE",
                    value: v.clone(),
                })?
            }
            None => defaults.batch_size,
        };

        let file_path = lookup("NOTIFICATIONS_FILE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.file_path);

        let webhook_url = lookup("NOTIFICATIONS_WEBHOOK_URL").filter(|u| !u.trim().is_empty());
        if sink == SinkKind::Webhook && webhook_url.is_none() {
            return Err(ConfigError::Missing {
                var: "NOTIFICATIONS_WEBHOOK_URL",
                sink,
            });
        }

        Ok(Self {
            enabled,
            sink,
            poll_interval,
            batch_size,
            file_path,
            webhook_url,
        })
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<NotificationConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NotificationConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.sink, SinkKind::Console);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.file_path, PathBuf::from("logs/notifications.log"));
        assert!(config.webhook_url.is_none());
    }

    #[test]
    fn reads_all_variables() {
        let config = load(&[
            ("NOTIFICATIONS_ENABLED", "true"),
            ("NOTIFICATIONS_SINK", "file"),
            ("NOTIFICATIONS_POLL_INTERVAL_MS", "250"),
            ("NOTIFICATIONS_BATCH_SIZE", "10"),
            ("NOTIFICATIONS_FILE_PATH", "/var/log/learnhub/events.log"),
        ])
        .unwrap();
        assert!(config.enabled);
        assert_eq!(config.sink, SinkKind::File);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.batch_size, 10);
        assert_eq!(
            config.file_path,
            PathBuf::from("/var/log/learnhub/events.log")
        );
    }

    #[test]
    fn enabled_flag_accepts_common_spellings() {
        for v in ["1", "TRUE", "yes", "On"] {
            assert!(load(&[("NOTIFICATIONS_ENABLED", v)]).unwrap().enabled);
        }
        for v in ["0", "false", "No", "off"] {
            assert!(!load(&[("NOTIFICATIONS_ENABLED", v)]).unwrap().enabled);
        }
    }

    #[test]
    fn rejects_unknown_sink() {
        assert_matches!(
            load(&[("NOTIFICATIONS_SINK", "pigeon")]),
            Err(ConfigError::InvalidValue { var: "NOTIFICATIONS_SINK", .. })
        );
    }

    #[test]
    fn rejects_zero_interval_and_batch() {
        assert_matches!(
            load(&[("NOTIFICATIONS_POLL_INTERVAL_MS", "0")]),
            Err(ConfigError::InvalidValue { var: "NOTIFICATIONS_POLL_INTERVAL_MS", .. })
        );
        assert_matches!(
            load(&[("NOTIFICATIONS_BATCH_SIZE", "0")]),
            Err(ConfigError::InvalidValue { var: "NOTIFICATIONS_BATCH_SIZE", .. })
        );
    }

    #[test]
    fn webhook_sink_requires_url() {
        assert_matches!(
            load(&[("NOTIFICATIONS_SINK", "webhook")]),
            Err(ConfigError::Missing { var: "NOTIFICATIONS_WEBHOOK_URL", sink: SinkKind::Webhook })
        );
        let config = load(&[
            ("NOTIFICATIONS_SINK", "webhook"),
            ("NOTIFICATIONS_WEBHOOK_URL", "https://hooks.example.com/learnhub"),
        ])
        .unwrap();
        assert_eq!(
            config.webhook_url.as_deref(),
            Some("https://hooks.example.com/learnhub")
        );
    }

    #[test]
    fn sink_kind_round_trips_through_display() {
        for kind in [SinkKind::Console, SinkKind::File, SinkKind::Webhook] {
            assert_eq!(kind.to_string().parse::<SinkKind>().unwrap(), kind);
        }
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::Missing {
            var: "NOTIFICATIONS_WEBHOOK_URL",
            sink: SinkKind::Webhook,
        };
        assert_eq!(
            err.to_string(),
            "NOTIFICATIONS_WEBHOOK_URL must be set when NOTIFICATIONS_SINK=webhook"
        );
    }
}
