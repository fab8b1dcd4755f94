//! # Supervisor configuration
//!
//! Settings are layered: built-in defaults, then an optional file (format
//! picked from its extension), then `DISSEMBLER__*` environment variables.
//! Nested keys use a double underscore, e.g. `DISSEMBLER__LOG__LEVEL=debug`.

use crate::service::signals::MIN_SIGNAL_BUFFER;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "DISSEMBLER";

/// Supervisor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Capacity of the signal queue between delivery and the wait loop
    pub signal_buffer: usize,
    /// Return wait and stop errors from `serve` instead of only logging them
    pub strict_shutdown: bool,
    /// Call the lifecycle's reloader on SIGHUP
    pub reload_on_hup: bool,
    /// Treat a failed or panicked start task as a shutdown trigger
    pub stop_on_start_failure: bool,
    /// Upper bound on `stop` in seconds (unset = wait forever)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_timeout_secs: Option<u64>,
    /// Logging settings
    pub log: LogConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            signal_buffer: MIN_SIGNAL_BUFFER,
            strict_shutdown: false,
            reload_on_hup: false,
            stop_on_start_failure: false,
            stop_timeout_secs: None,
            log: LogConfig::default(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(Error::InvalidConfig {
                field: "log.format".to_string(),
                reason: format!("unknown format '{other}' (expected json, pretty or compact)"),
            }),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level or `EnvFilter` directive string; `RUST_LOG` takes precedence
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl SupervisorConfig {
    /// Load configuration from defaults, an optional file, and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!("Loading configuration from {:?}", path);
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.signal_buffer < MIN_SIGNAL_BUFFER {
            return Err(Error::InvalidConfig {
                field: "signal_buffer".to_string(),
                reason: format!("must be at least {MIN_SIGNAL_BUFFER}"),
            });
        }

        if self.stop_timeout_secs == Some(0) {
            return Err(Error::InvalidConfig {
                field: "stop_timeout_secs".to_string(),
                reason: "must be greater than 0 when set".to_string(),
            });
        }

        if tracing_subscriber::EnvFilter::try_new(&self.log.level).is_err() {
            return Err(Error::InvalidConfig {
                field: "log.level".to_string(),
                reason: format!("'{}' is not a valid filter directive", self.log.level),
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn stop_timeout(&self) -> Option<Duration> {
        self.stop_timeout_secs.map(Duration::from_secs)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Service(format!("Failed to render config: {e}")))
    }
}
