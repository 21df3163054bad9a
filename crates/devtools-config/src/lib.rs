//! Shared configuration for the DevTools protocol client.
//!
//! Values are layered by `ortho_config`: built-in defaults, then a TOML file
//! named by `--config-path` or `DEVTOOLS_MUX_CONFIG_PATH`, then
//! `DEVTOOLS_MUX_*` environment variables, then command-line flags.

mod defaults;
mod endpoint;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_DEBUGGER_HOST,
    DEFAULT_DEBUGGER_PATH, DEFAULT_DEBUGGER_PORT, DEFAULT_EVENT_TIMEOUT_MS, DEFAULT_LOG_FILTER,
    default_endpoint, default_log_filter, default_log_filter_string, default_log_format,
};
pub use endpoint::{DebuggerEndpoint, EndpointParseError};
pub use logging::{LogFormat, LogFormatParseError};

/// Environment variable naming a configuration file.
pub const CONFIG_PATH_ENV: &str = "DEVTOOLS_MUX_CONFIG_PATH";
/// Environment variable overriding [`Config::endpoint`].
pub const ENDPOINT_ENV: &str = "DEVTOOLS_MUX_ENDPOINT";
/// Environment variable overriding [`Config::log_filter`].
pub const LOG_FILTER_ENV: &str = "DEVTOOLS_MUX_LOG_FILTER";
/// Environment variable overriding [`Config::log_format`].
pub const LOG_FORMAT_ENV: &str = "DEVTOOLS_MUX_LOG_FORMAT";

/// Client configuration.
///
/// Load it with `Config::load_from_iter`, passing the program name followed
/// by any configuration flags (`--endpoint`, `--command-timeout-ms`,
/// `--log-format`, `--config-path` and so on).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "DEVTOOLS_MUX")]
pub struct Config {
    /// Debugger WebSocket endpoint.
    #[serde(default = "defaults::default_endpoint")]
    pub endpoint: DebuggerEndpoint,
    /// Budget for the TCP connect and handshake, in milliseconds.
    #[serde(default = "defaults::default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Default budget for a command round trip, in milliseconds.
    #[serde(default = "defaults::default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// Default budget for an event wait, in milliseconds.
    #[serde(default = "defaults::default_event_timeout_ms")]
    pub event_timeout_ms: u64,
    /// `tracing_subscriber::EnvFilter` expression.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: defaults::default_endpoint(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            event_timeout_ms: DEFAULT_EVENT_TIMEOUT_MS,
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
        }
    }
}

impl Config {
    /// Configured debugger endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &DebuggerEndpoint {
        &self.endpoint
    }

    /// Connect and handshake budget.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Default command budget.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Default event wait budget.
    #[must_use]
    pub const fn event_timeout(&self) -> Duration {
        Duration::from_millis(self.event_timeout_ms)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
