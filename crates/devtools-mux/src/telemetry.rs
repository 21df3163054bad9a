//! Tracing subscribers for embedders of the client.
//!
//! The client only emits `tracing` events under the `devtools_mux::*`
//! targets. Applications that want them rendered call [`initialise`] once at
//! start-up; tests and tools that must not touch the global dispatcher can
//! use [`scoped`] or [`build_subscriber`] instead.

use std::io::{self, IsTerminal};

use devtools_config::{Config, LogFormat};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{EnvFilter, fmt};

/// Format of the subscriber installed by the first successful [`initialise`].
static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Boxed subscriber ready for global or scoped use.
pub type BoxedSubscriber = Box<dyn Subscriber + Send + Sync>;

/// Describes the process-wide subscriber after [`initialise`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
    installed: bool,
}

impl TelemetryHandle {
    /// Format of the subscriber that owns the process.
    ///
    /// This is the format of the first call, even if a later call asked for
    /// another one.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }

    /// Whether this call installed the subscriber.
    #[must_use]
    pub const fn installed(self) -> bool {
        self.installed
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured log filter expression did not parse.
    #[error("invalid log filter '{expression}': {source}")]
    Filter {
        /// Expression taken from [`Config::log_filter`].
        expression: String,
        /// Parser failure.
        #[source]
        source: ParseError,
    },
    /// Another global subscriber was already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the subscriber described by `config` as the global default.
///
/// Only the first successful call installs anything. Later calls build
/// nothing and report the format already in place.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable filter and
/// [`TelemetryError::Subscriber`] when a subscriber from elsewhere already
/// owns the process.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let mut installed = false;
    let format = *INSTALLED.get_or_try_init(|| {
        let subscriber = build_subscriber(config)?;
        tracing::subscriber::set_global_default(subscriber)?;
        installed = true;
        Ok::<LogFormat, TelemetryError>(config.log_format())
    })?;
    Ok(TelemetryHandle { format, installed })
}

/// Runs `operation` with the subscriber described by `config` as the
/// current thread's default, leaving the global dispatcher untouched.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable filter.
pub fn scoped<T>(config: &Config, operation: impl FnOnce() -> T) -> Result<T, TelemetryError> {
    let subscriber = build_subscriber(config)?;
    Ok(tracing::subscriber::with_default(subscriber, operation))
}

/// Builds a stderr subscriber for `config` without installing it.
///
/// JSON output flattens event fields so `method`, `id` and `frames` sit at
/// the top level of each record. Colour is only used on terminals.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable filter.
pub fn build_subscriber(config: &Config) -> Result<BoxedSubscriber, TelemetryError> {
    let filter = parse_filter(config.log_filter())?;
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());

    Ok(match config.log_format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    })
}

fn parse_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|source| TelemetryError::Filter {
        expression: expression.to_owned(),
        source,
    })
}
