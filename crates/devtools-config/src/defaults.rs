use crate::endpoint::DebuggerEndpoint;

/// Port Chromium listens on when launched with `--remote-debugging-port`
/// and no explicit value.
pub const DEFAULT_DEBUGGER_PORT: u16 = 9222;

/// Host used when no endpoint is configured.
pub const DEFAULT_DEBUGGER_HOST: &str = "127.0.0.1";

/// Path of the browser-level target on the default endpoint.
pub const DEFAULT_DEBUGGER_PATH: &str = "/devtools/browser";

/// Milliseconds allowed for the TCP connect and WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Milliseconds a command may wait for its response.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 30_000;

/// Milliseconds an event wait may block.
pub const DEFAULT_EVENT_TIMEOUT_MS: u64 = 30_000;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default debugger endpoint, `ws://127.0.0.1:9222/devtools/browser`.
#[must_use]
pub fn default_endpoint() -> DebuggerEndpoint {
    DebuggerEndpoint::local(
        DEFAULT_DEBUGGER_HOST,
        DEFAULT_DEBUGGER_PORT,
        DEFAULT_DEBUGGER_PATH,
    )
}

pub(crate) const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

pub(crate) const fn default_command_timeout_ms() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_MS
}

pub(crate) const fn default_event_timeout_ms() -> u64 {
    DEFAULT_EVENT_TIMEOUT_MS
}
