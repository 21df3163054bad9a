use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// WebSocket address of a remote debugging target.
///
/// Serialised as its URL text, for example
/// `ws://127.0.0.1:9222/devtools/page/4A1C`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct DebuggerEndpoint {
    secure: bool,
    host: String,
    port: u16,
    path: String,
}

impl DebuggerEndpoint {
    /// Builds a plain `ws://` endpoint.
    #[must_use]
    pub fn local(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        Self {
            secure: false,
            host: host.into(),
            port,
            path,
        }
    }

    /// Host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port, defaulted from the scheme when the URL omitted it.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Request path, including any query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the endpoint uses `wss://`.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.secure
    }

    /// Scheme name as it appears in the URL.
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        if self.secure { "wss" } else { "ws" }
    }
}

impl fmt::Display for DebuggerEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}://{}:{}{}",
            self.scheme(),
            self.host,
            self.port,
            self.path
        )
    }
}

impl FromStr for DebuggerEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        let secure = match url.scheme() {
            "ws" => false,
            "wss" => true,
            other => return Err(EndpointParseError::UnsupportedScheme(other.to_owned())),
        };
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| EndpointParseError::MissingHost(input.to_owned()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| EndpointParseError::MissingPort(input.to_owned()))?;
        let path = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_owned(),
        };

        Ok(Self {
            secure,
            host: host.to_owned(),
            port,
            path,
        })
    }
}

impl TryFrom<String> for DebuggerEndpoint {
    type Error = EndpointParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DebuggerEndpoint> for String {
    fn from(endpoint: DebuggerEndpoint) -> Self {
        endpoint.to_string()
    }
}

/// Errors encountered while parsing a [`DebuggerEndpoint`] from text.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Scheme was neither `ws` nor `wss`.
    #[error("unsupported debugger endpoint scheme '{0}'")]
    UnsupportedScheme(String),
    /// Host name was missing.
    #[error("missing host in '{0}'")]
    MissingHost(String),
    /// No port was given and the scheme has no default.
    #[error("missing port in '{0}'")]
    MissingPort(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
