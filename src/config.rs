//! Client configuration.
//!
//! A [`ClientConfig`] names the daemon to talk to and bounds the resources a
//! connection may use. Addresses are given as strings the same way on the
//! command line and in code:
//!
//! - `/var/run/searchd.sock` or `unix:///var/run/searchd.sock`: unix socket.
//! - `host` or `host:port`: TCP, port defaulting to [`DEFAULT_PORT`].
//! - `[::1]:9312`: bracketed IPv6 host.
use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;

use crate::protocol::{DEFAULT_MAX_ALLOC, DEFAULT_MAX_REPLY};

/// Default searchd API port.
pub const DEFAULT_PORT: u16 = 9312;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("empty server address")]
    Empty,

    #[error("invalid port in server address '{0}'")]
    InvalidPort(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAddress {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

impl Default for ServerAddress {
    fn default() -> Self {
        ServerAddress::Tcp {
            host: "localhost".into(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerAddress {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        ServerAddress::Tcp {
            host: host.into(),
            port,
        }
    }

    pub fn unix(path: impl Into<PathBuf>) -> Self {
        ServerAddress::Unix(path.into())
    }
}

impl FromStr for ServerAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigError::Empty);
        }
        if s.starts_with('/') {
            return Ok(ServerAddress::unix(s));
        }
        if let Some(path) = s.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(ConfigError::Empty);
            }
            return Ok(ServerAddress::unix(path));
        }

        let (host, port) = match s.strip_prefix('[') {
            Some(rest) => {
                let (host, tail) = rest
                    .split_once(']')
                    .ok_or_else(|| ConfigError::InvalidPort(s.to_string()))?;
                match tail {
                    "" => (host, None),
                    tail => match tail.strip_prefix(':') {
                        Some(port) => (host, Some(port)),
                        None => return Err(ConfigError::InvalidPort(s.to_string())),
                    },
                }
            }
            // a bare IPv6 address carries several colons and no port
            None => match s.rsplit_once(':') {
                Some((host, port)) if !host.contains(':') => (host, Some(port)),
                _ => (s, None),
            },
        };

        if host.is_empty() {
            return Err(ConfigError::Empty);
        }
        let port = match port {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(s.to_string()))?,
            None => DEFAULT_PORT,
        };
        Ok(ServerAddress::tcp(host, port))
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerAddress::Tcp { host, port } if host.contains(':') => write!(f, "[{host}]:{port}"),
            ServerAddress::Tcp { host, port } => write!(f, "{host}:{port}"),
            ServerAddress::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub address: ServerAddress,
    /// Applies to establishing the connection only.
    pub connect_timeout: Option<Duration>,
    /// Capacity ceiling of the connection buffer.
    pub max_alloc: usize,
    /// Longest reply payload accepted from the daemon.
    pub max_reply: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: ServerAddress::default(),
            connect_timeout: None,
            max_alloc: DEFAULT_MAX_ALLOC,
            max_reply: DEFAULT_MAX_REPLY,
        }
    }
}
