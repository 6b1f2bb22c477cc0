//! Server configuration module.
//!
//! Parses configuration from environment variables for the EventRelay server.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `PORT` | No | 8080 | HTTP server port |
//! | `EVENTRELAY_BIND_ADDR` | No | `0.0.0.0` | IP address to listen on |
//! | `RUST_LOG` | No | `info,tower_http=debug` | Log level filter (read by the binary) |

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use thiserror::Error;

/// Default HTTP server port.
const DEFAULT_PORT: u16 = 8080;

/// Log filter used by the binary when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Default listen address.
const DEFAULT_BIND_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },

    /// Port number is invalid.
    #[error("invalid port number: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

/// Server configuration parsed from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,

    /// Address the listener binds to.
    pub bind_addr: IpAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_addr: DEFAULT_BIND_ADDR,
        }
    }
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `PORT` is not a valid u16 or
    /// `EVENTRELAY_BIND_ADDR` is not an IP address.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use eventrelay_server::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// println!("Server will listen on {}", config.socket_addr());
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: parse_port()?,
            bind_addr: parse_bind_addr()?,
        })
    }

    /// Returns the socket address to listen on.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

/// Read an environment variable, rejecting non-unicode values.
fn read_env(var: &str) -> Result<Option<String>, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(Some(value.trim().to_string())),
        Ok(_) | Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: var.to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}

/// Parse the PORT environment variable.
///
/// Returns the default port if not set.
fn parse_port() -> Result<u16, ConfigError> {
    match read_env("PORT")? {
        Some(port_str) => Ok(port_str.parse()?),
        None => Ok(DEFAULT_PORT),
    }
}

/// Parse the EVENTRELAY_BIND_ADDR environment variable.
fn parse_bind_addr() -> Result<IpAddr, ConfigError> {
    match read_env("EVENTRELAY_BIND_ADDR")? {
        Some(addr) => addr.parse().map_err(|_| ConfigError::InvalidFormat {
            var: "EVENTRELAY_BIND_ADDR".to_string(),
            message: format!("expected an IP address, got '{addr}'"),
        }),
        None => Ok(DEFAULT_BIND_ADDR),
    }
}
