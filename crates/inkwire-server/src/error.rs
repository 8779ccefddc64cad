//! Server error types.

use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid bind address {value:?}: {source}")]
    InvalidAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid channel capacity {0:?}: expected a positive integer")]
    InvalidCapacity(String),
}

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The relay hub has shut down and no longer accepts commands.
#[derive(Debug, Error)]
#[error("relay hub is not running")]
pub struct HubClosed;
