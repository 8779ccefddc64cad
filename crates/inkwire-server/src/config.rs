//! Server configuration
//!
//! Read from the environment at startup:
//!
//! - `INKWIRE_BIND`: listen address (default `0.0.0.0:3030`)
//! - `INKWIRE_STATIC_DIR`: directory served for everything outside `/ws`
//! - `INKWIRE_CHANNEL_CAPACITY`: depth of the relay hub's command queue
//! - `INKWIRE_OUTBOUND_CAPACITY`: frames buffered per connection before
//!   relays to it are dropped

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ConfigError;

pub const BIND_VAR: &str = "INKWIRE_BIND";
pub const STATIC_DIR_VAR: &str = "INKWIRE_STATIC_DIR";
pub const CHANNEL_CAPACITY_VAR: &str = "INKWIRE_CHANNEL_CAPACITY";
pub const OUTBOUND_CAPACITY_VAR: &str = "INKWIRE_OUTBOUND_CAPACITY";

const DEFAULT_BIND: ([u8; 4], u16) = ([0, 0, 0, 0], 3030);
const DEFAULT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Relay server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Canvas UI files, if this process also serves the page.
    pub static_dir: Option<PathBuf>,
    pub channel_capacity: usize,
    /// Per-connection outbound queue depth. A peer that falls this far
    /// behind misses frames until it catches up.
    pub outbound_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(DEFAULT_BIND),
            static_dir: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to read variables; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(BIND_VAR) {
            config.bind_addr = value
                .parse()
                .map_err(|source| ConfigError::InvalidAddr { value, source })?;
        }

        if let Some(dir) = lookup(STATIC_DIR_VAR).filter(|d| !d.is_empty()) {
            config.static_dir = Some(PathBuf::from(dir));
        }

        if let Some(value) = lookup(CHANNEL_CAPACITY_VAR) {
            config.channel_capacity = parse_capacity(value)?;
        }

        if let Some(value) = lookup(OUTBOUND_CAPACITY_VAR) {
            config.outbound_capacity = parse_capacity(value)?;
        }

        Ok(config)
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity;
        self
    }
}

fn parse_capacity(value: String) -> Result<usize, ConfigError> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidCapacity(value)),
    }
}
