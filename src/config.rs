//! Server facade configuration (spec §4.6).

use std::net::IpAddr;

use crate::constants::{DEFAULT_BACKLOG, DEFAULT_HOST, DEFAULT_PORT};
use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub backlog: u32,
    pub allowed_hosts: Vec<IpAddr>,
    pub redis: Option<RedisConfig>,
    pub grpc_port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            allowed_hosts: vec!["127.0.0.1".parse().expect("valid loopback literal")],
            redis: None,
            grpc_port: None,
        }
    }
}

impl ServerConfig {
    /// Validate a raw port value per §4.6: reject 0-1023 as forbidden,
    /// reject out-of-range values as improper, warn on the ephemeral range.
    pub fn validate_port(raw: i64) -> Result<u16, ConfigError> {
        if !(0..=65535).contains(&raw) {
            return Err(ConfigError::ImproperPort(raw));
        }
        let port = raw as u32;
        if port <= 1023 {
            return Err(ConfigError::ForbiddenPort(port));
        }
        if (49152..=65535).contains(&port) {
            tracing::warn!(
                "port {port} falls in the dynamic/ephemeral range (49152-65535); \
                 this may collide with transient OS-assigned ports"
            );
        }
        Ok(port as u16)
    }

    pub fn with_port(mut self, raw: i64) -> Result<Self, ConfigError> {
        self.port = Self::validate_port(raw)?;
        Ok(self)
    }
}
