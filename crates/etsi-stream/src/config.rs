//! ETSI Stream Configuration
//!
//! Listener, identifier root and per-connection limits of the stream
//! router, plus the TSDB endpoint its sessions connect to.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use etsi_client::ClientConfig;
use etsi_common::config::{env_parse_or, load_toml};
use etsi_common::{identifier_root_from_env, DEFAULT_IDENTIFIER_ROOT};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

pub const ENV_WSPORT: &str = "WSPORT";
pub const DEFAULT_WSPORT: u16 = 8080;

// =============================================================================
// Stream Configuration
// =============================================================================

/// Stream router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub host: String,
    pub port: u16,
    /// Namespace every group lives under.
    pub identifier_root: String,
    /// Capacity of each connection's outbound frame queue.
    pub queue_capacity: usize,
    pub max_connections: usize,
    pub enable_cors: bool,
    #[serde(skip)]
    pub client: ClientConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_WSPORT,
            identifier_root: DEFAULT_IDENTIFIER_ROOT.to_string(),
            queue_capacity: 128,
            max_connections: 1024,
            enable_cors: true,
            client: ClientConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Create a config listening on the given host and port.
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            ..Default::default()
        }
    }

    /// Defaults overridden by `WSPORT`, `ETSI_ROOT` and the `IOTDB_*`
    /// variables.
    pub fn from_env() -> Self {
        Self {
            port: env_parse_or(ENV_WSPORT, DEFAULT_WSPORT),
            identifier_root: identifier_root_from_env(),
            client: ClientConfig::from_env(),
            ..Default::default()
        }
    }

    /// Read a TOML file; the TSDB endpoint comes from the environment.
    pub fn from_file(path: impl AsRef<Path>) -> etsi_common::Result<Self> {
        let mut config: StreamConfig = load_toml(path.as_ref())?;
        config.client = ClientConfig::from_env();
        Ok(config)
    }

    /// Get the socket address for binding.
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], self.port)))
    }

    pub fn with_identifier_root(mut self, root: impl Into<String>) -> Self {
        self.identifier_root = root.into();
        self
    }

    pub fn with_client(mut self, client: ClientConfig) -> Self {
        self.client = client;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
