use database::PoolSettings;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

/// Where the registry lives and how the connection pool behaves. Every
/// timeout is bounded so no store operation can hang indefinitely.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Path of the SQLite database file. Created on first start.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Seconds to wait for a free pooled connection.
    #[serde(default = "default_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Seconds to wait on a conflicting write lock before reporting a
    /// transient failure to the caller.
    #[serde(default = "default_timeout_secs")]
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_timeout_secs(),
            busy_timeout_secs: default_timeout_secs(),
        }
    }
}

impl DatabaseSettings {
    /// Converts the file-level settings into the store's explicit pool
    /// construction parameters.
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            path: self.path.clone(),
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
            busy_timeout: Duration::from_secs(self.busy_timeout_secs),
        }
    }
}

/// The address the HTTP surface binds to.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("battmon.db")
}

fn default_max_connections() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8080
}
