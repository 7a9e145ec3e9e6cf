//! Configuration for cmpd

use cmp_backend::BackendConfig;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Compute backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Tenant to create at startup if it does not exist yet
    #[serde(default)]
    pub bootstrap: Option<BootstrapTenant>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (for development/testing)
    #[default]
    Memory,

    /// PostgreSQL storage
    Postgres {
        /// Connection URL
        url: String,

        /// Maximum connections in pool
        #[serde(default = "default_pool_size")]
        max_connections: u32,

        /// Connection timeout in seconds
        #[serde(default = "default_connection_timeout")]
        connect_timeout_secs: u64,
    },
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Seed tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapTenant {
    pub username: String,
    pub token: String,
    pub quota_cpu: f64,
    pub quota_memory: f64,
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 8080))
}

fn default_request_timeout() -> u64 {
    60
}

fn default_pool_size() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then `CMP_*`
    /// environment variables (`CMP_SERVER__LISTEN_ADDR=0.0.0.0:9000`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Add environment variables with CMP_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("CMP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmp_backend::ProviderConfig;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert!(matches!(config.backend.provider, ProviderConfig::Simulated));
        assert_eq!(config.backend.call_timeout_secs, 30);
        assert!(config.bootstrap.is_none());
    }

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert!(config.enable_cors);
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
listen_addr = "0.0.0.0:9090"

[storage]
type = "postgres"
url = "postgres://cmp@localhost/cmp"

[backend]
call_timeout_secs = 10

[backend.provider]
type = "kubernetes"
mode = "in_cluster"

[bootstrap]
username = "admin"
token = "admin-token"
quota_cpu = 64.0
quota_memory = 256.0
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = DaemonConfig::load(Some(&path)).unwrap();

        assert_eq!(config.server.listen_addr.port(), 9090);
        match config.storage {
            StorageConfig::Postgres {
                url,
                max_connections,
                ..
            } => {
                assert_eq!(url, "postgres://cmp@localhost/cmp");
                assert_eq!(max_connections, 10);
            }
            other => panic!("unexpected storage: {:?}", other),
        }
        assert_eq!(config.backend.call_timeout_secs, 10);
        assert!(matches!(
            config.backend.provider,
            ProviderConfig::Kubernetes { .. }
        ));
        assert_eq!(config.bootstrap.unwrap().username, "admin");
    }
}
