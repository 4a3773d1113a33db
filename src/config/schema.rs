//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the multiplexer.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the protocol multiplexer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MuxConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Path constants used for classification.
    pub paths: PathConfig,

    /// Administrative access settings.
    pub admin: AdminConfig,

    /// Static resource serving.
    pub static_files: StaticFilesConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Request targets that select a chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathConfig {
    /// Exact path of the administrative UI.
    pub admin_root_path: String,

    /// Prefix that selects the WebSocket chain.
    pub websocket_path: String,

    /// Redirect target for requests to `/`.
    pub landing_url: String,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            admin_root_path: "/admin".to_string(),
            websocket_path: "/websockets".to_string(),
            landing_url: "http://www.blynk.cc".to_string(),
        }
    }
}

/// Administrative access configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Comma-separated list of IPs or CIDR networks allowed to reach the admin path.
    pub allowed_ips: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            allowed_ips: "127.0.0.1,::1".to_string(),
        }
    }
}

/// Static resource configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Serve loose files from `root` instead of the built-in bundle.
    pub unpacked: bool,

    /// Directory that contains the `static/` tree in unpacked mode.
    pub root: PathBuf,

    /// Directory holding generated CSV archives.
    pub csv_dir: PathBuf,

    /// File suffix that identifies CSV archives.
    pub csv_suffix: String,

    /// Chunk size for streamed file bodies, in bytes.
    pub chunk_size: usize,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            unpacked: false,
            root: PathBuf::from("."),
            csv_dir: std::env::temp_dir().join("protomux-csv"),
            csv_suffix: ".csv.gz".to_string(),
            chunk_size: 8 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout for HTTP handler stages in seconds.
    pub request_secs: u64,

    /// How long to wait for open connections during shutdown, in seconds.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let config: MuxConfig = toml::from_str(
            r#"
            [paths]
            websocket_path = "/ws"

            [admin]
            allowed_ips = "10.0.0.0/8"
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.websocket_path, "/ws");
        assert_eq!(config.paths.admin_root_path, "/admin");
        assert_eq!(config.admin.allowed_ips, "10.0.0.0/8");
        assert_eq!(config.listener.max_connections, 10_000);
        assert_eq!(config.static_files.csv_suffix, ".csv.gz");
        assert!(!config.static_files.unpacked);
    }
}
