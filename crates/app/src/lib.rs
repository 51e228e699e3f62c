//! Face Overlay application
//!
//! Configuration, logging, and metrics setup plus the pieces the
//! `face-overlay` binary wires together: the status server, the backend
//! health monitor, and the frame-dumping overlay surface.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use camera_capture::CaptureConfig;
use metrics_exporter_prometheus::PrometheusBuilder;
use overlay_engine::OverlayConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use vision_client::ClientConfig;

pub mod dump;
pub mod monitor;
pub mod server;

pub use dump::FrameDumpSurface;
pub use monitor::spawn_health_monitor;
pub use server::{create_router, run_server, AppState};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "FACE_OVERLAY";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum level: trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: ClientConfig,
    pub capture: CaptureConfig,
    pub overlay: OverlayConfig,
    pub logging: LoggingConfig,
    /// Prometheus exporter listen address
    pub metrics_addr: Option<String>,
    /// Status server listen address
    pub server_addr: Option<String>,
    /// Seconds between backend health checks
    pub health_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: ClientConfig::default(),
            capture: CaptureConfig::default(),
            overlay: OverlayConfig::default(),
            logging: LoggingConfig::default(),
            metrics_addr: None,
            server_addr: None,
            health_interval_secs: 10,
        }
    }
}

impl AppConfig {
    /// Load from an optional TOML file, overridden by `FACE_OVERLAY__*` variables
    pub fn load(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;

        settings
            .try_deserialize()
            .context("invalid configuration")
    }
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level: Level = config
        .level
        .parse()
        .with_context(|| format!("invalid log level {:?}", config.level))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.context("failed to set tracing subscriber")
}

/// Install the Prometheus exporter
pub fn init_metrics(addr: &str) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid metrics address {:?}", addr))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("failed to install Prometheus exporter")?;
    info!("Prometheus metrics on http://{}/metrics", addr);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = AppConfig::load(Path::new("/nonexistent/face-overlay.toml")).unwrap();
        assert_eq!(config.backend.url, "http://localhost:5001");
        assert_eq!(config.overlay.period_ms, 100);
        assert_eq!(config.capture.jpeg_quality, 92);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.health_interval_secs, 10);
        assert!(config.metrics_addr.is_none());
    }

    #[test]
    fn test_file_sections_override_defaults() {
        let path = std::env::temp_dir().join(format!("face-overlay-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            r#"
metrics_addr = "127.0.0.1:9100"

[backend]
url = "http://vision:5001"

[overlay]
period_ms = 150
forward_region = true

[overlay.default_region]
x = 10.0
y = 20.0
width = 200.0
height = 100.0
"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.backend.url, "http://vision:5001");
        assert_eq!(config.backend.timeout_ms, ClientConfig::default().timeout_ms);
        assert_eq!(config.overlay.period_ms, 150);
        assert!(config.overlay.forward_region);
        assert_eq!(config.overlay.default_region.width, 200.0);
        assert_eq!(config.overlay.min_region_size, 50.0);
        assert_eq!(config.metrics_addr.as_deref(), Some("127.0.0.1:9100"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let config = LoggingConfig {
            level: "loud".into(),
            json: false,
        };
        assert!(init_logging(&config).is_err());
    }
}
