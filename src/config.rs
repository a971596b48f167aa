//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `hub.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - IngestConfig: TCP listener the sensor nodes push to.
//!     - BufferConfig: How many recent readings are kept.
//!     - DashboardConfig: HTTP listener and refresh cadence.
//!     - SimulatorConfig: Synthetic node for demos without hardware.
//!     - LoggingConfig: tracing filter and per-reading output.
//!
//! ==============================================================================

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct HubConfig {
    pub ingest: IngestConfig,
    pub buffer: BufferConfig,
    pub dashboard: DashboardConfig,
    pub simulator: SimulatorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    pub bind: String,
    pub port: u16,
    /// longest accepted line, terminator excluded
    pub max_line_bytes: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BufferConfig {
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind: String,
    pub port: u16,
    pub refresh_ms: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    pub enabled: bool,
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0".to_string(), port: 12345, max_line_bytes: 1024 }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { capacity: crate::buffer::DEFAULT_CAPACITY }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0".to_string(), port: 3000, refresh_ms: 2000 }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self { enabled: false, interval_ms: 2000 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

impl IngestConfig {
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("invalid ingest address {}:{}", self.bind, self.port))
    }
}

impl DashboardConfig {
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("invalid dashboard address {}:{}", self.bind, self.port))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }
}

impl SimulatorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl HubConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: HubConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load with default fallback
    ///
    /// runs before the tracing subscriber exists (the log level lives in
    /// here), so notices go to stdout like the startup banner.
    pub fn load_or_default() -> Self {
        let paths = [
            PathBuf::from("config").join("hub.toml"),
            PathBuf::from("..").join("config").join("hub.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {:#}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer.capacity == 0 {
            bail!("buffer.capacity must be at least 1");
        }
        if self.dashboard.refresh_ms < 100 {
            bail!("dashboard.refresh_ms must be at least 100 (got {})", self.dashboard.refresh_ms);
        }
        if self.simulator.interval_ms < 100 {
            bail!("simulator.interval_ms must be at least 100 (got {})", self.simulator.interval_ms);
        }
        if self.ingest.max_line_bytes == 0 {
            bail!("ingest.max_line_bytes must be at least 1");
        }
        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│            HUB CONFIGURATION            │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Ingest: {}:{}", self.ingest.bind, self.ingest.port);
        println!("│ Dashboard: {}:{}", self.dashboard.bind, self.dashboard.port);
        println!("│ Buffer Capacity: {}", self.buffer.capacity);
        println!("│ Refresh Interval: {}ms", self.dashboard.refresh_ms);
        println!("│ Simulator: {}", if self.simulator.enabled { "on" } else { "off" });
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = HubConfig::default();
        assert_eq!(c.ingest.port, 12345);
        assert_eq!(c.buffer.capacity, 100);
        assert_eq!(c.dashboard.refresh_ms, 2000);
        assert!(!c.simulator.enabled);
        assert!(c.validate().is_ok());
        assert_eq!(c.ingest.addr().unwrap().port(), 12345);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[buffer]\ncapacity = 10\n\n[simulator]\nenabled = true").unwrap();

        let c = HubConfig::load(f.path()).unwrap();
        assert_eq!(c.buffer.capacity, 10);
        assert!(c.simulator.enabled);
        assert_eq!(c.simulator.interval_ms, 2000);
        assert_eq!(c.ingest, IngestConfig::default());
        assert_eq!(c.logging.level, "info");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[buffer]\ncapacity = 0").unwrap();
        assert!(HubConfig::load(f.path()).is_err());

        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[dashboard]\nrefresh_ms = 5").unwrap();
        assert!(HubConfig::load(f.path()).is_err());

        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[simulator]\ninterval_ms = 99").unwrap();
        assert!(HubConfig::load(f.path()).is_err());

        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[ingest]\nmax_line_bytes = 0").unwrap();
        assert!(HubConfig::load(f.path()).is_err());

        // boundaries are inclusive
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[simulator]\ninterval_ms = 100\n\n[ingest]\nmax_line_bytes = 1").unwrap();
        assert!(HubConfig::load(f.path()).is_ok());
    }

    #[test]
    fn test_malformed_toml() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[ingest\nport = ").unwrap();
        assert!(HubConfig::load(f.path()).is_err());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config").join("hub.toml");
        assert_eq!(HubConfig::load(path).unwrap(), HubConfig::default());
    }

    #[test]
    fn test_missing_file() {
        assert!(HubConfig::load("/nonexistent/hub.toml").is_err());
    }
}
