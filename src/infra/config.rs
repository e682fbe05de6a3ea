//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::geo::GeoPoint;
use crate::domain::ports::PortCatalog;
use crate::domain::progress::{validate_fraction, ProgressMode};
use crate::domain::route::DEFAULT_REGIONAL_WAYPOINTS;
use crate::domain::shipment::{TrackingOptions, VoyageWindow};
use crate::error::TrackingError;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Progress used for shipments with neither a fixed progress nor a voyage window
    #[serde(default = "default_progress")]
    pub default_progress: f64,
    /// Waypoint count for regional routes
    #[serde(default = "default_regional_waypoints")]
    pub regional_waypoints: usize,
    #[serde(default)]
    pub progress_mode: ProgressMode,
    /// Serve mode recompute interval
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            default_progress: default_progress(),
            regional_waypoints: default_regional_waypoints(),
            progress_mode: ProgressMode::default(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

fn default_progress() -> f64 {
    0.6
}

fn default_regional_waypoints() -> usize {
    DEFAULT_REGIONAL_WAYPOINTS
}

fn default_refresh_interval_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval_secs")]
    pub interval_secs: u64,
    /// Prometheus metrics HTTP port (0 to disable)
    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_metrics_interval_secs(),
            prometheus_port: default_prometheus_port(),
        }
    }
}

fn default_metrics_interval_secs() -> u64 {
    10
}

fn default_prometheus_port() -> u16 {
    9090
}

#[derive(Debug, Clone, Deserialize)]
pub struct EgressConfig {
    /// File path for tracking snapshots (JSONL format)
    #[serde(default = "default_egress_file")]
    pub file: String,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self { file: default_egress_file() }
    }
}

fn default_egress_file() -> String {
    "tracking.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_id")]
    pub id: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self { id: default_site_id() }
    }
}

fn default_site_id() -> String {
    "freight".to_string()
}

/// A shipment to track, as written in the config file.
///
/// `origin` and `destination` are port names or `lon,lat` strings.
/// Timestamps are quoted RFC 3339 strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShipmentConfig {
    pub tracking_number: String,
    pub origin: String,
    pub destination: String,
    /// Fixed progress; overrides the voyage window
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub departed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub eta: Option<DateTime<Utc>>,
    #[serde(default)]
    pub weather: Option<String>,
}

impl ShipmentConfig {
    /// Voyage window when both timestamps are present
    pub fn window(&self) -> Result<Option<VoyageWindow>, TrackingError> {
        match (self.departed_at, self.eta) {
            (Some(departed_at), Some(eta)) => VoyageWindow::new(departed_at, eta).map(Some),
            _ => Ok(None),
        }
    }

    /// Progress at `now`: fixed progress, else the window's elapsed share,
    /// else `fallback`
    pub fn progress_at(&self, now: DateTime<Utc>, fallback: f64) -> f64 {
        if let Some(progress) = self.progress {
            return progress;
        }
        match self.window() {
            Ok(Some(window)) => window.progress_at(now),
            _ => fallback,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub egress: EgressConfig,
    /// Extra ports as `Name = [lon, lat]`
    #[serde(default)]
    pub ports: HashMap<String, [f64; 2]>,
    #[serde(default)]
    pub shipments: Vec<ShipmentConfig>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    default_progress: f64,
    regional_waypoints: usize,
    progress_mode: ProgressMode,
    refresh_interval_secs: u64,
    metrics_interval_secs: u64,
    prometheus_port: u16,
    config_file: String,
    egress_file: String,
    ports: PortCatalog,
    shipments: Vec<ShipmentConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            default_progress: default_progress(),
            regional_waypoints: default_regional_waypoints(),
            progress_mode: ProgressMode::Index,
            refresh_interval_secs: default_refresh_interval_secs(),
            metrics_interval_secs: default_metrics_interval_secs(),
            prometheus_port: default_prometheus_port(),
            config_file: "default".to_string(),
            egress_file: default_egress_file(),
            ports: PortCatalog::default(),
            shipments: Vec::new(),
        }
    }
}

impl Config {
    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml_str(&content, &path.display().to_string())
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parse configuration from TOML text. `source` is recorded as the config file name.
    pub fn from_toml_str(content: &str, source: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content)?;

        validate_fraction(toml_config.tracking.default_progress)
            .context("tracking.default_progress must be within [0, 1]")?;
        if toml_config.tracking.regional_waypoints < 2 {
            anyhow::bail!("tracking.regional_waypoints must be at least 2");
        }

        let mut ports = PortCatalog::default();
        for (name, [lon, lat]) in &toml_config.ports {
            let point = GeoPoint::new(*lon, *lat).with_context(|| format!("port {}", name))?;
            ports.insert(name, point);
        }

        for shipment in &toml_config.shipments {
            if let Some(progress) = shipment.progress {
                validate_fraction(progress)
                    .with_context(|| format!("shipment {}", shipment.tracking_number))?;
            }
            shipment.window().with_context(|| format!("shipment {}", shipment.tracking_number))?;
        }

        Ok(Self {
            site_id: toml_config.site.id,
            default_progress: toml_config.tracking.default_progress,
            regional_waypoints: toml_config.tracking.regional_waypoints,
            progress_mode: toml_config.tracking.progress_mode,
            refresh_interval_secs: toml_config.tracking.refresh_interval_secs,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            prometheus_port: toml_config.metrics.prometheus_port,
            config_file: source.to_string(),
            egress_file: toml_config.egress.file,
            ports,
            shipments: toml_config.shipments,
        })
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load(args: &[String]) -> Self {
        Self::load_from_path(&Self::resolve_config_path(args))
    }

    /// Load configuration from `path`, falling back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Tracking options for one configured shipment
    pub fn tracking_options(&self, shipment: &ShipmentConfig) -> TrackingOptions {
        TrackingOptions {
            progress_mode: self.progress_mode,
            regional_waypoints: self.regional_waypoints,
            window: shipment.window().ok().flatten(),
            weather: shipment.weather.clone(),
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn default_progress(&self) -> f64 {
        self.default_progress
    }

    pub fn regional_waypoints(&self) -> usize {
        self.regional_waypoints
    }

    pub fn progress_mode(&self) -> ProgressMode {
        self.progress_mode
    }

    pub fn refresh_interval_secs(&self) -> u64 {
        self.refresh_interval_secs
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn prometheus_port(&self) -> u16 {
        self.prometheus_port
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    pub fn egress_file(&self) -> &str {
        &self.egress_file
    }

    pub fn ports(&self) -> &PortCatalog {
        &self.ports
    }

    pub fn shipments(&self) -> &[ShipmentConfig] {
        &self.shipments
    }

    /// Builder method for tests to set the configured shipments
    #[cfg(test)]
    pub fn with_shipments(mut self, shipments: Vec<ShipmentConfig>) -> Self {
        self.shipments = shipments;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn shipment(number: &str) -> ShipmentConfig {
        ShipmentConfig {
            tracking_number: number.to_string(),
            origin: "Shanghai".to_string(),
            destination: "Los Angeles".to_string(),
            progress: None,
            departed_at: None,
            eta: None,
            weather: None,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.site_id(), "freight");
        assert_eq!(config.default_progress(), 0.6);
        assert_eq!(config.regional_waypoints(), 6);
        assert_eq!(config.progress_mode(), ProgressMode::Index);
        assert_eq!(config.metrics_interval_secs(), 10);
        assert_eq!(config.prometheus_port(), 9090);
        assert!(config.ports().get("Shanghai").is_some());
        assert!(config.shipments().is_empty());
    }

    #[test]
    fn test_resolve_config_path_default() {
        let args: Vec<String> = vec!["freight-tracker".to_string()];
        if env::var("CONFIG_FILE").is_err() {
            assert_eq!(Config::resolve_config_path(&args), "config/dev.toml");
        }
    }

    #[test]
    fn test_resolve_config_path_from_arg() {
        let args: Vec<String> = vec![
            "freight-tracker".to_string(),
            "--config".to_string(),
            "config/prod.toml".to_string(),
        ];
        assert_eq!(Config::resolve_config_path(&args), "config/prod.toml");
    }

    #[test]
    fn test_resolve_config_path_from_arg_equals() {
        let args: Vec<String> =
            vec!["freight-tracker".to_string(), "--config=config/demo.toml".to_string()];
        assert_eq!(Config::resolve_config_path(&args), "config/demo.toml");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("", "inline").unwrap();
        assert_eq!(config.egress_file(), "tracking.jsonl");
        assert_eq!(config.refresh_interval_secs(), 5);
        assert_eq!(config.config_file(), "inline");
        assert_eq!(config.site_id(), "freight");

        let config =
            Config::from_toml_str("[tracking]\ndefault_progress = 0.5\n", "inline").unwrap();
        assert_eq!(config.site_id(), "freight");
        assert_eq!(config.site_id(), Config::default().site_id());
    }

    #[test]
    fn test_ports_extend_catalog() {
        let config = Config::from_toml_str(
            r#"
[ports]
"Piraeus" = [23.6470, 37.9420]
"#,
            "inline",
        )
        .unwrap();
        assert_eq!(config.ports().get("piraeus"), Some(GeoPoint::from_degrees(23.6470, 37.9420)));
        assert!(config.ports().get("Rotterdam").is_some());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_toml_str("[tracking]\ndefault_progress = 1.5\n", "x").is_err());
        assert!(Config::from_toml_str("[tracking]\nregional_waypoints = 1\n", "x").is_err());
        assert!(Config::from_toml_str("[ports]\n\"Nowhere\" = [0.0, 91.0]\n", "x").is_err());
        assert!(Config::from_toml_str("[tracking]\nprogress_mode = \"warp\"\n", "x").is_err());
    }

    #[test]
    fn test_shipment_progress_sources() {
        let now = Utc.with_ymd_and_hms(2026, 10, 7, 0, 0, 0).unwrap();

        let plain = shipment("A");
        assert_eq!(plain.progress_at(now, 0.6), 0.6);

        let mut windowed = shipment("B");
        windowed.departed_at = Some(Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap());
        windowed.eta = Some(Utc.with_ymd_and_hms(2026, 10, 11, 0, 0, 0).unwrap());
        assert!((windowed.progress_at(now, 0.6) - 0.6).abs() < 1e-9);
        assert!(windowed.window().unwrap().is_some());

        let mut fixed = windowed.clone();
        fixed.progress = Some(0.25);
        assert_eq!(fixed.progress_at(now, 0.6), 0.25);
    }

    #[test]
    fn test_tracking_options_from_config() {
        let mut s = shipment("A");
        s.weather = Some("Fog".to_string());
        let config = Config::default().with_shipments(vec![s.clone()]);
        let options = config.tracking_options(&config.shipments()[0]);
        assert_eq!(options.regional_waypoints, 6);
        assert_eq!(options.weather.as_deref(), Some("Fog"));
        assert!(options.window.is_none());
    }
}
