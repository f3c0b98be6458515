//! Configuration management for `travelmap`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::TravelMapError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TravelMapConfig {
    /// Travel planning backend
    #[serde(default)]
    pub backend: BackendConfig,
    /// Geocoding chain settings
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Route building settings
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL the `/map`, `/travel` endpoints hang off
    #[serde(default = "default_backend_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_backend_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    #[serde(default = "default_backend_max_retries")]
    pub max_retries: u32,
}

/// Geocoding chain settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// How long the map provider geocoder may take before we move on
    #[serde(default = "default_sdk_timeout_ms")]
    pub sdk_timeout_ms: u64,
    /// Map provider web-service key. Without it the provider stage is skipped.
    pub amap_key: Option<String>,
    #[serde(default = "default_amap_base_url")]
    pub amap_base_url: String,
    #[serde(default = "default_nominatim_base_url")]
    pub nominatim_base_url: String,
    /// Language preference sent to the public geocoder
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
    /// Identifying client header required by the public geocoder
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Number of public geocoder candidates to rank
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: u32,
}

/// Route building settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Pairs closer than this are treated as the same place
    #[serde(default = "default_min_route_distance")]
    pub min_route_distance_m: f64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_backend_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_backend_timeout() -> u32 {
    30
}

fn default_backend_max_retries() -> u32 {
    2
}

fn default_sdk_timeout_ms() -> u64 {
    3000
}

fn default_amap_base_url() -> String {
    "https://restapi.amap.com".to_string()
}

fn default_nominatim_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_accept_language() -> String {
    "zh-CN,en".to_string()
}

fn default_user_agent() -> String {
    "AI-Travel-Planner/1.0".to_string()
}

fn default_candidate_limit() -> u32 {
    5
}

fn default_min_route_distance() -> f64 {
    10.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_base_url(),
            timeout_seconds: default_backend_timeout(),
            max_retries: default_backend_max_retries(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            sdk_timeout_ms: default_sdk_timeout_ms(),
            amap_key: None,
            amap_base_url: default_amap_base_url(),
            nominatim_base_url: default_nominatim_base_url(),
            accept_language: default_accept_language(),
            user_agent: default_user_agent(),
            candidate_limit: default_candidate_limit(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            min_route_distance_m: default_min_route_distance(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl TravelMapConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // TRAVELMAP_GEOCODING__AMAP_KEY=... style overrides
        builder = builder.add_source(
            Environment::with_prefix("TRAVELMAP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: TravelMapConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("travelmap").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.backend.base_url.is_empty() {
            self.backend.base_url = default_backend_base_url();
        }
        if self.backend.timeout_seconds == 0 {
            self.backend.timeout_seconds = default_backend_timeout();
        }
        if self.geocoding.sdk_timeout_ms == 0 {
            self.geocoding.sdk_timeout_ms = default_sdk_timeout_ms();
        }
        if self.geocoding.amap_base_url.is_empty() {
            self.geocoding.amap_base_url = default_amap_base_url();
        }
        if self.geocoding.nominatim_base_url.is_empty() {
            self.geocoding.nominatim_base_url = default_nominatim_base_url();
        }
        if self.geocoding.accept_language.is_empty() {
            self.geocoding.accept_language = default_accept_language();
        }
        if self.geocoding.user_agent.is_empty() {
            self.geocoding.user_agent = default_user_agent();
        }
        if self.geocoding.candidate_limit == 0 {
            self.geocoding.candidate_limit = default_candidate_limit();
        }
        if self.geocoding.amap_key.as_deref() == Some("") {
            self.geocoding.amap_key = None;
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.backend.timeout_seconds > 300 {
            return Err(
                TravelMapError::config("Backend timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.backend.max_retries > 10 {
            return Err(TravelMapError::config("Backend max retries cannot exceed 10").into());
        }

        if !(1..=60_000).contains(&self.geocoding.sdk_timeout_ms) {
            return Err(TravelMapError::config(
                "Map provider geocoding timeout must be between 1 and 60000 ms",
            )
            .into());
        }

        if !(1..=50).contains(&self.geocoding.candidate_limit) {
            return Err(
                TravelMapError::config("Geocoder candidate limit must be between 1 and 50").into(),
            );
        }

        if !self.routing.min_route_distance_m.is_finite() || self.routing.min_route_distance_m < 0.0
        {
            return Err(TravelMapError::config(
                "Minimum route distance must be a non-negative number of meters",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TravelMapError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "compact"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TravelMapError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (label, url) in [
            ("Backend base URL", &self.backend.base_url),
            ("Map provider base URL", &self.geocoding.amap_base_url),
            ("Public geocoder base URL", &self.geocoding.nominatim_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(
                    TravelMapError::config(format!("{label} must be a valid HTTP or HTTPS URL"))
                        .into(),
                );
            }
        }

        Ok(())
    }
}
