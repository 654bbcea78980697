//! Configuration management for `CareMap`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::CareMapError;
use crate::models::Coordinate;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CareMapConfig {
    /// Upstream service endpoints
    #[serde(default)]
    pub services: ServicesConfig,
    /// API keys for the weather and text generation services
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Facility search settings
    #[serde(default)]
    pub search: SearchConfig,
    /// Weather request settings
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Start position and zoom levels
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upstream service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    #[serde(default = "default_overpass_url")]
    pub overpass_url: String,
    #[serde(default = "default_weather_url")]
    pub weather_url: String,
    /// Base URL of the generative language API, without the model path
    #[serde(default = "default_generative_url")]
    pub generative_url: String,
    #[serde(default = "default_generative_model")]
    pub generative_model: String,
    /// Sent on every outbound request; Nominatim rejects anonymous clients
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// API keys, normally injected through the environment
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CredentialsConfig {
    pub weather_api_key: Option<String>,
    pub generative_api_key: Option<String>,
}

/// Facility search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search radius around the center in meters
    #[serde(default = "default_radius_meters")]
    pub radius_meters: u32,
    /// Timeout directive embedded in the Overpass query
    #[serde(default = "default_query_timeout")]
    pub query_timeout_seconds: u32,
}

/// Weather request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default = "default_language")]
    pub language: String,
}

/// Start position and zoom levels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default = "default_longitude")]
    pub longitude: f64,
    /// Label of the user marker on first load
    #[serde(default = "default_label")]
    pub label: String,
    /// Zoom on first load
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    /// Zoom after a destination search or position fix
    #[serde(default = "default_focus_zoom")]
    pub focus_zoom: u8,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory holding the built front end
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// OTLP/HTTP traces endpoint; export is off when unset
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

// Default value functions
fn default_geocoding_url() -> String {
    "https://nominatim.openstreetmap.org/search".to_string()
}

fn default_overpass_url() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

fn default_weather_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}

fn default_generative_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_generative_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_user_agent() -> String {
    format!("CareMap/{}", crate::VERSION)
}

fn default_radius_meters() -> u32 {
    2500
}

fn default_query_timeout() -> u32 {
    30
}

fn default_units() -> String {
    "metric".to_string()
}

fn default_language() -> String {
    "ja".to_string()
}

fn default_latitude() -> f64 {
    35.6812
}

fn default_longitude() -> f64 {
    139.7671
}

fn default_label() -> String {
    "東京駅 (サンプル)".to_string()
}

fn default_zoom() -> u8 {
    15
}

fn default_focus_zoom() -> u8 {
    16
}

fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> String {
    "frontend/dist".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            geocoding_url: default_geocoding_url(),
            overpass_url: default_overpass_url(),
            weather_url: default_weather_url(),
            generative_url: default_generative_url(),
            generative_model: default_generative_model(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            radius_meters: default_radius_meters(),
            query_timeout_seconds: default_query_timeout(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            units: default_units(),
            language: default_language(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            label: default_label(),
            zoom: default_zoom(),
            focus_zoom: default_focus_zoom(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl DefaultsConfig {
    /// The configured start coordinate
    pub fn start(&self) -> crate::Result<Coordinate> {
        Coordinate::new(self.latitude, self.longitude)
    }
}

impl CareMapConfig {
    /// Load configuration from `config_path` (or the default location) and
    /// `CAREMAP_` environment variables
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

        // CAREMAP_CREDENTIALS__WEATHER_API_KEY=... and friends
        builder = builder.add_source(
            Environment::with_prefix("CAREMAP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: CareMapConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("caremap").join("config.toml"))
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Keys are optional, but an empty one is almost always a broken env file
    pub fn validate_api_keys(&self) -> Result<()> {
        let keys = [
            ("weather", &self.credentials.weather_api_key),
            ("generative", &self.credentials.generative_api_key),
        ];
        for (name, key) in keys {
            if key.as_deref().is_some_and(|k| k.trim().is_empty()) {
                return Err(CareMapError::config(format!(
                    "{name} API key cannot be empty if provided. Either remove it or provide a valid key."
                ))
                .into());
            }
        }
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.search.radius_meters == 0 || self.search.radius_meters > 10_000 {
            return Err(
                CareMapError::config("Search radius must be between 1 and 10000 meters").into(),
            );
        }

        if self.search.query_timeout_seconds == 0 || self.search.query_timeout_seconds > 180 {
            return Err(CareMapError::config(
                "Overpass query timeout must be between 1 and 180 seconds",
            )
            .into());
        }

        for zoom in [self.defaults.zoom, self.defaults.focus_zoom] {
            if !(1..=19).contains(&zoom) {
                return Err(CareMapError::config(format!(
                    "Zoom level {zoom} must be between 1 and 19"
                ))
                .into());
            }
        }

        self.defaults
            .start()
            .map_err(|e| CareMapError::config(format!("Invalid default position: {e}")))?;

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(CareMapError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(CareMapError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("geocoding", &self.services.geocoding_url),
            ("overpass", &self.services.overpass_url),
            ("weather", &self.services.weather_url),
            ("generative", &self.services.generative_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(CareMapError::config(format!(
                    "The {name} service URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}
