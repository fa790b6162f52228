use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable that overrides `generative.api_key`.
pub const API_KEY_ENV: &str = "NEARBY_API_KEY";

const API_KEY_PLACEHOLDER: &str = "YOUR_GEMINI_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Generative language API settings
    #[serde(default)]
    pub generative: GenerativeConfig,

    /// Location and geocoding settings
    #[serde(default)]
    pub location: LocationConfig,

    /// Fact pipeline settings
    #[serde(default)]
    pub facts: FactsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeConfig {
    /// Gemini API key. `NEARBY_API_KEY` takes precedence when set.
    #[serde(default)]
    pub api_key: String,

    /// Model name, e.g. "gemini-1.5-flash"
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the Generative Language API
    #[serde(default = "default_generative_url")]
    pub base_url: String,

    /// HTTP timeout for a single generation call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Ask the model for a JSON mime type response
    #[serde(default = "default_true")]
    pub json_response: bool,
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_generative_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            api_key: API_KEY_PLACEHOLDER.to_string(),
            model: default_model(),
            base_url: default_generative_url(),
            request_timeout_secs: default_request_timeout(),
            json_response: true,
        }
    }
}

impl GenerativeConfig {
    /// Check if the API key is configured (not empty or a placeholder)
    pub fn is_configured(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && !key.starts_with("YOUR_")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Fixes older than this are discarded
    #[serde(default = "default_freshness")]
    pub freshness_secs: u64,

    /// Fixed latitude for hosts without a location service
    #[serde(default)]
    pub latitude: Option<f64>,

    /// Fixed longitude for hosts without a location service
    #[serde(default)]
    pub longitude: Option<f64>,

    /// Nominatim reverse geocoding endpoint
    #[serde(default = "default_geocoder_url")]
    pub geocoder_url: String,
}

fn default_freshness() -> u64 {
    5
}

fn default_geocoder_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            freshness_secs: default_freshness(),
            latitude: None,
            longitude: None,
            geocoder_url: default_geocoder_url(),
        }
    }
}

impl LocationConfig {
    /// Both coordinates, when configured.
    pub fn fixed_position(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactsConfig {
    /// Total generation attempts per fetch, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Minimum number of facts requested from the model
    #[serde(default = "default_min_facts")]
    pub min_facts: u32,

    /// Delay before the first retry (doubles each retry)
    #[serde(default = "default_retry_initial_delay")]
    pub retry_initial_delay_ms: u64,

    /// Upper bound for the retry delay
    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_min_facts() -> u32 {
    10
}

fn default_retry_initial_delay() -> u64 {
    250
}

fn default_retry_max_delay() -> u64 {
    2000
}

impl Default for FactsConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_facts: default_min_facts(),
            retry_initial_delay_ms: default_retry_initial_delay(),
            retry_max_delay_ms: default_retry_max_delay(),
        }
    }
}


impl Config {
    /// Load configuration from the default path, creating it if it doesn't exist.
    ///
    /// `NEARBY_API_KEY` overrides the API key from the file.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            tracing::info!("Wrote default configuration to {}", config_path.display());
            config
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.generative.api_key = key;
            }
        }

        Ok(config)
    }

    /// Load configuration from a specific file without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it, failing fast on errors.
    ///
    /// Warnings are logged and returned alongside the config.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        Ok(config.into_validated()?)
    }

    /// Validate an already loaded config, consuming it.
    pub fn into_validated(self) -> Result<(Self, ValidationResult), ConfigError> {
        let validation = self.validate();

        if !self.generative.is_configured() {
            return Err(ConfigError::MissingSetting(format!(
                "generative.api_key (set it in the config file or via {})",
                API_KEY_ENV
            )));
        }

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((self, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if !self.generative.is_configured() {
            result.add_error("generative.api_key", "API key is missing");
        }

        if self.generative.model.trim().is_empty() {
            result.add_error("generative.model", "Model name must not be empty");
        }

        self.validate_url(&self.generative.base_url, "generative.base_url", &mut result);
        self.validate_url(&self.location.geocoder_url, "location.geocoder_url", &mut result);

        if self.generative.request_timeout_secs == 0 {
            result.add_error(
                "generative.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        if self.location.freshness_secs == 0 {
            result.add_error(
                "location.freshness_secs",
                "Freshness window must be greater than 0",
            );
        }

        if let Some(lat) = self.location.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                result.add_error("location.latitude", "Latitude must be within -90..90");
            }
        }

        if let Some(lon) = self.location.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                result.add_error("location.longitude", "Longitude must be within -180..180");
            }
        }

        if self.location.latitude.is_some() != self.location.longitude.is_some() {
            result.add_warning(
                "location",
                "Only one of latitude/longitude is set; fixed position ignored",
            );
        }

        if self.facts.max_attempts == 0 {
            result.add_error("facts.max_attempts", "At least one attempt is required");
        } else if self.facts.max_attempts > 10 {
            result.add_warning(
                "facts.max_attempts",
                "More than 10 attempts per fetch may be slow and costly",
            );
        }

        if self.facts.min_facts == 0 {
            result.add_warning("facts.min_facts", "Requesting zero facts");
        }

        if self.facts.retry_initial_delay_ms > self.facts.retry_max_delay_ms {
            result.add_warning(
                "facts.retry_initial_delay_ms",
                "Initial retry delay exceeds the maximum delay",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("nearby");

        Ok(config_dir.join("config.toml"))
    }
}
