use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

const ENV_PREFIX: &str = "ATMOS";

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

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding config.toml and the weather state record
    pub config_dir: PathBuf,

    pub weather: WeatherConfig,

    pub location: LocationConfig,

    pub assistant: AssistantConfig,

    pub speech: SpeechConfig,

    pub notifications: NotificationsConfig,
}

/// OpenWeather settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// OpenWeather API key (https://openweathermap.org/api)
    pub api_key: String,

    pub base_url: String,

    /// How long a fetched snapshot counts as fresh
    pub cache_minutes: u32,

    pub request_timeout_secs: u64,

    /// Retries for transient failures (timeouts, 5xx)
    pub max_retries: u32,
}

impl WeatherConfig {
    /// Check if an API key is configured (not a placeholder)
    pub fn is_configured(&self) -> bool {
        is_real_key(&self.api_key)
    }

    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.cache_minutes) * 60)
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("OPENWEATHER_API_KEY")
                .unwrap_or_else(|_| "YOUR_OPENWEATHER_API_KEY".to_string()),
            base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            cache_minutes: 5,
            request_timeout_secs: 10,
            max_retries: 2,
        }
    }
}

/// How the "current location" is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationMode {
    /// Use the configured latitude/longitude
    Fixed,
    /// Approximate location from the public IP address
    #[default]
    Ip,
    /// Location access refused
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub mode: LocationMode,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub ip_lookup_url: String,
    pub timeout_secs: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            mode: LocationMode::Ip,
            latitude: None,
            longitude: None,
            ip_lookup_url: "http://ip-api.com/json".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Language model settings (Groq, OpenAI-compatible API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub enabled: bool,
    /// Groq API key (https://console.groq.com)
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    /// Answer "my weather" questions from a fresh current-location snapshot
    /// instead of fetching again
    pub skip_fetch_when_fresh: bool,
}

impl AssistantConfig {
    pub fn is_configured(&self) -> bool {
        self.enabled && is_real_key(&self.api_key)
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: std::env::var("GROQ_API_KEY")
                .unwrap_or_else(|_| "YOUR_GROQ_API_KEY".to_string()),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            chat_model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.7,
            max_tokens: 200,
            request_timeout_secs: 30,
            skip_fetch_when_fresh: true,
        }
    }
}

/// Speech input/output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    pub locale: String,
    pub tts_model: String,
    pub tts_voice: String,
    /// Command that plays WAV audio from stdin
    pub player_command: String,
    pub player_args: Vec<String>,
    /// Local synthesis command used when remote synthesis fails
    pub local_command: String,
    pub local_args: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            locale: "en-US".to_string(),
            tts_model: "playai-tts".to_string(),
            tts_voice: "Adelaide-PlayAI".to_string(),
            player_command: "aplay".to_string(),
            player_args: vec!["-q".to_string()],
            local_command: "espeak-ng".to_string(),
            local_args: vec!["-v".to_string(), "en-us".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub enabled: bool,
    /// Delay between consecutive alerts
    pub stagger_ms: u64,
}

impl NotificationsConfig {
    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stagger_ms: 1000,
        }
    }
}

fn is_real_key(key: &str) -> bool {
    !key.trim().is_empty() && !key.starts_with("YOUR_")
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("atmos")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            weather: WeatherConfig::default(),
            location: LocationConfig::default(),
            assistant: AssistantConfig::default(),
            speech: SpeechConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            Self::default().save_to(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, layering `ATMOS_*` environment
    /// overrides on top (e.g. `ATMOS_WEATHER__API_KEY`).
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read config file")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration (from `path`, or the default location) and
    /// validate it
    ///
    /// A file that can't be read or parsed is a `ParseError`; critical
    /// validation errors are `Invalid`. Warnings are only logged.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult), ConfigError> {
        let loaded = match path {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        };
        let config = loaded.map_err(|e| ConfigError::ParseError(format!("{e:#}")))?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        validate_url(&self.weather.base_url, "weather.base_url", &mut result);
        validate_url(&self.assistant.base_url, "assistant.base_url", &mut result);

        if !self.weather.is_configured() {
            result.add_warning(
                "weather.api_key",
                "OpenWeather API key not configured - weather requests will fail",
            );
        }

        if self.weather.cache_minutes == 0 {
            result.add_warning(
                "weather.cache_minutes",
                "Weather cache disabled (0 minutes) - every question refetches",
            );
        } else if self.weather.cache_minutes > 1440 {
            result.add_warning(
                "weather.cache_minutes",
                "Weather cache is kept for more than 24 hours",
            );
        }

        match self.location.mode {
            LocationMode::Fixed => match (self.location.latitude, self.location.longitude) {
                (Some(lat), Some(lon)) => {
                    if !(-90.0..=90.0).contains(&lat) {
                        result.add_error("location.latitude", "Latitude must be within ±90");
                    }
                    if !(-180.0..=180.0).contains(&lon) {
                        result.add_error("location.longitude", "Longitude must be within ±180");
                    }
                }
                _ => result.add_error(
                    "location",
                    "Fixed location mode requires latitude and longitude",
                ),
            },
            LocationMode::Ip => {
                validate_url(&self.location.ip_lookup_url, "location.ip_lookup_url", &mut result)
            }
            LocationMode::Disabled => {}
        }

        if self.assistant.enabled && !self.assistant.is_configured() {
            result.add_warning(
                "assistant.api_key",
                "Groq API key not configured - voice questions will get a setup reminder",
            );
        }

        if self.speech.enabled && self.speech.player_command.trim().is_empty() {
            result.add_error("speech.player_command", "Player command cannot be empty");
        }

        result
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> PathBuf {
        default_config_dir().join("config.toml")
    }
}

fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
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
