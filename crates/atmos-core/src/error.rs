//! User-facing error taxonomy for Atmos.
//!
//! Library crates keep their own precise error enums; the binary maps them
//! into `AppError` so every failure ends in a readable replacement message:
//! - `NotFound` for unknown cities
//! - `Auth` for rejected credentials on an external API
//! - `Network` for transport failures
//! - `Unsupported` / `PermissionDenied` for device capabilities

use thiserror::Error;

/// A device or platform capability the application may need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Geolocation,
    Microphone,
    SpeechSynthesis,
    Notifications,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::Geolocation => "geolocation",
            Capability::Microphone => "microphone",
            Capability::SpeechSynthesis => "speech synthesis",
            Capability::Notifications => "notifications",
        };
        f.write_str(name)
    }
}

/// Top-level application error type.
///
/// Use `user_message()` to get text suitable for the terminal.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No city name given")]
    EmptyCity,

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Unsupported capability: {0}")]
    Unsupported(Capability),

    #[error("Permission denied: {0}")]
    PermissionDenied(Capability),

    #[error("Location lookup timed out")]
    LocationTimeout,

    #[error("No speech detected")]
    NoSpeech,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "City not found. Please check the spelling and try again.",
            AppError::EmptyCity => "Please enter a city name.",
            AppError::Auth(e) => e.user_message(),
            AppError::Network(e) => e.user_message(),
            AppError::Unsupported(capability) => match capability {
                Capability::Geolocation => "Geolocation is not supported on this system.",
                Capability::Microphone => "Sorry, speech recognition is not supported here.",
                Capability::SpeechSynthesis => "Text-to-speech is not supported here.",
                Capability::Notifications => "Notifications are not supported here.",
            },
            AppError::PermissionDenied(capability) => match capability {
                Capability::Geolocation => {
                    "Location access denied. Please enable location services or search manually."
                }
                Capability::Microphone => "Microphone access denied. Please enable permissions.",
                Capability::SpeechSynthesis => "Speech output is disabled.",
                Capability::Notifications => "Notification permission was denied.",
            },
            AppError::LocationTimeout => {
                "Location request timed out. Please try again or search manually."
            }
            AppError::NoSpeech => "I didn't catch that. Please try again.",
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Failed to fetch weather data. Please check your connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The weather service is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "Failed to fetch weather data. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
            NetworkError::LocationUnavailable(_) => {
                "Location information unavailable. Please search manually."
            }
        }
    }
}

/// Credentials rejected by an external API.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid weather API key")]
    InvalidWeatherKey,

    #[error("Invalid assistant API key")]
    InvalidAssistantKey,

    #[error("API key not configured for {0}")]
    MissingKey(String),
}

impl AuthError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidWeatherKey => "Invalid API key. Please check your configuration.",
            AuthError::InvalidAssistantKey => {
                "The assistant rejected its API key. Please check your configuration."
            }
            AuthError::MissingKey(_) => "An API key is missing. Please check your configuration.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}
