pub mod config;
pub mod error;

pub use config::{
    AssistantConfig, Config, LocationConfig, LocationMode, NotificationsConfig, SpeechConfig,
    ValidationResult, WeatherConfig,
};
pub use error::{AppError, AuthError, Capability, ConfigError, NetworkError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize logging for the application.
///
/// Honours `RUST_LOG`; defaults to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Atmos core initialized");
    Ok(())
}
