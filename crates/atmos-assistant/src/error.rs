use thiserror::Error;

/// Language model errors.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Assistant disabled in configuration")]
    Disabled,

    #[error("Assistant API key not set")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("format error: {0}")]
    Format(String),
}

impl AssistantError {
    /// The service is unusable until its configuration changes.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Disabled | Self::MissingApiKey)
    }
}

/// Speech input/output errors.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Speech capability not supported: {0}")]
    Unsupported(String),

    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("No speech detected")]
    NoSpeech,

    #[error("Speech timed out")]
    Timeout,

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
