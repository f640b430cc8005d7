use atmos_assistant::SpeechError;
use atmos_core::{AppError, Capability, NetworkError};

use super::IntoAppError;

impl IntoAppError for SpeechError {
    fn into_app_error(self) -> AppError {
        match self {
            SpeechError::Unsupported(_) => AppError::Unsupported(Capability::Microphone),
            SpeechError::PermissionDenied => AppError::PermissionDenied(Capability::Microphone),
            SpeechError::NoSpeech => AppError::NoSpeech,
            SpeechError::Timeout => AppError::Network(NetworkError::Timeout),
            SpeechError::Synthesis(s) => AppError::Network(NetworkError::InvalidResponse(s)),
            SpeechError::Playback(_) => AppError::Unsupported(Capability::SpeechSynthesis),
            SpeechError::Cancelled => AppError::Other(anyhow::anyhow!("interaction cancelled")),
            SpeechError::Io(e) => AppError::Io(e),
        }
    }
}
