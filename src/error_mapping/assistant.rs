use atmos_assistant::AssistantError;
use atmos_core::{AppError, AuthError, NetworkError, ReqwestErrorExt};

use super::IntoAppError;

impl IntoAppError for AssistantError {
    fn into_app_error(self) -> AppError {
        match self {
            AssistantError::Disabled | AssistantError::MissingApiKey => {
                AppError::Auth(AuthError::MissingKey("Groq".to_string()))
            }
            AssistantError::Http(e) => AppError::Network(e.into_network_error()),
            AssistantError::Api { status: 401, .. } => {
                AppError::Auth(AuthError::InvalidAssistantKey)
            }
            AssistantError::Api { status, message } => {
                AppError::Network(NetworkError::ServerError { status, message })
            }
            AssistantError::Format(s) => AppError::Network(NetworkError::InvalidResponse(s)),
        }
    }
}
