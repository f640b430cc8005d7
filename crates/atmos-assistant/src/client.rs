//! Groq chat-completions client (OpenAI-compatible wire format).
//!
//! One system message built from the weather context, one user message with
//! the transcript; single request/response, no streaming.

use std::time::Duration;

use async_trait::async_trait;
use atmos_weather::WeatherSnapshot;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use crate::error::AssistantError;
use crate::prompt::system_prompt;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_CHAT_MODEL: &str = "llama-3.3-70b-versatile";

/// Answers questions about the weather.
#[async_trait]
pub trait LanguageService: Send + Sync {
    /// Raw answer text, expected to carry `Response:` / `Location:` lines.
    async fn ask(
        &self,
        transcript: &str,
        context: Option<&WeatherSnapshot>,
    ) -> Result<String, AssistantError>;
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub enabled: bool,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl ChatConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            enabled: true,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 200,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GroqClient {
    client: Client,
    config: ChatConfig,
}

impl GroqClient {
    pub fn new(config: ChatConfig) -> Result<Self, AssistantError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn check_configured(&self) -> Result<(), AssistantError> {
        if !self.config.enabled {
            return Err(AssistantError::Disabled);
        }
        let key = self.config.api_key.trim();
        if key.is_empty() || key.starts_with("YOUR_") {
            return Err(AssistantError::MissingApiKey);
        }
        Ok(())
    }
}

#[async_trait]
impl LanguageService for GroqClient {
    async fn ask(
        &self,
        transcript: &str,
        context: Option<&WeatherSnapshot>,
    ) -> Result<String, AssistantError> {
        self.check_configured()?;

        let system = system_prompt(context);
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: transcript,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        tracing::debug!("Asking {} about: {}", self.config.model, transcript);

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(AssistantError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Format(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AssistantError::Format("response has no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let body = ChatRequest {
            model: "m",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "Is it raining?",
                },
            ],
            temperature: 0.5,
            max_tokens: 200,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Is it raining?");
        assert_eq!(json["max_tokens"], 200);
    }

    #[tokio::test]
    async fn test_placeholder_key_is_rejected_before_any_request() {
        let client = GroqClient::new(ChatConfig::new("YOUR_GROQ_API_KEY")).unwrap();
        assert!(matches!(
            client.ask("hi", None).await,
            Err(AssistantError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_disabled_client() {
        let mut config = ChatConfig::new("gsk_live");
        config.enabled = false;
        let client = GroqClient::new(config).unwrap();
        let err = client.ask("hi", None).await.unwrap_err();
        assert!(err.is_configuration());
    }
}
