//! Groq chat and speech endpoints against a wiremock server.

use std::time::Duration;

use atmos_assistant::{
    AssistantError, ChatConfig, CommandSpec, FallbackSpeaker, GroqClient, LanguageService,
    LocalSynthesizer, RemoteSpeechConfig, RemoteSynthesizer, SpeechError, SpeechOutput,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_client(server: &MockServer) -> GroqClient {
    let mut config = ChatConfig::new("gsk_test");
    config.base_url = server.uri();
    config.timeout = Duration::from_secs(5);
    GroqClient::new(config).unwrap()
}

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn test_chat_request_shape_and_answer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer gsk_test"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama-3.3-70b-versatile",
            "max_tokens": 200,
        })))
        .and(body_string_contains("No weather data available yet."))
        .and(body_string_contains("Is it raining?"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("Response: No rain today.\nLocation: None")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let answer = chat_client(&server).ask("Is it raining?", None).await.unwrap();
    assert_eq!(answer, "Response: No rain today.\nLocation: None");
}

#[tokio::test]
async fn test_chat_error_body_message_is_kept() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"message": "Invalid API Key", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let result = chat_client(&server).ask("hi", None).await;
    assert!(
        matches!(&result, Err(AssistantError::Api { status: 401, message }) if message == "Invalid API Key"),
        "unexpected result: {result:?}"
    );
}

#[tokio::test]
async fn test_chat_without_choices_is_format_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
        .mount(&server)
        .await;

    let result = chat_client(&server).ask("hi", None).await;
    assert!(matches!(result, Err(AssistantError::Format(_))));
}

fn speech_config(server: &MockServer) -> RemoteSpeechConfig {
    RemoteSpeechConfig {
        api_key: "gsk_test".to_string(),
        base_url: server.uri(),
        model: "playai-tts".to_string(),
        voice: "Adelaide-PlayAI".to_string(),
        timeout: Duration::from_secs(5),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_remote_speech_is_piped_to_player() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/speech"))
        .and(body_partial_json(serde_json::json!({
            "model": "playai-tts",
            "voice": "Adelaide-PlayAI",
            "input": "Hello there",
            "response_format": "wav",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFF....WAVEfmt ".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let speaker = RemoteSynthesizer::new(
        speech_config(&server),
        CommandSpec::new("cat", Vec::<String>::new()),
    )
    .unwrap();
    speaker
        .speak("Hello there", &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_remote_speech_error_is_synthesis_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/speech"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let speaker = RemoteSynthesizer::new(
        speech_config(&server),
        CommandSpec::new("cat", Vec::<String>::new()),
    )
    .unwrap();
    let result = speaker.speak("Hello", &CancellationToken::new()).await;
    assert!(matches!(result, Err(SpeechError::Synthesis(_))));
}

#[cfg(unix)]
#[tokio::test]
async fn test_remote_failure_falls_back_to_local_command() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/speech"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let remote = RemoteSynthesizer::new(
        speech_config(&server),
        CommandSpec::new("cat", Vec::<String>::new()),
    )
    .unwrap();
    let local = LocalSynthesizer::new(CommandSpec::new("true", Vec::<String>::new()));

    FallbackSpeaker::new(remote, local)
        .speak("Hello", &CancellationToken::new())
        .await
        .unwrap();
}
