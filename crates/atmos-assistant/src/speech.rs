//! Speech input and output.
//!
//! Input is a single-shot transcript; closed input is `UnexpectedEof`.
//! Output speaks through the remote TTS endpoint and falls back to a local
//! synthesis command. Every operation takes the interaction's
//! `CancellationToken`; child processes die with it.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::SpeechError;

#[async_trait]
pub trait SpeechInput: Send + Sync {
    /// One utterance, transcribed.
    async fn listen(&self, cancel: &CancellationToken) -> Result<String, SpeechError>;
}

#[async_trait]
pub trait SpeechOutput: Send + Sync {
    async fn speak(&self, text: &str, cancel: &CancellationToken) -> Result<(), SpeechError>;
}

/// Reads typed utterances, one line each.
pub struct TerminalListener {
    reader: Mutex<Box<dyn AsyncBufRead + Unpin + Send>>,
    locale: String,
}

impl TerminalListener {
    pub fn stdin(locale: impl Into<String>) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), locale)
    }

    pub fn new(reader: impl AsyncBufRead + Unpin + Send + 'static, locale: impl Into<String>) -> Self {
        Self {
            reader: Mutex::new(Box::new(reader)),
            locale: locale.into(),
        }
    }
}

#[async_trait]
impl SpeechInput for TerminalListener {
    async fn listen(&self, cancel: &CancellationToken) -> Result<String, SpeechError> {
        let mut reader = self.reader.lock().await;
        let mut line = String::new();

        let read = tokio::select! {
            _ = cancel.cancelled() => None,
            read = reader.read_line(&mut line) => Some(read),
        };
        let Some(read) = read else {
            return Err(SpeechError::Cancelled);
        };
        if read? == 0 {
            return Err(SpeechError::Io(ErrorKind::UnexpectedEof.into()));
        }

        let transcript = line.trim();
        if transcript.is_empty() {
            return Err(SpeechError::NoSpeech);
        }
        tracing::debug!("Heard ({}): {}", self.locale, transcript);
        Ok(transcript.to_string())
    }
}

/// External command that consumes or produces audio.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn(&self, mut cmd: Command) -> Result<Child, SpeechError> {
        cmd.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => SpeechError::Unsupported(format!("{} not found", self.program)),
            ErrorKind::PermissionDenied => {
                SpeechError::Unsupported(format!("{} is not executable", self.program))
            }
            _ => SpeechError::Io(e),
        })
    }
}

/// Wait for `child`, killing it if `cancel` fires first.
///
/// Stderr is drained while the child runs so a noisy player can't fill the
/// pipe and stall.
async fn wait_or_kill(
    program: &str,
    mut child: Child,
    cancel: &CancellationToken,
) -> Result<(), SpeechError> {
    let stderr = child.stderr.take().map(|mut stderr| {
        tokio::spawn(async move {
            let mut output = Vec::new();
            let _ = stderr.read_to_end(&mut output).await;
            output
        })
    });

    let waited = tokio::select! {
        _ = cancel.cancelled() => None,
        status = child.wait() => Some(status),
    };
    let Some(status) = waited else {
        if let Err(e) = child.kill().await {
            tracing::debug!("Failed to kill {}: {}", program, e);
        }
        if let Some(task) = stderr {
            task.abort();
        }
        return Err(SpeechError::Cancelled);
    };
    let status = status?;

    if status.success() {
        if let Some(task) = stderr {
            task.abort();
        }
        return Ok(());
    }

    let output = match stderr {
        Some(task) => task.await.unwrap_or_default(),
        None => Vec::new(),
    };

    let output = String::from_utf8_lossy(&output);
    let message = output.lines().next().unwrap_or("").trim();
    Err(SpeechError::Playback(format!(
        "{} exited with {}: {}",
        program, status, message
    )))
}

#[derive(Debug, Clone)]
pub struct RemoteSpeechConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub voice: String,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

/// Groq TTS piped into a local audio player.
pub struct RemoteSynthesizer {
    client: Client,
    config: RemoteSpeechConfig,
    player: CommandSpec,
}

impl RemoteSynthesizer {
    pub fn new(config: RemoteSpeechConfig, player: CommandSpec) -> Result<Self, SpeechError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SpeechError::Synthesis(e.to_string()))?;
        Ok(Self {
            client,
            config,
            player,
        })
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        let key = self.config.api_key.trim();
        if key.is_empty() || key.starts_with("YOUR_") {
            return Err(SpeechError::Unsupported("TTS API key not set".to_string()));
        }

        let url = format!("{}/audio/speech", self.config.base_url.trim_end_matches('/'));
        let body = SpeechRequest {
            model: &self.config.model,
            voice: &self.config.voice,
            input: text,
            response_format: "wav",
        };

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SpeechError::Timeout
                } else {
                    SpeechError::Synthesis(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SpeechError::Synthesis(format!("status {}: {}", status, message)));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Synthesis(e.to_string()))?;
        Ok(audio.to_vec())
    }

    async fn play(&self, audio: Vec<u8>, cancel: &CancellationToken) -> Result<(), SpeechError> {
        let mut cmd = self.player.command();
        cmd.stdin(Stdio::piped());
        let mut child = self.player.spawn(cmd)?;

        if let Some(mut stdin) = child.stdin.take() {
            // Written from a task so a player that stops reading early can't block us
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&audio).await {
                    tracing::debug!("Audio player closed its input early: {}", e);
                }
            });
        }

        wait_or_kill(&self.player.program, child, cancel).await
    }
}

#[async_trait]
impl SpeechOutput for RemoteSynthesizer {
    async fn speak(&self, text: &str, cancel: &CancellationToken) -> Result<(), SpeechError> {
        if cancel.is_cancelled() {
            return Err(SpeechError::Cancelled);
        }

        let audio = tokio::select! {
            _ = cancel.cancelled() => return Err(SpeechError::Cancelled),
            audio = self.synthesize(text) => audio?,
        };
        tracing::debug!("Synthesized {} bytes of audio", audio.len());
        self.play(audio, cancel).await
    }
}

/// Local synthesis command, text passed as the last argument.
pub struct LocalSynthesizer {
    command: CommandSpec,
}

impl LocalSynthesizer {
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }
}

#[async_trait]
impl SpeechOutput for LocalSynthesizer {
    async fn speak(&self, text: &str, cancel: &CancellationToken) -> Result<(), SpeechError> {
        if cancel.is_cancelled() {
            return Err(SpeechError::Cancelled);
        }
        let mut cmd = self.command.command();
        cmd.arg(text).stdin(Stdio::null());
        let child = self.command.spawn(cmd)?;
        wait_or_kill(&self.command.program, child, cancel).await
    }
}

pub struct FallbackSpeaker<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackSpeaker<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<P: SpeechOutput, F: SpeechOutput> SpeechOutput for FallbackSpeaker<P, F> {
    async fn speak(&self, text: &str, cancel: &CancellationToken) -> Result<(), SpeechError> {
        match self.primary.speak(text, cancel).await {
            Ok(()) => Ok(()),
            Err(SpeechError::Cancelled) => Err(SpeechError::Cancelled),
            Err(e) => {
                tracing::warn!("Primary speech output failed, falling back: {}", e);
                self.fallback.speak(text, cancel).await
            }
        }
    }
}

/// Speech disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSpeaker;

#[async_trait]
impl SpeechOutput for SilentSpeaker {
    async fn speak(&self, _text: &str, _cancel: &CancellationToken) -> Result<(), SpeechError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as SyncMutex;
    use std::io::Cursor;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        spoken: SyncMutex<Vec<String>>,
        fail_with: Option<fn() -> SpeechError>,
    }

    #[async_trait]
    impl SpeechOutput for Arc<Recorder> {
        async fn speak(&self, text: &str, _cancel: &CancellationToken) -> Result<(), SpeechError> {
            if let Some(make) = self.fail_with {
                return Err(make());
            }
            self.spoken.lock().push(text.to_string());
            Ok(())
        }
    }

    fn failing(make: fn() -> SpeechError) -> Arc<Recorder> {
        Arc::new(Recorder {
            fail_with: Some(make),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_terminal_listener_reads_one_line() {
        let listener = TerminalListener::new(Cursor::new(b"  Is it raining?  \nsecond\n".to_vec()), "en-US");
        let cancel = CancellationToken::new();
        assert_eq!(listener.listen(&cancel).await.unwrap(), "Is it raining?");
        assert_eq!(listener.listen(&cancel).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_blank_line_is_no_speech() {
        let listener = TerminalListener::new(Cursor::new(b"   \n".to_vec()), "en-US");
        let result = listener.listen(&CancellationToken::new()).await;
        assert!(matches!(result, Err(SpeechError::NoSpeech)));
    }

    #[tokio::test]
    async fn test_end_of_input_is_eof() {
        let listener = TerminalListener::new(Cursor::new(Vec::new()), "en-US");
        let result = listener.listen(&CancellationToken::new()).await;
        assert!(matches!(result, Err(SpeechError::Io(ref e)) if e.kind() == ErrorKind::UnexpectedEof));
    }

    #[tokio::test]
    async fn test_cancelled_listen() {
        let listener = TerminalListener::new(tokio::io::empty(), "en-US");
        let cancel = CancellationToken::new();
        cancel.cancel();
        // Either branch may be ready; a cancelled token must never yield a transcript
        assert!(listener.listen(&cancel).await.is_err());
    }

    #[tokio::test]
    async fn test_fallback_used_when_primary_fails() {
        let fallback = Arc::new(Recorder::default());
        let speaker = FallbackSpeaker::new(
            failing(|| SpeechError::Synthesis("boom".into())),
            fallback.clone(),
        );
        speaker.speak("hello", &CancellationToken::new()).await.unwrap();
        assert_eq!(*fallback.spoken.lock(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_cancellation_skips_fallback() {
        let fallback = Arc::new(Recorder::default());
        let speaker = FallbackSpeaker::new(failing(|| SpeechError::Cancelled), fallback.clone());
        let result = speaker.speak("hello", &CancellationToken::new()).await;
        assert!(matches!(result, Err(SpeechError::Cancelled)));
        assert!(fallback.spoken.lock().is_empty());
    }

    #[tokio::test]
    async fn test_silent_speaker_succeeds() {
        assert!(SilentSpeaker.speak("hi", &CancellationToken::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_local_command_is_unsupported() {
        let speaker = LocalSynthesizer::new(CommandSpec::new("atmos-no-such-tts-binary", Vec::<String>::new()));
        let result = speaker.speak("hi", &CancellationToken::new()).await;
        assert!(matches!(result, Err(SpeechError::Unsupported(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_local_command_runs_to_completion() {
        let speaker = LocalSynthesizer::new(CommandSpec::new("echo", Vec::<String>::new()));
        speaker.speak("hi", &CancellationToken::new()).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_kills_running_command() {
        let speaker = LocalSynthesizer::new(CommandSpec::new("sleep", Vec::<String>::new()));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let result = speaker.speak("30", &cancel).await;
        assert!(matches!(result, Err(SpeechError::Cancelled)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_noisy_failing_command_does_not_stall() {
        // Far more stderr than a pipe buffer holds, then a failing exit
        let script = "yes player-error | head -n 50000 >&2; exit 3";
        let speaker = LocalSynthesizer::new(CommandSpec::new("sh", vec!["-c", script]));
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            speaker.speak("hi", &CancellationToken::new()),
        )
        .await
        .expect("command stalled on a full stderr pipe");

        match result {
            Err(SpeechError::Playback(message)) => assert!(message.contains("player-error")),
            other => panic!("expected Playback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_spawn() {
        let speaker = LocalSynthesizer::new(CommandSpec::new("atmos-no-such-tts-binary", Vec::<String>::new()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(speaker.speak("hi", &cancel).await, Err(SpeechError::Cancelled)));
    }
}
