//! Voice assistant for Atmos
//!
//! Prompting and the Groq client, answer parsing, the voice query state
//! machine, and speech I/O.

pub mod client;
pub mod error;
pub mod interaction;
pub mod orchestrator;
pub mod prompt;
pub mod resolver;
pub mod speech;

pub use client::{ChatConfig, GroqClient, LanguageService};
pub use error::{AssistantError, SpeechError};
pub use interaction::{Interaction, InteractionState, Press, VoiceInteractions};
pub use orchestrator::{
    fallback_text, route, FetchTarget, FreshnessGuard, VoiceOrchestrator, VoiceOutcome, VoiceStep,
};
pub use prompt::system_prompt;
pub use resolver::{parse_answer, LocationDirective, VoiceQueryResult};
pub use speech::{
    CommandSpec, FallbackSpeaker, LocalSynthesizer, RemoteSpeechConfig, RemoteSynthesizer,
    SilentSpeaker, SpeechInput, SpeechOutput, TerminalListener,
};
