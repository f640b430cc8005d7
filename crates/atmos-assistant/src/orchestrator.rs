//! Voice query state machine.
//!
//! ```text
//! Start ──route──> Speak
//!   │                ^
//!   └──> Fetching ───┤ (fetch failed: "couldn't find")
//!           │        │
//!           └──> Requery
//! ```
//!
//! Each step is one `advance`. The machine never fails; every error turns
//! into something to say.

use std::sync::Arc;
use std::time::Duration;

use atmos_weather::{SharedContext, WeatherContext, WeatherFetcher, WeatherSnapshot};
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::client::LanguageService;
use crate::error::AssistantError;
use crate::resolver::{parse_answer, LocationDirective, VoiceQueryResult};
use crate::speech::SpeechOutput;

pub const COULD_NOT_FIND: &str = "I couldn't find weather data for that location.";
pub const CONNECTION_APOLOGY: &str =
    "I'm having trouble connecting to my brain right now. Please try again later.";
pub const CONFIGURATION_APOLOGY: &str =
    "I'm sorry, I haven't been configured correctly. Please check my API key.";
pub const EMPTY_ANSWER: &str = "Sorry, I don't have an answer for that right now.";

/// What to say instead of an assistant error.
pub fn fallback_text(error: &AssistantError) -> &'static str {
    if error.is_configuration() {
        CONFIGURATION_APOLOGY
    } else {
        CONNECTION_APOLOGY
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTarget {
    CurrentLocation,
    City(String),
}

/// Lets a fresh current-location context answer without refetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessGuard {
    max_age: Duration,
    enabled: bool,
}

impl FreshnessGuard {
    pub fn new(max_age: Duration, enabled: bool) -> Self {
        Self { max_age, enabled }
    }

    /// Always refetch.
    pub fn disabled() -> Self {
        Self {
            max_age: Duration::ZERO,
            enabled: false,
        }
    }

    pub fn is_fresh(&self, context: &WeatherContext, now: DateTime<Utc>) -> bool {
        self.enabled && context.is_fresh(now, self.max_age)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceOutcome {
    pub text: String,
    /// A fetch committed new weather during this query.
    pub refreshed: bool,
    pub spoken: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VoiceStep {
    Start,
    Fetching { target: FetchTarget },
    Requery { snapshot: WeatherSnapshot },
    Speak { text: String, refreshed: bool },
    Done(VoiceOutcome),
}

fn speak(text: impl Into<String>, refreshed: bool) -> VoiceStep {
    VoiceStep::Speak {
        text: text.into(),
        refreshed,
    }
}

/// Decide what the first answer needs before it can be spoken.
pub fn route(
    result: VoiceQueryResult,
    context: &WeatherContext,
    guard: &FreshnessGuard,
    now: DateTime<Utc>,
) -> VoiceStep {
    match result.location {
        LocationDirective::None => speak(result.text, false),
        LocationDirective::CurrentLocation => {
            if context.is_current_location() && guard.is_fresh(context, now) {
                speak(result.text, false)
            } else {
                VoiceStep::Fetching {
                    target: FetchTarget::CurrentLocation,
                }
            }
        }
        LocationDirective::NamedCity(city) => {
            // Name match only: two different cities sharing a name won't refetch.
            let same_city = context
                .location_name()
                .is_some_and(|name| name.trim().to_lowercase() == city.trim().to_lowercase());
            if same_city {
                speak(result.text, false)
            } else {
                VoiceStep::Fetching {
                    target: FetchTarget::City(city),
                }
            }
        }
    }
}

pub struct VoiceOrchestrator {
    assistant: Arc<dyn LanguageService>,
    weather: Arc<dyn WeatherFetcher>,
    speech: Arc<dyn SpeechOutput>,
    context: SharedContext,
    guard: FreshnessGuard,
}

impl VoiceOrchestrator {
    pub fn new(
        assistant: Arc<dyn LanguageService>,
        weather: Arc<dyn WeatherFetcher>,
        speech: Arc<dyn SpeechOutput>,
        context: SharedContext,
        guard: FreshnessGuard,
    ) -> Self {
        Self {
            assistant,
            weather,
            speech,
            context,
            guard,
        }
    }

    async fn ask(
        &self,
        transcript: &str,
        snapshot: Option<&WeatherSnapshot>,
    ) -> Result<VoiceQueryResult, &'static str> {
        match self.assistant.ask(transcript, snapshot).await {
            Ok(raw) => Ok(parse_answer(&raw)),
            Err(e) => {
                tracing::error!("Assistant request failed: {}", e);
                Err(fallback_text(&e))
            }
        }
    }

    /// Run one transition.
    pub async fn advance(
        &self,
        step: VoiceStep,
        transcript: &str,
        cancel: &CancellationToken,
    ) -> VoiceStep {
        match step {
            VoiceStep::Start => {
                let context = self.context.snapshot();
                match self.ask(transcript, context.current()).await {
                    Ok(result) => route(result, &context, &self.guard, Utc::now()),
                    Err(apology) => speak(apology, false),
                }
            }

            VoiceStep::Fetching { target } => {
                let fetched = match &target {
                    FetchTarget::CurrentLocation => self.weather.current_location_weather().await,
                    FetchTarget::City(city) => self.weather.city_weather(city).await,
                };
                match fetched {
                    Ok(snapshot) => VoiceStep::Requery { snapshot },
                    Err(e) => {
                        tracing::warn!("Weather fetch for {:?} failed: {}", target, e);
                        speak(COULD_NOT_FIND, false)
                    }
                }
            }

            // The second answer's location is ignored; we already moved there.
            VoiceStep::Requery { snapshot } => match self.ask(transcript, Some(&snapshot)).await {
                Ok(result) => speak(result.text, true),
                Err(apology) => speak(apology, true),
            },

            VoiceStep::Speak { text, refreshed } => {
                let text = if text.trim().is_empty() {
                    EMPTY_ANSWER.to_string()
                } else {
                    text
                };
                let spoken = match self.speech.speak(&text, cancel).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!("Speech output failed: {}", e);
                        false
                    }
                };
                VoiceStep::Done(VoiceOutcome {
                    text,
                    refreshed,
                    spoken,
                })
            }

            done @ VoiceStep::Done(_) => done,
        }
    }

    /// Answer `transcript` out loud.
    pub async fn run(&self, transcript: &str, cancel: &CancellationToken) -> VoiceOutcome {
        let mut step = VoiceStep::Start;
        loop {
            step = self.advance(step, transcript, cancel).await;
            tracing::debug!("Voice step: {:?}", step);
            if let VoiceStep::Done(outcome) = step {
                return outcome;
            }
        }
    }
}
