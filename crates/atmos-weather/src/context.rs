//! The last fetched weather, shared between the fetch path and the voice
//! assistant.
//!
//! A `WeatherContext` is only ever replaced as a whole. `last_updated` is set
//! exactly when `current` or `forecast` is.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::{ForecastSample, WeatherSnapshot};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherContext {
    current: Option<WeatherSnapshot>,
    forecast: Option<Vec<ForecastSample>>,
    last_updated: Option<DateTime<Utc>>,
    is_current_location: bool,
}

impl WeatherContext {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Context produced by a completed fetch.
    pub fn from_fetch(
        current: WeatherSnapshot,
        forecast: Option<Vec<ForecastSample>>,
        is_current_location: bool,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            current: Some(current),
            forecast,
            last_updated: Some(fetched_at),
            is_current_location,
        }
    }

    pub fn current(&self) -> Option<&WeatherSnapshot> {
        self.current.as_ref()
    }

    pub fn forecast(&self) -> Option<&[ForecastSample]> {
        self.forecast.as_deref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// True only when `current` came from the geolocation path.
    pub fn is_current_location(&self) -> bool {
        self.current.is_some() && self.is_current_location
    }

    pub fn location_name(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.forecast.is_none()
    }

    /// Holds for every context built through the constructors; a record read
    /// from disk may not.
    pub fn is_consistent(&self) -> bool {
        let has_data = self.current.is_some() || self.forecast.is_some();
        has_data == self.last_updated.is_some()
    }

    /// `now - last_updated < max_age`. A timestamp in the future counts as
    /// fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match self.last_updated {
            Some(updated) => match (now - updated).to_std() {
                Ok(age) => age < max_age,
                Err(_) => true,
            },
            None => false,
        }
    }
}

/// Cloneable handle to the process-wide context.
#[derive(Debug, Clone, Default)]
pub struct SharedContext {
    inner: Arc<RwLock<WeatherContext>>,
}

impl SharedContext {
    pub fn new(context: WeatherContext) -> Self {
        Self {
            inner: Arc::new(RwLock::new(context)),
        }
    }

    /// Copy of the context as it is right now.
    pub fn snapshot(&self) -> WeatherContext {
        self.inner.read().clone()
    }

    /// Replace the whole record.
    pub fn replace(&self, context: WeatherContext) {
        *self.inner.write() = context;
    }
}
