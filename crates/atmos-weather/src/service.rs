//! Fetch paths used by the CLI and the voice assistant.
//!
//! Every successful fetch builds a fresh `WeatherContext`, swaps it into the
//! shared handle, and persists it. A failed fetch leaves the context alone.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::cache::WeatherCache;
use crate::context::{SharedContext, WeatherContext};
use crate::location::Locator;
use crate::provider::WeatherProvider;
use crate::types::{Coordinates, ForecastSample, LocationError, WeatherError, WeatherSnapshot};

/// The two ways the assistant can ask for new weather.
#[async_trait]
pub trait WeatherFetcher: Send + Sync {
    /// Weather at the user's own location.
    async fn current_location_weather(&self) -> Result<WeatherSnapshot, WeatherError>;

    /// Weather for a named city.
    async fn city_weather(&self, city: &str) -> Result<WeatherSnapshot, WeatherError>;
}

pub struct WeatherService {
    provider: Arc<dyn WeatherProvider>,
    locator: Option<Arc<dyn Locator>>,
    context: SharedContext,
    cache: Option<WeatherCache>,
    cache_duration: Duration,
}

impl WeatherService {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        context: SharedContext,
        cache_duration: Duration,
    ) -> Self {
        Self {
            provider,
            locator: None,
            context,
            cache: None,
            cache_duration,
        }
    }

    pub fn with_locator(mut self, locator: Arc<dyn Locator>) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn with_cache(mut self, cache: WeatherCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    /// Restore a fresh cached context, otherwise fetch for the current
    /// location.
    pub async fn initialize(&self) -> Result<WeatherContext, WeatherError> {
        self.restore_or_fetch(|_| true).await
    }

    /// Like `initialize`, but a restored city search doesn't count: only a
    /// fresh record for the user's own location skips the fetch.
    pub async fn initialize_current(&self) -> Result<WeatherContext, WeatherError> {
        self.restore_or_fetch(WeatherContext::is_current_location).await
    }

    async fn restore_or_fetch(
        &self,
        accept: impl Fn(&WeatherContext) -> bool,
    ) -> Result<WeatherContext, WeatherError> {
        if let Some(cached) = self
            .cache
            .as_ref()
            .and_then(|c| c.load(Utc::now(), self.cache_duration))
            .filter(|cached| accept(cached))
        {
            tracing::info!(
                "Restored cached weather for {}",
                cached.location_name().unwrap_or("unknown location")
            );
            self.context.replace(cached.clone());
            return Ok(cached);
        }

        self.current_location_weather().await?;
        Ok(self.context.snapshot())
    }

    async fn locate(&self) -> Result<Coordinates, WeatherError> {
        let locator = self.locator.as_ref().ok_or(LocationError::Unsupported)?;
        Ok(locator.locate().await?)
    }

    /// Forecast errors never fail the surrounding fetch.
    async fn forecast_best_effort(&self, coordinates: Coordinates) -> Option<Vec<ForecastSample>> {
        match self.provider.fetch_forecast(coordinates).await {
            Ok(samples) => Some(samples),
            Err(e) => {
                tracing::warn!("Unable to load forecast: {}", e);
                None
            }
        }
    }

    fn commit(
        &self,
        snapshot: &WeatherSnapshot,
        forecast: Option<Vec<ForecastSample>>,
        is_current_location: bool,
    ) {
        let context =
            WeatherContext::from_fetch(snapshot.clone(), forecast, is_current_location, Utc::now());

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.save(&context) {
                tracing::warn!("Failed to save weather cache: {}", e);
            }
        }

        self.context.replace(context);
    }
}

#[async_trait]
impl WeatherFetcher for WeatherService {
    async fn current_location_weather(&self) -> Result<WeatherSnapshot, WeatherError> {
        let coordinates = self.locate().await?;
        let snapshot = self.provider.fetch_by_coordinates(coordinates).await?;
        let forecast = self.forecast_best_effort(coordinates).await;

        self.commit(&snapshot, forecast, true);
        tracing::info!("Fetched weather for current location ({})", snapshot.name);
        Ok(snapshot)
    }

    async fn city_weather(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(WeatherError::EmptyCity);
        }

        let snapshot = self.provider.fetch_by_city(city).await?;
        let forecast = self.forecast_best_effort(snapshot.coordinates).await;

        self.commit(&snapshot, forecast, false);
        tracing::info!("Fetched weather for {}", snapshot.display_name());
        Ok(snapshot)
    }
}
