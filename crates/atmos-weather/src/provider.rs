//! OpenWeather 2.5 client (`/weather` and `/forecast`, metric units).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::retry::{with_retry, RetryConfig};
use crate::types::{Coordinates, ForecastSample, WeatherCondition, WeatherError, WeatherSnapshot};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// 3-hour steps; three days of data
pub const FORECAST_SAMPLE_LIMIT: usize = 24;

/// Source of weather snapshots and forecasts
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch_by_coordinates(
        &self,
        coordinates: Coordinates,
    ) -> Result<WeatherSnapshot, WeatherError>;

    async fn fetch_by_city(&self, city: &str) -> Result<WeatherSnapshot, WeatherError>;

    async fn fetch_forecast(
        &self,
        coordinates: Coordinates,
    ) -> Result<Vec<ForecastSample>, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    client: Arc<Client>,
    config: ProviderConfig,
}

impl OpenWeatherProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            config,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// GET `path` with `query` plus credentials and metric units, mapping
    /// HTTP failures onto `WeatherError`.
    async fn get_json<T>(&self, path: &str, query: &[(&str, String)], subject: &str) -> Result<T, WeatherError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = self.endpoint(path);

        with_retry(&self.config.retry, || async {
            let response = self
                .client
                .get(&url)
                .query(query)
                .query(&[("appid", self.config.api_key.as_str()), ("units", "metric")])
                .send()
                .await?;

            let status = response.status();
            match status {
                s if s.is_success() => {}
                StatusCode::NOT_FOUND => return Err(WeatherError::NotFound(subject.to_string())),
                StatusCode::UNAUTHORIZED => return Err(WeatherError::Unauthorized),
                s => return Err(WeatherError::Server { status: s.as_u16() }),
            }

            response
                .json::<T>()
                .await
                .map_err(|e| WeatherError::Parse(e.to_string()))
        })
        .await
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_by_coordinates(
        &self,
        coordinates: Coordinates,
    ) -> Result<WeatherSnapshot, WeatherError> {
        tracing::debug!("Fetching weather for {}", coordinates);
        let query = [
            ("lat", coordinates.latitude.to_string()),
            ("lon", coordinates.longitude.to_string()),
        ];
        let body: CurrentResponse = self
            .get_json("weather", &query, &coordinates.to_string())
            .await?;
        body.into_snapshot()
    }

    async fn fetch_by_city(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(WeatherError::EmptyCity);
        }

        tracing::debug!("Fetching weather for city {}", city);
        let body: CurrentResponse = self
            .get_json("weather", &[("q", city.to_string())], city)
            .await?;
        body.into_snapshot()
    }

    async fn fetch_forecast(
        &self,
        coordinates: Coordinates,
    ) -> Result<Vec<ForecastSample>, WeatherError> {
        let query = [
            ("lat", coordinates.latitude.to_string()),
            ("lon", coordinates.longitude.to_string()),
        ];
        let body: ForecastResponse = self
            .get_json("forecast", &query, &coordinates.to_string())
            .await?;

        Ok(body
            .list
            .into_iter()
            .take(FORECAST_SAMPLE_LIMIT)
            .filter_map(ForecastItem::into_sample)
            .collect())
    }
}

// Wire types

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    coord: WireCoord,
    #[serde(default)]
    weather: Vec<WireCondition>,
    main: WireMain,
    #[serde(default)]
    wind: WireWind,
    #[serde(default)]
    name: String,
    #[serde(default)]
    sys: WireSys,
    #[serde(default)]
    timezone: i32,
    dt: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WireCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct WireCondition {
    id: i32,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct WireMain {
    temp: f64,
    feels_like: Option<f64>,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    pressure: f64,
}

#[derive(Debug, Default, Deserialize)]
struct WireWind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Default, Deserialize)]
struct WireSys {
    country: Option<String>,
}

impl CurrentResponse {
    fn into_snapshot(self) -> Result<WeatherSnapshot, WeatherError> {
        if self.name.trim().is_empty() {
            return Err(WeatherError::Parse("response has no location name".into()));
        }

        let (condition, description, icon) = match self.weather.into_iter().next() {
            Some(w) => (WeatherCondition::from_owm_code(w.id), w.description, w.icon),
            None => (WeatherCondition::default(), String::new(), String::new()),
        };

        let observed_at = self
            .dt
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .unwrap_or_else(Utc::now);

        Ok(WeatherSnapshot {
            name: self.name,
            country: self.sys.country,
            coordinates: Coordinates::new(self.coord.lat, self.coord.lon),
            temperature: self.main.temp,
            feels_like: self.main.feels_like.unwrap_or(self.main.temp),
            humidity: self.main.humidity.round().clamp(0.0, 100.0) as u8,
            pressure: self.main.pressure.round().max(0.0) as u32,
            wind_speed: self.wind.speed,
            condition,
            description,
            icon,
            timezone_offset: self.timezone,
            observed_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastItem>,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    dt: i64,
    main: WireMain,
    #[serde(default)]
    weather: Vec<WireCondition>,
}

impl ForecastItem {
    fn into_sample(self) -> Option<ForecastSample> {
        let time = DateTime::<Utc>::from_timestamp(self.dt, 0)?;
        Some(ForecastSample {
            time,
            temperature: self.main.temp,
            description: self
                .weather
                .into_iter()
                .next()
                .map(|w| w.description)
                .unwrap_or_default(),
        })
    }
}
