use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Weather condition categories mapped from OpenWeather condition ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert an OpenWeather condition id to a WeatherCondition
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_owm_code(code: i32) -> Self {
        match code {
            200..=232 => Self::Thunderstorm,
            300..=321 => Self::Drizzle,
            502..=504 | 522 => Self::HeavyRain,
            500..=531 => Self::Rain, // Freezing rain (511) included
            611..=616 => Self::Sleet,
            600..=622 => Self::Snow,
            701..=781 => Self::Fog, // Mist, haze, dust and the rest of the atmosphere group
            800 => Self::Clear,
            801 | 802 => Self::PartlyCloudy,
            803 | 804 => Self::Cloudy,
            _ => Self::Clear, // Unknown codes default to clear
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }

    /// Rain, drizzle or thunderstorms
    pub fn is_wet(&self) -> bool {
        matches!(
            self,
            Self::Drizzle | Self::Rain | Self::HeavyRain | Self::Thunderstorm
        )
    }

    pub fn is_snowy(&self) -> bool {
        matches!(self, Self::Snow | Self::Sleet)
    }

    pub fn is_cloudy(&self) -> bool {
        matches!(self, Self::PartlyCloudy | Self::Cloudy)
    }
}

/// Geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4},{:.4}", self.latitude, self.longitude)
    }
}

/// Current conditions for one place, normalized from the provider response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Display name reported by the provider ("London")
    pub name: String,
    pub country: Option<String>,
    pub coordinates: Coordinates,
    /// °C
    pub temperature: f64,
    /// °C
    pub feels_like: f64,
    /// Percent
    pub humidity: u8,
    /// hPa
    pub pressure: u32,
    /// m/s
    pub wind_speed: f64,
    pub condition: WeatherCondition,
    /// Provider text such as "broken clouds"
    pub description: String,
    /// Provider icon code such as "04d"
    pub icon: String,
    /// Seconds east of UTC
    pub timezone_offset: i32,
    pub observed_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// "London, GB" when the country is known
    pub fn display_name(&self) -> String {
        match &self.country {
            Some(country) if !country.is_empty() => format!("{}, {}", self.name, country),
            _ => self.name.clone(),
        }
    }

    /// Wall-clock time at the snapshot's location
    pub fn local_time(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        let offset =
            FixedOffset::east_opt(self.timezone_offset).unwrap_or_else(|| Utc.fix());
        now.with_timezone(&offset)
    }
}

/// One forecast step (3-hourly)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    pub time: DateTime<Utc>,
    /// °C
    pub temperature: f64,
    pub description: String,
}

/// Location service errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location unavailable: {0}")]
    Unavailable(String),
    #[error("Location request timed out")]
    Timeout,
    #[error("Location lookup not supported")]
    Unsupported,
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Empty city name")]
    EmptyCity,
    #[error("Location not found: {0}")]
    NotFound(String),
    #[error("Invalid API key")]
    Unauthorized,
    #[error("Weather service returned status {status}")]
    Server { status: u16 },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Location error: {0}")]
    Location(#[from] LocationError),
    #[error("Cache error: {0}")]
    Cache(String),
}

impl WeatherError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Server { status } => *status >= 500 || *status == 429 || *status == 408,
            _ => false,
        }
    }
}
