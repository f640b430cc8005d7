//! One-line advice and extreme-weather alerts derived from a snapshot.

use serde::{Deserialize, Serialize};

use crate::types::{WeatherCondition, WeatherSnapshot};

const EXTREME_HEAT_C: f64 = 35.0;
const FREEZING_C: f64 = 0.0;
const CHILLY_C: f64 = 10.0;
const HIGH_WIND_MS: f64 = 15.0;
const WINDY_MS: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub event: String,
    pub description: String,
}

impl WeatherAlert {
    fn new(event: &str, description: impl Into<String>) -> Self {
        Self {
            event: event.to_string(),
            description: description.into(),
        }
    }

    /// Notification tag, e.g. `weather-alert-high-winds`
    pub fn tag(&self) -> String {
        let slug = self
            .event
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("-");
        format!("weather-alert-{}", slug)
    }
}

/// Friendly advice for the conditions, first matching rule wins.
pub fn smart_summary(snapshot: &WeatherSnapshot) -> &'static str {
    let temp = snapshot.temperature;
    let wind = snapshot.wind_speed;
    let condition = snapshot.condition;

    if condition.is_wet() {
        "Don't forget your umbrella, it's wet outside! ☔"
    } else if condition.is_snowy() {
        "Bundle up! It's snowing. ❄️"
    } else if temp > EXTREME_HEAT_C {
        "Extreme heat! Stay indoors and keep hydrated. 🔥"
    } else if temp < FREEZING_C {
        "Freezing conditions! Dress in layers and stay warm. 🥶"
    } else if temp < CHILLY_C {
        "It's quite chilly. Wear a warm jacket! 🧥"
    } else if wind > HIGH_WIND_MS {
        "Very windy today! Secure loose items. 💨"
    } else if wind > WINDY_MS {
        "Hold onto your hat, it's windy! 💨"
    } else if condition == WeatherCondition::Clear && temp > 25.0 {
        "It's a beautiful sunny day! Stay hydrated. ☀️"
    } else if condition.is_cloudy() && temp > 20.0 {
        "Perfect weather for a walk, though a bit cloudy. ☁️"
    } else if snapshot.humidity > 85 {
        "It feels quite humid today. 💧"
    } else {
        "Enjoy your day! 😊"
    }
}

/// Alerts for extreme conditions; empty when nothing is notable.
pub fn weather_alerts(snapshot: &WeatherSnapshot) -> Vec<WeatherAlert> {
    let mut alerts = Vec::new();

    if snapshot.temperature > EXTREME_HEAT_C {
        alerts.push(WeatherAlert::new(
            "Extreme Heat",
            "Temperature exceeds 35°C. Stay hydrated and avoid prolonged sun exposure.",
        ));
    } else if snapshot.temperature < FREEZING_C {
        alerts.push(WeatherAlert::new(
            "Freezing Conditions",
            "Temperature below 0°C. Be cautious of ice and dress warmly.",
        ));
    }

    if snapshot.wind_speed > HIGH_WIND_MS {
        alerts.push(WeatherAlert::new(
            "High Winds",
            format!(
                "Wind speed is {} m/s. Secure loose objects and be cautious outdoors.",
                snapshot.wind_speed
            ),
        ));
    }

    if snapshot.condition == WeatherCondition::Thunderstorm {
        alerts.push(WeatherAlert::new(
            "Thunderstorm Warning",
            "Thunderstorms detected. Seek shelter and avoid outdoor activities.",
        ));
    }

    alerts
}
