//! Plain text weather report for the terminal.

use atmos_weather::{smart_summary, weather_alerts, WeatherContext, WeatherSnapshot};
use chrono::{DateTime, Utc};

/// Forecast samples shown (3-hourly, so one day).
const FORECAST_ROWS: usize = 8;

fn current_block(snapshot: &WeatherSnapshot, now: DateTime<Utc>) -> Vec<String> {
    vec![
        format!(
            "  {:.0}°C, feels like {:.0}°C, {}",
            snapshot.temperature, snapshot.feels_like, snapshot.description
        ),
        format!(
            "  Humidity {}%  Wind {:.1} m/s  Pressure {} hPa",
            snapshot.humidity, snapshot.wind_speed, snapshot.pressure
        ),
        format!(
            "  Local time {}",
            snapshot.local_time(now).format("%a %H:%M")
        ),
    ]
}

pub fn render(context: &WeatherContext, now: DateTime<Utc>) -> String {
    let Some(snapshot) = context.current() else {
        return "No weather data available yet.".to_string();
    };

    let mut lines = Vec::new();
    let marker = if context.is_current_location() {
        "  (your location)"
    } else {
        ""
    };
    lines.push(format!("{}{}", snapshot.display_name(), marker));
    lines.extend(current_block(snapshot, now));
    lines.push(String::new());
    lines.push(smart_summary(snapshot).to_string());

    let alerts = weather_alerts(snapshot);
    if !alerts.is_empty() {
        lines.push(String::new());
        lines.push("Alerts:".to_string());
        for alert in &alerts {
            lines.push(format!("  ⚠️ {}: {}", alert.event, alert.description));
        }
    }

    if let Some(forecast) = context.forecast().filter(|f| !f.is_empty()) {
        lines.push(String::new());
        lines.push("Forecast:".to_string());
        let offset = snapshot.local_time(now).timezone();
        for sample in forecast.iter().take(FORECAST_ROWS) {
            lines.push(format!(
                "  {}  {:>4.0}°C  {}",
                sample.time.with_timezone(&offset).format("%a %H:%M"),
                sample.temperature,
                sample.description
            ));
        }
    }

    if let Some(updated) = context.last_updated() {
        lines.push(String::new());
        lines.push(format!(
            "Updated {}",
            updated.with_timezone(&snapshot.local_time(now).timezone()).format("%H:%M")
        ));
    }

    lines.join("\n")
}
