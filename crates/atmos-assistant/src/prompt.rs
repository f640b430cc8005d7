//! System prompt for the weather assistant.
//!
//! The location rules here are what `resolver::parse_answer` relies on:
//! a named city wins over "my location", which wins over nothing.

use atmos_weather::WeatherSnapshot;

const NO_DATA: &str = "No weather data available yet.";

const INSTRUCTIONS: &str = "\
Instructions:
1. Answer the user's question based on the weather context provided.
2. Keep your answer concise (1-2 sentences) and natural.
3. Location extraction rules (follow strictly):
   - PRIORITY 1 (specific city): if the user mentions a specific city (e.g. \"Paris\", \"London\", \"New York\"), output that city name as the Location.
   - PRIORITY 2 (current location): if the user explicitly asks about \"my weather\", \"my location\", \"here\" or \"current location\", output \"CURRENT_LOCATION\".
   - PRIORITY 3 (contextual): if the user asks a general question (\"Is it raining?\", \"Should I go out?\") without mentioning a place, output \"None\".

Output format:
Response: [your natural language response]
Location: [extracted city name, \"CURRENT_LOCATION\", or \"None\"]";

/// Weather facts block for `snapshot`, or the no-data placeholder.
pub fn context_block(snapshot: Option<&WeatherSnapshot>) -> String {
    match snapshot {
        Some(s) => format!(
            "Current Location: {}\n\
             Temperature: {}°C (Feels like {}°C)\n\
             Condition: {}\n\
             Humidity: {}%\n\
             Wind: {} m/s",
            s.name,
            s.temperature.round() as i64,
            s.feels_like.round() as i64,
            s.description,
            s.humidity,
            s.wind_speed,
        ),
        None => NO_DATA.to_string(),
    }
}

/// Full system prompt. Same input, same output.
pub fn system_prompt(snapshot: Option<&WeatherSnapshot>) -> String {
    format!(
        "You are Atmos, a helpful and friendly weather assistant.\n\n\
         Current Weather Context:\n{}\n\n{}",
        context_block(snapshot),
        INSTRUCTIONS
    )
}
