//! Durable copy of the weather context: one JSON record in the config
//! directory, rewritten after every successful fetch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::context::WeatherContext;
use crate::types::WeatherError;

pub const CACHE_FILE_NAME: &str = "atmos_weather_state.json";

#[derive(Debug, Clone)]
pub struct WeatherCache {
    cache_path: PathBuf,
}

impl WeatherCache {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            cache_path: config_dir.join(CACHE_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.cache_path
    }

    /// Stored context if it exists, parses, and is younger than `max_age`.
    /// Anything else is treated as absent.
    pub fn load(&self, now: DateTime<Utc>, max_age: Duration) -> Option<WeatherContext> {
        let contents = match std::fs::read_to_string(&self.cache_path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read weather cache: {}", e);
                return None;
            }
        };

        let context: WeatherContext = match serde_json::from_str(&contents) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Ignoring malformed weather cache: {}", e);
                return None;
            }
        };

        if !context.is_consistent() || context.is_empty() {
            tracing::warn!("Ignoring inconsistent weather cache record");
            return None;
        }

        if !context.is_fresh(now, max_age) {
            tracing::debug!("Weather cache is stale");
            return None;
        }

        Some(context)
    }

    /// Write `context`, replacing the previous record atomically.
    pub fn save(&self, context: &WeatherContext) -> Result<(), WeatherError> {
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WeatherError::Cache(e.to_string()))?;
        }

        let json =
            serde_json::to_string(context).map_err(|e| WeatherError::Cache(e.to_string()))?;

        let tmp_path = self.cache_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|e| WeatherError::Cache(e.to_string()))?;
        std::fs::rename(&tmp_path, &self.cache_path)
            .map_err(|e| WeatherError::Cache(e.to_string()))?;

        tracing::debug!("Saved weather cache to {}", self.cache_path.display());
        Ok(())
    }
}
