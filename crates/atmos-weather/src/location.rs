//! Where is "here"? Fixed coordinates, an IP lookup, or nothing at all.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::types::{Coordinates, LocationError};

const USER_AGENT: &str = "Atmos/0.1.0";

#[async_trait]
pub trait Locator: Send + Sync {
    async fn locate(&self) -> Result<Coordinates, LocationError>;
}

/// Always answers with the configured coordinates.
#[derive(Debug, Clone)]
pub struct FixedLocator {
    coordinates: Coordinates,
}

impl FixedLocator {
    pub fn new(coordinates: Coordinates) -> Self {
        Self { coordinates }
    }
}

#[async_trait]
impl Locator for FixedLocator {
    async fn locate(&self) -> Result<Coordinates, LocationError> {
        Ok(self.coordinates)
    }
}

/// Location access refused by the user.
#[derive(Debug, Clone, Default)]
pub struct DisabledLocator;

#[async_trait]
impl Locator for DisabledLocator {
    async fn locate(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::PermissionDenied)
    }
}

/// Approximate location from an ip-api.com compatible endpoint.
#[derive(Debug, Clone)]
pub struct IpLocator {
    client: Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: Option<String>,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
}

impl IpLocator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LocationError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Locator for IpLocator {
    async fn locate(&self) -> Result<Coordinates, LocationError> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                LocationError::Timeout
            } else {
                LocationError::Unavailable(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(LocationError::Unavailable(format!(
                "lookup returned status {}",
                response.status()
            )));
        }

        let body: IpLookupResponse = response
            .json()
            .await
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;

        if body.status.as_deref().is_some_and(|s| s != "success") {
            return Err(LocationError::Unavailable(
                body.message.unwrap_or_else(|| "lookup failed".to_string()),
            ));
        }

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => {
                tracing::info!(
                    "Located via IP near {}",
                    body.city.as_deref().unwrap_or("unknown place")
                );
                Ok(Coordinates::new(lat, lon))
            }
            _ => Err(LocationError::Unavailable(
                "lookup returned no coordinates".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_locator() {
        let locator = FixedLocator::new(Coordinates::new(40.71, -74.0));
        assert_eq!(locator.locate().await.unwrap(), Coordinates::new(40.71, -74.0));
    }

    #[tokio::test]
    async fn test_disabled_locator_denies() {
        assert!(matches!(
            DisabledLocator.locate().await,
            Err(LocationError::PermissionDenied)
        ));
    }
}
