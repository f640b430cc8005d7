//! Weather data for Atmos
//!
//! OpenWeather client, the shared weather context and its durable cache,
//! location lookup, and alerts.

pub mod alerts;
pub mod cache;
pub mod context;
pub mod location;
pub mod notify;
pub mod provider;
pub mod retry;
pub mod service;
pub mod types;

pub use alerts::{smart_summary, weather_alerts, WeatherAlert};
pub use cache::WeatherCache;
pub use context::{SharedContext, WeatherContext};
pub use location::{DisabledLocator, FixedLocator, IpLocator, Locator};
pub use notify::{AlertNotifier, LogSink, NotificationPermission, NotificationSink};
pub use provider::{OpenWeatherProvider, ProviderConfig, WeatherProvider};
pub use retry::RetryConfig;
pub use service::{WeatherFetcher, WeatherService};
pub use types::*;
