//! Integration tests for OpenWeatherProvider using wiremock.

use std::time::Duration;

use atmos_weather::{
    Coordinates, OpenWeatherProvider, ProviderConfig, RetryConfig, WeatherCondition, WeatherError,
    WeatherProvider,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn weather_json(name: &str, lat: f64, lon: f64, temp: f64) -> serde_json::Value {
    serde_json::json!({
        "coord": {"lon": lon, "lat": lat},
        "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
        "main": {"temp": temp, "feels_like": temp - 1.0, "pressure": 1009, "humidity": 81},
        "wind": {"speed": 5.1},
        "dt": 1760000000,
        "sys": {"country": "GB"},
        "timezone": 0,
        "name": name
    })
}

fn provider(server: &MockServer, retry: RetryConfig) -> OpenWeatherProvider {
    OpenWeatherProvider::new(ProviderConfig {
        api_key: "test-key".to_string(),
        base_url: server.uri(),
        timeout: Duration::from_secs(5),
        retry,
    })
    .unwrap()
}

#[tokio::test]
async fn test_fetch_by_city_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "London"))
        .and(query_param("appid", "test-key"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_json(
            "London", 51.51, -0.13, 12.3,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = provider(&server, RetryConfig::none())
        .fetch_by_city("  London ")
        .await
        .unwrap();

    assert_eq!(snapshot.name, "London");
    assert_eq!(snapshot.condition, WeatherCondition::Rain);
    assert_eq!(snapshot.description, "light rain");
    assert_eq!(snapshot.coordinates, Coordinates::new(51.51, -0.13));
}

#[tokio::test]
async fn test_fetch_by_coordinates_sends_lat_lon() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "48.85"))
        .and(query_param("lon", "2.35"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_json(
            "Paris", 48.85, 2.35, 22.0,
        )))
        .mount(&server)
        .await;

    let snapshot = provider(&server, RetryConfig::none())
        .fetch_by_coordinates(Coordinates::new(48.85, 2.35))
        .await
        .unwrap();

    assert_eq!(snapshot.name, "Paris");
}

#[tokio::test]
async fn test_unknown_city_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({"cod": "404", "message": "city not found"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server, RetryConfig::new(3, 1, 1))
        .fetch_by_city("Atlantis")
        .await;

    assert!(
        matches!(&result, Err(WeatherError::NotFound(subject)) if subject == "Atlantis"),
        "expected NotFound, got {:?}",
        result
    );
}

#[tokio::test]
async fn test_bad_key_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = provider(&server, RetryConfig::none())
        .fetch_by_city("London")
        .await;

    assert!(matches!(result, Err(WeatherError::Unauthorized)));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_json(
            "Leeds", 53.8, -1.55, 9.0,
        )))
        .mount(&server)
        .await;

    let snapshot = provider(&server, RetryConfig::new(2, 1, 1))
        .fetch_by_city("Leeds")
        .await
        .unwrap();

    assert_eq!(snapshot.name, "Leeds");
}

#[tokio::test]
async fn test_empty_city_rejected_without_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = provider(&server, RetryConfig::none()).fetch_by_city("   ").await;
    assert!(matches!(result, Err(WeatherError::EmptyCity)));
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = provider(&server, RetryConfig::none())
        .fetch_by_city("London")
        .await;
    assert!(matches!(result, Err(WeatherError::Parse(_))));
}

#[tokio::test]
async fn test_forecast_is_capped_at_three_days() {
    let server = MockServer::start().await;

    let list: Vec<_> = (0..40)
        .map(|i| {
            serde_json::json!({
                "dt": 1760000000 + i * 10800,
                "main": {"temp": 10.0 + i as f64},
                "weather": [{"id": 800, "description": "clear sky", "icon": "01d"}]
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "list": list })))
        .mount(&server)
        .await;

    let samples = provider(&server, RetryConfig::none())
        .fetch_forecast(Coordinates::new(1.0, 2.0))
        .await
        .unwrap();

    assert_eq!(samples.len(), 24);
    assert_eq!(samples[0].temperature, 10.0);
    assert_eq!(samples[0].description, "clear sky");
    assert_eq!(
        (samples[1].time - samples[0].time).num_hours(),
        3
    );
}
