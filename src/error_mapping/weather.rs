use atmos_core::{AppError, AuthError, NetworkError, ReqwestErrorExt};
use atmos_weather::WeatherError;

use super::IntoAppError;

impl IntoAppError for WeatherError {
    fn into_app_error(self) -> AppError {
        match self {
            WeatherError::EmptyCity => AppError::EmptyCity,
            WeatherError::NotFound(subject) => AppError::NotFound(subject),
            WeatherError::Unauthorized => AppError::Auth(AuthError::InvalidWeatherKey),
            WeatherError::Server { status } => AppError::Network(NetworkError::ServerError {
                status,
                message: format!("weather service returned {status}"),
            }),
            WeatherError::Network(e) => AppError::Network(e.into_network_error()),
            WeatherError::Parse(s) => AppError::Network(NetworkError::InvalidResponse(s)),
            WeatherError::Location(e) => e.into_app_error(),
            WeatherError::Cache(s) => AppError::Other(anyhow::anyhow!(s)),
        }
    }
}
