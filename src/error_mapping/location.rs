use atmos_core::{AppError, Capability, NetworkError};
use atmos_weather::LocationError;

use super::IntoAppError;

impl IntoAppError for LocationError {
    fn into_app_error(self) -> AppError {
        match self {
            LocationError::PermissionDenied => AppError::PermissionDenied(Capability::Geolocation),
            LocationError::Unavailable(s) => AppError::Network(NetworkError::LocationUnavailable(s)),
            LocationError::Timeout => AppError::LocationTimeout,
            LocationError::Unsupported => AppError::Unsupported(Capability::Geolocation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_location_failure_has_its_own_message() {
        let messages: Vec<&str> = [
            LocationError::PermissionDenied,
            LocationError::Unavailable("no fix".into()),
            LocationError::Timeout,
            LocationError::Unsupported,
        ]
        .into_iter()
        .map(|e| e.into_app_error().user_message())
        .collect();

        assert_eq!(
            messages[0],
            "Location access denied. Please enable location services or search manually."
        );
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
