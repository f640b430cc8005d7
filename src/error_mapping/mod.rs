//! Maps library errors to atmos_core::AppError for consistent user-facing messages.
//! One module per source error type.

use atmos_core::AppError;

mod assistant;
mod location;
mod speech;
mod weather;

/// Conversion into the user-facing taxonomy.
pub trait IntoAppError {
    fn into_app_error(self) -> AppError;
}
