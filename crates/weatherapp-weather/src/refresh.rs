//! Weather refresh use case.
//!
//! A refresh yields a stream of results rather than a single value so a
//! provider can emit cached data first and fresh data once it arrives.

use futures::stream::BoxStream;

use crate::types::{DefaultLocation, Weather};
use weatherapp_core::{Units, WeatherError};

/// Outcome of a single weather fetch
pub type ApiResult<T> = Result<T, WeatherError>;

pub type WeatherStream = BoxStream<'static, ApiResult<Weather>>;

/// Fetches weather for a location in the user's language and units.
pub trait RefreshWeatherUseCase: Send + Sync {
    fn refresh(&self, location: &DefaultLocation, language: &str, units: Units) -> WeatherStream;
}
