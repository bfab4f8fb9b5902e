//! Weather domain for WeatherApp
//!
//! Location and forecast types, the settings store that remembers the
//! user's default location, and the refresh use-case interface.

pub mod refresh;
pub mod settings;
pub mod types;

pub use refresh::{ApiResult, RefreshWeatherUseCase, WeatherStream};
pub use settings::{
    FileSettingsRepository, InMemorySettingsRepository, Settings, SettingsRepository,
};
pub use types::*;
pub use weatherapp_core::{SettingsError, Units, WeatherError};
