pub mod settings_service;
pub mod weather_service;

pub use settings_service::DefaultLocationWriter;
pub use weather_service::{
    request_refresh as request_weather_refresh, WeatherPreferences, WeatherServiceMessage,
};
