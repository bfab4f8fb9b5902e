//! Weather backend: drains a refresh stream off the UI thread.
//! Each result is forwarded as a message; the receiver decides what to show.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use weatherapp_core::{Units, WeatherConfig};
use weatherapp_weather::{ApiResult, DefaultLocation, RefreshWeatherUseCase, Settings, Weather};

/// Language and units a refresh is requested in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherPreferences {
    pub language: String,
    pub units: Units,
}

impl From<&WeatherConfig> for WeatherPreferences {
    fn from(config: &WeatherConfig) -> Self {
        Self {
            language: config.language.clone(),
            units: config.units,
        }
    }
}

impl From<&Settings> for WeatherPreferences {
    fn from(settings: &Settings) -> Self {
        Self {
            language: settings.language.clone(),
            units: settings.units,
        }
    }
}

/// Messages sent from the refresh task back to the UI
#[derive(Debug)]
pub enum WeatherServiceMessage {
    /// One item from the refresh stream
    Refreshed(ApiResult<Weather>),
    /// The stream ended
    Finished,
}

/// Request a weather refresh for `location`.
/// Sends one `Refreshed` per stream item, then `Finished`.
pub fn request_refresh(
    tx: &UnboundedSender<WeatherServiceMessage>,
    runtime: &tokio::runtime::Handle,
    use_case: Arc<dyn RefreshWeatherUseCase>,
    location: DefaultLocation,
    preferences: WeatherPreferences,
) {
    let tx = tx.clone();

    runtime.spawn(async move {
        tracing::info!(
            "Refreshing weather for {} ({}, {})",
            location.display_coordinates(),
            preferences.language,
            preferences.units.as_query_value()
        );

        let mut results =
            use_case.refresh(&location, &preferences.language, preferences.units);

        while let Some(result) = results.next().await {
            if let Err(e) = &result {
                tracing::warn!("Weather refresh failed: {}", e);
            }
            if tx.send(WeatherServiceMessage::Refreshed(result)).is_err() {
                tracing::debug!("Weather receiver dropped, stopping refresh");
                return;
            }
        }

        if tx.send(WeatherServiceMessage::Finished).is_err() {
            tracing::debug!("Weather receiver dropped before refresh finished");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_from_config() {
        let config = WeatherConfig {
            units: Units::Imperial,
            language: "pt_br".into(),
            refresh_minutes: 30,
        };
        let prefs = WeatherPreferences::from(&config);
        assert_eq!(prefs.language, "pt_br");
        assert_eq!(prefs.units, Units::Imperial);
    }

    struct FailingRefresh;

    impl RefreshWeatherUseCase for FailingRefresh {
        fn refresh(
            &self,
            _location: &DefaultLocation,
            language: &str,
            units: Units,
        ) -> weatherapp_weather::WeatherStream {
            let message = format!("{} {}", language, units.as_query_value());
            futures::stream::iter(vec![
                Err(weatherapp_weather::WeatherError::Network(message)),
                Err(weatherapp_weather::WeatherError::InvalidApiKey),
            ])
            .boxed()
        }
    }

    #[tokio::test]
    async fn forwards_every_result_then_finishes() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        request_refresh(
            &tx,
            &tokio::runtime::Handle::current(),
            Arc::new(FailingRefresh),
            DefaultLocation::new(-1.3, 36.8),
            WeatherPreferences {
                language: "sw".into(),
                units: Units::Metric,
            },
        );

        match rx.recv().await {
            Some(WeatherServiceMessage::Refreshed(Err(e))) => {
                assert!(e.to_string().contains("sw metric"));
            }
            other => panic!("unexpected message: {:?}", other),
        }
        assert!(matches!(
            rx.recv().await,
            Some(WeatherServiceMessage::Refreshed(Err(
                weatherapp_weather::WeatherError::InvalidApiKey
            )))
        ));
        assert!(matches!(
            rx.recv().await,
            Some(WeatherServiceMessage::Finished)
        ));
    }

    #[test]
    fn preferences_from_settings() {
        let settings = Settings::default();
        let prefs = WeatherPreferences::from(&settings);
        assert_eq!(prefs.language, "en");
        assert_eq!(prefs.units, Units::Metric);
    }
}
