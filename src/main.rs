use std::sync::Arc;

use anyhow::{Context, Result};
use weatherapp_core::AppError;
use weatherapp_ui::{MainViewIntent, MainViewModel};
use weatherapp_weather::{FileSettingsRepository, SettingsRepository};

fn parse_coordinates(args: &[String]) -> Result<Option<(f64, f64)>> {
    match args {
        [] => Ok(None),
        [lat, lon] => {
            let latitude: f64 = lat.parse().context("Latitude must be a number")?;
            let longitude: f64 = lon.parse().context("Longitude must be a number")?;
            if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                anyhow::bail!("Coordinates out of range: {}, {}", latitude, longitude);
            }
            Ok(Some((latitude, longitude)))
        }
        _ => anyhow::bail!("Usage: weatherapp [LATITUDE LONGITUDE]"),
    }
}

fn main() {
    if let Err(err) = run() {
        let err = AppError::from(err);
        tracing::error!("{}", err);
        eprintln!("Error: {}", err.user_message());
        eprintln!("  {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    weatherapp_core::init()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let coordinates = parse_coordinates(&args)?;

    let (config, _) = weatherapp_core::Config::load_validated()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("weatherapp-tokio")
        .build()
        .context("Failed to create tokio runtime")?;

    let settings = Arc::new(FileSettingsRepository::new(config.settings_path()));
    let model = MainViewModel::new(settings.clone(), runtime.handle().clone());

    tracing::info!("WeatherApp started");

    println!("WeatherApp");
    println!("  Config directory: {}", config.config_dir.display());
    println!("  Settings file: {}", settings.path().display());
    println!(
        "  Units: {} ({})",
        config.weather.units.as_query_value(),
        config.weather.units.temperature_suffix()
    );
    println!("  Language: {}", config.weather.language);

    let mut updates = model.subscribe();
    runtime.spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            tracing::info!("Main view state: {:?}", state);
        }
    });

    if let Some((latitude, longitude)) = coordinates {
        model.process_intent(MainViewIntent::GrantPermission { is_granted: true });
        model.process_intent(MainViewIntent::CheckLocationSettings { is_enabled: true });
        model.process_intent(MainViewIntent::ReceiveLocation {
            latitude,
            longitude,
        });
        runtime.block_on(model.wait_for_persistence());
    }

    let saved = runtime
        .block_on(settings.default_location())
        .context("Failed to read saved settings")?;

    let state = model.state();
    println!("\nState: {:?}", state);
    if let Err(blocked) = state.check_location_ready() {
        println!("{}", AppError::from(blocked).user_message());
    }
    match saved {
        Some(location) => println!("Saved default location: {}", location.display_coordinates()),
        None => println!("No default location saved"),
    }

    model.shutdown();
    Ok(())
}
