//! User settings persistence: default location and weather preferences.
//!
//! `SettingsRepository` is the seam the screen models write through.
//! `FileSettingsRepository` keeps settings in a JSON file next to the config;
//! `InMemorySettingsRepository` holds them for the lifetime of the process.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::DefaultLocation;
use weatherapp_core::{SettingsError, Units};

/// Persisted user settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_location: Option<DefaultLocation>,
    pub language: String,
    pub units: Units,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_location: None,
            language: "en".to_string(),
            units: Units::default(),
        }
    }
}

/// Storage for user settings.
///
/// Implementations must tolerate concurrent calls; each setter is a
/// read-modify-write of the whole settings record.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Load all settings, returning defaults if none are stored.
    async fn load(&self) -> Result<Settings, SettingsError>;

    async fn default_location(&self) -> Result<Option<DefaultLocation>, SettingsError> {
        Ok(self.load().await?.default_location)
    }

    async fn set_default_location(&self, location: DefaultLocation) -> Result<(), SettingsError>;

    async fn set_language(&self, language: String) -> Result<(), SettingsError>;

    async fn set_units(&self, units: Units) -> Result<(), SettingsError>;
}

/// JSON-file backed settings.
#[derive(Debug)]
pub struct FileSettingsRepository {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: tokio::sync::Mutex<()>,
}

impl FileSettingsRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Settings, SettingsError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_vec_pretty(settings)?;

        // Write then rename so a crash mid-write never leaves a truncated file
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, contents).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    async fn update<F>(&self, apply: F) -> Result<(), SettingsError>
    where
        F: FnOnce(&mut Settings) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut settings = self.read().await?;
        apply(&mut settings);
        self.write(&settings).await
    }
}

#[async_trait]
impl SettingsRepository for FileSettingsRepository {
    async fn load(&self) -> Result<Settings, SettingsError> {
        let _guard = self.write_lock.lock().await;
        self.read().await
    }

    async fn set_default_location(&self, location: DefaultLocation) -> Result<(), SettingsError> {
        self.update(|s| s.default_location = Some(location)).await?;
        tracing::info!(
            "Saved default location {} to {}",
            location.display_coordinates(),
            self.path.display()
        );
        Ok(())
    }

    async fn set_language(&self, language: String) -> Result<(), SettingsError> {
        self.update(|s| s.language = language).await
    }

    async fn set_units(&self, units: Units) -> Result<(), SettingsError> {
        self.update(|s| s.units = units).await
    }
}

/// Process-local settings.
#[derive(Debug, Default)]
pub struct InMemorySettingsRepository {
    settings: Mutex<Settings>,
    location_writes: Mutex<Vec<DefaultLocation>>,
}

impl InMemorySettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every location passed to `set_default_location`, oldest first
    pub fn location_writes(&self) -> Vec<DefaultLocation> {
        self.location_writes.lock().clone()
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn load(&self) -> Result<Settings, SettingsError> {
        Ok(self.settings.lock().clone())
    }

    async fn set_default_location(&self, location: DefaultLocation) -> Result<(), SettingsError> {
        self.settings.lock().default_location = Some(location);
        self.location_writes.lock().push(location);
        Ok(())
    }

    async fn set_language(&self, language: String) -> Result<(), SettingsError> {
        self.settings.lock().language = language;
        Ok(())
    }

    async fn set_units(&self, units: Units) -> Result<(), SettingsError> {
        self.settings.lock().units = units;
        Ok(())
    }
}
