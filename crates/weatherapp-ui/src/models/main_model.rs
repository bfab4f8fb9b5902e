//! Main screen state: location permission, location settings and the
//! default location weather is shown for.
//!
//! Intents from the permission, settings and location callbacks are reduced
//! into a new snapshot and published on a watch channel. Reduction is pure;
//! the side effect an intent asks for is declared by `MainViewIntent::effect`
//! and queued alongside the snapshot it belongs to.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use weatherapp_core::LocationError;
use weatherapp_weather::{DefaultLocation, SettingsRepository};

use crate::services::settings_service::DefaultLocationWriter;

/// Snapshot of everything the main screen renders from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MainViewState {
    pub is_permission_granted: bool,
    pub is_location_setting_enabled: bool,
    pub default_location: Option<DefaultLocation>,
}

impl MainViewState {
    /// Why a location fix cannot be requested yet, if anything blocks it
    pub fn check_location_ready(&self) -> Result<(), LocationError> {
        if !self.is_permission_granted {
            return Err(LocationError::PermissionDenied);
        }
        if !self.is_location_setting_enabled {
            return Err(LocationError::SettingsDisabled);
        }
        Ok(())
    }

    /// True once both permission and device location settings allow a fix
    pub fn can_request_location(&self) -> bool {
        self.check_location_ready().is_ok()
    }
}

/// Something that happened which the main screen must react to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MainViewIntent {
    GrantPermission { is_granted: bool },
    CheckLocationSettings { is_enabled: bool },
    ReceiveLocation { latitude: f64, longitude: f64 },
}

/// Side effects requested by an intent, run outside the reducer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MainViewEffect {
    PersistDefaultLocation(DefaultLocation),
}

impl MainViewIntent {
    pub fn effect(&self) -> Option<MainViewEffect> {
        match *self {
            MainViewIntent::GrantPermission { .. } | MainViewIntent::CheckLocationSettings { .. } => {
                None
            }
            MainViewIntent::ReceiveLocation {
                latitude,
                longitude,
            } => Some(MainViewEffect::PersistDefaultLocation(DefaultLocation::new(
                latitude, longitude,
            ))),
        }
    }
}

/// Compute the snapshot that follows `state` once `intent` is applied.
/// Only the field named by the intent changes.
pub fn reduce(state: &MainViewState, intent: &MainViewIntent) -> MainViewState {
    match *intent {
        MainViewIntent::GrantPermission { is_granted } => MainViewState {
            is_permission_granted: is_granted,
            ..state.clone()
        },
        MainViewIntent::CheckLocationSettings { is_enabled } => MainViewState {
            is_location_setting_enabled: is_enabled,
            ..state.clone()
        },
        MainViewIntent::ReceiveLocation {
            latitude,
            longitude,
        } => MainViewState {
            default_location: Some(DefaultLocation::new(latitude, longitude)),
            ..state.clone()
        },
    }
}

/// State holder for the main screen.
///
/// `process_intent` may be called concurrently from any thread. Each call
/// reduces and publishes while holding the channel's write lock, so intents
/// apply in the order they acquire it and observers only ever see newer
/// snapshots.
///
/// Default locations are saved by a single writer task on `runtime`, in the
/// order their snapshots were published, and `process_intent` never waits
/// for them. Once the model is shut down or dropped, in-flight saves are
/// abandoned and later ones are skipped; published state is unaffected
/// either way.
pub struct MainViewModel {
    state: watch::Sender<MainViewState>,
    writer: DefaultLocationWriter,
    cancel: CancellationToken,
}

impl MainViewModel {
    pub fn new(settings: Arc<dyn SettingsRepository>, runtime: tokio::runtime::Handle) -> Self {
        Self::with_state(MainViewState::default(), settings, runtime)
    }

    pub fn with_state(
        initial: MainViewState,
        settings: Arc<dyn SettingsRepository>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let (state, _) = watch::channel(initial);
        let cancel = CancellationToken::new();
        let writer = DefaultLocationWriter::spawn(&runtime, cancel.clone(), settings);
        Self {
            state,
            writer,
            cancel,
        }
    }

    /// Current snapshot
    pub fn state(&self) -> MainViewState {
        self.state.borrow().clone()
    }

    /// Observe snapshots as they are published.
    /// A slow receiver skips straight to the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<MainViewState> {
        self.state.subscribe()
    }

    pub fn process_intent(&self, intent: MainViewIntent) {
        self.state.send_modify(|state| {
            let next = reduce(state, &intent);
            tracing::debug!("Main view {:?}: {:?} -> {:?}", intent, state, next);
            *state = next;

            // Queued under the state lock so saves follow publish order
            if let Some(effect) = intent.effect() {
                self.dispatch(effect);
            }
        });
    }

    fn dispatch(&self, effect: MainViewEffect) {
        match effect {
            MainViewEffect::PersistDefaultLocation(location) => {
                self.writer.request_save(location);
            }
        }
    }

    /// Number of saves queued or in flight
    pub fn pending_persistence(&self) -> usize {
        self.writer.pending()
    }

    /// Wait until every save queued before this call has finished or been
    /// abandoned. Concurrent callers each wait for their own point in the queue.
    pub async fn wait_for_persistence(&self) {
        self.writer.flush().await;
    }

    /// End the session: abandon in-flight saves and skip future ones.
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!(
                "Main view shutting down with {} pending saves",
                self.writer.pending()
            );
            self.cancel.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for MainViewModel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for MainViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainViewModel")
            .field("state", &*self.state.borrow())
            .field("pending_persistence", &self.writer.pending())
            .field("shut_down", &self.cancel.is_cancelled())
            .finish()
    }
}
