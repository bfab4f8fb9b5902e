//! Settings backend: persists the default location off the caller's thread.
//!
//! Saves go through one writer task fed by a queue, so they reach the
//! settings repository in the order they were requested. Callers never wait
//! on a write; failures are logged and dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use weatherapp_weather::{DefaultLocation, SettingsRepository};

/// Work handed to the writer task
#[derive(Debug)]
enum WriteRequest {
    Save(DefaultLocation),
    /// Answered once every request queued before it has been handled
    Flush(oneshot::Sender<()>),
}

/// Handle to the task that saves default locations.
///
/// The task exits when `cancel` fires or the handle is dropped. Requests
/// still queued at that point are abandoned.
#[derive(Debug)]
pub struct DefaultLocationWriter {
    tx: mpsc::UnboundedSender<WriteRequest>,
    pending: Arc<AtomicUsize>,
}

impl DefaultLocationWriter {
    pub fn spawn(
        runtime: &tokio::runtime::Handle,
        cancel: CancellationToken,
        settings: Arc<dyn SettingsRepository>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        runtime.spawn(run_writer(rx, cancel, settings, pending.clone()));

        Self { tx, pending }
    }

    /// Queue `location` to be saved after every earlier request.
    pub fn request_save(&self, location: DefaultLocation) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(WriteRequest::Save(location)).is_err() {
            release(&self.pending);
            tracing::debug!(
                "Session closed, not saving default location {}",
                location.display_coordinates()
            );
        }
    }

    /// Wait until every save queued before this call has finished or been
    /// abandoned. Safe to call from several tasks at once.
    pub async fn flush(&self) {
        let (respond_to, done) = oneshot::channel();
        if self.tx.send(WriteRequest::Flush(respond_to)).is_err() {
            return;
        }
        // An error means the writer exited and dropped the request
        let _ = done.await;
    }

    /// Number of saves queued or in flight
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

// Saturating so a request racing the writer's exit never wraps the count
fn release(pending: &AtomicUsize) {
    let _ = pending.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
}

async fn run_writer(
    mut rx: mpsc::UnboundedReceiver<WriteRequest>,
    cancel: CancellationToken,
    settings: Arc<dyn SettingsRepository>,
    pending: Arc<AtomicUsize>,
) {
    loop {
        let request = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            request = rx.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        match request {
            WriteRequest::Save(location) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!(
                            "Abandoned saving default location {}",
                            location.display_coordinates()
                        );
                        break;
                    }
                    result = settings.set_default_location(location) => match result {
                        Ok(()) => tracing::debug!(
                            "Default location {} saved",
                            location.display_coordinates()
                        ),
                        Err(e) => tracing::warn!(
                            "Failed to save default location {}: {}",
                            location.display_coordinates(),
                            e
                        ),
                    },
                }
                release(&pending);
            }
            WriteRequest::Flush(respond_to) => {
                let _ = respond_to.send(());
            }
        }
    }

    // Whatever is still queued is abandoned with the session
    rx.close();
    pending.store(0, Ordering::SeqCst);
    tracing::debug!("Default location writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use weatherapp_weather::InMemorySettingsRepository;

    #[tokio::test]
    async fn saves_location_in_background() {
        let repo = Arc::new(InMemorySettingsRepository::new());
        let writer = DefaultLocationWriter::spawn(
            &tokio::runtime::Handle::current(),
            CancellationToken::new(),
            repo.clone(),
        );

        writer.request_save(DefaultLocation::new(-1.3, 36.8));
        writer.flush().await;

        assert_eq!(repo.location_writes(), vec![DefaultLocation::new(-1.3, 36.8)]);
        assert_eq!(writer.pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn saves_apply_in_request_order() {
        let repo = Arc::new(InMemorySettingsRepository::new());
        let writer = DefaultLocationWriter::spawn(
            &tokio::runtime::Handle::current(),
            CancellationToken::new(),
            repo.clone(),
        );

        let expected: Vec<_> = (0..50)
            .map(|i| DefaultLocation::new(f64::from(i), 0.0))
            .collect();
        for location in &expected {
            writer.request_save(*location);
        }
        writer.flush().await;

        assert_eq!(repo.location_writes(), expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_flushes_all_return() {
        let repo = Arc::new(InMemorySettingsRepository::new());
        let writer = Arc::new(DefaultLocationWriter::spawn(
            &tokio::runtime::Handle::current(),
            CancellationToken::new(),
            repo.clone(),
        ));

        writer.request_save(DefaultLocation::new(1.0, 1.0));
        let a = {
            let writer = writer.clone();
            tokio::spawn(async move { writer.flush().await })
        };
        let b = {
            let writer = writer.clone();
            tokio::spawn(async move { writer.flush().await })
        };
        a.await.unwrap();
        b.await.unwrap();

        assert_eq!(repo.location_writes(), vec![DefaultLocation::new(1.0, 1.0)]);
    }

    #[tokio::test]
    async fn cancelled_writer_skips_save() {
        let repo = Arc::new(InMemorySettingsRepository::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let writer =
            DefaultLocationWriter::spawn(&tokio::runtime::Handle::current(), cancel, repo.clone());

        writer.request_save(DefaultLocation::new(0.0, 0.0));
        writer.flush().await;

        assert!(repo.location_writes().is_empty());
        assert_eq!(writer.pending(), 0);
    }
}
