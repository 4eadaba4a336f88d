//! Keeps the document store connected.
//!
//! The server boots and serves traffic even while the backend is down; this
//! task owns the connect/reconnect lifecycle and flips the shared degraded
//! flag that the health endpoint and the write paths consult.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{document_store::DocumentStore, storage::StorageError},
    state::SharedState,
};

/// First retry delay; doubles up to [`BACKOFF_CEILING`].
const BACKOFF_START: Duration = Duration::from_secs(1);
const BACKOFF_CEILING: Duration = Duration::from_secs(10);
/// How often a healthy store is probed.
const PROBE_INTERVAL: Duration = Duration::from_secs(5);
/// Consecutive reconnect failures tolerated before the store is abandoned.
const RECONNECT_ATTEMPTS: u32 = 3;

/// Connect the document store and keep it alive.
///
/// Runs for the life of the process: establishes a store via `connect`,
/// installs it on the shared state, then probes it with
/// [`DocumentStore::health_check`]. A failed probe triggers
/// [`DocumentStore::try_reconnect`] with backoff; once those attempts are
/// exhausted the store is dropped and `connect` starts over.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn DocumentStore>, StorageError>> + Send,
{
    let mut backoff = BACKOFF_START;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "document store connect failed");
                sleep(backoff).await;
                backoff = (backoff * 2).min(BACKOFF_CEILING);
                continue;
            }
        };

        state.set_document_store(store.clone()).await;
        info!("document store connected");
        backoff = BACKOFF_START;

        probe_until_lost(&state, store.as_ref()).await;

        warn!("document store lost; connecting from scratch");
        sleep(backoff).await;
        backoff = (backoff * 2).min(BACKOFF_CEILING);
    }
}

/// Probe the store every [`PROBE_INTERVAL`] until it is lost for good.
///
/// The degraded flag is lowered whenever the store answers and raised on the
/// first failed reconnect attempt, so clients see the outage while recovery
/// is still in progress.
async fn probe_until_lost(state: &SharedState, store: &dyn DocumentStore) {
    loop {
        if store.health_check().await.is_ok() {
            if state.is_degraded().await {
                info!("document store healthy again; leaving degraded mode");
                state.update_degraded(false).await;
            }
            sleep(PROBE_INTERVAL).await;
            continue;
        }

        if !recover(state, store).await {
            return;
        }
        state.update_degraded(false).await;
        sleep(PROBE_INTERVAL).await;
    }
}

/// Try to bring a store that failed its probe back, with backoff.
async fn recover(state: &SharedState, store: &dyn DocumentStore) -> bool {
    let mut backoff = BACKOFF_START;

    for attempt in 0..RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "document store reconnected");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(
                        attempt, error = %err,
                        "document store unreachable; entering degraded mode"
                    );
                    state.update_degraded(true).await;
                } else {
                    warn!(attempt, error = %err, "document store reconnect attempt failed");
                }
                sleep(backoff).await;
                backoff = (backoff * 2).min(BACKOFF_CEILING);
            }
        }
    }

    warn!("document store reconnect attempts exhausted; staying degraded");
    false
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use futures::{future::BoxFuture, stream, stream::BoxStream};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            document_store::{Document, DocumentEvent, Fields, WriteBatch},
            storage::StorageResult,
        },
        state::AppState,
    };

    /// Store whose probe and reconnect paths fail a scripted number of times.
    #[derive(Default)]
    struct ScriptedStore {
        failing_probes: AtomicU32,
        failing_reconnects: AtomicU32,
        reconnect_calls: AtomicU32,
    }

    impl ScriptedStore {
        fn outage(probes: u32, reconnects: u32) -> Self {
            Self {
                failing_probes: AtomicU32::new(probes),
                failing_reconnects: AtomicU32::new(reconnects),
                reconnect_calls: AtomicU32::new(0),
            }
        }

        fn take(counter: &AtomicU32) -> bool {
            counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                    left.checked_sub(1)
                })
                .is_ok()
        }
    }

    impl DocumentStore for ScriptedStore {
        fn get(&self, _: &str, _: &str) -> BoxFuture<'static, StorageResult<Option<Document>>> {
            Box::pin(async { Ok(None) })
        }

        fn list(&self, _: &str) -> BoxFuture<'static, StorageResult<Vec<Document>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn create(&self, _: &str, _: Fields) -> BoxFuture<'static, StorageResult<String>> {
            Box::pin(async { Ok(String::new()) })
        }

        fn set(&self, _: &str, _: &str, _: Fields) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn update(&self, _: &str, _: &str, _: Fields) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn delete(&self, _: &str, _: &str) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn commit(&self, _: WriteBatch) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn watch_document(&self, _: &str, _: &str) -> BoxStream<'static, DocumentEvent> {
            Box::pin(stream::empty())
        }

        fn watch_collection(&self, _: &str) -> BoxStream<'static, Vec<Document>> {
            Box::pin(stream::empty())
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            let fail = Self::take(&self.failing_probes);
            Box::pin(async move {
                if fail {
                    Err(StorageError::unavailable(
                        "probe failed".into(),
                        std::io::Error::other("probe failed"),
                    ))
                } else {
                    Ok(())
                }
            })
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.reconnect_calls.fetch_add(1, Ordering::SeqCst);
            let fail = Self::take(&self.failing_reconnects);
            Box::pin(async move {
                if fail {
                    Err(StorageError::unavailable(
                        "reconnect failed".into(),
                        std::io::Error::other("reconnect failed"),
                    ))
                } else {
                    Ok(())
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_from_a_transient_outage_and_leaves_degraded_mode() {
        let state = AppState::new(AppConfig::default());
        let store = Arc::new(ScriptedStore::outage(1, 1));

        let supervised = store.clone();
        let supervisor_state = state.clone();
        tokio::spawn(run(supervisor_state, move || {
            let store = supervised.clone() as Arc<dyn DocumentStore>;
            async move { Ok(store) }
        }));

        // Probe #1 fails, reconnect #1 fails (degraded), reconnect #2 heals.
        sleep(Duration::from_secs(30)).await;

        assert!(!state.is_degraded().await);
        assert!(store.reconnect_calls.load(Ordering::SeqCst) >= 2);
        assert!(state.require_store().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn abandons_the_store_and_reconnects_after_exhausted_attempts() {
        let state = AppState::new(AppConfig::default());
        let connects = Arc::new(AtomicU32::new(0));

        let counted = connects.clone();
        tokio::spawn(run(state.clone(), move || {
            counted.fetch_add(1, Ordering::SeqCst);
            // Every store fails its first probe and every reconnect attempt.
            let store =
                Arc::new(ScriptedStore::outage(u32::MAX, u32::MAX)) as Arc<dyn DocumentStore>;
            async move { Ok(store) }
        }));

        sleep(Duration::from_secs(120)).await;

        assert!(state.is_degraded().await);
        assert!(connects.load(Ordering::SeqCst) >= 2);
    }
}
