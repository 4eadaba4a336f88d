//! The shared game clock, a singleton document every client subscribes to.

use futures::{StreamExt, stream::BoxStream};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    dao::{
        document_store::{DocumentEvent, Fields, GAME_STATE_DOC_ID, collections},
        models::{self, GameStateRecord, GameStatus, now_millis},
        storage::StorageError,
    },
    dto::{game::GameStateView, sse::ServerEvent},
    error::ServiceError,
    state::SharedState,
};

/// Start the game clock.
///
/// Merges the running flag and start time into the singleton; the first
/// start ever creates the document with a full write.
pub async fn start_game(state: &SharedState) -> Result<GameStateView, ServiceError> {
    let store = state.require_store().await?;
    let now = now_millis();

    let mut fields = Fields::new();
    fields.insert("isStarted".into(), json!(true));
    fields.insert("startTime".into(), json!(now));
    fields.insert("status".into(), json!(GameStatus::Active));

    let result = store
        .update(collections::GAME_STATE, GAME_STATE_DOC_ID, fields)
        .await;
    if let Err(StorageError::MissingDocument { .. }) = result {
        let record = GameStateRecord {
            is_started: true,
            start_time: Some(now),
            end_time: None,
            status: GameStatus::Active,
        };
        store
            .set(
                collections::GAME_STATE,
                GAME_STATE_DOC_ID,
                models::encode(&record)?,
            )
            .await?;
    } else {
        result?;
    }

    info!("game started");
    current_state(state).await
}

/// Stop the game clock. Fails when the clock was never started.
pub async fn stop_game(state: &SharedState) -> Result<GameStateView, ServiceError> {
    let store = state.require_store().await?;

    let mut fields = Fields::new();
    fields.insert("isStarted".into(), json!(false));
    fields.insert("endTime".into(), json!(now_millis()));
    fields.insert("status".into(), json!(GameStatus::Stopped));

    store
        .update(collections::GAME_STATE, GAME_STATE_DOC_ID, fields)
        .await
        .map_err(|err| match err {
            StorageError::MissingDocument { .. } => {
                ServiceError::NotFound("game has not been started".into())
            }
            other => other.into(),
        })?;

    info!("game stopped");
    current_state(state).await
}

/// Current game clock, defaulting to the waiting state before the singleton
/// exists.
pub async fn current_state(state: &SharedState) -> Result<GameStateView, ServiceError> {
    let store = state.require_store().await?;
    let document = store
        .get(collections::GAME_STATE, GAME_STATE_DOC_ID)
        .await?;
    match document {
        Some(document) => {
            let record: GameStateRecord = models::decode(&document)?;
            Ok(record.into())
        }
        None => Ok(GameStateView::waiting()),
    }
}

/// Subscribe to the game clock. An absent or deleted singleton is reported
/// as the waiting state so clients never see a gap.
pub async fn watch_game_state(
    state: &SharedState,
) -> Result<BoxStream<'static, ServerEvent>, ServiceError> {
    let store = state.require_store().await?;
    let stream = store
        .watch_document(collections::GAME_STATE, GAME_STATE_DOC_ID)
        .filter_map(|event| async move {
            let view = match event {
                DocumentEvent::Current(document) => {
                    match models::decode::<GameStateRecord>(&document) {
                        Ok(record) => record.into(),
                        Err(err) => {
                            warn!(error = %err, "undecodable game state; reporting waiting");
                            GameStateView::waiting()
                        }
                    }
                }
                DocumentEvent::Absent | DocumentEvent::Deleted => GameStateView::waiting(),
            };
            match ServerEvent::json("gameState".to_owned(), &view) {
                Ok(event) => Some(event),
                Err(err) => {
                    warn!(error = %err, "failed to serialize game state");
                    None
                }
            }
        });
    Ok(stream.boxed())
}

/// Subscribe to the general settings singleton: the first document of the
/// `general` collection wins, `null` while the collection is empty.
pub async fn watch_general_settings(
    state: &SharedState,
) -> Result<BoxStream<'static, ServerEvent>, ServiceError> {
    let store = state.require_store().await?;
    let stream = store
        .watch_collection(collections::GENERAL)
        .filter_map(|documents| async move {
            match documents.into_iter().next() {
                Some(document) => match ServerEvent::json("general".to_owned(), &document.fields) {
                    Ok(event) => Some(event),
                    Err(err) => {
                        warn!(error = %err, "failed to serialize general settings");
                        None
                    }
                },
                None => Some(ServerEvent::null("general")),
            }
        });
    Ok(stream.boxed())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::document_store::memory::MemoryDocumentStore, state::AppState,
    };

    async fn state_with_store() -> crate::state::SharedState {
        let state = AppState::new(AppConfig::default());
        let store = Arc::new(MemoryDocumentStore::new());
        state.set_document_store(store).await;
        state
    }

    #[tokio::test]
    async fn clock_defaults_to_waiting() {
        let state = state_with_store().await;
        let view = current_state(&state).await.unwrap();
        assert!(!view.is_started);
        assert_eq!(view.status, GameStatus::Waiting);
        assert!(view.start_time.is_none());
    }

    #[tokio::test]
    async fn first_start_creates_the_singleton() {
        let state = state_with_store().await;
        let view = start_game(&state).await.unwrap();
        assert!(view.is_started);
        assert_eq!(view.status, GameStatus::Active);
        assert!(view.start_time.is_some());
        assert!(view.end_time.is_none());
    }

    #[tokio::test]
    async fn stop_before_start_is_not_found() {
        let state = state_with_store().await;
        let err = stop_game(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn stop_keeps_the_start_time() {
        let state = state_with_store().await;
        let started = start_game(&state).await.unwrap();
        let stopped = stop_game(&state).await.unwrap();

        assert!(!stopped.is_started);
        assert_eq!(stopped.status, GameStatus::Stopped);
        assert_eq!(stopped.start_time, started.start_time);
        assert!(stopped.end_time.is_some());
    }

    #[tokio::test]
    async fn restart_flips_back_to_active() {
        let state = state_with_store().await;
        start_game(&state).await.unwrap();
        stop_game(&state).await.unwrap();
        let view = start_game(&state).await.unwrap();
        assert!(view.is_started);
        assert_eq!(view.status, GameStatus::Active);
    }

    #[tokio::test]
    async fn watch_reports_waiting_then_active() {
        let state = state_with_store().await;
        let mut stream = watch_game_state(&state).await.unwrap();

        let first = stream.next().await.unwrap();
        assert_eq!(first.event.as_deref(), Some("gameState"));
        assert!(first.data.contains("waiting"));

        start_game(&state).await.unwrap();
        let second = stream.next().await.unwrap();
        assert!(second.data.contains("active"));
    }
}
