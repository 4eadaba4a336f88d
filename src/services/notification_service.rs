//! Admin-to-team notifications.
//!
//! One notification document per team, keyed by the team id. Sending is a
//! full overwrite so a stale response from the previous notification can
//! never leak into the new one; responding and clearing are merges. Cleared
//! notifications stay on disk with `isActive: false`.

use futures::{StreamExt, stream::BoxStream};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    dao::{
        document_store::{Document, DocumentEvent, Fields, WriteBatch, collections},
        models::{self, NotificationRecord, now_millis},
    },
    dto::{notification::NotificationView, sse::ServerEvent, validation::validate_message},
    error::ServiceError,
    services::map_missing,
    state::SharedState,
};

/// Send a notification to one team, replacing any previous one.
pub async fn send_to_team(
    state: &SharedState,
    team_id: &str,
    message: &str,
) -> Result<(), ServiceError> {
    validate_message(message)?;
    let store = state.require_store().await?;

    store
        .get(collections::USERS, team_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("team {team_id}")))?;

    let record = NotificationRecord::new(team_id.to_owned(), message.trim().to_owned());
    store
        .set(
            collections::TEAM_NOTIFICATIONS,
            team_id,
            models::encode(&record)?,
        )
        .await?;
    info!(team = %team_id, "notification sent");
    Ok(())
}

/// Send the same notification to every team in one atomic batch.
///
/// Returns the number of teams written. No teams means nothing to write and
/// a count of zero.
pub async fn broadcast(state: &SharedState, message: &str) -> Result<usize, ServiceError> {
    validate_message(message)?;
    let store = state.require_store().await?;

    let teams = store.list(collections::USERS).await?;
    if teams.is_empty() {
        return Ok(0);
    }

    let mut batch = WriteBatch::new();
    for team in &teams {
        let record = NotificationRecord::new(team.id.clone(), message.trim().to_owned());
        batch.set(
            collections::TEAM_NOTIFICATIONS,
            &team.id,
            models::encode(&record)?,
        );
    }
    store.commit(batch).await?;
    info!(teams = teams.len(), "notification broadcast");
    Ok(teams.len())
}

/// Record a team's answer to its current notification.
pub async fn respond(
    state: &SharedState,
    team_id: &str,
    answer: &str,
) -> Result<(), ServiceError> {
    validate_message(answer)?;
    let store = state.require_store().await?;

    let mut fields = Fields::new();
    fields.insert(
        "response".into(),
        json!({
            "answer": answer.trim(),
            "timestamp": now_millis(),
        }),
    );
    store
        .update(collections::TEAM_NOTIFICATIONS, team_id, fields)
        .await
        .map_err(|err| map_missing(err, format!("notification for team {team_id}")))?;
    info!(team = %team_id, "notification answered");
    Ok(())
}

/// Deactivate a team's notification, keeping the document for history.
pub async fn clear(state: &SharedState, team_id: &str) -> Result<(), ServiceError> {
    let store = state.require_store().await?;

    let mut fields = Fields::new();
    fields.insert("isActive".into(), json!(false));
    fields.insert("clearedAt".into(), json!(now_millis()));
    store
        .update(collections::TEAM_NOTIFICATIONS, team_id, fields)
        .await
        .map_err(|err| map_missing(err, format!("notification for team {team_id}")))?;
    info!(team = %team_id, "notification cleared");
    Ok(())
}

/// Subscribe to one team's notification.
///
/// Emits a `notification` event holding the active notification, or `null`
/// while there is none (never sent, cleared, or undecodable).
pub async fn watch_team_notification(
    state: &SharedState,
    team_id: &str,
) -> Result<BoxStream<'static, ServerEvent>, ServiceError> {
    let store = state.require_store().await?;
    let stream = store
        .watch_document(collections::TEAM_NOTIFICATIONS, team_id)
        .filter_map(|event| async move {
            match event {
                DocumentEvent::Current(document) => Some(notification_event(document)),
                DocumentEvent::Absent | DocumentEvent::Deleted => {
                    Some(ServerEvent::null("notification"))
                }
            }
        });
    Ok(stream.boxed())
}

/// Subscribe to every team's notifications, active ones only, for the admin
/// dashboard.
pub async fn watch_all_notifications(
    state: &SharedState,
) -> Result<BoxStream<'static, ServerEvent>, ServiceError> {
    let store = state.require_store().await?;
    let stream = store
        .watch_collection(collections::TEAM_NOTIFICATIONS)
        .filter_map(|documents| async move {
            let views: Vec<NotificationView> = documents
                .into_iter()
                .filter_map(|document| decode_notification(&document))
                .filter(|view| view.is_active)
                .collect();
            match ServerEvent::json("notifications".to_owned(), &views) {
                Ok(event) => Some(event),
                Err(err) => {
                    warn!(error = %err, "failed to serialize notification snapshot");
                    None
                }
            }
        });
    Ok(stream.boxed())
}

fn notification_event(document: Document) -> ServerEvent {
    match decode_notification(&document) {
        Some(view) if view.is_active => ServerEvent::json("notification".to_owned(), &view)
            .unwrap_or_else(|err| {
                warn!(error = %err, "failed to serialize notification view");
                ServerEvent::null("notification")
            }),
        _ => ServerEvent::null("notification"),
    }
}

fn decode_notification(document: &Document) -> Option<NotificationView> {
    match models::decode::<NotificationRecord>(document) {
        Ok(record) => Some(record.into()),
        Err(err) => {
            warn!(id = %document.id, error = %err, "skipping undecodable notification document");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            document_store::{DocumentStore, memory::MemoryDocumentStore},
            models::{TeamRecord, decode, encode},
        },
        state::AppState,
    };

    async fn state_with_store() -> (crate::state::SharedState, Arc<MemoryDocumentStore>) {
        let state = AppState::new(AppConfig::default());
        let store = Arc::new(MemoryDocumentStore::new());
        state.set_document_store(store.clone()).await;
        (state, store)
    }

    async fn seed_team(store: &MemoryDocumentStore, name: &str) -> String {
        let record = TeamRecord::new(name.into(), Vec::new());
        store
            .create(collections::USERS, encode(&record).unwrap())
            .await
            .unwrap()
    }

    async fn stored_notification(store: &MemoryDocumentStore, team_id: &str) -> NotificationRecord {
        let document = store
            .get(collections::TEAM_NOTIFICATIONS, team_id)
            .await
            .unwrap()
            .unwrap();
        decode(&document).unwrap()
    }

    #[tokio::test]
    async fn a_fresh_send_clears_the_previous_response() {
        let (state, store) = state_with_store().await;
        let team_id = seed_team(&store, "alpha").await;

        send_to_team(&state, &team_id, "first question").await.unwrap();
        respond(&state, &team_id, "our answer").await.unwrap();
        let stored = stored_notification(&store, &team_id).await;
        assert!(stored.response.is_some());

        send_to_team(&state, &team_id, "second question").await.unwrap();
        let stored = stored_notification(&store, &team_id).await;
        assert_eq!(stored.message, "second question");
        assert!(stored.is_active);
        assert!(stored.response.is_none());
        assert!(stored.cleared_at.is_none());
    }

    #[tokio::test]
    async fn clear_keeps_the_document_inactive() {
        let (state, store) = state_with_store().await;
        let team_id = seed_team(&store, "alpha").await;

        send_to_team(&state, &team_id, "question").await.unwrap();
        clear(&state, &team_id).await.unwrap();

        let stored = stored_notification(&store, &team_id).await;
        assert!(!stored.is_active);
        assert!(stored.cleared_at.is_some());
        assert_eq!(stored.message, "question");
    }

    #[tokio::test]
    async fn respond_without_notification_is_not_found() {
        let (state, store) = state_with_store().await;
        let team_id = seed_team(&store, "alpha").await;

        let err = respond(&state, &team_id, "answer").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn send_to_unknown_team_is_not_found() {
        let (state, _store) = state_with_store().await;
        let err = send_to_team(&state, "ghost", "hello").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn broadcast_writes_one_notification_per_team() {
        let (state, store) = state_with_store().await;
        let first = seed_team(&store, "alpha").await;
        let second = seed_team(&store, "beta").await;

        let count = broadcast(&state, "meet at the fountain").await.unwrap();
        assert_eq!(count, 2);

        for team_id in [&first, &second] {
            let stored = stored_notification(&store, team_id).await;
            assert_eq!(stored.message, "meet at the fountain");
            assert_eq!(&stored.team_id, team_id);
            assert!(stored.is_active);
        }
    }

    #[tokio::test]
    async fn broadcast_without_teams_writes_nothing() {
        let (state, store) = state_with_store().await;
        let count = broadcast(&state, "anyone there?").await.unwrap();
        assert_eq!(count, 0);
        assert!(
            store
                .list(collections::TEAM_NOTIFICATIONS)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn team_stream_nulls_out_on_clear() {
        let (state, store) = state_with_store().await;
        let team_id = seed_team(&store, "alpha").await;

        let mut stream = watch_team_notification(&state, &team_id).await.unwrap();
        let first = stream.next().await.unwrap();
        assert_eq!(first.data, "null");

        send_to_team(&state, &team_id, "question").await.unwrap();
        let second = stream.next().await.unwrap();
        assert!(second.data.contains("question"));

        clear(&state, &team_id).await.unwrap();
        let third = stream.next().await.unwrap();
        assert_eq!(third.data, "null");
    }
}
