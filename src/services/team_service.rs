//! Team lifecycle: join, rename, progress tracking, and admin-side listing
//! and deletion.

use futures::{StreamExt, stream::BoxStream};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    dao::{
        document_store::{Document, DocumentEvent, Fields, collections},
        models::{self, TeamRecord, now_millis},
    },
    dto::{sse::ServerEvent, team::TeamView, validation::validate_team_name},
    error::ServiceError,
    services::map_missing,
    state::SharedState,
};

/// Create a team with a freshly assigned quest order.
///
/// Returns the new team's id and its order. Session handling is the caller's
/// concern.
pub async fn create_team(
    state: &SharedState,
    name: &str,
) -> Result<(String, Vec<String>), ServiceError> {
    validate_team_name(name)?;
    let store = state.require_store().await?;

    let assignment = super::order_service::order_for_new_team(state).await?;
    let record = TeamRecord::new(name.trim().to_owned(), assignment.order.clone());
    let id = store
        .create(collections::USERS, models::encode(&record)?)
        .await?;
    info!(team = %id, name = %record.name, "team joined");

    Ok((id, assignment.order))
}

/// Fetch a single team.
pub async fn get_team(state: &SharedState, id: &str) -> Result<TeamView, ServiceError> {
    let store = state.require_store().await?;
    let document = store
        .get(collections::USERS, id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("team {id}")))?;
    let record: TeamRecord = models::decode(&document)?;
    Ok(TeamView::from_record(document.id, record))
}

/// List every team, for the admin dashboard.
pub async fn list_teams(state: &SharedState) -> Result<Vec<TeamView>, ServiceError> {
    let store = state.require_store().await?;
    let documents = store.list(collections::USERS).await?;

    let mut teams = Vec::with_capacity(documents.len());
    for document in documents {
        let record: TeamRecord = models::decode(&document)?;
        teams.push(TeamView::from_record(document.id, record));
    }
    Ok(teams)
}

/// Rename an existing team.
pub async fn rename_team(state: &SharedState, id: &str, name: &str) -> Result<(), ServiceError> {
    validate_team_name(name)?;
    let store = state.require_store().await?;

    let mut fields = Fields::new();
    fields.insert("name".into(), json!(name.trim()));
    fields.insert("lastUpdated".into(), json!(now_millis()));
    store
        .update(collections::USERS, id, fields)
        .await
        .map_err(|err| map_missing(err, format!("team {id}")))?;
    info!(team = %id, "team renamed");
    Ok(())
}

/// Move a team's progress cursor, flipping the completion flag when the
/// cursor reaches the end of a non-empty order.
///
/// Completion is sticky: once set it is never unset, even if the cursor is
/// later moved backwards.
pub async fn update_progress(
    state: &SharedState,
    id: &str,
    current_quest_index: usize,
) -> Result<TeamView, ServiceError> {
    let store = state.require_store().await?;
    let document = store
        .get(collections::USERS, id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("team {id}")))?;
    let record: TeamRecord = models::decode(&document)?;

    if current_quest_index > record.order.len() {
        return Err(ServiceError::InvalidInput(format!(
            "quest index {current_quest_index} exceeds order length {}",
            record.order.len()
        )));
    }

    let now = now_millis();
    let mut fields = Fields::new();
    fields.insert("currentQuestIndex".into(), json!(current_quest_index));
    fields.insert("lastUpdated".into(), json!(now));

    let completed_now =
        !record.order.is_empty() && current_quest_index >= record.order.len() && !record.is_completed;
    if completed_now {
        fields.insert("isCompleted".into(), json!(true));
        fields.insert("completedAt".into(), json!(now));
        info!(team = %id, "team completed the hunt");
    }

    store
        .update(collections::USERS, id, fields)
        .await
        .map_err(|err| map_missing(err, format!("team {id}")))?;

    get_team(state, id).await
}

/// Delete a team and drop every session bound to it. Deleting an absent
/// team is a no-op.
pub async fn delete_team(state: &SharedState, id: &str) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    store.delete(collections::USERS, id).await?;
    state.sessions().clear_team(id);
    info!(team = %id, "team deleted");
    Ok(())
}

/// Subscribe to one team's document.
///
/// Emits a `team` event with the current view on every change, a
/// `team_missing` sentinel when the document does not exist yet, and a
/// `team_deleted` sentinel once its deletion is observed. The deleted
/// sentinel lets clients tear down their session instead of waiting for a
/// team that will never come back.
pub async fn watch_team(
    state: &SharedState,
    id: &str,
) -> Result<BoxStream<'static, ServerEvent>, ServiceError> {
    let store = state.require_store().await?;
    let stream = store
        .watch_document(collections::USERS, id)
        .filter_map(|event| async move {
            match event {
                DocumentEvent::Current(document) => team_event(document),
                DocumentEvent::Absent => Some(ServerEvent::null("team_missing")),
                DocumentEvent::Deleted => Some(ServerEvent::null("team_deleted")),
            }
        });
    Ok(stream.boxed())
}

/// Subscribe to the whole team roster, for the admin dashboard.
pub async fn watch_teams(
    state: &SharedState,
) -> Result<BoxStream<'static, ServerEvent>, ServiceError> {
    let store = state.require_store().await?;
    let stream = store
        .watch_collection(collections::USERS)
        .filter_map(|documents| async move {
            let views: Vec<TeamView> = documents
                .into_iter()
                .filter_map(|document| match models::decode::<TeamRecord>(&document) {
                    Ok(record) => Some(TeamView::from_record(document.id, record)),
                    Err(err) => {
                        warn!(id = %document.id, error = %err, "skipping undecodable team document");
                        None
                    }
                })
                .collect();
            match ServerEvent::json("teams".to_owned(), &views) {
                Ok(event) => Some(event),
                Err(err) => {
                    warn!(error = %err, "failed to serialize team snapshot");
                    None
                }
            }
        });
    Ok(stream.boxed())
}

fn team_event(document: Document) -> Option<ServerEvent> {
    match models::decode::<TeamRecord>(&document) {
        Ok(record) => {
            let view = TeamView::from_record(document.id, record);
            match ServerEvent::json("team".to_owned(), &view) {
                Ok(event) => Some(event),
                Err(err) => {
                    warn!(error = %err, "failed to serialize team view");
                    None
                }
            }
        }
        Err(err) => {
            warn!(id = %document.id, error = %err, "skipping undecodable team document");
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
        dao::document_store::{DocumentStore, memory::MemoryDocumentStore},
        state::AppState,
    };

    async fn state_with_store() -> (crate::state::SharedState, Arc<MemoryDocumentStore>) {
        let state = AppState::new(AppConfig::default());
        let store = Arc::new(MemoryDocumentStore::new());
        state.set_document_store(store.clone()).await;
        (state, store)
    }

    async fn seed_quests(store: &MemoryDocumentStore, count: usize) {
        for index in 0..count {
            let mut fields = crate::dao::document_store::Fields::new();
            fields.insert("title".into(), serde_json::json!(format!("quest {index}")));
            store.create(collections::QUESTS, fields).await.unwrap();
        }
    }

    #[tokio::test]
    async fn join_assigns_full_length_order() {
        let (state, store) = state_with_store().await;
        seed_quests(&store, 3).await;

        let (id, order) = create_team(&state, "alpha").await.unwrap();
        assert_eq!(order.len(), 3);

        let team = get_team(&state, &id).await.unwrap();
        assert_eq!(team.order, order);
        assert_eq!(team.current_quest_index, 0);
        assert!(!team.is_completed);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let (state, _store) = state_with_store().await;
        let err = create_team(&state, "   ").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn reaching_the_end_of_the_order_marks_completion() {
        let (state, store) = state_with_store().await;
        seed_quests(&store, 2).await;
        let (id, _order) = create_team(&state, "alpha").await.unwrap();

        let team = update_progress(&state, &id, 1).await.unwrap();
        assert!(!team.is_completed);
        assert!(team.completed_at.is_none());

        let team = update_progress(&state, &id, 2).await.unwrap();
        assert!(team.is_completed);
        assert!(team.completed_at.is_some());
    }

    #[tokio::test]
    async fn empty_order_never_completes() {
        let (state, _store) = state_with_store().await;
        let (id, order) = create_team(&state, "alpha").await.unwrap();
        assert!(order.is_empty());

        let team = update_progress(&state, &id, 0).await.unwrap();
        assert!(!team.is_completed);
    }

    #[tokio::test]
    async fn out_of_range_cursor_is_rejected() {
        let (state, store) = state_with_store().await;
        seed_quests(&store, 2).await;
        let (id, _order) = create_team(&state, "alpha").await.unwrap();

        let err = update_progress(&state, &id, 5).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn watch_team_reports_deletion() {
        let (state, _store) = state_with_store().await;
        let (id, _order) = create_team(&state, "alpha").await.unwrap();

        let mut stream = watch_team(&state, &id).await.unwrap();
        let first = stream.next().await.unwrap();
        assert_eq!(first.event.as_deref(), Some("team"));

        delete_team(&state, &id).await.unwrap();
        let second = stream.next().await.unwrap();
        assert_eq!(second.event.as_deref(), Some("team_deleted"));
        assert_eq!(second.data, "null");
    }

    #[tokio::test]
    async fn delete_team_drops_its_sessions() {
        let (state, _store) = state_with_store().await;
        let (id, _order) = create_team(&state, "alpha").await.unwrap();
        let token = state.sessions().open_for_team(&id);
        assert!(state.sessions().get(&token).is_some());

        delete_team(&state, &id).await.unwrap();
        assert!(state.sessions().get(&token).is_none());
        assert!(matches!(
            get_team(&state, &id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }
}
