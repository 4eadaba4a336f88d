//! Quest CRUD. Every structural change to the quest set triggers a full
//! order reassignment so team orders always span the current quests.

use futures::{StreamExt, stream::BoxStream};
use tracing::{info, warn};

use crate::{
    dao::{
        document_store::collections,
        models::{self, QuestRecord},
    },
    dto::{
        quest::{CreateQuestRequest, QuestView, UpdateQuestRequest},
        sse::ServerEvent,
    },
    error::ServiceError,
    services::{map_missing, order_service::ReassignmentOutcome},
    state::SharedState,
};

/// List every quest currently configured.
pub async fn list_quests(state: &SharedState) -> Result<Vec<QuestView>, ServiceError> {
    let store = state.require_store().await?;
    let documents = store.list(collections::QUESTS).await?;

    let mut quests = Vec::with_capacity(documents.len());
    for document in documents {
        let record: QuestRecord = models::decode(&document)?;
        quests.push(QuestView::from_record(document.id, record));
    }
    Ok(quests)
}

/// Create a quest and reassign every team's order to include it.
pub async fn create_quest(
    state: &SharedState,
    request: CreateQuestRequest,
) -> Result<(String, ReassignmentOutcome), ServiceError> {
    let store = state.require_store().await?;
    let record: QuestRecord = request.into();
    let id = store
        .create(collections::QUESTS, models::encode(&record)?)
        .await?;
    info!(quest = %id, "created quest");

    let outcome = super::order_service::reassign_all_orders(state).await?;
    Ok((id, outcome))
}

/// Merge the provided fields into an existing quest.
///
/// Editing quest content does not change its identity, so orders are left
/// untouched.
pub async fn update_quest(
    state: &SharedState,
    id: &str,
    request: UpdateQuestRequest,
) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    store
        .update(collections::QUESTS, id, request.into_fields())
        .await
        .map_err(|err| map_missing(err, format!("quest {id}")))?;
    info!(quest = %id, "updated quest");
    Ok(())
}

/// Delete a quest and shrink every team's order accordingly. Deleting an
/// absent quest still runs the reassignment.
pub async fn delete_quest(
    state: &SharedState,
    id: &str,
) -> Result<ReassignmentOutcome, ServiceError> {
    let store = state.require_store().await?;
    store.delete(collections::QUESTS, id).await?;
    info!(quest = %id, "deleted quest");

    super::order_service::reassign_all_orders(state).await
}

/// Subscribe to the quest set. Emits a `quests` event with a full snapshot
/// after every change.
pub async fn watch_quests(
    state: &SharedState,
) -> Result<BoxStream<'static, ServerEvent>, ServiceError> {
    let store = state.require_store().await?;
    let stream = store
        .watch_collection(collections::QUESTS)
        .filter_map(|documents| async move {
            let views: Vec<QuestView> = documents
                .into_iter()
                .filter_map(|document| match models::decode::<QuestRecord>(&document) {
                    Ok(record) => Some(QuestView::from_record(document.id, record)),
                    Err(err) => {
                        warn!(id = %document.id, error = %err, "skipping undecodable quest document");
                        None
                    }
                })
                .collect();
            match ServerEvent::json("quests".to_owned(), &views) {
                Ok(event) => Some(event),
                Err(err) => {
                    warn!(error = %err, "failed to serialize quest snapshot");
                    None
                }
            }
        });
    Ok(stream.boxed())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            document_store::memory::MemoryDocumentStore,
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

    fn quest(title: &str) -> CreateQuestRequest {
        CreateQuestRequest {
            title: title.into(),
            description: String::new(),
            answer: None,
        }
    }

    #[tokio::test]
    async fn create_quest_extends_existing_orders() {
        let (state, store) = state_with_store().await;
        use crate::dao::document_store::DocumentStore;
        let team = TeamRecord::new("alpha".into(), Vec::new());
        store
            .create(collections::USERS, encode(&team).unwrap())
            .await
            .unwrap();

        let (first, _) = create_quest(&state, quest("one")).await.unwrap();
        let (second, outcome) = create_quest(&state, quest("two")).await.unwrap();
        assert_eq!(outcome.teams_updated, 1);

        let teams = store.list(collections::USERS).await.unwrap();
        let team: TeamRecord = decode(&teams[0]).unwrap();
        assert_eq!(team.order.len(), 2);
        assert!(team.order.contains(&first));
        assert!(team.order.contains(&second));
    }

    #[tokio::test]
    async fn update_missing_quest_is_not_found() {
        let (state, _store) = state_with_store().await;
        let request = UpdateQuestRequest {
            title: Some("new".into()),
            description: None,
            answer: None,
        };
        let err = update_quest(&state, "nope", request).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_quest_reassigns_remaining() {
        let (state, store) = state_with_store().await;
        use crate::dao::document_store::DocumentStore;
        let team = TeamRecord::new("alpha".into(), Vec::new());
        store
            .create(collections::USERS, encode(&team).unwrap())
            .await
            .unwrap();

        let (first, _) = create_quest(&state, quest("one")).await.unwrap();
        let (second, _) = create_quest(&state, quest("two")).await.unwrap();
        delete_quest(&state, &first).await.unwrap();

        let teams = store.list(collections::USERS).await.unwrap();
        let team: TeamRecord = decode(&teams[0]).unwrap();
        assert_eq!(team.order, vec![second]);
    }
}
