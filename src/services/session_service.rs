//! Client session lifecycle on top of the in-process registry.
//!
//! Sessions survive page reloads via the token the client keeps; the server
//! side invalidates them when the bound team disappears or a deep link names
//! a different team. One reaper task per process watches the team collection
//! and drops sessions for deleted teams.

use std::{collections::HashSet, time::Duration};

use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::{
    dao::document_store::collections,
    dto::session::SessionView,
    error::ServiceError,
    state::SharedState,
};

const STORE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Open a session carrying the admin flag.
pub fn open_admin_session(state: &SharedState) -> String {
    let token = state.sessions().open_admin();
    info!("admin session opened");
    token
}

/// Open a session bound to a team.
///
/// Invalidation is handled elsewhere: [`run_session_reaper`] drops the
/// session when the team is deleted, [`resolve`] when a deep link disagrees.
pub fn open_team_session(state: &SharedState, team_id: &str) -> String {
    state.sessions().open_for_team(team_id)
}

/// Drop sessions whose team document disappears.
///
/// A single task follows the whole team collection for the life of the
/// process; teams missing from a new snapshot have every bound session
/// cleared so stale clients fall back to the join screen. Resubscribes when
/// the store is unavailable or its stream ends.
pub async fn run_session_reaper(state: SharedState) {
    loop {
        let store = match state.require_store().await {
            Ok(store) => store,
            Err(_) => {
                sleep(STORE_RETRY_DELAY).await;
                continue;
            }
        };

        let mut snapshots = store.watch_collection(collections::USERS);
        let Some(first) = snapshots.next().await else {
            sleep(STORE_RETRY_DELAY).await;
            continue;
        };
        let mut known: HashSet<String> = first.into_iter().map(|doc| doc.id).collect();

        while let Some(snapshot) = snapshots.next().await {
            let current: HashSet<String> = snapshot.into_iter().map(|doc| doc.id).collect();
            for gone in known.difference(&current) {
                info!(team = %gone, "team deleted; dropping its sessions");
                state.sessions().clear_team(gone);
            }
            known = current;
        }

        debug!("team snapshot stream ended; resubscribing");
    }
}

/// Resolve a session token, optionally against a deep-linked team id.
///
/// A deep link naming a team the session never joined, or a team whose
/// document no longer exists, invalidates the session entirely.
pub async fn resolve(
    state: &SharedState,
    token: &str,
    team_hint: Option<&str>,
) -> Result<SessionView, ServiceError> {
    let session = state
        .sessions()
        .get(token)
        .ok_or_else(|| ServiceError::NotFound("unknown session".into()))?;

    if let Some(hint) = team_hint
        && session.team_id.as_deref() != Some(hint)
    {
        info!(team = %hint, "deep link does not match session; clearing it");
        state.sessions().clear(token);
        return Err(ServiceError::NotFound("no session for this team".into()));
    }

    if let Some(team_id) = session.team_id.as_deref() {
        let store = state.require_store().await?;
        if store.get(collections::USERS, team_id).await?.is_none() {
            info!(team = %team_id, "session team no longer exists; clearing it");
            state.sessions().clear(token);
            return Err(ServiceError::NotFound("team no longer exists".into()));
        }
    }

    Ok(session.into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            document_store::{DocumentStore, memory::MemoryDocumentStore},
            models::{TeamRecord, encode},
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

    async fn wait_for_cleared(state: &crate::state::SharedState, token: &str) -> bool {
        for _ in 0..50 {
            if state.sessions().get(token).is_none() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn resolve_round_trips_a_team_session() {
        let (state, store) = state_with_store().await;
        let team_id = seed_team(&store, "alpha").await;
        let token = open_team_session(&state, &team_id);

        let view = resolve(&state, &token, None).await.unwrap();
        assert_eq!(view.team_id.as_deref(), Some(team_id.as_str()));
        assert!(!view.admin);

        let view = resolve(&state, &token, Some(&team_id)).await.unwrap();
        assert_eq!(view.team_id.as_deref(), Some(team_id.as_str()));
    }

    #[tokio::test]
    async fn mismatched_deep_link_clears_the_session() {
        let (state, store) = state_with_store().await;
        let team_id = seed_team(&store, "alpha").await;
        let other = seed_team(&store, "beta").await;
        let token = open_team_session(&state, &team_id);

        let err = resolve(&state, &token, Some(&other)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        // The session is gone for good, not just for that deep link.
        let err = resolve(&state, &token, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn reaper_invalidates_sessions_of_a_deleted_team() {
        let (state, store) = state_with_store().await;
        let team_id = seed_team(&store, "alpha").await;
        let token = open_team_session(&state, &team_id);

        tokio::spawn(run_session_reaper(state.clone()));
        // Let the reaper take its baseline snapshot before deleting.
        tokio::time::sleep(Duration::from_millis(20)).await;

        store.delete(collections::USERS, &team_id).await.unwrap();

        assert!(
            wait_for_cleared(&state, &token).await,
            "session was not cleared after team deletion"
        );
    }

    #[tokio::test]
    async fn one_reaper_covers_every_team() {
        let (state, store) = state_with_store().await;
        let alpha = seed_team(&store, "alpha").await;
        let beta = seed_team(&store, "beta").await;
        let alpha_token = open_team_session(&state, &alpha);
        let beta_token = open_team_session(&state, &beta);

        tokio::spawn(run_session_reaper(state.clone()));
        tokio::time::sleep(Duration::from_millis(20)).await;

        store.delete(collections::USERS, &alpha).await.unwrap();
        assert!(wait_for_cleared(&state, &alpha_token).await);
        // The other team's session is untouched by the first deletion.
        assert!(state.sessions().get(&beta_token).is_some());

        store.delete(collections::USERS, &beta).await.unwrap();
        assert!(wait_for_cleared(&state, &beta_token).await);
    }

    #[tokio::test]
    async fn admin_session_resolves_without_a_team() {
        let (state, _store) = state_with_store().await;
        let token = open_admin_session(&state);

        let view = resolve(&state, &token, None).await.unwrap();
        assert!(view.admin);
        assert!(view.team_id.is_none());
    }
}
