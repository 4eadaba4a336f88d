use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the installed document store and report service liveness.
///
/// A failed probe is reported as degraded right away instead of waiting for
/// the supervisor's next poll, so load balancers see the outage as soon as
/// they ask.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let store_reachable = match state.require_store().await {
        Ok(store) => match store.health_check().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "document store probe failed");
                false
            }
        },
        Err(_) => {
            warn!("no document store installed; reporting degraded");
            false
        }
    };

    if store_reachable && !state.is_degraded().await {
        HealthResponse::ok()
    } else {
        HealthResponse::degraded()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::document_store::memory::MemoryDocumentStore, state::AppState,
    };

    #[tokio::test]
    async fn healthy_store_reports_ok() {
        let state = AppState::new(AppConfig::default());
        state
            .set_document_store(Arc::new(MemoryDocumentStore::new()))
            .await;

        let response = health_status(&state).await;
        assert!(!response.degraded);
    }

    #[tokio::test]
    async fn missing_store_reports_degraded() {
        let state = AppState::new(AppConfig::default());

        let response = health_status(&state).await;
        assert!(response.degraded);
    }

    #[tokio::test]
    async fn degraded_flag_wins_over_a_healthy_probe() {
        let state = AppState::new(AppConfig::default());
        state
            .set_document_store(Arc::new(MemoryDocumentStore::new()))
            .await;
        state.update_degraded(true).await;

        let response = health_status(&state).await;
        assert!(response.degraded);
    }
}
