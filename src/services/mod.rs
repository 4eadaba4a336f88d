/// OpenAPI documentation generation.
pub mod documentation;
/// Shared game clock operations.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Admin-to-team notifications.
pub mod notification_service;
/// Unique quest order assignment orchestration.
pub mod order_service;
/// Quest CRUD and order reassignment triggers.
pub mod quest_service;
/// Client session lifecycle.
pub mod session_service;
/// Document subscription to SSE response bridging.
pub mod sse_service;
/// Storage reconnection supervisor.
pub mod storage_supervisor;
/// Team lifecycle and progress tracking.
pub mod team_service;

use crate::{dao::storage::StorageError, error::ServiceError};

/// Map a missing-document storage failure to a not-found service error,
/// leaving every other failure as unavailable.
fn map_missing(err: StorageError, what: String) -> ServiceError {
    match err {
        StorageError::MissingDocument { .. } => ServiceError::NotFound(what),
        other => other.into(),
    }
}
