//! DTO definitions used by the admin REST API.

use serde::Serialize;
use utoipa::ToSchema;

/// Generic action acknowledgement used by admin endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Human readable confirmation.
    pub message: String,
}

impl ActionResponse {
    /// Wrap a confirmation message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outcome of a full order reassignment.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReassignOrdersResponse {
    /// Number of team documents rewritten.
    pub teams_updated: usize,
    /// True when the retry budget ran out and duplicate orders may exist.
    pub budget_exhausted: bool,
}

/// Response to quest creation, including the triggered reassignment.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateQuestResponse {
    /// Identifier of the created quest.
    pub id: String,
    /// Number of team documents rewritten with fresh orders.
    pub teams_updated: usize,
    /// True when the retry budget ran out and duplicate orders may exist.
    pub budget_exhausted: bool,
}
