//! DTO definitions for team join and progress endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dao::models::TeamRecord;
use crate::dto::format_millis;

/// Payload sent by a client joining the hunt as a new team.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinGameRequest {
    /// Display name for the team.
    pub name: String,
}

/// Response to a successful join: the created team plus its session token.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinGameResponse {
    /// Identifier of the created team document.
    pub team_id: String,
    /// Opaque token identifying this client session.
    pub session_token: String,
    /// Quest ordering assigned to the team.
    pub order: Vec<String>,
}

/// Payload renaming an existing team.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RenameTeamRequest {
    /// New display name.
    pub name: String,
}

/// Payload moving a team's progress cursor.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProgressUpdateRequest {
    /// New cursor into the team's quest order. Reaching the order length
    /// marks the team completed.
    pub current_quest_index: usize,
}

/// A team as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamView {
    /// Team identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Assigned quest ordering.
    pub order: Vec<String>,
    /// Progress cursor into `order`.
    pub current_quest_index: usize,
    /// Whether the team finished every quest.
    pub is_completed: bool,
    /// RFC 3339 completion time, once completed.
    pub completed_at: Option<String>,
    /// RFC 3339 time of the last write to this team.
    pub last_updated: Option<String>,
}

impl TeamView {
    /// Build a view from a stored record and its document id.
    pub fn from_record(id: String, record: TeamRecord) -> Self {
        Self {
            id,
            name: record.name,
            order: record.order,
            current_quest_index: record.current_quest_index,
            is_completed: record.is_completed,
            completed_at: record.completed_at.map(format_millis),
            last_updated: record.last_updated.map(format_millis),
        }
    }
}
