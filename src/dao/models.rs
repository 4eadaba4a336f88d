//! Typed views over the schemaless documents this application stores.
//!
//! Field names mirror what is persisted (camelCase); every field that might
//! be missing on older documents is defaulted so a partially written or
//! legacy document still decodes.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use utoipa::ToSchema;

use crate::dao::{
    document_store::{Document, Fields},
    storage::{StorageError, StorageResult},
};

/// Decode a stored document into a typed record.
pub fn decode<T: DeserializeOwned>(document: &Document) -> StorageResult<T> {
    serde_json::from_value(Value::Object(document.fields.clone()))
        .map_err(|err| StorageError::decode(err.to_string()))
}

/// Encode a typed record into a document field payload.
pub fn encode<T: Serialize>(record: &T) -> StorageResult<Fields> {
    match serde_json::to_value(record) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(StorageError::decode("record is not a JSON object")),
        Err(err) => Err(StorageError::decode(err.to_string())),
    }
}

/// Milliseconds since the UNIX epoch, the timestamp unit used in documents.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A team document in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeamRecord {
    /// Display name chosen by the team.
    #[serde(default)]
    pub name: String,
    /// Assigned quest ordering; empty when no quests exist.
    #[serde(default)]
    pub order: Vec<String>,
    /// Cursor into `order`; equals `order.len()` once the team is done.
    #[serde(default)]
    pub current_quest_index: usize,
    /// Whether the team has finished every quest.
    #[serde(default)]
    pub is_completed: bool,
    /// Completion timestamp (ms), set once `is_completed` flips.
    #[serde(default)]
    pub completed_at: Option<u64>,
    /// Last write timestamp (ms).
    #[serde(default)]
    pub last_updated: Option<u64>,
}

impl TeamRecord {
    /// Fresh team with the given name and assigned order.
    pub fn new(name: String, order: Vec<String>) -> Self {
        Self {
            name,
            order,
            current_quest_index: 0,
            is_completed: false,
            completed_at: None,
            last_updated: Some(now_millis()),
        }
    }
}

/// A quest document in the `quests` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestRecord {
    /// Short quest title shown to teams.
    #[serde(default)]
    pub title: String,
    /// Full challenge text.
    #[serde(default)]
    pub description: String,
    /// Expected answer, visible to admins only.
    #[serde(default)]
    pub answer: Option<String>,
}

/// Game clock phases.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Game has not been started yet.
    #[default]
    Waiting,
    /// Game clock is running.
    Active,
    /// Game has been stopped by the admin.
    Stopped,
}

/// The game clock singleton in the `gameState` collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameStateRecord {
    /// Whether the clock is currently running.
    #[serde(default)]
    pub is_started: bool,
    /// When the game was started (ms).
    #[serde(default)]
    pub start_time: Option<u64>,
    /// When the game was stopped (ms).
    #[serde(default)]
    pub end_time: Option<u64>,
    /// Current phase.
    #[serde(default)]
    pub status: GameStatus,
}

/// A team's answer to a notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct NotificationResponse {
    /// Free-text answer submitted by the team.
    pub answer: String,
    /// When the answer arrived (ms).
    pub timestamp: u64,
}

/// A notification document in the `teamNotifications` collection, keyed by
/// team id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    /// Target team (duplicated from the document id for convenience).
    #[serde(default)]
    pub team_id: String,
    /// Message text from the admin.
    #[serde(default)]
    pub message: String,
    /// When the notification was sent (ms).
    #[serde(default)]
    pub timestamp: u64,
    /// False once the notification has been cleared; cleared notifications
    /// are kept, not deleted.
    #[serde(default)]
    pub is_active: bool,
    /// The team's answer, if any. A fresh send always resets this to `None`.
    #[serde(default)]
    pub response: Option<NotificationResponse>,
    /// When the notification was cleared (ms).
    #[serde(default)]
    pub cleared_at: Option<u64>,
}

impl NotificationRecord {
    /// Fresh active notification for a team, with no response yet.
    pub fn new(team_id: String, message: String) -> Self {
        Self {
            team_id,
            message,
            timestamp: now_millis(),
            is_active: true,
            response: None,
            cleared_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dao::document_store::Document;

    #[test]
    fn legacy_team_document_decodes_with_defaults() {
        // Teams created before progress tracking only carry a name.
        let mut fields = Fields::new();
        fields.insert("name".into(), json!("alpha"));
        let document = Document::new("t1", fields);

        let team: TeamRecord = decode(&document).unwrap();
        assert_eq!(team.name, "alpha");
        assert!(team.order.is_empty());
        assert_eq!(team.current_quest_index, 0);
        assert!(!team.is_completed);
    }

    #[test]
    fn team_record_round_trips() {
        let team = TeamRecord::new("alpha".into(), vec!["q1".into(), "q2".into()]);
        let fields = encode(&team).unwrap();
        assert_eq!(fields.get("currentQuestIndex"), Some(&json!(0)));

        let document = Document::new("t1", fields);
        let decoded: TeamRecord = decode(&document).unwrap();
        assert_eq!(decoded, team);
    }

    #[test]
    fn game_state_defaults_to_waiting() {
        let document = Document::new("current", Fields::new());
        let state: GameStateRecord = decode(&document).unwrap();
        assert!(!state.is_started);
        assert_eq!(state.status, GameStatus::Waiting);
    }
}
