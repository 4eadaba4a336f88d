//! DTO definitions for the notification system.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dao::models::NotificationRecord;
use crate::dto::format_millis;

/// Payload sending a notification to a single team.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendNotificationRequest {
    /// Message text.
    pub message: String,
}

/// Payload broadcasting a notification to every team.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BroadcastNotificationRequest {
    /// Message text.
    pub message: String,
}

/// Acknowledgement of a broadcast.
#[derive(Debug, Serialize, ToSchema)]
pub struct BroadcastResponse {
    /// Number of teams the notification was written for.
    pub teams_notified: usize,
}

/// Payload recording a team's answer to its active notification.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NotificationAnswerRequest {
    /// Free-text answer.
    pub answer: String,
}

/// A team's answer as returned to admins.
#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationAnswerView {
    /// Free-text answer.
    pub answer: String,
    /// RFC 3339 time the answer arrived.
    pub timestamp: String,
}

/// A notification as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationView {
    /// Target team identifier.
    pub team_id: String,
    /// Message text.
    pub message: String,
    /// RFC 3339 time the notification was sent.
    pub timestamp: String,
    /// Whether the notification is still active.
    pub is_active: bool,
    /// The team's answer, if any.
    pub response: Option<NotificationAnswerView>,
}

impl From<NotificationRecord> for NotificationView {
    fn from(record: NotificationRecord) -> Self {
        Self {
            team_id: record.team_id,
            message: record.message,
            timestamp: format_millis(record.timestamp),
            is_active: record.is_active,
            response: record.response.map(|response| NotificationAnswerView {
                answer: response.answer,
                timestamp: format_millis(response.timestamp),
            }),
        }
    }
}
