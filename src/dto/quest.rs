//! DTO definitions for quest management.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dao::{document_store::Fields, models::QuestRecord};

/// Payload describing a new quest.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateQuestRequest {
    /// Short quest title shown to teams.
    pub title: String,
    /// Full challenge text.
    #[serde(default)]
    pub description: String,
    /// Expected answer, kept on the quest document.
    pub answer: Option<String>,
}

impl From<CreateQuestRequest> for QuestRecord {
    fn from(request: CreateQuestRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            answer: request.answer,
        }
    }
}

/// Partial quest edit; omitted fields are left untouched.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuestRequest {
    /// New title, when present.
    pub title: Option<String>,
    /// New challenge text, when present.
    pub description: Option<String>,
    /// New expected answer, when present.
    pub answer: Option<String>,
}

impl UpdateQuestRequest {
    /// Convert the present fields into a merge payload.
    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        if let Some(title) = self.title {
            fields.insert("title".into(), title.into());
        }
        if let Some(description) = self.description {
            fields.insert("description".into(), description.into());
        }
        if let Some(answer) = self.answer {
            fields.insert("answer".into(), answer.into());
        }
        fields
    }
}

/// A quest as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestView {
    /// Quest identifier.
    pub id: String,
    /// Short quest title.
    pub title: String,
    /// Full challenge text.
    pub description: String,
    /// Expected answer, when one is recorded.
    pub answer: Option<String>,
}

impl QuestView {
    /// Build a view from a stored record and its document id.
    pub fn from_record(id: String, record: QuestRecord) -> Self {
        Self {
            id,
            title: record.title,
            description: record.description,
            answer: record.answer,
        }
    }
}
