use serde::Serialize;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE streams.
pub struct ServerEvent {
    /// Optional SSE event name.
    pub event: Option<String>,
    /// Serialized JSON data field.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Event with the given name and a literal `null` data field, used as
    /// the "nothing to show" sentinel on document streams.
    pub fn null(event: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: "null".to_string(),
        }
    }
}
