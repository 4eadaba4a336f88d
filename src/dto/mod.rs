//! Request, response, and SSE payload types.

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod admin;
pub mod game;
pub mod health;
pub mod notification;
pub mod quest;
pub mod session;
pub mod sse;
pub mod team;
pub mod validation;

/// Render a millisecond UNIX timestamp as RFC 3339 for display fields.
fn format_millis(millis: u64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .and_then(|timestamp| timestamp.format(&Rfc3339).ok())
        .unwrap_or_else(|| "invalid-timestamp".into())
}
