//! DTO definitions for the shared game clock.

use serde::Serialize;
use utoipa::ToSchema;

use crate::dao::models::{GameStateRecord, GameStatus};

/// The game clock as returned to clients.
///
/// Clock fields stay in milliseconds so clients can run their own timers
/// against them.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameStateView {
    /// Whether the clock is currently running.
    pub is_started: bool,
    /// Current phase.
    pub status: GameStatus,
    /// Start timestamp in milliseconds, once started.
    pub start_time: Option<u64>,
    /// Stop timestamp in milliseconds, once stopped.
    pub end_time: Option<u64>,
}

impl From<GameStateRecord> for GameStateView {
    fn from(record: GameStateRecord) -> Self {
        Self {
            is_started: record.is_started,
            status: record.status,
            start_time: record.start_time,
            end_time: record.end_time,
        }
    }
}

impl GameStateView {
    /// The view shown before the game clock document exists.
    pub fn waiting() -> Self {
        GameStateRecord::default().into()
    }
}
