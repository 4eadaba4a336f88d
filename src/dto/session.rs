//! DTO definitions for client session bookkeeping.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::state::session::ClientSession;

/// Response to an admin-flag claim.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminSessionResponse {
    /// Opaque token identifying the admin session.
    pub session_token: String,
}

/// Query parameters accepted by the session resolution endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct SessionQuery {
    /// Team id from a deep link, validated against the session binding.
    pub team: Option<String>,
}

/// What the backend knows about the calling session.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionView {
    /// Team bound to this session, if any.
    pub team_id: Option<String>,
    /// Whether the session carries the admin flag.
    pub admin: bool,
}

impl From<ClientSession> for SessionView {
    fn from(session: ClientSession) -> Self {
        Self {
            team_id: session.team_id,
            admin: session.admin,
        }
    }
}
