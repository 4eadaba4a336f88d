//! Process-local session registry.
//!
//! Remembers which team a client is, and whether the client claimed the
//! admin flag, across page loads. Sessions are cleared wholesale when the
//! bound team's document disappears or a deep link names a team the session
//! never joined.

use dashmap::DashMap;
use uuid::Uuid;

/// What one client session currently knows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSession {
    /// Team bound to this session, if the client joined as a team.
    pub team_id: Option<String>,
    /// Client-side admin flag. This is not authentication, just the marker
    /// the admin UI sets for itself.
    pub admin: bool,
}

/// Registry of live client sessions keyed by an opaque token.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, ClientSession>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh session bound to a team, returning its token.
    pub fn open_for_team(&self, team_id: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(
            token.clone(),
            ClientSession {
                team_id: Some(team_id.to_owned()),
                admin: false,
            },
        );
        token
    }

    /// Open a fresh session carrying the admin flag, returning its token.
    pub fn open_admin(&self) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(
            token.clone(),
            ClientSession {
                team_id: None,
                admin: true,
            },
        );
        token
    }

    /// Look up a session by token.
    pub fn get(&self, token: &str) -> Option<ClientSession> {
        self.sessions.get(token).map(|entry| entry.clone())
    }

    /// Whether the token belongs to a session carrying the admin flag.
    pub fn is_admin(&self, token: &str) -> bool {
        self.sessions
            .get(token)
            .is_some_and(|session| session.admin)
    }

    /// Drop one session entirely.
    pub fn clear(&self, token: &str) {
        self.sessions.remove(token);
    }

    /// Drop every session bound to a team, e.g. after its document was
    /// observed being deleted.
    pub fn clear_team(&self, team_id: &str) {
        self.sessions
            .retain(|_, session| session.team_id.as_deref() != Some(team_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_session_round_trip() {
        let registry = SessionRegistry::new();
        let token = registry.open_for_team("t1");

        let session = registry.get(&token).unwrap();
        assert_eq!(session.team_id.as_deref(), Some("t1"));
        assert!(!session.admin);
        assert!(!registry.is_admin(&token));
    }

    #[test]
    fn clearing_a_team_drops_all_of_its_sessions() {
        let registry = SessionRegistry::new();
        let first = registry.open_for_team("t1");
        let second = registry.open_for_team("t1");
        let other = registry.open_for_team("t2");

        registry.clear_team("t1");

        assert!(registry.get(&first).is_none());
        assert!(registry.get(&second).is_none());
        assert!(registry.get(&other).is_some());
    }

    #[test]
    fn admin_flag_is_per_session() {
        let registry = SessionRegistry::new();
        let admin = registry.open_admin();
        let team = registry.open_for_team("t1");

        assert!(registry.is_admin(&admin));
        assert!(!registry.is_admin(&team));
    }
}
