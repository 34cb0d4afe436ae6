use std::collections::HashMap;
use std::sync::RwLock;

use backoffice_auth::SessionContext;

use super::{SessionService, SessionServiceError, SessionSubject};

/// In-memory session directory.
///
/// Intended for tests/dev. Sessions are keyed by subject, so a staff user and a
/// party never share an entry even if their UUIDs collide.
#[derive(Debug, Default)]
pub struct InMemorySessionService {
    sessions: RwLock<HashMap<SessionSubject, SessionContext>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, subject: SessionSubject, session: SessionContext) {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(subject, session);
    }

    pub fn with_session(self, subject: SessionSubject, session: SessionContext) -> Self {
        self.insert(subject, session);
        self
    }

    pub fn remove(&self, subject: &SessionSubject) -> Option<SessionContext> {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(subject)
    }
}

#[async_trait::async_trait]
impl SessionService for InMemorySessionService {
    async fn fetch_session(
        &self,
        subject: SessionSubject,
    ) -> Result<Option<SessionContext>, SessionServiceError> {
        Ok(self
            .sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&subject)
            .cloned())
    }
}
