//! The external authorization/session service, seen from the resolver.
//!
//! The resolver is the only caller. Implementations must be safe to call
//! concurrently and more than once per resolution.

mod http;
mod in_memory;

pub use http::HttpSessionService;
pub use in_memory::InMemorySessionService;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use backoffice_auth::SessionContext;
use backoffice_core::{BackofficeUserId, PartyId};

/// Whose session is being asked for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SessionSubject {
    BackofficeUser(BackofficeUserId),
    Party(PartyId),
}

impl SessionSubject {
    pub fn as_uuid(&self) -> &Uuid {
        match self {
            SessionSubject::BackofficeUser(id) => id.as_uuid(),
            SessionSubject::Party(id) => id.as_uuid(),
        }
    }
}

impl core::fmt::Display for SessionSubject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SessionSubject::BackofficeUser(id) => write!(f, "backoffice user {id}"),
            SessionSubject::Party(id) => write!(f, "party {id}"),
        }
    }
}

/// The service could not answer (as opposed to answering "no session").
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionServiceError {
    #[error("session service transport error: {0}")]
    Transport(String),

    #[error("session service returned status {0}")]
    UnexpectedStatus(u16),

    #[error("failed to decode session: {0}")]
    Decode(String),
}

#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    /// `Ok(None)` when the subject has no session.
    async fn fetch_session(
        &self,
        subject: SessionSubject,
    ) -> Result<Option<SessionContext>, SessionServiceError>;
}
