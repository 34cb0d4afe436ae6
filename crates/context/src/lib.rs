//! `backoffice-context` — dual security context for backoffice requests.
//!
//! Combines trusted identity headers, the session service and impersonation
//! scope checks into one immutable [`BackofficeContext`] per request. Header
//! extraction is delegated to a [`HeaderSource`]; status codes and audit
//! persistence are left to the caller.

pub mod config;
pub mod context;
pub mod headers;
pub mod resolver;
pub mod session_service;
pub mod validator;

pub use config::{ConfigError, ResolverConfig};
pub use context::{
    BackofficeContext, BackofficeContextBuilder, BackofficeIdentity, ContextError,
    ImpersonatedParty, ImpersonationAuditRecord, ImpersonationScope, ScopeStatus,
};
pub use headers::{HeaderNames, HeaderSource, ImpersonationRequest, UndecodableHeader};
pub use resolver::{
    BackofficeContextResolver, ImpersonationRequirement, ResolveError, ResolveOptions,
    SessionFailure,
};
pub use session_service::{
    HttpSessionService, InMemorySessionService, SessionService, SessionServiceError,
    SessionSubject,
};
pub use validator::{ImpersonationValidator, RequestedScope, ScopeViolation};
