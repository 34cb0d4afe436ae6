//! Resolution of a [`BackofficeContext`] from request headers.
//!
//! One resolution is a linear pipeline that stops at the first failure:
//!
//! 1. read the backoffice identity (mandatory) and the impersonation target
//! 2. capture reason, tenant and client IP verbatim
//! 3. fetch the backoffice user's session
//! 4. when a party is impersonated under a requested contract/product, fetch the
//!    party's session (concurrently with 3) and validate the scope against it
//! 5. assemble the immutable context
//!
//! Only steps 3 and 4 suspend. Dropping the returned future cancels any
//! in-flight lookup; nothing partially built ever escapes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{Span, debug, instrument, warn};

use backoffice_auth::{SessionContext, session_mapper};
use backoffice_core::{BackofficeUserId, ContractId, PartyId, ProductId};

use crate::config::ResolverConfig;
use crate::context::{BackofficeContext, ContextError, ImpersonationScope};
use crate::headers::{HeaderSource, ImpersonationRequest};
use crate::session_service::{SessionService, SessionServiceError, SessionSubject};
use crate::validator::{ImpersonationValidator, RequestedScope, ScopeViolation};

/// Why a session could not be obtained.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionFailure {
    #[error("no session found")]
    NotFound,

    #[error("session lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Service(#[from] SessionServiceError),
}

/// Typed resolution failure. The transport layer picks status codes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("missing backoffice identity: {0}")]
    MissingIdentity(String),

    #[error("invalid impersonation target: {0}")]
    InvalidImpersonationTarget(String),

    #[error("impersonation target required but not supplied")]
    MissingImpersonationTarget,

    #[error("session unavailable for backoffice user {user_id}: {cause}")]
    BackofficeSessionUnavailable {
        user_id: BackofficeUserId,
        cause: SessionFailure,
    },

    #[error("no session found for party {party_id}")]
    CustomerSessionNotFound { party_id: PartyId },

    #[error("session unavailable for party {party_id}: {cause}")]
    CustomerSessionUnavailable {
        party_id: PartyId,
        cause: SessionFailure,
    },

    #[error("impersonation of party {party_id} not authorized: {violation}")]
    ImpersonationNotAuthorized {
        party_id: PartyId,
        violation: ScopeViolation,
    },
}

impl ResolveError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::MissingIdentity(_) => "missing_identity",
            ResolveError::InvalidImpersonationTarget(_) => "invalid_impersonation_target",
            ResolveError::MissingImpersonationTarget => "missing_impersonation_target",
            ResolveError::BackofficeSessionUnavailable { .. } => "backoffice_session_unavailable",
            ResolveError::CustomerSessionNotFound { .. } => "customer_session_not_found",
            ResolveError::CustomerSessionUnavailable { .. } => "customer_session_unavailable",
            ResolveError::ImpersonationNotAuthorized { .. } => "impersonation_not_authorized",
        }
    }
}

impl From<ContextError> for ResolveError {
    fn from(value: ContextError) -> Self {
        match value {
            ContextError::EmptyBackofficeUser => ResolveError::MissingIdentity(value.to_string()),
            ContextError::EmptyImpersonatedParty => {
                ResolveError::InvalidImpersonationTarget(value.to_string())
            }
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ImpersonationRequirement {
    /// Requests without a target resolve as plain backoffice actions.
    #[default]
    Optional,
    Required,
}

/// What the calling code path needs from the resolution.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    pub impersonation: ImpersonationRequirement,
    pub scope: RequestedScope,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_impersonation(mut self) -> Self {
        self.impersonation = ImpersonationRequirement::Required;
        self
    }

    pub fn contract(mut self, contract_id: ContractId) -> Self {
        self.scope = self.scope.contract(contract_id);
        self
    }

    pub fn product(mut self, product_id: ProductId) -> Self {
        self.scope = self.scope.product(product_id);
        self
    }
}

/// Builds [`BackofficeContext`]s. Stateless across requests; share freely.
pub struct BackofficeContextResolver {
    sessions: Arc<dyn SessionService>,
    validator: ImpersonationValidator,
    config: ResolverConfig,
}

impl core::fmt::Debug for BackofficeContextResolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackofficeContextResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BackofficeContextResolver {
    pub fn new(sessions: Arc<dyn SessionService>, config: ResolverConfig) -> Self {
        Self {
            sessions,
            validator: ImpersonationValidator::new(),
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Header stage only: identities and audit metadata, no lookups.
    pub fn extract<H: HeaderSource + ?Sized>(&self, headers: &H) -> Result<ImpersonationRequest, ResolveError> {
        ImpersonationRequest::from_headers(headers, &self.config.headers)
    }

    pub async fn resolve<H: HeaderSource + Sync + ?Sized>(
        &self,
        headers: &H,
        options: &ResolveOptions,
    ) -> Result<BackofficeContext, ResolveError> {
        let request = self.extract(headers)?;
        self.resolve_request(request, options, Utc::now()).await
    }

    /// Lookup, validation and assembly for already-extracted headers.
    ///
    /// `now` becomes the context's `impersonation_started_at`.
    #[instrument(
        skip_all,
        fields(
            backoffice_user_id = %request.backoffice_user_id,
            impersonated_party_id = tracing::field::Empty
        ),
        err
    )]
    pub async fn resolve_request(
        &self,
        request: ImpersonationRequest,
        options: &ResolveOptions,
        now: DateTime<Utc>,
    ) -> Result<BackofficeContext, ResolveError> {
        let user_id = request.backoffice_user_id;
        let party_id = request.impersonated_party_id;

        if let Some(party_id) = party_id {
            Span::current().record("impersonated_party_id", tracing::field::display(party_id));
        } else if options.impersonation == ImpersonationRequirement::Required {
            return Err(ResolveError::MissingImpersonationTarget);
        }

        let scoped_party = party_id.filter(|_| !options.scope.is_empty());

        let backoffice_lookup = self.fetch(SessionSubject::BackofficeUser(user_id));
        let (backoffice_session, party_session) = match scoped_party {
            Some(party_id) => {
                let (backoffice, party) =
                    tokio::join!(backoffice_lookup, self.fetch(SessionSubject::Party(party_id)));
                (backoffice, Some((party_id, party)))
            }
            None => (backoffice_lookup.await, None),
        };

        let backoffice_session = backoffice_session.map_err(|cause| {
            warn!(%cause, "backoffice session unavailable");
            ResolveError::BackofficeSessionUnavailable { user_id, cause }
        })?;

        let mut builder = BackofficeContext::builder(user_id)
            .backoffice_roles(session_mapper::extract_roles(Some(&backoffice_session)))
            .backoffice_permissions(session_mapper::extract_permissions(Some(&backoffice_session)))
            .ip_address(request.ip_address)
            .tenant_id(request.tenant_id)
            .impersonation_reason(request.reason)
            .impersonation_started_at(now);

        builder = match (party_id, party_session) {
            (_, Some((party_id, party_session))) => {
                let party_session = self.party_session(party_id, party_session)?;
                let scope = self
                    .validator
                    .validate(&party_session, options.scope)
                    .map_err(|violation| {
                        warn!(%violation, "impersonation scope denied");
                        ResolveError::ImpersonationNotAuthorized { party_id, violation }
                    })?;
                builder
                    .impersonated_party(party_id)
                    .impersonated_party_roles(session_mapper::extract_roles(Some(&party_session)))
                    .impersonated_party_permissions(session_mapper::extract_permissions(Some(
                        &party_session,
                    )))
                    .scope(scope)
            }
            (Some(party_id), None) => builder.impersonated_party(party_id),
            (None, None) => builder.scope(ImpersonationScope::unverified(options.scope)),
        };

        let context = builder.build()?;
        debug!(
            impersonating = context.is_impersonating(),
            valid_impersonation = context.is_valid_impersonation(),
            "backoffice context resolved"
        );
        Ok(context)
    }

    fn party_session(
        &self,
        party_id: PartyId,
        lookup: Result<SessionContext, SessionFailure>,
    ) -> Result<SessionContext, ResolveError> {
        match lookup {
            Ok(session) => Ok(session),
            Err(SessionFailure::NotFound) => {
                warn!("impersonated party has no session");
                Err(ResolveError::CustomerSessionNotFound { party_id })
            }
            Err(cause) => {
                warn!(%cause, "impersonated party session unavailable");
                Err(ResolveError::CustomerSessionUnavailable { party_id, cause })
            }
        }
    }

    async fn fetch(&self, subject: SessionSubject) -> Result<SessionContext, SessionFailure> {
        let timeout = self.config.session_timeout;
        match tokio::time::timeout(timeout, self.sessions.fetch_session(subject)).await {
            Err(_elapsed) => Err(SessionFailure::Timeout(timeout)),
            Ok(Err(e)) => Err(SessionFailure::Service(e)),
            Ok(Ok(None)) => Err(SessionFailure::NotFound),
            Ok(Ok(Some(session))) => Ok(session),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::context::ScopeStatus;
    use crate::session_service::InMemorySessionService;

    fn request(user: BackofficeUserId, party: Option<PartyId>) -> ImpersonationRequest {
        ImpersonationRequest {
            backoffice_user_id: user,
            impersonated_party_id: party,
            reason: Some("ticket 42".to_string()),
            tenant_id: Some("tenant-a".to_string()),
            ip_address: Some("10.0.0.7".to_string()),
        }
    }

    fn resolver_with(sessions: impl SessionService + 'static) -> BackofficeContextResolver {
        BackofficeContextResolver::new(Arc::new(sessions), ResolverConfig::default())
    }

    fn staff_session(user: BackofficeUserId) -> SessionContext {
        SessionContext::new(user)
            .with_role("support")
            .with_permission("customers", "read")
    }

    /// Counts lookups per subject kind, delegating to an in-memory directory.
    #[derive(Default)]
    struct CountingSessions {
        inner: InMemorySessionService,
        party_lookups: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl SessionService for CountingSessions {
        async fn fetch_session(
            &self,
            subject: SessionSubject,
        ) -> Result<Option<SessionContext>, SessionServiceError> {
            if matches!(subject, SessionSubject::Party(_)) {
                self.party_lookups.fetch_add(1, Ordering::SeqCst);
            }
            self.inner.fetch_session(subject).await
        }
    }

    /// Never answers for parties.
    struct HangingPartySessions(InMemorySessionService);

    #[async_trait::async_trait]
    impl SessionService for HangingPartySessions {
        async fn fetch_session(
            &self,
            subject: SessionSubject,
        ) -> Result<Option<SessionContext>, SessionServiceError> {
            if matches!(subject, SessionSubject::Party(_)) {
                std::future::pending::<()>().await;
            }
            self.0.fetch_session(subject).await
        }
    }

    struct BrokenSessions;

    #[async_trait::async_trait]
    impl SessionService for BrokenSessions {
        async fn fetch_session(
            &self,
            _subject: SessionSubject,
        ) -> Result<Option<SessionContext>, SessionServiceError> {
            Err(SessionServiceError::UnexpectedStatus(503))
        }
    }

    /// Completes only once two lookups are in flight at the same time.
    struct RendezvousSessions {
        barrier: tokio::sync::Barrier,
        inner: InMemorySessionService,
    }

    #[async_trait::async_trait]
    impl SessionService for RendezvousSessions {
        async fn fetch_session(
            &self,
            subject: SessionSubject,
        ) -> Result<Option<SessionContext>, SessionServiceError> {
            self.barrier.wait().await;
            self.inner.fetch_session(subject).await
        }
    }

    #[tokio::test]
    async fn resolves_plain_backoffice_action() {
        let user = BackofficeUserId::new();
        let now = Utc::now();
        let resolver = resolver_with(
            InMemorySessionService::new()
                .with_session(SessionSubject::BackofficeUser(user), staff_session(user)),
        );

        let ctx = resolver
            .resolve_request(request(user, None), &ResolveOptions::new(), now)
            .await
            .unwrap();

        assert_eq!(ctx.backoffice_user_id(), user);
        assert_eq!(ctx.impersonated_party_id(), None);
        assert!(!ctx.is_valid_impersonation());
        assert!(ctx.has_backoffice_role("support"));
        assert!(ctx.has_backoffice_permission("customers:read"));
        assert_eq!(ctx.impersonation_started_at(), now);
        assert_eq!(ctx.tenant_id(), Some("tenant-a"));
        assert_eq!(ctx.impersonation_reason(), Some("ticket 42"));
        assert_eq!(ctx.backoffice_user_ip_address(), Some("10.0.0.7"));
    }

    #[tokio::test]
    async fn required_impersonation_without_target_fails_before_lookup() {
        let resolver = resolver_with(BrokenSessions);
        let err = resolver
            .resolve_request(
                request(BackofficeUserId::new(), None),
                &ResolveOptions::new().require_impersonation(),
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::MissingImpersonationTarget);
    }

    #[tokio::test]
    async fn missing_backoffice_session() {
        let user = BackofficeUserId::new();
        let err = resolver_with(InMemorySessionService::new())
            .resolve_request(request(user, None), &ResolveOptions::new(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::BackofficeSessionUnavailable {
                user_id: user,
                cause: SessionFailure::NotFound
            }
        );
    }

    #[tokio::test]
    async fn broken_service_is_reported_not_retried() {
        let user = BackofficeUserId::new();
        let err = resolver_with(BrokenSessions)
            .resolve_request(request(user, None), &ResolveOptions::new(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::BackofficeSessionUnavailable {
                user_id: user,
                cause: SessionFailure::Service(SessionServiceError::UnexpectedStatus(503)),
            }
        );
        assert_eq!(err.code(), "backoffice_session_unavailable");
    }

    #[tokio::test]
    async fn party_session_is_not_fetched_without_scope() {
        let user = BackofficeUserId::new();
        let party = PartyId::new();
        let sessions = Arc::new(CountingSessions::default());
        sessions
            .inner
            .insert(SessionSubject::BackofficeUser(user), staff_session(user));
        let resolver = BackofficeContextResolver::new(sessions.clone(), ResolverConfig::default());

        let ctx = resolver
            .resolve_request(request(user, Some(party)), &ResolveOptions::new(), Utc::now())
            .await
            .unwrap();

        assert_eq!(sessions.party_lookups.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.impersonated_party_id(), Some(party));
        assert_eq!(ctx.scope().status(), ScopeStatus::NotRequested);
        assert!(ctx.is_valid_impersonation());
        assert!(ctx.impersonated().unwrap().roles().is_empty());
    }

    #[tokio::test]
    async fn scope_without_party_is_recorded_unverified() {
        let user = BackofficeUserId::new();
        let contract = ContractId::new();
        let resolver = resolver_with(
            InMemorySessionService::new()
                .with_session(SessionSubject::BackofficeUser(user), staff_session(user)),
        );

        let ctx = resolver
            .resolve_request(request(user, None), &ResolveOptions::new().contract(contract), Utc::now())
            .await
            .unwrap();

        assert_eq!(ctx.contract_id(), Some(contract));
        assert_eq!(ctx.scope().status(), ScopeStatus::Unverified);
        assert!(!ctx.is_valid_impersonation());
    }

    #[tokio::test]
    async fn party_session_timeout_is_unavailable() {
        let user = BackofficeUserId::new();
        let party = PartyId::new();
        let config = ResolverConfig {
            session_timeout: Duration::from_millis(20),
            ..ResolverConfig::default()
        };
        let resolver = BackofficeContextResolver::new(
            Arc::new(HangingPartySessions(
                InMemorySessionService::new()
                    .with_session(SessionSubject::BackofficeUser(user), staff_session(user)),
            )),
            config,
        );

        let err = resolver
            .resolve_request(
                request(user, Some(party)),
                &ResolveOptions::new().contract(ContractId::new()),
                Utc::now(),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ResolveError::CustomerSessionUnavailable {
                party_id: party,
                cause: SessionFailure::Timeout(Duration::from_millis(20)),
            }
        );
    }

    #[tokio::test]
    async fn backoffice_failure_wins_over_party_failure() {
        let user = BackofficeUserId::new();
        let err = resolver_with(InMemorySessionService::new())
            .resolve_request(
                request(user, Some(PartyId::new())),
                &ResolveOptions::new().contract(ContractId::new()),
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::BackofficeSessionUnavailable { .. }));
    }

    #[tokio::test]
    async fn both_lookups_run_concurrently() {
        let user = BackofficeUserId::new();
        let party = PartyId::new();
        let contract = ContractId::new();
        let config = ResolverConfig {
            session_timeout: Duration::from_secs(5),
            ..ResolverConfig::default()
        };
        let sessions = RendezvousSessions {
            barrier: tokio::sync::Barrier::new(2),
            inner: InMemorySessionService::new()
                .with_session(SessionSubject::BackofficeUser(user), staff_session(user))
                .with_session(
                    SessionSubject::Party(party),
                    SessionContext::new(party).with_contract(contract),
                ),
        };
        let resolver = BackofficeContextResolver::new(Arc::new(sessions), config);

        let ctx = resolver
            .resolve_request(
                request(user, Some(party)),
                &ResolveOptions::new().contract(contract),
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(ctx.is_valid_impersonation());
    }

    #[test]
    fn context_errors_map_to_header_failures() {
        assert!(matches!(
            ResolveError::from(ContextError::EmptyBackofficeUser),
            ResolveError::MissingIdentity(_)
        ));
        assert!(matches!(
            ResolveError::from(ContextError::EmptyImpersonatedParty),
            ResolveError::InvalidImpersonationTarget(_)
        ));
    }
}
