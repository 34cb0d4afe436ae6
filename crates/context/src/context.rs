//! The resolved dual security context of one backoffice request.
//!
//! A [`BackofficeContext`] holds two strictly separated identities: the staff
//! member making the call ([`BackofficeIdentity`]) and, optionally, the customer
//! being impersonated ([`ImpersonatedParty`]). Authorization questions are only
//! ever answered from the backoffice side; the customer's roles are informational.
//!
//! Contexts are built once per request (through [`BackofficeContextBuilder`]) and
//! never modified afterwards. They are not cached or shared across requests.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use backoffice_auth::{ADMIN_ROLE, Permission, PermissionSet, Role, RoleSet};
use backoffice_core::{BackofficeUserId, ContractId, PartyId, ProductId, ValueObject};

use crate::validator::RequestedScope;

/// The staff member on whose authority the request runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackofficeIdentity {
    user_id: BackofficeUserId,
    roles: RoleSet,
    permissions: PermissionSet,
    ip_address: Option<String>,
}

impl BackofficeIdentity {
    pub fn user_id(&self) -> BackofficeUserId {
        self.user_id
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }
}

/// The customer being accessed. Its roles never authorize anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpersonatedParty {
    party_id: PartyId,
    roles: RoleSet,
    permissions: PermissionSet,
}

impl ImpersonatedParty {
    pub fn party_id(&self) -> PartyId {
        self.party_id
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeStatus {
    /// No contract or product was requested.
    NotRequested,
    /// A scope was requested but nobody checked it against the party's session.
    Unverified,
    /// The party's session grants every requested identifier.
    Verified,
}

/// Business scope of an impersonation and whether it was validated.
///
/// Only [`crate::ImpersonationValidator`] can produce a verified scope.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct ImpersonationScope {
    contract_id: Option<ContractId>,
    product_id: Option<ProductId>,
    status: ScopeStatus,
}

impl ImpersonationScope {
    pub fn none() -> Self {
        Self {
            contract_id: None,
            product_id: None,
            status: ScopeStatus::NotRequested,
        }
    }

    /// A scope as requested by the caller, not yet checked.
    pub fn unverified(requested: RequestedScope) -> Self {
        if requested.is_empty() {
            return Self::none();
        }
        Self {
            contract_id: requested.contract_id,
            product_id: requested.product_id,
            status: ScopeStatus::Unverified,
        }
    }

    pub(crate) fn verified(requested: RequestedScope) -> Self {
        if requested.is_empty() {
            return Self::none();
        }
        Self {
            contract_id: requested.contract_id,
            product_id: requested.product_id,
            status: ScopeStatus::Verified,
        }
    }

    pub fn contract_id(&self) -> Option<ContractId> {
        self.contract_id
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    pub fn status(&self) -> ScopeStatus {
        self.status
    }

    /// Nothing requested, or everything requested was verified.
    pub fn is_satisfied(&self) -> bool {
        matches!(self.status, ScopeStatus::NotRequested | ScopeStatus::Verified)
    }
}

impl Default for ImpersonationScope {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("backoffice user id is empty")]
    EmptyBackofficeUser,

    #[error("impersonated party id is empty")]
    EmptyImpersonatedParty,
}

/// Immutable dual security context for one backoffice request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackofficeContext {
    backoffice: BackofficeIdentity,
    impersonated: Option<ImpersonatedParty>,
    scope: ImpersonationScope,
    tenant_id: Option<String>,
    impersonation_started_at: DateTime<Utc>,
    impersonation_reason: Option<String>,
}

impl ValueObject for BackofficeContext {}

impl BackofficeContext {
    pub fn builder(backoffice_user_id: BackofficeUserId) -> BackofficeContextBuilder {
        BackofficeContextBuilder::new(backoffice_user_id)
    }

    pub fn backoffice(&self) -> &BackofficeIdentity {
        &self.backoffice
    }

    pub fn backoffice_user_id(&self) -> BackofficeUserId {
        self.backoffice.user_id
    }

    pub fn impersonated(&self) -> Option<&ImpersonatedParty> {
        self.impersonated.as_ref()
    }

    pub fn impersonated_party_id(&self) -> Option<PartyId> {
        self.impersonated.as_ref().map(|p| p.party_id)
    }

    pub fn scope(&self) -> &ImpersonationScope {
        &self.scope
    }

    pub fn contract_id(&self) -> Option<ContractId> {
        self.scope.contract_id
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.scope.product_id
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn impersonation_started_at(&self) -> DateTime<Utc> {
        self.impersonation_started_at
    }

    pub fn impersonation_reason(&self) -> Option<&str> {
        self.impersonation_reason.as_deref()
    }

    pub fn backoffice_user_ip_address(&self) -> Option<&str> {
        self.backoffice.ip_address()
    }

    pub fn is_impersonating(&self) -> bool {
        self.impersonated.is_some()
    }

    pub fn has_backoffice_role(&self, role: &str) -> bool {
        self.backoffice.roles.contains(role)
    }

    pub fn has_any_backoffice_role<R: AsRef<str>>(&self, roles: &[R]) -> bool {
        self.backoffice.roles.contains_any(roles)
    }

    /// An empty list is `false`; see [`RoleSet::contains_all`].
    pub fn has_all_backoffice_roles<R: AsRef<str>>(&self, roles: &[R]) -> bool {
        self.backoffice.roles.contains_all(roles)
    }

    /// Membership test for a normalized `"resource:action"` permission.
    pub fn has_backoffice_permission(&self, permission: &str) -> bool {
        self.backoffice.permissions.contains(permission)
    }

    pub fn has_backoffice_permission_for(&self, resource: &str, action: &str) -> bool {
        self.backoffice.permissions.contains_pair(resource, action)
    }

    pub fn backoffice_is_admin(&self) -> bool {
        self.has_backoffice_role(ADMIN_ROLE)
    }

    /// Informational only: never use this to authorize the backoffice action.
    pub fn impersonated_party_has_role(&self, role: &str) -> bool {
        self.impersonated
            .as_ref()
            .is_some_and(|p| p.roles.contains(role))
    }

    /// Both identities are present and non-empty, and any requested scope
    /// was verified against the party's session.
    pub fn is_valid_impersonation(&self) -> bool {
        let Some(party) = &self.impersonated else {
            return false;
        };
        !self.backoffice.user_id.is_nil() && !party.party_id.is_nil() && self.scope.is_satisfied()
    }

    /// Every field an audit trail needs for this impersonation.
    pub fn audit_record(&self) -> ImpersonationAuditRecord {
        ImpersonationAuditRecord {
            backoffice_user_id: self.backoffice.user_id,
            backoffice_roles: self.backoffice.roles.iter().map(|r| r.as_str().to_string()).collect(),
            impersonated_party_id: self.impersonated_party_id(),
            contract_id: self.scope.contract_id,
            product_id: self.scope.product_id,
            scope_status: self.scope.status,
            tenant_id: self.tenant_id.clone(),
            impersonation_reason: self.impersonation_reason.clone(),
            ip_address: self.backoffice.ip_address.clone(),
            started_at: self.impersonation_started_at,
        }
    }
}

/// Serializable audit snapshot. Writing it somewhere is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpersonationAuditRecord {
    pub backoffice_user_id: BackofficeUserId,
    pub backoffice_roles: Vec<String>,
    pub impersonated_party_id: Option<PartyId>,
    pub contract_id: Option<ContractId>,
    pub product_id: Option<ProductId>,
    pub scope_status: ScopeStatus,
    pub tenant_id: Option<String>,
    pub impersonation_reason: Option<String>,
    pub ip_address: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Builder for [`BackofficeContext`]; `build` validates and freezes every field.
#[derive(Debug, Clone)]
pub struct BackofficeContextBuilder {
    backoffice_user_id: BackofficeUserId,
    backoffice_roles: RoleSet,
    backoffice_permissions: PermissionSet,
    ip_address: Option<String>,
    impersonated_party_id: Option<PartyId>,
    party_roles: RoleSet,
    party_permissions: PermissionSet,
    scope: ImpersonationScope,
    tenant_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    reason: Option<String>,
}

impl BackofficeContextBuilder {
    pub fn new(backoffice_user_id: BackofficeUserId) -> Self {
        Self {
            backoffice_user_id,
            backoffice_roles: RoleSet::new(),
            backoffice_permissions: PermissionSet::new(),
            ip_address: None,
            impersonated_party_id: None,
            party_roles: RoleSet::new(),
            party_permissions: PermissionSet::new(),
            scope: ImpersonationScope::none(),
            tenant_id: None,
            started_at: None,
            reason: None,
        }
    }

    pub fn backoffice_roles(mut self, roles: RoleSet) -> Self {
        self.backoffice_roles = roles;
        self
    }

    pub fn backoffice_role(mut self, role: impl Into<std::borrow::Cow<'static, str>>) -> Self {
        self.backoffice_roles.insert(Role::new(role));
        self
    }

    pub fn backoffice_permissions(mut self, permissions: PermissionSet) -> Self {
        self.backoffice_permissions = permissions;
        self
    }

    pub fn backoffice_permission(mut self, resource: &str, action: &str) -> Self {
        self.backoffice_permissions.insert(Permission::of(resource, action));
        self
    }

    pub fn ip_address(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }

    pub fn impersonated_party(mut self, party_id: PartyId) -> Self {
        self.impersonated_party_id = Some(party_id);
        self
    }

    pub fn impersonated_party_roles(mut self, roles: RoleSet) -> Self {
        self.party_roles = roles;
        self
    }

    pub fn impersonated_party_permissions(mut self, permissions: PermissionSet) -> Self {
        self.party_permissions = permissions;
        self
    }

    pub fn scope(mut self, scope: ImpersonationScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn tenant_id(mut self, tenant_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn impersonation_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    /// Defaults to the build time when not set.
    pub fn impersonation_started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }

    pub fn build(self) -> Result<BackofficeContext, ContextError> {
        if self.backoffice_user_id.is_nil() {
            return Err(ContextError::EmptyBackofficeUser);
        }

        let impersonated = match self.impersonated_party_id {
            Some(party_id) if party_id.is_nil() => return Err(ContextError::EmptyImpersonatedParty),
            Some(party_id) => Some(ImpersonatedParty {
                party_id,
                roles: self.party_roles,
                permissions: self.party_permissions,
            }),
            None => None,
        };

        Ok(BackofficeContext {
            backoffice: BackofficeIdentity {
                user_id: self.backoffice_user_id,
                roles: self.backoffice_roles,
                permissions: self.backoffice_permissions,
                ip_address: self.ip_address,
            },
            impersonated,
            scope: self.scope,
            tenant_id: self.tenant_id,
            impersonation_started_at: self.started_at.unwrap_or_else(Utc::now),
            impersonation_reason: self.reason,
        })
    }
}
