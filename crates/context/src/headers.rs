//! Reading the trusted identity headers injected by the upstream gateway.

use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use backoffice_core::{BackofficeUserId, PartyId};

use crate::resolver::ResolveError;

/// A header is present but its value is not visible ASCII.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
#[error("header value is not visible ASCII")]
pub struct UndecodableHeader;

/// Thin accessor over whatever carries the inbound request headers.
///
/// Implementations must look names up case-insensitively, like HTTP does, and
/// must report a present but undecodable value as `Some(Err(_))` rather than
/// as absent.
pub trait HeaderSource {
    fn header(&self, name: &str) -> Option<Result<&str, UndecodableHeader>>;
}

impl HeaderSource for http::HeaderMap {
    fn header(&self, name: &str) -> Option<Result<&str, UndecodableHeader>> {
        self.get(name)
            .map(|value| value.to_str().map_err(|_| UndecodableHeader))
    }
}

/// Plain string map, mostly for tests and non-HTTP callers.
///
/// An exact-case key wins. Otherwise, among keys equal to `name` ignoring ASCII
/// case, the lexicographically smallest one is used.
impl HeaderSource for HashMap<String, String> {
    fn header(&self, name: &str) -> Option<Result<&str, UndecodableHeader>> {
        self.get(name)
            .or_else(|| {
                self.iter()
                    .filter(|(k, _)| k.eq_ignore_ascii_case(name))
                    .min_by(|(a, _), (b, _)| a.cmp(b))
                    .map(|(_, v)| v)
            })
            .map(|v| Ok(v.as_str()))
    }
}

/// Names of the headers the resolver reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderNames {
    pub backoffice_user: String,
    pub impersonated_party: String,
    pub impersonation_reason: String,
    pub tenant: String,
    pub forwarded_for: String,
    pub real_ip: String,
}

impl Default for HeaderNames {
    fn default() -> Self {
        Self {
            backoffice_user: "X-User-Id".to_string(),
            impersonated_party: "X-Impersonate-Party-Id".to_string(),
            impersonation_reason: "X-Impersonation-Reason".to_string(),
            tenant: "X-Tenant-Id".to_string(),
            forwarded_for: "X-Forwarded-For".to_string(),
            real_ip: "X-Real-IP".to_string(),
        }
    }
}

/// Everything the headers say about the request, before any session lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpersonationRequest {
    pub backoffice_user_id: BackofficeUserId,
    pub impersonated_party_id: Option<PartyId>,
    pub reason: Option<String>,
    pub tenant_id: Option<String>,
    pub ip_address: Option<String>,
}

impl ImpersonationRequest {
    /// Extracts identities and metadata; the identity header is mandatory.
    ///
    /// Undecodable identity headers are rejected like malformed ones.
    /// Undecodable metadata (reason, tenant, IP) is dropped with a warning.
    pub fn from_headers<H: HeaderSource + ?Sized>(
        headers: &H,
        names: &HeaderNames,
    ) -> Result<Self, ResolveError> {
        let backoffice_user_id = present(headers, &names.backoffice_user)
            .map_err(|e| ResolveError::MissingIdentity(format!("{}: {e}", names.backoffice_user)))?
            .ok_or_else(|| ResolveError::MissingIdentity(format!("{} header absent", names.backoffice_user)))?
            .parse::<BackofficeUserId>()
            .map_err(|e| ResolveError::MissingIdentity(e.to_string()))?;

        let impersonated_party_id = present(headers, &names.impersonated_party)
            .map_err(|e| {
                ResolveError::InvalidImpersonationTarget(format!("{}: {e}", names.impersonated_party))
            })?
            .map(|raw| raw.parse::<PartyId>())
            .transpose()
            .map_err(|e| ResolveError::InvalidImpersonationTarget(e.to_string()))?;

        Ok(Self {
            backoffice_user_id,
            impersonated_party_id,
            reason: metadata(headers, &names.impersonation_reason).map(str::to_string),
            tenant_id: metadata(headers, &names.tenant).map(str::to_string),
            ip_address: client_ip(headers, names),
        })
    }
}

/// Header value, with blank values treated as absent.
fn present<'a, H: HeaderSource + ?Sized>(
    headers: &'a H,
    name: &str,
) -> Result<Option<&'a str>, UndecodableHeader> {
    headers
        .header(name)
        .transpose()
        .map(|value| value.filter(|v| !v.trim().is_empty()))
}

fn metadata<'a, H: HeaderSource + ?Sized>(headers: &'a H, name: &str) -> Option<&'a str> {
    present(headers, name).unwrap_or_else(|e| {
        warn!(header = name, "ignoring audit header: {e}");
        None
    })
}

/// First hop of the forwarded chain, else the real-ip header.
fn client_ip<H: HeaderSource + ?Sized>(headers: &H, names: &HeaderNames) -> Option<String> {
    metadata(headers, &names.forwarded_for)
        .and_then(|chain| chain.split(',').map(str::trim).find(|hop| !hop.is_empty()))
        .or_else(|| metadata(headers, &names.real_ip).map(str::trim))
        .map(str::to_string)
}
