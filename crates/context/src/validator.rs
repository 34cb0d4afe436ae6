//! Impersonation scope validation.
//!
//! Pure: operates on a customer session that the resolver has already fetched.

use thiserror::Error;

use backoffice_auth::SessionContext;
use backoffice_core::{ContractId, ProductId};

use crate::context::ImpersonationScope;

/// Contract and/or product the caller wants the impersonation limited to.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RequestedScope {
    pub contract_id: Option<ContractId>,
    pub product_id: Option<ProductId>,
}

impl RequestedScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contract(mut self, contract_id: ContractId) -> Self {
        self.contract_id = Some(contract_id);
        self
    }

    pub fn product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    /// No identifiers requested: validation is skipped entirely.
    pub fn is_empty(&self) -> bool {
        self.contract_id.is_none() && self.product_id.is_none()
    }
}

/// The party's session lacks one or more requested identifiers.
///
/// Both identifiers are checked independently, so a violation may name both.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{}", describe(.contract_id, .product_id))]
pub struct ScopeViolation {
    pub contract_id: Option<ContractId>,
    pub product_id: Option<ProductId>,
}

fn describe(contract_id: &Option<ContractId>, product_id: &Option<ProductId>) -> String {
    match (contract_id, product_id) {
        (Some(c), Some(p)) => format!("party has no access to contract {c} nor product {p}"),
        (Some(c), None) => format!("party has no access to contract {c}"),
        (None, Some(p)) => format!("party has no access to product {p}"),
        (None, None) => "party scope violation".to_string(),
    }
}

/// Decides whether impersonating a party is authorized for a contract/product.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImpersonationValidator;

impl ImpersonationValidator {
    pub fn new() -> Self {
        Self
    }

    /// Returns the verified scope, or every requested identifier the session lacks.
    pub fn validate(
        &self,
        session: &SessionContext,
        requested: RequestedScope,
    ) -> Result<ImpersonationScope, ScopeViolation> {
        let missing_contract = requested.contract_id.filter(|c| !session.has_contract(*c));
        let missing_product = requested.product_id.filter(|p| !session.has_product(*p));

        if missing_contract.is_some() || missing_product.is_some() {
            return Err(ScopeViolation {
                contract_id: missing_contract,
                product_id: missing_product,
            });
        }

        Ok(ImpersonationScope::verified(requested))
    }
}
