use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use backoffice_core::{ContractId, ProductId};

use crate::Role;

/// A permission descriptor as delivered by the session service.
///
/// Both parts are trimmed when built through [`PermissionGrant::new`] or
/// deserialized, so grants can be looked up by exact value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionGrant {
    #[serde(deserialize_with = "trimmed")]
    pub resource: String,
    #[serde(deserialize_with = "trimmed")]
    pub action: String,
}

impl PermissionGrant {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into().trim().to_string(),
            action: action.into().trim().to_string(),
        }
    }
}

fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

/// Session record fetched from the external authorization service.
///
/// Read-only input: nothing in this workspace mutates a session after it has been
/// fetched. The same shape describes staff users and customers; which one it is
/// depends on who asked for it. Every collection defaults to empty when the
/// service omits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    /// Identifier of the user or party the session belongs to.
    #[serde(alias = "partyId")]
    pub subject_id: Uuid,

    #[serde(default)]
    pub roles: BTreeSet<Role>,

    #[serde(default)]
    pub permissions: BTreeSet<PermissionGrant>,

    #[serde(default)]
    pub contract_ids: BTreeSet<ContractId>,

    #[serde(default)]
    pub product_ids: BTreeSet<ProductId>,
}

impl SessionContext {
    /// An empty session (no roles, permissions or accessible entities).
    pub fn new(subject_id: impl Into<Uuid>) -> Self {
        Self {
            subject_id: subject_id.into(),
            roles: BTreeSet::new(),
            permissions: BTreeSet::new(),
            contract_ids: BTreeSet::new(),
            product_ids: BTreeSet::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<std::borrow::Cow<'static, str>>) -> Self {
        self.roles.insert(Role::new(role));
        self
    }

    pub fn with_permission(mut self, resource: impl Into<String>, action: impl Into<String>) -> Self {
        self.permissions.insert(PermissionGrant::new(resource, action));
        self
    }

    pub fn with_contract(mut self, contract_id: ContractId) -> Self {
        self.contract_ids.insert(contract_id);
        self
    }

    pub fn with_product(mut self, product_id: ProductId) -> Self {
        self.product_ids.insert(product_id);
        self
    }

    pub fn has_contract(&self, contract_id: ContractId) -> bool {
        self.contract_ids.contains(&contract_id)
    }

    pub fn has_product(&self, product_id: ProductId) -> bool {
        self.product_ids.contains(&product_id)
    }
}
