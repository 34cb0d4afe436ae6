use std::borrow::{Borrow, Cow};
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Role granted to the administrator profile.
pub const ADMIN_ROLE: &str = "admin";

/// Role identifier used for RBAC.
///
/// Roles are opaque strings at this layer and are compared case-sensitively.
/// Mapping roles to permissions is the session service's business, not ours.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Lets sets be queried with a plain `&str`. `Ord`/`Hash` of `Cow<str>` agree with `str`.
impl Borrow<str> for Role {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A set of roles held by one identity.
///
/// Never absent: "no data" is the empty set. All queries fail closed, so an
/// empty query (blank role, empty role list) answers `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, value: Role) -> bool {
        self.0.insert(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }

    /// Exact, case-sensitive membership. A blank role is never held.
    pub fn contains(&self, role: &str) -> bool {
        !role.is_empty() && self.0.contains(role)
    }

    /// True iff at least one listed role is held. An empty list is `false`.
    pub fn contains_any<R: AsRef<str>>(&self, roles: &[R]) -> bool {
        !roles.is_empty() && roles.iter().any(|r| self.contains(r.as_ref()))
    }

    /// True iff every listed role is held.
    ///
    /// An empty list is `false`, not vacuously `true`: an empty requirement is
    /// treated as a malformed check and denied.
    pub fn contains_all<R: AsRef<str>>(&self, roles: &[R]) -> bool {
        !roles.is_empty() && roles.iter().all(|r| self.contains(r.as_ref()))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RoleSet {
    type Item = &'a Role;
    type IntoIter = std::collections::btree_set::Iter<'a, Role>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
