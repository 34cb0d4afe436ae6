use std::borrow::{Borrow, Cow};
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Separator between resource and action in a normalized permission.
pub const PERMISSION_SEPARATOR: char = ':';

/// Permission identifier, normalized as `"resource:action"` (e.g. `"customers:read"`).
///
/// Compared case-sensitively. There is no wildcard: a permission is held only if
/// the exact string is present.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Build the normalized `"resource:action"` form.
    pub fn of(resource: &str, action: &str) -> Self {
        Self(Cow::Owned(format!("{resource}{PERMISSION_SEPARATOR}{action}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn resource(&self) -> Option<&str> {
        self.0.split_once(PERMISSION_SEPARATOR).map(|(r, _)| r)
    }

    pub fn action(&self) -> Option<&str> {
        self.0.split_once(PERMISSION_SEPARATOR).map(|(_, a)| a)
    }
}

// Lets sets be queried with a plain `&str`. `Ord`/`Hash` of `Cow<str>` agree with `str`.
impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A set of normalized permissions held by one identity. Never absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, value: Permission) -> bool {
        self.0.insert(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    /// Membership test against an already-normalized permission string.
    pub fn contains(&self, permission: &str) -> bool {
        !permission.is_empty() && self.0.contains(permission)
    }

    /// Membership test for `resource:action`. Blank parts are never held.
    pub fn contains_pair(&self, resource: &str, action: &str) -> bool {
        if resource.is_empty() || action.is_empty() {
            return false;
        }
        self.contains(Permission::of(resource, action).as_str())
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a Permission;
    type IntoIter = std::collections::btree_set::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
