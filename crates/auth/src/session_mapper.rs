//! Pure queries over a fetched session (or its absence).
//!
//! Nothing here performs I/O or returns an error. An absent session, a blank role,
//! or an empty role list all answer `false` / the empty set: authorization
//! queries against incomplete data deny.

use crate::{ADMIN_ROLE, Permission, PermissionGrant, PermissionSet, RoleSet, SessionContext};

pub const CUSTOMERS_RESOURCE: &str = "customers";
pub const READ_ACTION: &str = "read";
pub const WRITE_ACTION: &str = "write";

/// Roles carried by the session, or the empty set when there is no session.
pub fn extract_roles(session: Option<&SessionContext>) -> RoleSet {
    match session {
        Some(session) => session.roles.iter().cloned().collect(),
        None => RoleSet::new(),
    }
}

/// Normalized `"resource:action"` permissions carried by the session.
///
/// Descriptors with a blank resource or action are dropped.
pub fn extract_permissions(session: Option<&SessionContext>) -> PermissionSet {
    let Some(session) = session else {
        return PermissionSet::new();
    };

    session
        .permissions
        .iter()
        .filter(|grant| !grant.resource.trim().is_empty() && !grant.action.trim().is_empty())
        .map(|grant| Permission::of(grant.resource.trim(), grant.action.trim()))
        .collect()
}

/// Exact, case-sensitive role lookup against the session itself.
pub fn has_role(session: Option<&SessionContext>, role: &str) -> bool {
    session.is_some_and(|s| holds_role(s, role))
}

/// Exact lookup of the grant; the query is not trimmed.
pub fn has_permission(session: Option<&SessionContext>, resource: &str, action: &str) -> bool {
    if resource.trim().is_empty() || action.trim().is_empty() {
        return false;
    }
    session.is_some_and(|s| {
        s.permissions.contains(&PermissionGrant {
            resource: resource.to_string(),
            action: action.to_string(),
        })
    })
}

pub fn has_any_role<R: AsRef<str>>(session: Option<&SessionContext>, roles: &[R]) -> bool {
    !roles.is_empty() && session.is_some_and(|s| roles.iter().any(|r| holds_role(s, r.as_ref())))
}

/// See [`RoleSet::contains_all`]: an empty requirement is denied.
pub fn has_all_roles<R: AsRef<str>>(session: Option<&SessionContext>, roles: &[R]) -> bool {
    !roles.is_empty() && session.is_some_and(|s| roles.iter().all(|r| holds_role(s, r.as_ref())))
}

fn holds_role(session: &SessionContext, role: &str) -> bool {
    !role.is_empty() && session.roles.contains(role)
}

pub fn is_admin(session: Option<&SessionContext>) -> bool {
    has_role(session, ADMIN_ROLE)
}

pub fn can_read_customers(session: Option<&SessionContext>) -> bool {
    has_permission(session, CUSTOMERS_RESOURCE, READ_ACTION)
}

pub fn can_write_customers(session: Option<&SessionContext>) -> bool {
    has_permission(session, CUSTOMERS_RESOURCE, WRITE_ACTION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn empty_session() -> SessionContext {
        SessionContext::new(Uuid::now_v7())
    }

    fn support_session() -> SessionContext {
        empty_session()
            .with_role("support")
            .with_role("admin")
            .with_permission("customers", "read")
            .with_permission("contracts", "read")
    }

    #[test]
    fn absent_session_yields_empty_roles() {
        assert!(extract_roles(None).is_empty());
    }

    #[test]
    fn absent_session_yields_empty_permissions() {
        assert!(extract_permissions(None).is_empty());
    }

    #[test]
    fn empty_session_yields_empty_sets() {
        let session = empty_session();
        assert!(extract_roles(Some(&session)).is_empty());
        assert!(extract_permissions(Some(&session)).is_empty());
    }

    #[test]
    fn role_check_fails_closed() {
        let session = empty_session();
        assert!(!has_role(None, "admin"));
        assert!(!has_role(Some(&session), ""));
        assert!(!has_role(Some(&support_session()), ""));
    }

    #[test]
    fn permission_check_fails_closed() {
        let session = support_session();
        assert!(!has_permission(None, "customers", "read"));
        assert!(!has_permission(Some(&session), "", "read"));
        assert!(!has_permission(Some(&session), "customers", ""));
    }

    #[test]
    fn any_role_fails_closed() {
        let session = support_session();
        let none: [&str; 0] = [];
        assert!(!has_any_role(None, &["admin", "support"]));
        assert!(!has_any_role(Some(&session), &none));
    }

    #[test]
    fn all_roles_fails_closed() {
        let session = support_session();
        let none: [&str; 0] = [];
        assert!(!has_all_roles(None, &["admin", "support"]));
        assert!(!has_all_roles(Some(&session), &none));
    }

    #[test]
    fn role_queries_on_populated_session() {
        let session = support_session();
        assert!(has_role(Some(&session), "support"));
        assert!(!has_role(Some(&session), "auditor"));
        assert!(has_any_role(Some(&session), &["auditor", "support"]));
        assert!(has_all_roles(Some(&session), &["admin", "support"]));
        assert!(!has_all_roles(Some(&session), &["admin", "auditor"]));
    }

    #[test]
    fn extracts_normalized_permissions() {
        let session = support_session().with_permission(" ", "read");
        let perms = extract_permissions(Some(&session));
        assert_eq!(perms.len(), 2);
        assert!(perms.contains("customers:read"));
        assert!(perms.contains("contracts:read"));
    }

    #[test]
    fn convenience_predicates() {
        let session = empty_session();
        assert!(!is_admin(None));
        assert!(!is_admin(Some(&session)));
        assert!(!can_read_customers(None));
        assert!(!can_read_customers(Some(&session)));
        assert!(!can_write_customers(None));
        assert!(!can_write_customers(Some(&session)));

        let session = support_session();
        assert!(is_admin(Some(&session)));
        assert!(can_read_customers(Some(&session)));
        assert!(!can_write_customers(Some(&session)));
    }

    #[test]
    fn permission_query_is_exact() {
        let session = support_session().with_permission(" customers ", " write");
        assert!(has_permission(Some(&session), "customers", "write"));
        assert!(!has_permission(Some(&session), " customers", "write"));
        assert!(!has_permission(Some(&session), "Customers", "read"));
        assert!(!has_permission(Some(&session), " ", "read"));
    }

    #[test]
    fn direct_queries_agree_with_extracted_sets() {
        let session = support_session().with_role("auditor").with_permission("contracts", "write");
        let roles = extract_roles(Some(&session));
        let perms = extract_permissions(Some(&session));

        for role in ["admin", "support", "auditor", "Admin", "guest", ""] {
            assert_eq!(has_role(Some(&session), role), roles.contains(role), "{role:?}");
        }
        for (resource, action) in [("customers", "read"), ("contracts", "write"), ("customers", "write")] {
            assert_eq!(
                has_permission(Some(&session), resource, action),
                perms.contains_pair(resource, action),
                "{resource}:{action}"
            );
        }
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn grants() -> impl Strategy<Value = Vec<(String, String)>> {
            prop::collection::vec(("[a-z]{0,8}", "[a-z]{0,6}"), 0..12)
        }

        proptest! {
            /// Property: extraction is idempotent and ignores insertion order.
            #[test]
            fn permission_extraction_is_order_independent(mut pairs in grants()) {
                let forward = pairs.iter().fold(empty_session(), |s, (r, a)| s.with_permission(r.clone(), a.clone()));
                pairs.reverse();
                let reversed = pairs.iter().fold(
                    SessionContext::new(forward.subject_id),
                    |s, (r, a)| s.with_permission(r.clone(), a.clone()),
                );

                let first = extract_permissions(Some(&forward));
                prop_assert_eq!(&first, &extract_permissions(Some(&forward)));
                prop_assert_eq!(first, extract_permissions(Some(&reversed)));
            }

            /// Property: every extracted permission is queryable by its parts.
            #[test]
            fn extracted_permissions_answer_pair_queries(pairs in grants()) {
                let session = pairs.iter().fold(empty_session(), |s, (r, a)| s.with_permission(r.clone(), a.clone()));
                for (resource, action) in &pairs {
                    let expected = !resource.is_empty() && !action.is_empty();
                    prop_assert_eq!(has_permission(Some(&session), resource, action), expected);
                }
            }
        }
    }
}
