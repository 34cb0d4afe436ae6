//! `backoffice-auth` — roles, permissions and pure session queries.
//!
//! This crate is intentionally decoupled from HTTP and from the session service:
//! it only reasons about session values that someone else has already fetched.

pub mod permissions;
pub mod roles;
pub mod session;
pub mod session_mapper;

pub use permissions::{Permission, PermissionSet};
pub use roles::{ADMIN_ROLE, Role, RoleSet};
pub use session::{PermissionGrant, SessionContext};
