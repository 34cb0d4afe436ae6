//! `backoffice-core` — identifiers and value primitives shared by the backoffice crates.
//!
//! This crate contains **pure** primitives (no I/O, no transport concerns).

pub mod error;
pub mod id;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use id::{BackofficeUserId, ContractId, PartyId, ProductId};
pub use value_object::ValueObject;
