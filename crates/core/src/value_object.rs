//! Value object trait: equality by value, not identity.
//!
//! Request contexts, permission sets and scopes are values: they are built once
//! and then only read. Two of them with the same contents are interchangeable.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. Once built they are
/// never modified; to "change" one, build a new one.
///
/// ## Design Constraints
///
/// - **Clone**: values are freely copied into responses and audit records
/// - **PartialEq**: values are compared by their attributes
/// - **Debug**: values show up in logs and test failures
///
/// ## Usage Pattern
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Scope {
///     contract_id: Option<ContractId>,
///     product_id: Option<ProductId>,
/// }
///
/// impl ValueObject for Scope {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
