//! HTTP adapter: resolves the backoffice context for axum requests.
//!
//! Everything security-relevant lives in `backoffice-context`; this crate only
//! reads headers, maps failures to status codes and emits audit events.

pub mod app;
pub mod errors;
pub mod middleware;
