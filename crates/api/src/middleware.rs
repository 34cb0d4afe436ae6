use std::sync::Arc;

use axum::{extract::State, middleware::Next, response::Response};

use backoffice_context::{BackofficeContext, BackofficeContextResolver, ResolveOptions};

use crate::errors::resolve_error_to_response;

/// Target of the audit event emitted once per resolved context.
pub const AUDIT_TARGET: &str = "backoffice::audit";

#[derive(Clone)]
pub struct ContextState {
    pub resolver: Arc<BackofficeContextResolver>,
}

/// Resolves the context with default options (impersonation optional, no
/// scope) and makes it available as an `Extension<BackofficeContext>`.
pub async fn backoffice_context_middleware(
    State(state): State<ContextState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let resolved = state
        .resolver
        .resolve(req.headers(), &ResolveOptions::new())
        .await;

    match resolved {
        Ok(context) => {
            emit_audit(&context);
            req.extensions_mut().insert(context);
            next.run(req).await
        }
        Err(err) => resolve_error_to_response(&err),
    }
}

/// Logs the audit record of a resolved context. Plain backoffice actions are
/// audited too, with no impersonated party.
pub fn emit_audit(context: &BackofficeContext) {
    match serde_json::to_string(&context.audit_record()) {
        Ok(record) => tracing::info!(
            target: AUDIT_TARGET,
            impersonating = context.is_impersonating(),
            %record,
            "backoffice context resolved"
        ),
        Err(e) => tracing::warn!("failed to serialize audit record: {e}"),
    }
}
