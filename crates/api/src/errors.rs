use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use backoffice_context::ResolveError;

/// Status for each resolution failure: identity problems are 401/400, denied
/// scope is 403, an unreachable session service is 502.
pub fn status_for(err: &ResolveError) -> StatusCode {
    match err {
        ResolveError::MissingIdentity(_) => StatusCode::UNAUTHORIZED,
        ResolveError::InvalidImpersonationTarget(_) | ResolveError::MissingImpersonationTarget => {
            StatusCode::BAD_REQUEST
        }
        ResolveError::BackofficeSessionUnavailable { .. }
        | ResolveError::CustomerSessionUnavailable { .. } => StatusCode::BAD_GATEWAY,
        ResolveError::CustomerSessionNotFound { .. } => StatusCode::NOT_FOUND,
        ResolveError::ImpersonationNotAuthorized { .. } => StatusCode::FORBIDDEN,
    }
}

pub fn resolve_error_to_response(err: &ResolveError) -> axum::response::Response {
    json_error(status_for(err), err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
