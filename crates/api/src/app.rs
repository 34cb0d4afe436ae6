use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use backoffice_context::{BackofficeContext, BackofficeContextResolver, ResolveOptions};
use backoffice_core::{ContractId, PartyId, ProductId};

use crate::errors::{json_error, resolve_error_to_response};
use crate::middleware::{ContextState, backoffice_context_middleware, emit_audit};

pub fn build_app(resolver: Arc<BackofficeContextResolver>) -> Router {
    let state = ContextState { resolver };

    let resolved: Router<ContextState> = Router::new()
        .route("/whoami", get(whoami))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            backoffice_context_middleware,
        ));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/parties/:party_id/contracts/:contract_id/context",
            get(scoped_context),
        )
        .merge(resolved)
        .with_state(state)
}

fn context_body(context: &BackofficeContext) -> serde_json::Value {
    json!({
        "backoffice_user_id": context.backoffice_user_id(),
        "roles": context.backoffice().roles(),
        "permissions": context.backoffice().permissions(),
        "impersonated_party_id": context.impersonated_party_id(),
        "contract_id": context.contract_id(),
        "product_id": context.product_id(),
        "tenant_id": context.tenant_id(),
        "valid_impersonation": context.is_valid_impersonation(),
        "impersonation_started_at": context.impersonation_started_at(),
    })
}

async fn whoami(Extension(context): Extension<BackofficeContext>) -> Json<serde_json::Value> {
    Json(context_body(&context))
}

#[derive(Debug, Deserialize)]
struct ScopeQuery {
    product_id: Option<String>,
}

/// Impersonation of the path's party, validated against its contract (and
/// optionally a product).
async fn scoped_context(
    State(state): State<ContextState>,
    Path((party_id, contract_id)): Path<(String, String)>,
    Query(query): Query<ScopeQuery>,
    headers: HeaderMap,
) -> Response {
    let party_id = match party_id.parse::<PartyId>() {
        Ok(id) => id,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "invalid_party_id", e.to_string()),
    };
    let contract_id = match contract_id.parse::<ContractId>() {
        Ok(id) => id,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "invalid_contract_id", e.to_string()),
    };

    let mut options = ResolveOptions::new().require_impersonation().contract(contract_id);
    if let Some(raw) = query.product_id.as_deref() {
        match raw.parse::<ProductId>() {
            Ok(product_id) => options = options.product(product_id),
            Err(e) => return json_error(StatusCode::BAD_REQUEST, "invalid_product_id", e.to_string()),
        }
    }

    let request = match state.resolver.extract(&headers) {
        Ok(request) => request,
        Err(err) => return resolve_error_to_response(&err),
    };
    if let Some(target) = request.impersonated_party_id.filter(|target| *target != party_id) {
        return json_error(
            StatusCode::BAD_REQUEST,
            "party_mismatch",
            format!("impersonation header names party {target}, path names {party_id}"),
        );
    }

    match state.resolver.resolve_request(request, &options, Utc::now()).await {
        Ok(context) => {
            emit_audit(&context);
            Json(context_body(&context)).into_response()
        }
        Err(err) => resolve_error_to_response(&err),
    }
}
