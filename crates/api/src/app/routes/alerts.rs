use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Duration;
use serde_json::json;

use farmlink_auth::{require_role, Role};
use farmlink_core::AlertId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_alerts))
        .route("/sweep", post(sweep_expiring))
        .route("/:id/resolve", post(resolve_alert))
}

pub async fn list_alerts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::AlertsQuery>,
) -> axum::response::Response {
    if let Err(err) = require_role(principal.principal(), Role::Farmer) {
        return errors::domain_error_to_response(err);
    }

    let include_resolved = query.include_resolved.unwrap_or(false);
    match services
        .ledger
        .stock_alerts(principal.user_id(), include_resolved)
        .await
    {
        Ok(alerts) => {
            let alerts: Vec<serde_json::Value> = alerts.iter().map(dto::alert_to_json).collect();
            (
                StatusCode::OK,
                Json(json!({ "success": true, "alerts": alerts })),
            )
                .into_response()
        }
        Err(err) => errors::ledger_error_to_response(err),
    }
}

pub async fn resolve_alert(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(err) = require_role(principal.principal(), Role::Farmer) {
        return errors::domain_error_to_response(err);
    }

    let alert_id: AlertId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::fail(StatusCode::BAD_REQUEST, "invalid alert id"),
    };

    match services
        .ledger
        .resolve_alert(alert_id, principal.user_id())
        .await
    {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(err) => errors::ledger_error_to_response(err),
    }
}

/// Raise `expiring_soon` alerts for the caller's listings whose expiry date
/// falls inside the horizon (default three days).
pub async fn sweep_expiring(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Option<Json<dto::SweepRequest>>,
) -> axum::response::Response {
    if let Err(err) = require_role(principal.principal(), Role::Farmer) {
        return errors::domain_error_to_response(err);
    }

    let horizon_days = body
        .and_then(|Json(request)| request.horizon_days)
        .unwrap_or(3);
    if horizon_days <= 0 {
        return errors::fail(StatusCode::BAD_REQUEST, "horizon_days must be positive");
    }

    match services
        .ledger
        .flag_expiring(principal.user_id(), Duration::days(horizon_days))
        .await
    {
        Ok(flagged) => (
            StatusCode::OK,
            Json(json!({ "success": true, "flagged": flagged })),
        )
            .into_response(),
        Err(err) => errors::ledger_error_to_response(err),
    }
}
