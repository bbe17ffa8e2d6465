use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use farmlink_auth::{require_role, Role};
use farmlink_core::OrderId;
use farmlink_infra::OrderDraft;
use farmlink_orders::Order;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(place_order))
        .route("/:id", get(get_order))
        .route("/:id/cancel", post(cancel_order))
        .route("/:id/complete", post(complete_order))
}

async fn load_order(
    services: &AppServices,
    id: &str,
) -> Result<Order, axum::response::Response> {
    let order_id: OrderId = id
        .parse()
        .map_err(|_| errors::fail(StatusCode::BAD_REQUEST, "invalid order id"))?;

    match services.sequencer.order(order_id).await {
        Ok(Some(order)) => Ok(order),
        Ok(None) => Err(errors::fail(StatusCode::NOT_FOUND, "order not found")),
        Err(err) => Err(errors::ledger_error_to_response(err)),
    }
}

fn participates(principal: &PrincipalContext, order: &Order) -> bool {
    order.involves(principal.user_id()) || principal.principal().is(Role::Admin)
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(draft): Json<OrderDraft>,
) -> axum::response::Response {
    if let Err(err) = require_role(principal.principal(), Role::Buyer) {
        return errors::domain_error_to_response(err);
    }

    match services
        .sequencer
        .place_order(principal.user_id(), draft)
        .await
    {
        Ok(order) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "order": dto::order_to_json(&order),
            })),
        )
            .into_response(),
        Err(err) => errors::ledger_error_to_response(err),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order = match load_order(&services, &id).await {
        Ok(order) => order,
        Err(response) => return response,
    };

    if !participates(&principal, &order) {
        return errors::fail(StatusCode::FORBIDDEN, "not a participant in this order");
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "order": dto::order_to_json(&order),
        })),
    )
        .into_response()
}

/// Either side of the order can cancel while it is still open.
pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order = match load_order(&services, &id).await {
        Ok(order) => order,
        Err(response) => return response,
    };

    if !participates(&principal, &order) {
        return errors::fail(StatusCode::FORBIDDEN, "not a participant in this order");
    }

    match services
        .sequencer
        .cancel_order(order.id, principal.user_id())
        .await
    {
        Ok(order) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "order": dto::order_to_json(&order),
            })),
        )
            .into_response(),
        Err(err) => errors::ledger_error_to_response(err),
    }
}

/// Completion is the selling farmer's call: it converts the holds into
/// deducted stock and counted sales.
pub async fn complete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(err) = require_role(principal.principal(), Role::Farmer) {
        return errors::domain_error_to_response(err);
    }

    let order = match load_order(&services, &id).await {
        Ok(order) => order,
        Err(response) => return response,
    };

    if order.farmer_id != principal.user_id() && !principal.principal().is(Role::Admin) {
        return errors::fail(StatusCode::FORBIDDEN, "order belongs to another farmer");
    }

    match services
        .sequencer
        .complete_order(order.id, principal.user_id())
        .await
    {
        Ok(order) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "order": dto::order_to_json(&order),
            })),
        )
            .into_response(),
        Err(err) => errors::ledger_error_to_response(err),
    }
}
