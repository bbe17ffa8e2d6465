use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use farmlink_auth::{require_role, Role};
use farmlink_catalog::{NewProduct, Product, ProductUpdate};
use farmlink_core::{ProductId, Quantity};
use farmlink_inventory::StockChangeCommand;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product).put(update_product))
        .route("/:id/stock", post(apply_stock_change))
        .route("/:id/history", get(get_history))
}

/// Parse the id, load the listing, and check it belongs to the caller.
/// Admins pass the ownership check.
async fn owned_listing(
    services: &AppServices,
    principal: &PrincipalContext,
    id: &str,
) -> Result<Product, axum::response::Response> {
    let product_id: ProductId = id
        .parse()
        .map_err(|_| errors::fail(StatusCode::BAD_REQUEST, "invalid product id"))?;

    let product = match services.store.product(product_id).await {
        Ok(Some(product)) => product,
        Ok(None) => return Err(errors::fail(StatusCode::NOT_FOUND, "product not found")),
        Err(err) => return Err(errors::ledger_error_to_response(err.into())),
    };

    if !product.is_owned_by(principal.user_id()) && !principal.principal().is(Role::Admin) {
        return Err(errors::fail(
            StatusCode::FORBIDDEN,
            "listing belongs to another farmer",
        ));
    }

    Ok(product)
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    if let Err(err) = require_role(principal.principal(), Role::Farmer) {
        return errors::domain_error_to_response(err);
    }

    let new_product = NewProduct {
        farmer_id: principal.user_id(),
        name: body.name,
        description: body.description,
        unit: body.unit,
        price: body.price,
        initial_stock: body.initial_stock.unwrap_or(Quantity::ZERO),
        low_stock_threshold: body.low_stock_threshold.unwrap_or(Quantity::ZERO),
        harvested_at: body.harvested_at,
        expires_at: body.expires_at,
    };

    let product = match Product::create(new_product, Utc::now()) {
        Ok(product) => product,
        Err(err) => return errors::domain_error_to_response(err),
    };

    if let Err(err) = services.store.insert_product(&product).await {
        return errors::ledger_error_to_response(err.into());
    }

    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "product": dto::product_to_json(&product),
        })),
    )
        .into_response()
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(err) = require_role(principal.principal(), Role::Farmer) {
        return errors::domain_error_to_response(err);
    }

    match services.store.products_by_farmer(principal.user_id()).await {
        Ok(products) => {
            let listed: Vec<serde_json::Value> =
                products.iter().map(dto::product_to_json).collect();
            (
                StatusCode::OK,
                Json(json!({ "success": true, "products": listed })),
            )
                .into_response()
        }
        Err(err) => errors::ledger_error_to_response(err.into()),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::fail(StatusCode::BAD_REQUEST, "invalid product id"),
    };

    match services.store.product(product_id).await {
        Ok(Some(product)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "product": dto::product_to_json(&product),
            })),
        )
            .into_response(),
        Ok(None) => errors::fail(StatusCode::NOT_FOUND, "product not found"),
        Err(err) => errors::ledger_error_to_response(err.into()),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(update): Json<ProductUpdate>,
) -> axum::response::Response {
    if let Err(err) = require_role(principal.principal(), Role::Farmer) {
        return errors::domain_error_to_response(err);
    }

    let mut product = match owned_listing(&services, &principal, &id).await {
        Ok(product) => product,
        Err(response) => return response,
    };

    if let Err(err) = product.revise(update, Utc::now()) {
        return errors::domain_error_to_response(err);
    }
    if let Err(err) = services.store.update_listing(&product).await {
        return errors::ledger_error_to_response(err.into());
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "product": dto::product_to_json(&product),
        })),
    )
        .into_response()
}

pub async fn apply_stock_change(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::StockChangeRequest>,
) -> axum::response::Response {
    if let Err(err) = require_role(principal.principal(), Role::Farmer) {
        return errors::domain_error_to_response(err);
    }

    let product = match owned_listing(&services, &principal, &id).await {
        Ok(product) => product,
        Err(response) => return response,
    };

    let command = StockChangeCommand::manual(
        product.id,
        body.kind.as_change_kind(),
        body.quantity,
        body.note,
        principal.user_id(),
        Utc::now(),
    );

    match services.ledger.apply_change(command).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "old_stock": receipt.old_stock,
                "new_stock": receipt.new_stock,
                "change": receipt.change,
            })),
        )
            .into_response(),
        Err(err) => errors::ledger_error_to_response(err),
    }
}

pub async fn get_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(query): Query<dto::HistoryQuery>,
) -> axum::response::Response {
    if let Err(err) = require_role(principal.principal(), Role::Farmer) {
        return errors::domain_error_to_response(err);
    }

    let product = match owned_listing(&services, &principal, &id).await {
        Ok(product) => product,
        Err(response) => return response,
    };

    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    match services
        .ledger
        .inventory_history(product.id, limit, offset)
        .await
    {
        Ok(entries) => {
            let entries: Vec<serde_json::Value> = entries.iter().map(dto::entry_to_json).collect();
            (
                StatusCode::OK,
                Json(json!({ "success": true, "entries": entries })),
            )
                .into_response()
        }
        Err(err) => errors::ledger_error_to_response(err),
    }
}
