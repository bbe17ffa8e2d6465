use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use farmlink_catalog::Product;
use farmlink_core::{Money, Quantity};
use farmlink_inventory::{LogEntry, StockAlert, StockChangeKind};
use farmlink_orders::Order;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub unit: String,
    pub price: Money,
    pub initial_stock: Option<Quantity>,
    pub low_stock_threshold: Option<Quantity>,
    pub harvested_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Farmer-initiated change kinds. Reservation bookkeeping is order-driven
/// and not reachable from this endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualChangeKind {
    In,
    Out,
    Adjustment,
}

impl ManualChangeKind {
    pub fn as_change_kind(self) -> StockChangeKind {
        match self {
            Self::In => StockChangeKind::In,
            Self::Out => StockChangeKind::Out,
            Self::Adjustment => StockChangeKind::Adjustment,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StockChangeRequest {
    pub kind: ManualChangeKind,
    pub quantity: Quantity,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub include_resolved: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SweepRequest {
    pub horizon_days: Option<i64>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn product_to_json(product: &Product) -> Value {
    json!({
        "id": product.id,
        "farmer_id": product.farmer_id,
        "name": product.name,
        "description": product.description,
        "unit": product.unit,
        "price": product.price,
        "current_stock": product.current_stock,
        "reserved_stock": product.reserved_stock,
        "available_stock": product.available(),
        "low_stock_threshold": product.low_stock_threshold,
        "status": product.status,
        "total_sales": product.total_sales,
        "harvested_at": product.harvested_at,
        "expires_at": product.expires_at,
        "created_at": product.created_at,
        "updated_at": product.updated_at,
    })
}

pub fn order_to_json(order: &Order) -> Value {
    let items: Vec<Value> = order
        .items
        .iter()
        .map(|item| {
            json!({
                "product_id": item.product_id,
                "quantity": item.quantity,
                "unit_price": item.unit_price,
                "line_total": item.line_total(),
            })
        })
        .collect();

    json!({
        "id": order.id,
        "buyer_id": order.buyer_id,
        "farmer_id": order.farmer_id,
        "status": order.status,
        "total": order.total,
        "items": items,
        "created_at": order.created_at,
        "updated_at": order.updated_at,
    })
}

pub fn entry_to_json(entry: &LogEntry) -> Value {
    json!({
        "id": entry.id,
        "product_id": entry.product_id,
        "kind": entry.kind,
        "quantity": entry.quantity,
        "old_stock": entry.old_stock,
        "new_stock": entry.new_stock,
        "reference": {
            "kind": entry.reference.kind(),
            "id": entry.reference.ref_id(),
        },
        "note": entry.note,
        "actor_id": entry.actor_id,
        "recorded_at": entry.recorded_at,
    })
}

pub fn alert_to_json(alert: &StockAlert) -> Value {
    json!({
        "id": alert.id,
        "product_id": alert.product_id,
        "farmer_id": alert.farmer_id,
        "kind": alert.kind,
        "current_stock": alert.current_stock,
        "threshold_stock": alert.threshold_stock,
        "message": alert.message,
        "resolved": alert.resolved,
        "resolved_at": alert.resolved_at,
        "created_at": alert.created_at,
    })
}
