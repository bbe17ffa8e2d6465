use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use farmlink_catalog::Product;
use farmlink_core::{AlertId, DomainError, NotificationId, ProductId, Quantity, UserId};

/// Why a stock alert exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowStock,
    OutOfStock,
    ExpiringSoon,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowStock => "low_stock",
            Self::OutOfStock => "out_of_stock",
            Self::ExpiringSoon => "expiring_soon",
        }
    }
}

impl core::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AlertKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low_stock" => Ok(Self::LowStock),
            "out_of_stock" => Ok(Self::OutOfStock),
            "expiring_soon" => Ok(Self::ExpiringSoon),
            other => Err(DomainError::validation(format!(
                "unknown alert kind: {other}"
            ))),
        }
    }
}

/// Threshold policy, evaluated after every stock change against the
/// post-change current level.
///
/// Reserve/release leave current stock untouched, so for those kinds this
/// sees the pre-change value and reservations alone never cross a threshold.
/// A threshold of zero disables low-stock warnings entirely.
pub fn evaluate_thresholds(current: Quantity, threshold: Quantity) -> Option<AlertKind> {
    if current.is_zero() {
        Some(AlertKind::OutOfStock)
    } else if current <= threshold {
        Some(AlertKind::LowStock)
    } else {
        None
    }
}

/// A raised (and possibly later resolved) stock warning for one listing.
///
/// The store keeps at most one unresolved alert per (product, kind); repeat
/// triggers while one is open are silently absorbed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAlert {
    pub id: AlertId,
    pub product_id: ProductId,
    pub farmer_id: UserId,
    pub kind: AlertKind,
    pub current_stock: Quantity,
    pub threshold_stock: Quantity,
    pub message: String,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl StockAlert {
    /// Build the alert for a threshold verdict against the listing's current
    /// position.
    pub fn for_kind(kind: AlertKind, product: &Product, now: DateTime<Utc>) -> Self {
        match kind {
            AlertKind::LowStock => Self::low_stock(product, now),
            AlertKind::OutOfStock => Self::out_of_stock(product, now),
            AlertKind::ExpiringSoon => Self::expiring_soon(product, now),
        }
    }

    pub fn low_stock(product: &Product, now: DateTime<Utc>) -> Self {
        Self::raise(
            AlertKind::LowStock,
            product,
            format!(
                "{} is running low (only {} left)",
                product.name, product.current_stock
            ),
            now,
        )
    }

    pub fn out_of_stock(product: &Product, now: DateTime<Utc>) -> Self {
        Self::raise(
            AlertKind::OutOfStock,
            product,
            format!("{} is out of stock", product.name),
            now,
        )
    }

    pub fn expiring_soon(product: &Product, now: DateTime<Utc>) -> Self {
        let message = match product.expires_at {
            Some(at) => format!("{} expires on {}", product.name, at.format("%Y-%m-%d")),
            None => format!("{} is expiring soon", product.name),
        };
        Self::raise(AlertKind::ExpiringSoon, product, message, now)
    }

    fn raise(kind: AlertKind, product: &Product, message: String, now: DateTime<Utc>) -> Self {
        Self {
            id: AlertId::new(),
            product_id: product.id,
            farmer_id: product.farmer_id,
            kind,
            current_stock: product.current_stock,
            threshold_stock: product.low_stock_threshold,
            message,
            resolved: false,
            resolved_at: None,
            created_at: now,
        }
    }
}

/// A user-facing notification record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub payload: serde_json::Value,
    pub action_url: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Farmer-facing notification mirroring a stock alert, linking back to
    /// the product-management page for the listing.
    pub fn for_alert(alert: &StockAlert, now: DateTime<Utc>) -> Self {
        let title = match alert.kind {
            AlertKind::LowStock => "Low stock warning",
            AlertKind::OutOfStock => "Out of stock",
            AlertKind::ExpiringSoon => "Stock expiring soon",
        };

        Self {
            id: NotificationId::new(),
            user_id: alert.farmer_id,
            title: title.to_string(),
            body: alert.message.clone(),
            payload: json!({
                "product_id": alert.product_id,
                "alert_id": alert.id,
                "alert_kind": alert.kind,
                "current_stock": alert.current_stock,
                "threshold_stock": alert.threshold_stock,
            }),
            action_url: format!("/farmer/products/{}", alert.product_id),
            read: false,
            created_at: now,
        }
    }
}
