//! Storage boundary for the marketplace.
//!
//! Every method is one atomic unit of work: the Postgres backend opens and
//! commits a transaction inside the call, the in-memory backend holds one
//! lock scope. Callers never compose multi-step transactions across the
//! trait; the composite operations (`reserve_stock`, `confirm_usage`,
//! `transition_order`) exist precisely so the atomicity lives here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use farmlink_catalog::Product;
use farmlink_core::{AlertId, OrderId, ProductId, Quantity, UserId};
use farmlink_inventory::{LogEntry, Notification, StockAlert, StockChangeCommand};
use farmlink_orders::{Order, OrderStatus};

pub type StoreResult<T> = Result<T, StoreError>;

/// Infrastructure-level storage failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The row the operation targets does not exist.
    #[error("record not found")]
    NotFound,

    /// A uniqueness or concurrent-write conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Anything else the backend reports (connection loss, poisoned lock,
    /// serialization failure).
    #[error("storage failure: {0}")]
    Backend(String),
}

/// A committed stock change: the listing as persisted plus its log entry.
#[derive(Debug, Clone)]
pub struct AppliedChange {
    pub product: Product,
    pub entry: LogEntry,
}

/// Result of the conditional reservation claim.
///
/// `Insufficient` means the claim lost: nothing was written, no log entry
/// exists, and `available` is the signed availability the claim saw.
#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    Reserved(AppliedChange),
    Insufficient {
        available: Decimal,
        requested: Quantity,
    },
}

/// The composite fulfilment unit: release the hold, deduct the stock, count
/// the sale. Applied all-or-nothing with both log entries.
#[derive(Debug, Clone)]
pub struct UsagePlan {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub order_id: OrderId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// What `confirm_usage` committed: the final listing row and the two entries
/// (`released` first, then `out`) it appended.
#[derive(Debug, Clone)]
pub struct ConfirmApplied {
    pub product: Product,
    pub release_entry: LogEntry,
    pub deduct_entry: LogEntry,
}

/// Marketplace persistence: listings, the stock ledger, alerts and orders.
#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    async fn products_by_farmer(&self, farmer: UserId) -> StoreResult<Vec<Product>>;

    /// Persist a revised listing (metadata columns only; stock columns move
    /// through the ledger units below).
    async fn update_listing(&self, product: &Product) -> StoreResult<()>;

    /// A farmer's listings whose expiry date falls on or before `cutoff`.
    async fn expiring_products(
        &self,
        farmer: UserId,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<Product>>;

    /// Apply one unconditional stock change (`in`, `out`, `adjustment`,
    /// `released`) and append its log entry, all-or-nothing.
    async fn execute_change(&self, command: &StockChangeCommand) -> StoreResult<AppliedChange>;

    /// Atomic conditional claim for a `reserved` change: the reservation is
    /// taken only if signed availability covers the quantity, checked and
    /// applied in one step so concurrent claims cannot oversell.
    async fn reserve_stock(&self, command: &StockChangeCommand) -> StoreResult<ReserveOutcome>;

    /// Release + deduct + `total_sales` increment as one unit.
    async fn confirm_usage(&self, plan: &UsagePlan) -> StoreResult<ConfirmApplied>;

    /// Insert an alert unless an unresolved alert of the same kind is already
    /// open for the product. Returns whether the row was written.
    async fn insert_alert(&self, alert: &StockAlert) -> StoreResult<bool>;

    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()>;

    async fn alerts_for_farmer(
        &self,
        farmer: UserId,
        include_resolved: bool,
    ) -> StoreResult<Vec<StockAlert>>;

    /// Mark an alert resolved if it exists and belongs to the farmer.
    /// Returns how many rows matched; zero is a valid outcome the caller may
    /// ignore, and re-resolving just refreshes `resolved_at`.
    async fn resolve_alert(
        &self,
        alert: AlertId,
        farmer: UserId,
        resolved_at: DateTime<Utc>,
    ) -> StoreResult<u64>;

    /// A product's inventory history, newest first.
    async fn log_entries(
        &self,
        product: ProductId,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<LogEntry>>;

    async fn insert_order(&self, order: &Order) -> StoreResult<()>;

    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// Guarded status flip: moves the order to `to` only while its current
    /// status is one of `allowed_from`. Returns how many rows matched; zero
    /// means the claim lost (already moved, or no such order).
    async fn transition_order(
        &self,
        id: OrderId,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<u64>;
}

#[async_trait]
impl<S> MarketStore for std::sync::Arc<S>
where
    S: MarketStore + ?Sized,
{
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        (**self).insert_product(product).await
    }

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        (**self).product(id).await
    }

    async fn products_by_farmer(&self, farmer: UserId) -> StoreResult<Vec<Product>> {
        (**self).products_by_farmer(farmer).await
    }

    async fn update_listing(&self, product: &Product) -> StoreResult<()> {
        (**self).update_listing(product).await
    }

    async fn expiring_products(
        &self,
        farmer: UserId,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<Product>> {
        (**self).expiring_products(farmer, cutoff).await
    }

    async fn execute_change(&self, command: &StockChangeCommand) -> StoreResult<AppliedChange> {
        (**self).execute_change(command).await
    }

    async fn reserve_stock(&self, command: &StockChangeCommand) -> StoreResult<ReserveOutcome> {
        (**self).reserve_stock(command).await
    }

    async fn confirm_usage(&self, plan: &UsagePlan) -> StoreResult<ConfirmApplied> {
        (**self).confirm_usage(plan).await
    }

    async fn insert_alert(&self, alert: &StockAlert) -> StoreResult<bool> {
        (**self).insert_alert(alert).await
    }

    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        (**self).insert_notification(notification).await
    }

    async fn alerts_for_farmer(
        &self,
        farmer: UserId,
        include_resolved: bool,
    ) -> StoreResult<Vec<StockAlert>> {
        (**self).alerts_for_farmer(farmer, include_resolved).await
    }

    async fn resolve_alert(
        &self,
        alert: AlertId,
        farmer: UserId,
        resolved_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        (**self).resolve_alert(alert, farmer, resolved_at).await
    }

    async fn log_entries(
        &self,
        product: ProductId,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<LogEntry>> {
        (**self).log_entries(product, limit, offset).await
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        (**self).insert_order(order).await
    }

    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        (**self).order(id).await
    }

    async fn transition_order(
        &self,
        id: OrderId,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        (**self)
            .transition_order(id, allowed_from, to, updated_at)
            .await
    }
}
