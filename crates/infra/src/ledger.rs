//! The Stock Ledger service.
//!
//! Every stock mutation flows through one of these operations: the store
//! commits the change and its log entry atomically, then the ledger runs the
//! threshold alert pass on the post-change level. Alerts and notifications
//! are best-effort; their failures are logged and never fail the mutation
//! that triggered them.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use farmlink_catalog::Product;
use farmlink_core::{AlertId, OrderId, ProductId, Quantity, UserId};
use farmlink_inventory::{
    evaluate_thresholds, AlertKind, LogEntry, Notification, StockAlert, StockChangeCommand,
    StockChangeKind,
};

use crate::store::{MarketStore, ReserveOutcome, StoreError, UsagePlan};

/// Operation-boundary failure taxonomy.
///
/// Everything the storage layer reports that is not a missing row collapses
/// into `Transaction`, with the backend's message forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("product not found")]
    ProductNotFound,

    #[error("order not found")]
    OrderNotFound,

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        available: Decimal,
        requested: Quantity,
    },

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Transaction(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => LedgerError::ProductNotFound,
            StoreError::Conflict(msg) | StoreError::Backend(msg) => LedgerError::Transaction(msg),
        }
    }
}

/// What a committed change did to the current-stock column.
///
/// `change` is signed and tracks current stock only, so reservation
/// bookkeeping reports zero even though the reserved column moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockChangeReceipt {
    pub old_stock: Quantity,
    pub new_stock: Quantity,
    pub change: Decimal,
}

impl StockChangeReceipt {
    fn for_entry(entry: &LogEntry) -> Self {
        Self {
            old_stock: entry.old_stock,
            new_stock: entry.new_stock,
            change: entry.new_stock.signed_sub(entry.old_stock),
        }
    }
}

/// Stock mutation service over a [`MarketStore`].
#[derive(Debug, Clone)]
pub struct StockLedger<S> {
    store: S,
}

impl<S> StockLedger<S>
where
    S: MarketStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Apply one stock change and run the alert pass.
    ///
    /// `reserved` commands route through the conditional claim; a shortfall
    /// surfaces as [`LedgerError::InsufficientStock`] with nothing written.
    #[instrument(
        skip(self, command),
        fields(product_id = %command.product_id, kind = %command.kind, quantity = %command.quantity),
        err
    )]
    pub async fn apply_change(
        &self,
        command: StockChangeCommand,
    ) -> Result<StockChangeReceipt, LedgerError> {
        let applied = match command.kind {
            StockChangeKind::Reserved => match self.store.reserve_stock(&command).await? {
                ReserveOutcome::Reserved(applied) => applied,
                ReserveOutcome::Insufficient {
                    available,
                    requested,
                } => {
                    return Err(LedgerError::InsufficientStock {
                        available,
                        requested,
                    });
                }
            },
            _ => self.store.execute_change(&command).await?,
        };

        self.threshold_pass(&applied.product).await;
        Ok(StockChangeReceipt::for_entry(&applied.entry))
    }

    /// Hold stock for an order line.
    pub async fn reserve(
        &self,
        product: ProductId,
        quantity: Quantity,
        order: OrderId,
        actor: UserId,
    ) -> Result<StockChangeReceipt, LedgerError> {
        let command =
            StockChangeCommand::reserve_for_order(product, quantity, order, actor, Utc::now());
        self.apply_change(command).await
    }

    /// Hand a hold back to the open pool.
    pub async fn release(
        &self,
        product: ProductId,
        quantity: Quantity,
        order: OrderId,
        actor: UserId,
    ) -> Result<StockChangeReceipt, LedgerError> {
        let command =
            StockChangeCommand::release_for_order(product, quantity, order, actor, Utc::now());
        self.apply_change(command).await
    }

    /// Fulfil a reserved line: release the hold, deduct the stock, count the
    /// sale. The store commits all of it with both log entries atomically.
    #[instrument(skip(self), fields(product_id = %product, order_id = %order), err)]
    pub async fn confirm_usage(
        &self,
        product: ProductId,
        quantity: Quantity,
        order: OrderId,
        actor: UserId,
    ) -> Result<StockChangeReceipt, LedgerError> {
        let plan = UsagePlan {
            product_id: product,
            quantity,
            order_id: order,
            actor_id: actor,
            occurred_at: Utc::now(),
        };
        let confirmed = self.store.confirm_usage(&plan).await?;

        // One alert pass per constituent entry. The release pass evaluates
        // the pre-deduction level, as if it ran between the two entries; the
        // dedup rule absorbs the overlap when both land on the same kind.
        let mut held = confirmed.product.clone();
        held.current_stock = confirmed.release_entry.new_stock;
        self.threshold_pass(&held).await;
        self.threshold_pass(&confirmed.product).await;

        Ok(StockChangeReceipt {
            old_stock: confirmed.release_entry.old_stock,
            new_stock: confirmed.deduct_entry.new_stock,
            change: confirmed
                .deduct_entry
                .new_stock
                .signed_sub(confirmed.release_entry.old_stock),
        })
    }

    /// A product's inventory history, newest first. A listing with no
    /// entries (or no listing at all) reads as an empty page.
    pub async fn inventory_history(
        &self,
        product: ProductId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LogEntry>, LedgerError> {
        Ok(self.store.log_entries(product, limit, offset).await?)
    }

    pub async fn stock_alerts(
        &self,
        farmer: UserId,
        include_resolved: bool,
    ) -> Result<Vec<StockAlert>, LedgerError> {
        Ok(self.store.alerts_for_farmer(farmer, include_resolved).await?)
    }

    /// Resolve an alert if it exists and belongs to the farmer. Zero matched
    /// rows is still success; the caller cannot tell "resolved" apart from
    /// "not found or not owned".
    #[instrument(skip(self), fields(alert_id = %alert, farmer_id = %farmer), err)]
    pub async fn resolve_alert(&self, alert: AlertId, farmer: UserId) -> Result<(), LedgerError> {
        let matched = self.store.resolve_alert(alert, farmer, Utc::now()).await?;
        if matched == 0 {
            tracing::debug!(alert_id = %alert, "resolve matched no alert");
        }
        Ok(())
    }

    /// Raise `expiring_soon` alerts for the farmer's listings whose expiry
    /// date falls within `within` of now. Returns how many new alerts were
    /// raised; listings already carrying an open alert are skipped by the
    /// dedup rule.
    #[instrument(skip(self), fields(farmer_id = %farmer), err)]
    pub async fn flag_expiring(
        &self,
        farmer: UserId,
        within: Duration,
    ) -> Result<u64, LedgerError> {
        let now = Utc::now();
        let expiring = self.store.expiring_products(farmer, now + within).await?;

        let mut flagged = 0;
        for product in &expiring {
            let alert = StockAlert::expiring_soon(product, now);
            if self.store.insert_alert(&alert).await? {
                flagged += 1;
                self.notify(&alert).await;
            }
        }
        Ok(flagged)
    }

    /// Threshold check on the post-change level, then the best-effort writes.
    async fn threshold_pass(&self, product: &Product) {
        let Some(kind) = evaluate_thresholds(product.current_stock, product.low_stock_threshold)
        else {
            return;
        };
        self.raise_alert(product, kind).await;
    }

    async fn raise_alert(&self, product: &Product, kind: AlertKind) {
        let alert = StockAlert::for_kind(kind, product, Utc::now());
        match self.store.insert_alert(&alert).await {
            Ok(true) => self.notify(&alert).await,
            Ok(false) => {}
            Err(error) => {
                tracing::warn!(
                    product_id = %product.id,
                    kind = %kind,
                    %error,
                    "alert write failed"
                );
            }
        }
    }

    async fn notify(&self, alert: &StockAlert) {
        let notification = Notification::for_alert(alert, Utc::now());
        if let Err(error) = self.store.insert_notification(&notification).await {
            tracing::warn!(
                product_id = %alert.product_id,
                kind = %alert.kind,
                %error,
                "notification write failed"
            );
        }
    }
}
