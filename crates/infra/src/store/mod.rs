//! Storage backends for the marketplace.
//!
//! The trait defines the atomic units; `InMemoryMarketStore` backs tests and
//! local development, `PostgresMarketStore` backs deployments.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryMarketStore;
pub use postgres::PostgresMarketStore;
pub use r#trait::{
    AppliedChange, ConfirmApplied, MarketStore, ReserveOutcome, StoreError, StoreResult, UsagePlan,
};

use farmlink_catalog::Product;
use farmlink_inventory::{apply_change, status_after, LogEntry, StockChangeCommand};

/// Move a listing's stock columns for one command and produce the log entry.
///
/// This is the only place product stock columns change. Both backends call it
/// on a row they hold exclusively (row lock in Postgres, write lock in
/// memory), so the pure math runs exactly once per committed change.
pub(crate) fn apply_to_product(product: &mut Product, command: &StockChangeCommand) -> LogEntry {
    let transition = apply_change(product.stock(), command.kind, command.quantity);
    product.current_stock = transition.after.current;
    product.reserved_stock = transition.after.reserved;
    if let Some(status) = status_after(command.kind, &transition) {
        product.status = status;
    }
    product.updated_at = command.occurred_at;
    LogEntry::record(command, &transition)
}
