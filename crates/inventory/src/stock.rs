//! Pure stock arithmetic. No IO; the infra ledger persists the results.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use farmlink_catalog::{ProductStatus, StockSnapshot};
use farmlink_core::Quantity;

use crate::change::StockChangeKind;

/// The before/after stock position of one applied change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTransition {
    pub before: StockSnapshot,
    pub after: StockSnapshot,
}

impl StockTransition {
    /// Current stock before the change. Reservation bookkeeping leaves it
    /// untouched, so old and new are equal for those kinds.
    pub fn old_stock(&self) -> Quantity {
        self.before.current
    }

    /// Current stock after the change.
    pub fn new_stock(&self) -> Quantity {
        self.after.current
    }

    /// Signed movement of current stock (zero for reserve/release).
    pub fn change(&self) -> Decimal {
        self.after.current.signed_sub(self.before.current)
    }
}

/// Apply one change to a stock position.
///
/// Deductions clamp at zero rather than fail: a recount that finds less than
/// the books say is normal on a farm, and the adjustment kind exists for
/// setting the true level outright.
pub fn apply_change(
    stock: StockSnapshot,
    kind: StockChangeKind,
    quantity: Quantity,
) -> StockTransition {
    let after = match kind {
        StockChangeKind::In => StockSnapshot::new(stock.current + quantity, stock.reserved),
        StockChangeKind::Out => {
            StockSnapshot::new(stock.current.saturating_sub(quantity), stock.reserved)
        }
        StockChangeKind::Adjustment => StockSnapshot::new(quantity, stock.reserved),
        StockChangeKind::Reserved => {
            StockSnapshot::new(stock.current, stock.reserved + quantity)
        }
        StockChangeKind::Released => {
            StockSnapshot::new(stock.current, stock.reserved.saturating_sub(quantity))
        }
    };

    StockTransition {
        before: stock,
        after,
    }
}

/// Listing status implied by a change, if the change recomputes it at all.
///
/// Only physical movements (`in`, `out`, `adjustment`) touch the status;
/// reserving every last unit keeps a listing visibly active.
pub fn status_after(kind: StockChangeKind, transition: &StockTransition) -> Option<ProductStatus> {
    match kind {
        StockChangeKind::In | StockChangeKind::Out | StockChangeKind::Adjustment => {
            Some(ProductStatus::for_stock(transition.after.current))
        }
        StockChangeKind::Reserved | StockChangeKind::Released => None,
    }
}
