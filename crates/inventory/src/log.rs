use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use farmlink_core::{EntryId, ProductId, Quantity, UserId};

use crate::change::{ChangeReference, StockChangeCommand, StockChangeKind};
use crate::stock::StockTransition;

/// One immutable line in a product's inventory history.
///
/// `old_stock`/`new_stock` always record the current-stock column, so
/// reservation bookkeeping logs an unchanged pair. Entries are append-only;
/// nothing in the system edits or deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: EntryId,
    pub product_id: ProductId,
    pub kind: StockChangeKind,
    pub quantity: Quantity,
    pub old_stock: Quantity,
    pub new_stock: Quantity,
    pub reference: ChangeReference,
    pub note: Option<String>,
    pub actor_id: UserId,
    pub recorded_at: DateTime<Utc>,
}

impl LogEntry {
    /// Record what a command did to the stock position.
    pub fn record(command: &StockChangeCommand, transition: &StockTransition) -> Self {
        Self {
            id: EntryId::new(),
            product_id: command.product_id,
            kind: command.kind,
            quantity: command.quantity,
            old_stock: transition.old_stock(),
            new_stock: transition.new_stock(),
            reference: command.reference,
            note: command.note.clone(),
            actor_id: command.actor_id,
            recorded_at: command.occurred_at,
        }
    }
}
