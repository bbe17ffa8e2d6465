//! Stock ledger domain: every stock mutation flows through here.
//!
//! This crate contains the business rules for stock movement, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage). The
//! persistence-aware ledger service in `farmlink-infra` drives these rules.

pub mod alert;
pub mod change;
pub mod log;
pub mod stock;

pub use alert::{evaluate_thresholds, AlertKind, Notification, StockAlert};
pub use change::{ChangeReference, StockChangeCommand, StockChangeKind};
pub use log::LogEntry;
pub use stock::{apply_change, status_after, StockTransition};
