//! Order domain: the purchase record and its status lifecycle.
//!
//! Orders never touch stock themselves; the fulfilment sequencer in
//! `farmlink-infra` pairs every status move with the matching ledger calls.

pub mod order;

pub use order::{Order, OrderItem, OrderStatus};
