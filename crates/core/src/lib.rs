//! `farmlink-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod quantity;

pub use entity::{Entity, ValueObject};
pub use error::{DomainError, DomainResult};
pub use id::{AlertId, EntryId, NotificationId, OrderId, ProductId, UserId};
pub use quantity::{Money, Quantity};
