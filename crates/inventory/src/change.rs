use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use farmlink_core::{DomainError, DomainResult, OrderId, ProductId, Quantity, UserId};

/// The five ways stock can move.
///
/// `In`/`Out`/`Adjustment` move physical stock and recompute the listing
/// status; `Reserved`/`Released` only move the promised portion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockChangeKind {
    In,
    Out,
    Adjustment,
    Reserved,
    Released,
}

impl StockChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
            Self::Adjustment => "adjustment",
            Self::Reserved => "reserved",
            Self::Released => "released",
        }
    }
}

impl core::fmt::Display for StockChangeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for StockChangeKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            "adjustment" => Ok(Self::Adjustment),
            "reserved" => Ok(Self::Reserved),
            "released" => Ok(Self::Released),
            other => Err(DomainError::validation(format!(
                "unknown stock change kind: {other}"
            ))),
        }
    }
}

/// What prompted a stock change, carried on the log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ChangeReference {
    /// Reservation bookkeeping and fulfilment for a specific order.
    Order(OrderId),
    /// A farmer-driven change with no backing document.
    Manual,
}

impl ChangeReference {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Order(_) => "order",
            Self::Manual => "manual",
        }
    }

    pub fn ref_id(&self) -> Option<Uuid> {
        match self {
            Self::Order(order_id) => Some(*order_id.as_uuid()),
            Self::Manual => None,
        }
    }

    /// Rebuild a reference from its stored (kind, id) pair.
    pub fn from_parts(kind: &str, id: Option<Uuid>) -> DomainResult<Self> {
        match (kind, id) {
            ("order", Some(id)) => Ok(Self::Order(OrderId::from_uuid(id))),
            ("order", None) => Err(DomainError::validation(
                "order reference is missing its order id",
            )),
            ("manual", _) => Ok(Self::Manual),
            (other, _) => Err(DomainError::validation(format!(
                "unknown change reference kind: {other}"
            ))),
        }
    }
}

/// One requested stock mutation, ready for the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockChangeCommand {
    pub product_id: ProductId,
    pub kind: StockChangeKind,
    pub quantity: Quantity,
    pub reference: ChangeReference,
    pub note: Option<String>,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl StockChangeCommand {
    /// A farmer-driven change (restock, deduction, recount).
    pub fn manual(
        product_id: ProductId,
        kind: StockChangeKind,
        quantity: Quantity,
        note: Option<String>,
        actor_id: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id,
            kind,
            quantity,
            reference: ChangeReference::Manual,
            note,
            actor_id,
            occurred_at,
        }
    }

    /// Hold stock for an order.
    pub fn reserve_for_order(
        product_id: ProductId,
        quantity: Quantity,
        order_id: OrderId,
        actor_id: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id,
            kind: StockChangeKind::Reserved,
            quantity,
            reference: ChangeReference::Order(order_id),
            note: Some(format!("reserved for order {order_id}")),
            actor_id,
            occurred_at,
        }
    }

    /// Return a hold to the open pool (cancellation, failed checkout).
    pub fn release_for_order(
        product_id: ProductId,
        quantity: Quantity,
        order_id: OrderId,
        actor_id: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id,
            kind: StockChangeKind::Released,
            quantity,
            reference: ChangeReference::Order(order_id),
            note: Some(format!("released from order {order_id}")),
            actor_id,
            occurred_at,
        }
    }

    /// Deduct fulfilled stock for an order.
    pub fn deduct_for_order(
        product_id: ProductId,
        quantity: Quantity,
        order_id: OrderId,
        actor_id: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id,
            kind: StockChangeKind::Out,
            quantity,
            reference: ChangeReference::Order(order_id),
            note: Some(format!("fulfilled order {order_id}")),
            actor_id,
            occurred_at,
        }
    }
}
