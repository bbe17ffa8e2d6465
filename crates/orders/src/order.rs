use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use farmlink_core::{
    DomainError, DomainResult, Entity, Money, OrderId, ProductId, Quantity, UserId,
};

/// Order status lifecycle.
///
/// Pending and processing orders can still move; completed and cancelled are
/// terminal. The store enforces the same rule in its transition predicate, so
/// two racing actors cannot both win a terminal move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether an order may move from `self` to `to`.
    pub fn can_transition(&self, to: OrderStatus) -> bool {
        matches!(
            (*self, to),
            (
                Self::Pending,
                Self::Processing | Self::Completed | Self::Cancelled
            ) | (Self::Processing, Self::Completed | Self::Cancelled)
        )
    }

    /// The statuses an order may still be in when claiming a move to `to`.
    pub fn claimable_from(to: OrderStatus) -> &'static [OrderStatus] {
        match to {
            Self::Processing => &[Self::Pending],
            Self::Completed | Self::Cancelled => &[Self::Pending, Self::Processing],
            Self::Pending => &[],
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::validation(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

/// Order line: product, quantity, unit price at order time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub unit_price: Money,
}

impl OrderItem {
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A buyer's purchase from one farmer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    pub farmer_id: UserId,
    pub status: OrderStatus,
    pub total: Money,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a pending order from validated lines.
    ///
    /// The id is passed in rather than generated here: the sequencer needs it
    /// before the order exists, as the reference on each line's reservation.
    pub fn place(
        id: OrderId,
        buyer_id: UserId,
        farmer_id: UserId,
        items: Vec<OrderItem>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        for item in &items {
            if !item.quantity.is_positive() {
                return Err(DomainError::validation(
                    "order item quantity must be greater than zero",
                ));
            }
            if !item.unit_price.is_positive() {
                return Err(DomainError::validation(
                    "order item price must be greater than zero",
                ));
            }
        }

        let total = items
            .iter()
            .fold(Money::ZERO, |sum, item| sum + item.line_total());

        Ok(Self {
            id,
            buyer_id,
            farmer_id,
            status: OrderStatus::Pending,
            total,
            items,
            created_at: now,
            updated_at: now,
        })
    }

    /// Guard a status move, returning the invariant violation for illegal ones.
    pub fn ensure_transition(&self, to: OrderStatus) -> DomainResult<()> {
        if self.status.can_transition(to) {
            return Ok(());
        }
        if self.status.is_terminal() {
            return Err(DomainError::invariant(format!(
                "order is already {}",
                self.status
            )));
        }
        Err(DomainError::invariant(format!(
            "order cannot move from {} to {}",
            self.status, to
        )))
    }

    /// Buyer and farmer are the only parties to an order.
    pub fn involves(&self, user: UserId) -> bool {
        self.buyer_id == user || self.farmer_id == user
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &OrderId {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn qty(n: i64) -> Quantity {
        Quantity::new(Decimal::from(n)).unwrap()
    }

    fn money(n: i64) -> Money {
        Money::new(Decimal::from(n)).unwrap()
    }

    fn item(quantity: i64, price: i64) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(),
            quantity: qty(quantity),
            unit_price: money(price),
        }
    }

    fn place(items: Vec<OrderItem>) -> DomainResult<Order> {
        Order::place(
            OrderId::new(),
            UserId::new(),
            UserId::new(),
            items,
            Utc::now(),
        )
    }

    #[test]
    fn place_rejects_empty_orders() {
        let err = place(vec![]).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn place_rejects_zero_quantities() {
        let err = place(vec![item(2, 4), item(0, 4)]).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn place_rejects_zero_prices() {
        let err = place(vec![item(2, 0)]).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn place_totals_the_line_amounts() {
        let order = place(vec![item(2, 4), item(3, 5)]).unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, money(23));
        assert_eq!(order.items.len(), 2);
    }

    #[test]
    fn open_orders_can_move_forward() {
        let order = place(vec![item(1, 2)]).unwrap();

        order.ensure_transition(OrderStatus::Processing).unwrap();
        order.ensure_transition(OrderStatus::Completed).unwrap();
        order.ensure_transition(OrderStatus::Cancelled).unwrap();
    }

    #[test]
    fn processing_orders_cannot_return_to_pending() {
        let mut order = place(vec![item(1, 2)]).unwrap();
        order.status = OrderStatus::Processing;

        let err = order.ensure_transition(OrderStatus::Pending).unwrap_err();
        match err {
            DomainError::InvariantViolation(_) => {}
            other => panic!("expected InvariantViolation, got {other:?}"),
        }
    }

    #[test]
    fn terminal_orders_admit_nothing() {
        for terminal in [OrderStatus::Completed, OrderStatus::Cancelled] {
            let mut order = place(vec![item(1, 2)]).unwrap();
            order.status = terminal;
            assert!(terminal.is_terminal());

            for to in [
                OrderStatus::Pending,
                OrderStatus::Processing,
                OrderStatus::Completed,
                OrderStatus::Cancelled,
            ] {
                let err = order.ensure_transition(to).unwrap_err();
                match err {
                    DomainError::InvariantViolation(_) => {}
                    other => panic!("expected InvariantViolation, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn claimable_from_matches_the_transition_table() {
        for to in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            for from in [
                OrderStatus::Pending,
                OrderStatus::Processing,
                OrderStatus::Completed,
                OrderStatus::Cancelled,
            ] {
                assert_eq!(
                    OrderStatus::claimable_from(to).contains(&from),
                    from.can_transition(to),
                    "claimable_from and can_transition disagree on {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn involves_only_the_two_parties() {
        let order = place(vec![item(1, 2)]).unwrap();

        assert!(order.involves(order.buyer_id));
        assert!(order.involves(order.farmer_id));
        assert!(!order.involves(UserId::new()));
    }
}
