//! Order fulfilment sequencing.
//!
//! Orders never touch stock themselves. This service pairs every order move
//! with the matching ledger calls: checkout reserves each line (and unwinds
//! on failure), cancellation releases the holds, completion confirms usage.
//! Status moves are claimed through the store's guarded flip FIRST, so two
//! racing actors cannot both run the stock steps.

use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use farmlink_core::{OrderId, ProductId, Quantity, UserId};
use farmlink_orders::{Order, OrderItem, OrderStatus};

use crate::ledger::{LedgerError, StockLedger};
use crate::store::MarketStore;

/// One requested line of a checkout: the listing and how much of it.
/// Prices are never client-supplied; they come off the listing at placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// A buyer's checkout request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderDraft {
    pub lines: Vec<OrderLine>,
}

/// Order lifecycle service over a [`MarketStore`].
#[derive(Debug, Clone)]
pub struct FulfillmentSequencer<S> {
    store: S,
    ledger: StockLedger<S>,
}

impl<S> FulfillmentSequencer<S>
where
    S: MarketStore + Clone,
{
    pub fn new(store: S) -> Self {
        Self {
            ledger: StockLedger::new(store.clone()),
            store,
        }
    }

    /// Checkout: price the lines off the live listings, reserve each one,
    /// persist the pending order.
    ///
    /// Any line failure aborts the whole order: the lines already reserved
    /// are released again and no order row is written.
    #[instrument(skip(self, draft), fields(buyer_id = %buyer, lines = draft.lines.len()), err)]
    pub async fn place_order(
        &self,
        buyer: UserId,
        draft: OrderDraft,
    ) -> Result<Order, LedgerError> {
        if draft.lines.is_empty() {
            return Err(LedgerError::Validation(
                "order must contain at least one item".to_string(),
            ));
        }

        let mut farmer: Option<UserId> = None;
        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let product = self
                .store
                .product(line.product_id)
                .await?
                .ok_or(LedgerError::ProductNotFound)?;
            match farmer {
                None => farmer = Some(product.farmer_id),
                Some(seen) if seen == product.farmer_id => {}
                Some(_) => {
                    return Err(LedgerError::Validation(
                        "order lines must all belong to one farmer".to_string(),
                    ));
                }
            }
            items.push(OrderItem {
                product_id: product.id,
                quantity: line.quantity,
                unit_price: product.price,
            });
        }
        let farmer = farmer.ok_or_else(|| {
            LedgerError::Validation("order must contain at least one item".to_string())
        })?;

        // The id is minted before the order exists: each reservation's log
        // entry references it.
        let order = Order::place(OrderId::new(), buyer, farmer, items, Utc::now())
            .map_err(|err| LedgerError::Validation(err.to_string()))?;

        for (taken, item) in order.items.iter().enumerate() {
            if let Err(err) = self
                .ledger
                .reserve(item.product_id, item.quantity, order.id, buyer)
                .await
            {
                self.release_lines(&order.items[..taken], order.id, buyer)
                    .await;
                return Err(err);
            }
        }

        if let Err(err) = self.store.insert_order(&order).await {
            // The reservations are real; hand them all back before failing.
            self.release_lines(&order.items, order.id, buyer).await;
            return Err(err.into());
        }

        Ok(order)
    }

    /// Cancel a pending or processing order and release its holds.
    pub async fn cancel_order(&self, id: OrderId, actor: UserId) -> Result<Order, LedgerError> {
        self.finish(id, OrderStatus::Cancelled, actor).await
    }

    /// Complete a pending or processing order: each line's hold is confirmed
    /// as usage (release + deduct + sale count).
    pub async fn complete_order(&self, id: OrderId, actor: UserId) -> Result<Order, LedgerError> {
        self.finish(id, OrderStatus::Completed, actor).await
    }

    pub async fn order(&self, id: OrderId) -> Result<Option<Order>, LedgerError> {
        Ok(self.store.order(id).await?)
    }

    /// Claim the status move, then run the stock step for every line.
    ///
    /// The claim is the serialization point: of two racing actors exactly one
    /// sees a matched row, and only that one runs the stock steps. A stock
    /// failure after a won claim leaves the order in its new status; it is
    /// logged and surfaced as a transaction failure.
    #[instrument(skip(self), fields(order_id = %id, to = %to, actor_id = %actor), err)]
    async fn finish(
        &self,
        id: OrderId,
        to: OrderStatus,
        actor: UserId,
    ) -> Result<Order, LedgerError> {
        let order = self
            .store
            .order(id)
            .await?
            .ok_or(LedgerError::OrderNotFound)?;
        order
            .ensure_transition(to)
            .map_err(|err| LedgerError::InvalidTransition(err.to_string()))?;

        let claimed = self
            .store
            .transition_order(id, OrderStatus::claimable_from(to), to, Utc::now())
            .await?;
        if claimed == 0 {
            // Lost a race: someone moved the order between the read and the
            // claim. Report against the status they left behind.
            let status = self
                .store
                .order(id)
                .await?
                .map(|current| current.status)
                .unwrap_or(order.status);
            return Err(LedgerError::InvalidTransition(format!(
                "order cannot move from {status} to {to}"
            )));
        }

        for item in &order.items {
            let step = match to {
                OrderStatus::Cancelled => {
                    self.ledger
                        .release(item.product_id, item.quantity, id, actor)
                        .await
                }
                OrderStatus::Completed => {
                    self.ledger
                        .confirm_usage(item.product_id, item.quantity, id, actor)
                        .await
                }
                // No stock step is tied to the remaining statuses.
                OrderStatus::Pending | OrderStatus::Processing => continue,
            };
            if let Err(error) = step {
                tracing::warn!(
                    order_id = %id,
                    product_id = %item.product_id,
                    %error,
                    "stock step failed after status change"
                );
                return Err(LedgerError::Transaction(format!(
                    "order moved to {to} but a stock step failed: {error}"
                )));
            }
        }

        self.store.order(id).await?.ok_or(LedgerError::OrderNotFound)
    }

    /// Compensating releases for a failed checkout. Failures here are logged
    /// and swallowed; the original failure is what the caller sees.
    async fn release_lines(&self, items: &[OrderItem], order: OrderId, actor: UserId) {
        for item in items {
            if let Err(error) = self
                .ledger
                .release(item.product_id, item.quantity, order, actor)
                .await
            {
                tracing::warn!(
                    order_id = %order,
                    product_id = %item.product_id,
                    %error,
                    "compensating release failed"
                );
            }
        }
    }
}
