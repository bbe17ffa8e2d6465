//! In-memory store for tests and local development.
//!
//! One `RwLock` guards the whole state, so every trait method is naturally
//! one atomic unit: a write lock scope is the moral equivalent of the
//! Postgres transaction the other backend opens.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use farmlink_catalog::Product;
use farmlink_core::{AlertId, OrderId, ProductId, UserId};
use farmlink_inventory::{LogEntry, Notification, StockAlert, StockChangeCommand};
use farmlink_orders::{Order, OrderStatus};

use super::apply_to_product;
use super::r#trait::{
    AppliedChange, ConfirmApplied, MarketStore, ReserveOutcome, StoreError, StoreResult, UsagePlan,
};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    entries: HashMap<ProductId, Vec<LogEntry>>,
    alerts: Vec<StockAlert>,
    notifications: Vec<Notification>,
    orders: HashMap<OrderId, Order>,
}

/// Volatile `MarketStore` backed by hash maps.
#[derive(Debug, Default)]
pub struct InMemoryMarketStore {
    state: RwLock<State>,
}

impl InMemoryMarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("state lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("state lock poisoned".to_string()))
    }

    /// Notifications recorded for a user, newest first. Not part of the
    /// store trait; integration tests use it to observe the alert fan-out.
    pub fn notifications_for(&self, user: UserId) -> StoreResult<Vec<Notification>> {
        let state = self.read()?;
        Ok(state
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.products.contains_key(&product.id) {
            return Err(StoreError::Conflict(format!(
                "product {} already exists",
                product.id
            )));
        }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let state = self.read()?;
        Ok(state.products.get(&id).cloned())
    }

    async fn products_by_farmer(&self, farmer: UserId) -> StoreResult<Vec<Product>> {
        let state = self.read()?;
        let mut listings: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.farmer_id == farmer)
            .cloned()
            .collect();
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listings)
    }

    async fn update_listing(&self, product: &Product) -> StoreResult<()> {
        let mut state = self.write()?;
        let stored = state
            .products
            .get_mut(&product.id)
            .ok_or(StoreError::NotFound)?;

        // Metadata columns only; stock columns belong to the ledger units.
        stored.name = product.name.clone();
        stored.description = product.description.clone();
        stored.unit = product.unit.clone();
        stored.price = product.price;
        stored.low_stock_threshold = product.low_stock_threshold;
        stored.harvested_at = product.harvested_at;
        stored.expires_at = product.expires_at;
        stored.updated_at = product.updated_at;
        Ok(())
    }

    async fn expiring_products(
        &self,
        farmer: UserId,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<Product>> {
        let state = self.read()?;
        Ok(state
            .products
            .values()
            .filter(|p| p.farmer_id == farmer)
            .filter(|p| p.expires_by(cutoff))
            .cloned()
            .collect())
    }

    async fn execute_change(&self, command: &StockChangeCommand) -> StoreResult<AppliedChange> {
        let mut state = self.write()?;
        let product = state
            .products
            .get_mut(&command.product_id)
            .ok_or(StoreError::NotFound)?;

        let entry = apply_to_product(product, command);
        let applied = AppliedChange {
            product: product.clone(),
            entry: entry.clone(),
        };
        state.entries.entry(command.product_id).or_default().push(entry);
        Ok(applied)
    }

    async fn reserve_stock(&self, command: &StockChangeCommand) -> StoreResult<ReserveOutcome> {
        let mut state = self.write()?;
        let product = state
            .products
            .get_mut(&command.product_id)
            .ok_or(StoreError::NotFound)?;

        // Check and mutate under the same write lock: the claim either sees
        // enough availability and takes it, or touches nothing.
        let available = product.available();
        if available < command.quantity.value() {
            return Ok(ReserveOutcome::Insufficient {
                available,
                requested: command.quantity,
            });
        }

        let entry = apply_to_product(product, command);
        let applied = AppliedChange {
            product: product.clone(),
            entry: entry.clone(),
        };
        state.entries.entry(command.product_id).or_default().push(entry);
        Ok(ReserveOutcome::Reserved(applied))
    }

    async fn confirm_usage(&self, plan: &UsagePlan) -> StoreResult<ConfirmApplied> {
        let mut state = self.write()?;
        let product = state
            .products
            .get_mut(&plan.product_id)
            .ok_or(StoreError::NotFound)?;

        let release = StockChangeCommand::release_for_order(
            plan.product_id,
            plan.quantity,
            plan.order_id,
            plan.actor_id,
            plan.occurred_at,
        );
        let deduct = StockChangeCommand::deduct_for_order(
            plan.product_id,
            plan.quantity,
            plan.order_id,
            plan.actor_id,
            plan.occurred_at,
        );

        let release_entry = apply_to_product(product, &release);
        let deduct_entry = apply_to_product(product, &deduct);
        product.total_sales += 1;

        let confirmed = ConfirmApplied {
            product: product.clone(),
            release_entry: release_entry.clone(),
            deduct_entry: deduct_entry.clone(),
        };
        let entries = state.entries.entry(plan.product_id).or_default();
        entries.push(release_entry);
        entries.push(deduct_entry);
        Ok(confirmed)
    }

    async fn insert_alert(&self, alert: &StockAlert) -> StoreResult<bool> {
        let mut state = self.write()?;
        let already_open = state
            .alerts
            .iter()
            .any(|a| a.product_id == alert.product_id && a.kind == alert.kind && !a.resolved);
        if already_open {
            return Ok(false);
        }
        state.alerts.push(alert.clone());
        Ok(true)
    }

    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        let mut state = self.write()?;
        state.notifications.push(notification.clone());
        Ok(())
    }

    async fn alerts_for_farmer(
        &self,
        farmer: UserId,
        include_resolved: bool,
    ) -> StoreResult<Vec<StockAlert>> {
        let state = self.read()?;
        Ok(state
            .alerts
            .iter()
            .rev()
            .filter(|a| a.farmer_id == farmer)
            .filter(|a| include_resolved || !a.resolved)
            .cloned()
            .collect())
    }

    async fn resolve_alert(
        &self,
        alert: AlertId,
        farmer: UserId,
        resolved_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut state = self.write()?;
        match state
            .alerts
            .iter_mut()
            .find(|a| a.id == alert && a.farmer_id == farmer)
        {
            Some(found) => {
                found.resolved = true;
                found.resolved_at = Some(resolved_at);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn log_entries(
        &self,
        product: ProductId,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<LogEntry>> {
        let state = self.read()?;
        let Some(entries) = state.entries.get(&product) else {
            return Ok(Vec::new());
        };
        Ok(entries
            .iter()
            .rev()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.orders.contains_key(&order.id) {
            return Err(StoreError::Conflict(format!(
                "order {} already exists",
                order.id
            )));
        }
        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let state = self.read()?;
        Ok(state.orders.get(&id).cloned())
    }

    async fn transition_order(
        &self,
        id: OrderId,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut state = self.write()?;
        match state.orders.get_mut(&id) {
            Some(order) if allowed_from.contains(&order.status) => {
                order.status = to;
                order.updated_at = updated_at;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use farmlink_catalog::NewProduct;
    use farmlink_core::{Money, Quantity};
    use farmlink_inventory::StockChangeKind;

    use super::*;

    fn qty(n: i64) -> Quantity {
        Quantity::new(Decimal::from(n)).unwrap()
    }

    fn listing(farmer: UserId, initial: i64, threshold: i64) -> Product {
        Product::create(
            NewProduct {
                farmer_id: farmer,
                name: "Rainbow Chard".to_string(),
                description: None,
                unit: "bunch".to_string(),
                price: Money::new(Decimal::from(3)).unwrap(),
                initial_stock: qty(initial),
                low_stock_threshold: qty(threshold),
                harvested_at: None,
                expires_at: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn reserve_claim_checks_and_mutates_in_one_step() {
        let store = InMemoryMarketStore::new();
        let farmer = UserId::new();
        let product = listing(farmer, 10, 2);
        store.insert_product(&product).await.unwrap();

        let command = StockChangeCommand::reserve_for_order(
            product.id,
            qty(7),
            OrderId::new(),
            farmer,
            Utc::now(),
        );
        let outcome = store.reserve_stock(&command).await.unwrap();
        let applied = match outcome {
            ReserveOutcome::Reserved(applied) => applied,
            other => panic!("expected Reserved, got {other:?}"),
        };
        assert_eq!(applied.product.reserved_stock, qty(7));

        let again = StockChangeCommand::reserve_for_order(
            product.id,
            qty(4),
            OrderId::new(),
            farmer,
            Utc::now(),
        );
        match store.reserve_stock(&again).await.unwrap() {
            ReserveOutcome::Insufficient {
                available,
                requested,
            } => {
                assert_eq!(available, Decimal::from(3));
                assert_eq!(requested, qty(4));
            }
            other => panic!("expected Insufficient, got {other:?}"),
        }

        // The lost claim wrote nothing.
        let entries = store.log_entries(product.id, 10, 0).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn execute_change_on_missing_product_is_not_found() {
        let store = InMemoryMarketStore::new();
        let command = StockChangeCommand::manual(
            ProductId::new(),
            StockChangeKind::In,
            qty(5),
            None,
            UserId::new(),
            Utc::now(),
        );
        let err = store.execute_change(&command).await.unwrap_err();
        match err {
            StoreError::NotFound => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn confirm_usage_appends_both_entries_and_counts_the_sale() {
        let store = InMemoryMarketStore::new();
        let farmer = UserId::new();
        let product = listing(farmer, 10, 2);
        store.insert_product(&product).await.unwrap();

        let order_id = OrderId::new();
        let reserve = StockChangeCommand::reserve_for_order(
            product.id,
            qty(3),
            order_id,
            farmer,
            Utc::now(),
        );
        store.reserve_stock(&reserve).await.unwrap();

        let plan = UsagePlan {
            product_id: product.id,
            quantity: qty(3),
            order_id,
            actor_id: farmer,
            occurred_at: Utc::now(),
        };
        let confirmed = store.confirm_usage(&plan).await.unwrap();

        assert_eq!(confirmed.product.current_stock, qty(7));
        assert_eq!(confirmed.product.reserved_stock, Quantity::ZERO);
        assert_eq!(confirmed.product.total_sales, 1);
        assert_eq!(confirmed.release_entry.kind, StockChangeKind::Released);
        assert_eq!(confirmed.deduct_entry.kind, StockChangeKind::Out);
        // The release leaves current untouched; the deduct moves it.
        assert_eq!(confirmed.release_entry.old_stock, qty(10));
        assert_eq!(confirmed.release_entry.new_stock, qty(10));
        assert_eq!(confirmed.deduct_entry.old_stock, qty(10));
        assert_eq!(confirmed.deduct_entry.new_stock, qty(7));

        let entries = store.log_entries(product.id, 10, 0).await.unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn failed_confirm_usage_leaves_nothing_behind() {
        let store = InMemoryMarketStore::new();
        let missing = ProductId::new();

        let plan = UsagePlan {
            product_id: missing,
            quantity: qty(3),
            order_id: OrderId::new(),
            actor_id: UserId::new(),
            occurred_at: Utc::now(),
        };
        let err = store.confirm_usage(&plan).await.unwrap_err();
        match err {
            StoreError::NotFound => {}
            other => panic!("expected NotFound, got {other:?}"),
        }

        let entries = store.log_entries(missing, 10, 0).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn duplicate_open_alert_is_suppressed() {
        let store = InMemoryMarketStore::new();
        let farmer = UserId::new();
        let product = listing(farmer, 2, 5);
        store.insert_product(&product).await.unwrap();

        let first = StockAlert::low_stock(&product, Utc::now());
        let second = StockAlert::low_stock(&product, Utc::now());
        assert!(store.insert_alert(&first).await.unwrap());
        assert!(!store.insert_alert(&second).await.unwrap());

        // Resolving the open alert lets the next one through.
        assert_eq!(
            store.resolve_alert(first.id, farmer, Utc::now()).await.unwrap(),
            1
        );
        assert!(store.insert_alert(&second).await.unwrap());
    }

    #[tokio::test]
    async fn resolve_alert_ignores_other_farmers() {
        let store = InMemoryMarketStore::new();
        let farmer = UserId::new();
        let product = listing(farmer, 2, 5);
        store.insert_product(&product).await.unwrap();

        let alert = StockAlert::low_stock(&product, Utc::now());
        store.insert_alert(&alert).await.unwrap();

        let stranger = UserId::new();
        assert_eq!(
            store
                .resolve_alert(alert.id, stranger, Utc::now())
                .await
                .unwrap(),
            0
        );
        let open = store.alerts_for_farmer(farmer, false).await.unwrap();
        assert_eq!(open.len(), 1);
    }

    #[tokio::test]
    async fn transition_order_claims_only_from_allowed_states() {
        let store = InMemoryMarketStore::new();
        let buyer = UserId::new();
        let farmer = UserId::new();
        let product = listing(farmer, 10, 2);
        let order = Order::place(
            OrderId::new(),
            buyer,
            farmer,
            vec![farmlink_orders::OrderItem {
                product_id: product.id,
                quantity: qty(2),
                unit_price: product.price,
            }],
            Utc::now(),
        )
        .unwrap();
        store.insert_order(&order).await.unwrap();

        let won = store
            .transition_order(
                order.id,
                OrderStatus::claimable_from(OrderStatus::Completed),
                OrderStatus::Completed,
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(won, 1);

        // Second claim loses: the order is already terminal.
        let lost = store
            .transition_order(
                order.id,
                OrderStatus::claimable_from(OrderStatus::Cancelled),
                OrderStatus::Cancelled,
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(lost, 0);
    }

    #[tokio::test]
    async fn log_entries_page_newest_first() {
        let store = InMemoryMarketStore::new();
        let farmer = UserId::new();
        let product = listing(farmer, 0, 2);
        store.insert_product(&product).await.unwrap();

        for n in 1..=5 {
            let command = StockChangeCommand::manual(
                product.id,
                StockChangeKind::In,
                qty(n),
                None,
                farmer,
                Utc::now(),
            );
            store.execute_change(&command).await.unwrap();
        }

        let page = store.log_entries(product.id, 2, 1).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].quantity, qty(4));
        assert_eq!(page[1].quantity, qty(3));
    }
}
