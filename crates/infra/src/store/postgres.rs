//! Postgres-backed marketplace store.
//!
//! Every trait method runs as one transaction (or one statement, where a
//! single statement is already atomic). The ledger units (`execute_change`,
//! `reserve_stock`, `confirm_usage`) take a `SELECT ... FOR UPDATE` row lock
//! on the listing, run the same pure stock math as the in-memory backend,
//! and write the new columns plus the log entries before committing; two
//! concurrent reservations therefore serialize on the row and the loser sees
//! the winner's availability.
//!
//! ## Error Mapping
//!
//! | SQLx error | Postgres code | StoreError |
//! |------------|---------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any other | `Backend` |
//! | PoolClosed / RowNotFound / other | n/a | `Backend` |
//!
//! Rows that fail to parse back into domain types (unknown status or kind
//! strings, negative quantities) map to `Backend` as corrupt-row failures.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use farmlink_catalog::Product;
use farmlink_core::{AlertId, EntryId, OrderId, ProductId, Quantity, UserId};
use farmlink_inventory::{
    ChangeReference, LogEntry, Notification, StockAlert, StockChangeCommand, StockChangeKind,
};
use farmlink_orders::{Order, OrderItem, OrderStatus};

use super::apply_to_product;
use super::r#trait::{
    AppliedChange, ConfirmApplied, MarketStore, ReserveOutcome, StoreError, StoreResult, UsagePlan,
};

/// Idempotent schema bootstrap, applied on `connect`.
///
/// The partial unique index on `stock_alerts` is what enforces the
/// one-unresolved-alert-per-(product, kind) rule; `insert_alert` leans on it
/// with `ON CONFLICT ... DO NOTHING`.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id UUID PRIMARY KEY,
    farmer_id UUID NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    unit TEXT NOT NULL,
    price NUMERIC NOT NULL,
    current_stock NUMERIC NOT NULL,
    reserved_stock NUMERIC NOT NULL,
    low_stock_threshold NUMERIC NOT NULL,
    status TEXT NOT NULL,
    total_sales BIGINT NOT NULL,
    harvested_at TIMESTAMPTZ,
    expires_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS products_farmer_idx ON products (farmer_id, created_at DESC);

CREATE TABLE IF NOT EXISTS inventory_log (
    id UUID PRIMARY KEY,
    product_id UUID NOT NULL REFERENCES products (id),
    kind TEXT NOT NULL,
    quantity NUMERIC NOT NULL,
    old_stock NUMERIC NOT NULL,
    new_stock NUMERIC NOT NULL,
    reference_kind TEXT NOT NULL,
    reference_id UUID,
    note TEXT,
    actor_id UUID NOT NULL,
    recorded_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS inventory_log_product_idx
    ON inventory_log (product_id, recorded_at DESC);

CREATE TABLE IF NOT EXISTS stock_alerts (
    id UUID PRIMARY KEY,
    product_id UUID NOT NULL REFERENCES products (id),
    farmer_id UUID NOT NULL,
    kind TEXT NOT NULL,
    current_stock NUMERIC NOT NULL,
    threshold_stock NUMERIC NOT NULL,
    message TEXT NOT NULL,
    resolved BOOLEAN NOT NULL,
    resolved_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS stock_alerts_open_idx
    ON stock_alerts (product_id, kind) WHERE NOT resolved;

CREATE INDEX IF NOT EXISTS stock_alerts_farmer_idx
    ON stock_alerts (farmer_id, created_at DESC);

CREATE TABLE IF NOT EXISTS notifications (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    payload JSONB NOT NULL,
    action_url TEXT NOT NULL,
    is_read BOOLEAN NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS notifications_user_idx
    ON notifications (user_id, created_at DESC);

CREATE TABLE IF NOT EXISTS orders (
    id UUID PRIMARY KEY,
    buyer_id UUID NOT NULL,
    farmer_id UUID NOT NULL,
    status TEXT NOT NULL,
    total NUMERIC NOT NULL,
    items JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS orders_buyer_idx ON orders (buyer_id, created_at DESC);
CREATE INDEX IF NOT EXISTS orders_farmer_idx ON orders (farmer_id, created_at DESC);
"#;

const PRODUCT_COLUMNS: &str = "id, farmer_id, name, description, unit, price, current_stock, \
     reserved_stock, low_stock_threshold, status, total_sales, harvested_at, expires_at, \
     created_at, updated_at";

/// Postgres-backed `MarketStore`.
#[derive(Debug, Clone)]
pub struct PostgresMarketStore {
    pool: Arc<PgPool>,
}

impl PostgresMarketStore {
    /// Wrap an existing pool. The schema is assumed to be in place.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect to `database_url` and bootstrap the schema.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Apply the idempotent schema DDL.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

#[async_trait]
impl MarketStore for PostgresMarketStore {
    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, farmer_id, name, description, unit, price,
                current_stock, reserved_stock, low_stock_threshold, status,
                total_sales, harvested_at, expires_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.farmer_id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.unit)
        .bind(product.price.value())
        .bind(product.current_stock.value())
        .bind(product.reserved_stock.value())
        .bind(product.low_stock_threshold.value())
        .bind(product.status.as_str())
        .bind(product.total_sales as i64)
        .bind(product.harvested_at)
        .bind(product.expires_at)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("product", e))?;

        row.map(|row| product_from_row(&row)).transpose()
    }

    #[instrument(skip(self), fields(farmer_id = %farmer), err)]
    async fn products_by_farmer(&self, farmer: UserId) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE farmer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(farmer.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("products_by_farmer", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn update_listing(&self, product: &Product) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, unit = $4, price = $5,
                low_stock_threshold = $6, harvested_at = $7, expires_at = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.unit)
        .bind(product.price.value())
        .bind(product.low_stock_threshold.value())
        .bind(product.harvested_at)
        .bind(product.expires_at)
        .bind(product.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_listing", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(farmer_id = %farmer), err)]
    async fn expiring_products(
        &self,
        farmer: UserId,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE farmer_id = $1 AND expires_at IS NOT NULL AND expires_at <= $2"
        ))
        .bind(farmer.as_uuid())
        .bind(cutoff)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("expiring_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(
        skip(self, command),
        fields(product_id = %command.product_id, kind = %command.kind),
        err
    )]
    async fn execute_change(&self, command: &StockChangeCommand) -> StoreResult<AppliedChange> {
        let mut tx = self.begin().await?;

        let mut product = product_for_update(&mut tx, command.product_id)
            .await?
            .ok_or(StoreError::NotFound)?;

        let entry = apply_to_product(&mut product, command);
        persist_stock_columns(&mut tx, &product).await?;
        insert_log_entry(&mut tx, &entry).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("execute_change_commit", e))?;

        Ok(AppliedChange { product, entry })
    }

    #[instrument(
        skip(self, command),
        fields(product_id = %command.product_id, quantity = %command.quantity),
        err
    )]
    async fn reserve_stock(&self, command: &StockChangeCommand) -> StoreResult<ReserveOutcome> {
        let mut tx = self.begin().await?;

        let mut product = product_for_update(&mut tx, command.product_id)
            .await?
            .ok_or(StoreError::NotFound)?;

        // Row lock held: the availability this claim sees stays true until
        // commit or rollback.
        let available = product.available();
        if available < command.quantity.value() {
            return Ok(ReserveOutcome::Insufficient {
                available,
                requested: command.quantity,
            });
        }

        let entry = apply_to_product(&mut product, command);
        persist_stock_columns(&mut tx, &product).await?;
        insert_log_entry(&mut tx, &entry).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("reserve_stock_commit", e))?;

        Ok(ReserveOutcome::Reserved(AppliedChange { product, entry }))
    }

    #[instrument(
        skip(self, plan),
        fields(product_id = %plan.product_id, order_id = %plan.order_id),
        err
    )]
    async fn confirm_usage(&self, plan: &UsagePlan) -> StoreResult<ConfirmApplied> {
        let mut tx = self.begin().await?;

        let mut product = product_for_update(&mut tx, plan.product_id)
            .await?
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

        let release_entry = apply_to_product(&mut product, &release);
        let deduct_entry = apply_to_product(&mut product, &deduct);
        product.total_sales += 1;

        persist_stock_columns(&mut tx, &product).await?;
        insert_log_entry(&mut tx, &release_entry).await?;
        insert_log_entry(&mut tx, &deduct_entry).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("confirm_usage_commit", e))?;

        Ok(ConfirmApplied {
            product,
            release_entry,
            deduct_entry,
        })
    }

    #[instrument(
        skip(self, alert),
        fields(product_id = %alert.product_id, kind = %alert.kind),
        err
    )]
    async fn insert_alert(&self, alert: &StockAlert) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO stock_alerts (
                id, product_id, farmer_id, kind, current_stock, threshold_stock,
                message, resolved, resolved_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (product_id, kind) WHERE NOT resolved DO NOTHING
            "#,
        )
        .bind(alert.id.as_uuid())
        .bind(alert.product_id.as_uuid())
        .bind(alert.farmer_id.as_uuid())
        .bind(alert.kind.as_str())
        .bind(alert.current_stock.value())
        .bind(alert.threshold_stock.value())
        .bind(&alert.message)
        .bind(alert.resolved)
        .bind(alert.resolved_at)
        .bind(alert.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_alert", e))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self, notification), fields(user_id = %notification.user_id), err)]
    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, user_id, title, body, payload, action_url, is_read, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.user_id.as_uuid())
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.payload)
        .bind(&notification.action_url)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_notification", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(farmer_id = %farmer), err)]
    async fn alerts_for_farmer(
        &self,
        farmer: UserId,
        include_resolved: bool,
    ) -> StoreResult<Vec<StockAlert>> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, farmer_id, kind, current_stock, threshold_stock,
                   message, resolved, resolved_at, created_at
            FROM stock_alerts
            WHERE farmer_id = $1 AND ($2 OR NOT resolved)
            ORDER BY created_at DESC
            "#,
        )
        .bind(farmer.as_uuid())
        .bind(include_resolved)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("alerts_for_farmer", e))?;

        rows.iter().map(alert_from_row).collect()
    }

    #[instrument(skip(self), fields(alert_id = %alert, farmer_id = %farmer), err)]
    async fn resolve_alert(
        &self,
        alert: AlertId,
        farmer: UserId,
        resolved_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE stock_alerts
            SET resolved = TRUE, resolved_at = $3
            WHERE id = $1 AND farmer_id = $2
            "#,
        )
        .bind(alert.as_uuid())
        .bind(farmer.as_uuid())
        .bind(resolved_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("resolve_alert", e))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(product_id = %product), err)]
    async fn log_entries(
        &self,
        product: ProductId,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<LogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, kind, quantity, old_stock, new_stock,
                   reference_kind, reference_id, note, actor_id, recorded_at
            FROM inventory_log
            WHERE product_id = $1
            ORDER BY recorded_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(product.as_uuid())
        .bind(limit.max(0))
        .bind(offset.max(0))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("log_entries", e))?;

        rows.iter().map(log_entry_from_row).collect()
    }

    #[instrument(skip(self, order), fields(order_id = %order.id), err)]
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let items = serde_json::to_value(&order.items)
            .map_err(|e| StoreError::Backend(format!("serialize order items: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, buyer_id, farmer_id, status, total, items, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.buyer_id.as_uuid())
        .bind(order.farmer_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.total.value())
        .bind(items)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, buyer_id, farmer_id, status, total, items, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("order", e))?;

        row.map(|row| order_from_row(&row)).transpose()
    }

    #[instrument(skip(self), fields(order_id = %id, to = %to), err)]
    async fn transition_order(
        &self,
        id: OrderId,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let allowed: Vec<String> = allowed_from
            .iter()
            .map(|status| status.as_str().to_string())
            .collect();

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, updated_at = $3
            WHERE id = $1 AND status = ANY($4)
            "#,
        )
        .bind(id.as_uuid())
        .bind(to.as_str())
        .bind(updated_at)
        .bind(&allowed)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("transition_order", e))?;

        Ok(result.rows_affected())
    }
}

/// Load a listing under a row lock; `None` when it does not exist.
async fn product_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: ProductId,
) -> StoreResult<Option<Product>> {
    let row = sqlx::query(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
    ))
    .bind(id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("product_for_update", e))?;

    row.map(|row| product_from_row(&row)).transpose()
}

/// Write back the columns the ledger owns. Metadata columns stay untouched;
/// `update_listing` owns those.
async fn persist_stock_columns(
    tx: &mut Transaction<'_, Postgres>,
    product: &Product,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET current_stock = $2, reserved_stock = $3, status = $4,
            total_sales = $5, updated_at = $6
        WHERE id = $1
        "#,
    )
    .bind(product.id.as_uuid())
    .bind(product.current_stock.value())
    .bind(product.reserved_stock.value())
    .bind(product.status.as_str())
    .bind(product.total_sales as i64)
    .bind(product.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("persist_stock_columns", e))?;
    Ok(())
}

async fn insert_log_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: &LogEntry,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_log (
            id, product_id, kind, quantity, old_stock, new_stock,
            reference_kind, reference_id, note, actor_id, recorded_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(entry.id.as_uuid())
    .bind(entry.product_id.as_uuid())
    .bind(entry.kind.as_str())
    .bind(entry.quantity.value())
    .bind(entry.old_stock.value())
    .bind(entry.new_stock.value())
    .bind(entry.reference.kind())
    .bind(entry.reference.ref_id())
    .bind(&entry.note)
    .bind(entry.actor_id.as_uuid())
    .bind(entry.recorded_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_log_entry", e))?;
    Ok(())
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::RowNotFound => {
            StoreError::Backend(format!("unexpected row not found in {operation}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

fn corrupt_row(table: &str, err: impl core::fmt::Display) -> StoreError {
    StoreError::Backend(format!("corrupt {table} row: {err}"))
}

struct ProductRow {
    id: Uuid,
    farmer_id: Uuid,
    name: String,
    description: Option<String>,
    unit: String,
    price: Decimal,
    current_stock: Decimal,
    reserved_stock: Decimal,
    low_stock_threshold: Decimal,
    status: String,
    total_sales: i64,
    harvested_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ProductRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            farmer_id: row.try_get("farmer_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            unit: row.try_get("unit")?,
            price: row.try_get("price")?,
            current_stock: row.try_get("current_stock")?,
            reserved_stock: row.try_get("reserved_stock")?,
            low_stock_threshold: row.try_get("low_stock_threshold")?,
            status: row.try_get("status")?,
            total_sales: row.try_get("total_sales")?,
            harvested_at: row.try_get("harvested_at")?,
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: ProductId::from_uuid(row.id),
            farmer_id: UserId::from_uuid(row.farmer_id),
            name: row.name,
            description: row.description,
            unit: row.unit,
            price: farmlink_core::Money::new(row.price).map_err(|e| corrupt_row("products", e))?,
            current_stock: Quantity::new(row.current_stock)
                .map_err(|e| corrupt_row("products", e))?,
            reserved_stock: Quantity::new(row.reserved_stock)
                .map_err(|e| corrupt_row("products", e))?,
            low_stock_threshold: Quantity::new(row.low_stock_threshold)
                .map_err(|e| corrupt_row("products", e))?,
            status: row.status.parse().map_err(|e| corrupt_row("products", e))?,
            total_sales: row.total_sales as u64,
            harvested_at: row.harvested_at,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn product_from_row(row: &sqlx::postgres::PgRow) -> StoreResult<Product> {
    let row = ProductRow::from_row(row).map_err(|e| corrupt_row("products", e))?;
    Product::try_from(row)
}

struct LogEntryRow {
    id: Uuid,
    product_id: Uuid,
    kind: String,
    quantity: Decimal,
    old_stock: Decimal,
    new_stock: Decimal,
    reference_kind: String,
    reference_id: Option<Uuid>,
    note: Option<String>,
    actor_id: Uuid,
    recorded_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for LogEntryRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(LogEntryRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            kind: row.try_get("kind")?,
            quantity: row.try_get("quantity")?,
            old_stock: row.try_get("old_stock")?,
            new_stock: row.try_get("new_stock")?,
            reference_kind: row.try_get("reference_kind")?,
            reference_id: row.try_get("reference_id")?,
            note: row.try_get("note")?,
            actor_id: row.try_get("actor_id")?,
            recorded_at: row.try_get("recorded_at")?,
        })
    }
}

impl TryFrom<LogEntryRow> for LogEntry {
    type Error = StoreError;

    fn try_from(row: LogEntryRow) -> Result<Self, Self::Error> {
        let kind: StockChangeKind = row
            .kind
            .parse()
            .map_err(|e| corrupt_row("inventory_log", e))?;
        let reference = ChangeReference::from_parts(&row.reference_kind, row.reference_id)
            .map_err(|e| corrupt_row("inventory_log", e))?;

        Ok(LogEntry {
            id: EntryId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            kind,
            quantity: Quantity::new(row.quantity).map_err(|e| corrupt_row("inventory_log", e))?,
            old_stock: Quantity::new(row.old_stock)
                .map_err(|e| corrupt_row("inventory_log", e))?,
            new_stock: Quantity::new(row.new_stock)
                .map_err(|e| corrupt_row("inventory_log", e))?,
            reference,
            note: row.note,
            actor_id: UserId::from_uuid(row.actor_id),
            recorded_at: row.recorded_at,
        })
    }
}

fn log_entry_from_row(row: &sqlx::postgres::PgRow) -> StoreResult<LogEntry> {
    let row = LogEntryRow::from_row(row).map_err(|e| corrupt_row("inventory_log", e))?;
    LogEntry::try_from(row)
}

struct StockAlertRow {
    id: Uuid,
    product_id: Uuid,
    farmer_id: Uuid,
    kind: String,
    current_stock: Decimal,
    threshold_stock: Decimal,
    message: String,
    resolved: bool,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StockAlertRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StockAlertRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            farmer_id: row.try_get("farmer_id")?,
            kind: row.try_get("kind")?,
            current_stock: row.try_get("current_stock")?,
            threshold_stock: row.try_get("threshold_stock")?,
            message: row.try_get("message")?,
            resolved: row.try_get("resolved")?,
            resolved_at: row.try_get("resolved_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<StockAlertRow> for StockAlert {
    type Error = StoreError;

    fn try_from(row: StockAlertRow) -> Result<Self, Self::Error> {
        Ok(StockAlert {
            id: AlertId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            farmer_id: UserId::from_uuid(row.farmer_id),
            kind: row
                .kind
                .parse()
                .map_err(|e| corrupt_row("stock_alerts", e))?,
            current_stock: Quantity::new(row.current_stock)
                .map_err(|e| corrupt_row("stock_alerts", e))?,
            threshold_stock: Quantity::new(row.threshold_stock)
                .map_err(|e| corrupt_row("stock_alerts", e))?,
            message: row.message,
            resolved: row.resolved,
            resolved_at: row.resolved_at,
            created_at: row.created_at,
        })
    }
}

fn alert_from_row(row: &sqlx::postgres::PgRow) -> StoreResult<StockAlert> {
    let row = StockAlertRow::from_row(row).map_err(|e| corrupt_row("stock_alerts", e))?;
    StockAlert::try_from(row)
}

struct OrderRow {
    id: Uuid,
    buyer_id: Uuid,
    farmer_id: Uuid,
    status: String,
    total: Decimal,
    items: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for OrderRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            buyer_id: row.try_get("buyer_id")?,
            farmer_id: row.try_get("farmer_id")?,
            status: row.try_get("status")?,
            total: row.try_get("total")?,
            items: row.try_get("items")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let items: Vec<OrderItem> =
            serde_json::from_value(row.items).map_err(|e| corrupt_row("orders", e))?;

        Ok(Order {
            id: OrderId::from_uuid(row.id),
            buyer_id: UserId::from_uuid(row.buyer_id),
            farmer_id: UserId::from_uuid(row.farmer_id),
            status: row.status.parse().map_err(|e| corrupt_row("orders", e))?,
            total: farmlink_core::Money::new(row.total).map_err(|e| corrupt_row("orders", e))?,
            items,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn order_from_row(row: &sqlx::postgres::PgRow) -> StoreResult<Order> {
    let row = OrderRow::from_row(row).map_err(|e| corrupt_row("orders", e))?;
    Order::try_from(row)
}
