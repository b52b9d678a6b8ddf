//! Read-only access to the hosted Postgres store
//!
//! Each computation issues a small fixed number of bulk reads and then
//! works entirely in memory; the core never writes. Rows are normalized
//! here before the computation layer sees them: line items come back
//! flat with their transaction timestamp and product name/category
//! attached, missing or negative numerics are coerced to zero, and rows
//! without a usable timestamp are skipped.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::AppResult;
use pims_shared::{Product, ProductBatch, PurchaseOrder, Transaction, TransactionItem};

/// Build a connection pool against the hosted store
pub async fn connect(config: &DatabaseConfig) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.url)
        .await?;
    Ok(pool)
}

/// Row for the active product query
#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    category: Option<String>,
    brand: Option<String>,
}

/// Row for the active batch query
#[derive(Debug, FromRow)]
struct BatchRow {
    id: Uuid,
    product_id: Uuid,
    stock: Option<Decimal>,
    expiry_date: Option<NaiveDate>,
}

/// Row for the fulfilled purchase order query
#[derive(Debug, FromRow)]
struct PurchaseOrderRow {
    id: Uuid,
    product_id: Uuid,
    supplier_id: Option<Uuid>,
    placed_at: DateTime<Utc>,
    arrived_at: DateTime<Utc>,
}

/// Row for the transaction query
#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    ordered_at: Option<DateTime<Utc>>,
    total: Option<Decimal>,
    vat: Option<Decimal>,
}

/// Row for the denormalized line item query
#[derive(Debug, FromRow)]
struct TransactionItemRow {
    id: Uuid,
    transaction_id: Uuid,
    product_id: Option<Uuid>,
    quantity: Option<i64>,
    subtotal: Option<Decimal>,
    ordered_at: Option<DateTime<Utc>>,
    product_name: Option<String>,
    category: Option<String>,
}

/// Read-only handle on the hosted store
#[derive(Clone)]
pub struct Store {
    db: PgPool,
}

impl Store {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Fetch all active products
    pub async fn active_products(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, category, brand
            FROM products
            WHERE is_active = true
            ORDER BY name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Product {
                id: r.id,
                name: r.name,
                category: r.category,
                brand: r.brand,
                is_active: true,
            })
            .collect())
    }

    /// Fetch all active batches
    pub async fn active_batches(&self) -> AppResult<Vec<ProductBatch>> {
        let rows = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, product_id, stock, expiry_date
            FROM product_batches
            WHERE is_active = true
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ProductBatch {
                id: r.id,
                product_id: r.product_id,
                stock: coerce_quantity(r.stock, "product_batches.stock"),
                expiry_date: r.expiry_date,
                is_active: true,
            })
            .collect())
    }

    /// Fetch purchase orders with both timestamps set
    pub async fn fulfilled_purchase_orders(&self) -> AppResult<Vec<PurchaseOrder>> {
        let rows = sqlx::query_as::<_, PurchaseOrderRow>(
            r#"
            SELECT id, product_id, supplier_id, placed_at, arrived_at
            FROM purchase_orders
            WHERE placed_at IS NOT NULL AND arrived_at IS NOT NULL
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| PurchaseOrder {
                id: r.id,
                product_id: r.product_id,
                supplier_id: r.supplier_id,
                placed_at: r.placed_at,
                arrived_at: r.arrived_at,
            })
            .collect())
    }

    /// Fetch transactions ordered within `[from, to)`
    pub async fn transactions_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, ordered_at, total, vat
            FROM transactions
            WHERE ordered_at >= $1 AND ordered_at < $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|r| {
                let Some(ordered_at) = r.ordered_at else {
                    tracing::warn!(transaction_id = %r.id, "skipping transaction without timestamp");
                    return None;
                };
                Some(Transaction {
                    id: r.id,
                    ordered_at,
                    total: r.total.unwrap_or(Decimal::ZERO),
                    vat: r.vat.unwrap_or(Decimal::ZERO),
                })
            })
            .collect())
    }

    /// Fetch line items whose parent transaction was ordered within
    /// `[from, to)`, with the product's name and category attached
    pub async fn transaction_items_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<TransactionItem>> {
        let rows = sqlx::query_as::<_, TransactionItemRow>(
            r#"
            SELECT ti.id, ti.transaction_id, ti.product_id, ti.quantity, ti.subtotal,
                   t.ordered_at, p.name AS product_name, p.category
            FROM transaction_items ti
            JOIN transactions t ON t.id = ti.transaction_id
            LEFT JOIN products p ON p.id = ti.product_id
            WHERE t.ordered_at >= $1 AND t.ordered_at < $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|r| {
                let Some(ordered_at) = r.ordered_at else {
                    tracing::warn!(item_id = %r.id, "skipping line item without timestamp");
                    return None;
                };
                let quantity = match r.quantity {
                    Some(q) if q >= 0 => q,
                    Some(q) => {
                        tracing::warn!(item_id = %r.id, quantity = q, "coercing negative quantity to 0");
                        0
                    }
                    None => 0,
                };
                Some(TransactionItem {
                    id: r.id,
                    transaction_id: r.transaction_id,
                    product_id: r.product_id,
                    quantity,
                    subtotal: r.subtotal.unwrap_or(Decimal::ZERO),
                    ordered_at,
                    product_name: r.product_name,
                    category: r.category,
                })
            })
            .collect())
    }
}

/// Coerce a nullable quantity column to a non-negative value
fn coerce_quantity(value: Option<Decimal>, column: &str) -> Decimal {
    match value {
        Some(v) if v >= Decimal::ZERO => v,
        Some(v) => {
            tracing::warn!(column, value = %v, "coercing negative quantity to 0");
            Decimal::ZERO
        }
        None => Decimal::ZERO,
    }
}
