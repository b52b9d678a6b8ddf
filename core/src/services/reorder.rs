//! Reorder forecasting service
//!
//! Derives, per product, the current stock position, the average daily
//! usage over a trailing sales window, the mean supplier lead time from
//! fulfilled purchase orders, and from those a safety stock, a reorder
//! level, and a suggested order quantity.

use chrono::{Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::ReorderConfig;
use crate::error::AppResult;
use crate::store::Store;
use pims_shared::{Product, ProductBatch, PurchaseOrder, TransactionItem};

/// Stock status of a product relative to its reorder level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    #[serde(rename = "LOW STOCK")]
    Low,
    #[serde(rename = "OK")]
    Ok,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Low => "LOW STOCK",
            StockStatus::Ok => "OK",
        }
    }
}

/// Reorder advice for a single product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReorderAdvice {
    pub product_id: Uuid,
    pub product_name: String,
    pub current_stock: f64,
    /// Units sold per day over the trailing usage window
    pub avg_daily_usage: f64,
    /// Mean supplier lead time in days
    pub lead_time_days: f64,
    pub safety_stock: f64,
    pub reorder_level: f64,
    /// Whole units to order now; zero when adequately stocked
    pub suggested_quantity: u64,
    pub status: StockStatus,
}

/// Reorder forecasting service
#[derive(Clone)]
pub struct ReorderService {
    store: Store,
    config: ReorderConfig,
}

impl ReorderService {
    pub fn new(db: PgPool, config: ReorderConfig) -> Self {
        Self {
            store: Store::new(db),
            config,
        }
    }

    /// Products currently at or below their reorder level, most urgent
    /// first, optionally truncated to `limit` entries
    ///
    /// When `threshold` is given, the list is further restricted to
    /// products whose current stock also sits at or below that figure.
    pub async fn low_stock_products(
        &self,
        limit: Option<usize>,
        threshold: Option<f64>,
    ) -> AppResult<Vec<ReorderAdvice>> {
        let mut advice = self.advise_all().await?;
        advice.retain(|a| a.status == StockStatus::Low);
        if let Some(threshold) = threshold {
            advice.retain(|a| a.current_stock <= threshold);
        }
        if let Some(limit) = limit {
            advice.truncate(limit);
        }
        tracing::info!(low_stock = advice.len(), "reorder advice computed");
        Ok(advice)
    }

    /// Advice for every active product, regardless of status
    pub async fn advise_all(&self) -> AppResult<Vec<ReorderAdvice>> {
        let now = Utc::now();
        let window_start = now - Duration::days(i64::from(self.config.usage_window_days));

        let products = self.store.active_products().await?;
        let batches = self.store.active_batches().await?;
        let orders = self.store.fulfilled_purchase_orders().await?;
        let items = self
            .store
            .transaction_items_between(window_start, now)
            .await?;

        Ok(compute_reorder_advice(
            &products,
            &batches,
            &orders,
            &items,
            &self.config,
        ))
    }
}

/// Compute reorder advice for every active product over one data snapshot
///
/// `items` must already be restricted to the trailing usage window. The
/// result is sorted by stock shortfall (reorder level minus current
/// stock) descending, product name ascending on ties.
pub fn compute_reorder_advice(
    products: &[Product],
    batches: &[ProductBatch],
    orders: &[PurchaseOrder],
    items: &[TransactionItem],
    config: &ReorderConfig,
) -> Vec<ReorderAdvice> {
    let window_days = config.usage_window_days.max(1) as f64;

    let mut stock_by_product: HashMap<Uuid, f64> = HashMap::new();
    for batch in batches.iter().filter(|b| b.is_active) {
        let stock = batch.stock.max(Decimal::ZERO).to_f64().unwrap_or(0.0);
        *stock_by_product.entry(batch.product_id).or_insert(0.0) += stock;
    }

    let mut units_sold: HashMap<Uuid, i64> = HashMap::new();
    for item in items {
        if let Some(product_id) = item.product_id {
            *units_sold.entry(product_id).or_insert(0) += item.quantity.max(0);
        }
    }

    // (sum of lead times, qualifying order count) per product
    let mut lead_times: HashMap<Uuid, (f64, u32)> = HashMap::new();
    for order in orders {
        if let Some(days) = order.lead_time_days() {
            let entry = lead_times.entry(order.product_id).or_insert((0.0, 0));
            entry.0 += days;
            entry.1 += 1;
        }
    }

    let mut advice: Vec<ReorderAdvice> = products
        .iter()
        .filter(|p| p.is_active)
        .map(|product| {
            let current_stock = stock_by_product.get(&product.id).copied().unwrap_or(0.0);
            let avg_daily_usage =
                units_sold.get(&product.id).copied().unwrap_or(0) as f64 / window_days;
            let lead_time_days = lead_times
                .get(&product.id)
                .map(|(sum, n)| sum / f64::from(*n))
                .unwrap_or(config.default_lead_time_days);

            let safety_stock = config.safety_stock_factor * avg_daily_usage * lead_time_days;
            let reorder_level = avg_daily_usage * lead_time_days + safety_stock;
            let status = if current_stock <= reorder_level {
                StockStatus::Low
            } else {
                StockStatus::Ok
            };
            let suggested = (reorder_level - current_stock + safety_stock).max(0.0);

            ReorderAdvice {
                product_id: product.id,
                product_name: product.name.clone(),
                current_stock,
                avg_daily_usage: round2(avg_daily_usage),
                lead_time_days: round2(lead_time_days),
                safety_stock: round2(safety_stock),
                reorder_level: round2(reorder_level),
                suggested_quantity: suggested.round() as u64,
                status,
            }
        })
        .collect();

    advice.sort_by(|a, b| {
        let shortfall_a = a.reorder_level - a.current_stock;
        let shortfall_b = b.reorder_level - b.current_stock;
        shortfall_b
            .partial_cmp(&shortfall_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.product_name.cmp(&b.product_name))
    });

    advice
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
