//! Dashboard metrics service
//!
//! One bulk computation for the counters the back-office dashboard
//! tiles read: product counts, stock warnings, expiry warnings, and
//! today's sales.

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::{AlertConfig, ReportingConfig};
use crate::error::AppResult;
use crate::store::Store;
use pims_shared::{Product, ProductBatch, Transaction};

/// Dashboard metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub total_products: i64,
    /// Active products with stock at or below the configured threshold
    /// (out-of-stock products counted separately)
    pub low_stock_products: i64,
    pub out_of_stock_products: i64,
    /// Active batches expiring within the warning window
    pub expiring_batches: i64,
    pub expired_batches: i64,
    pub transactions_today: i64,
    pub sales_today: Decimal,
}

/// Dashboard metrics service
#[derive(Clone)]
pub struct DashboardService {
    store: Store,
    reporting: ReportingConfig,
    alerts: AlertConfig,
}

impl DashboardService {
    pub fn new(db: PgPool, reporting: ReportingConfig, alerts: AlertConfig) -> Self {
        Self {
            store: Store::new(db),
            reporting,
            alerts,
        }
    }

    /// Compute the dashboard counters over a fresh snapshot
    pub async fn metrics(&self) -> AppResult<DashboardMetrics> {
        let offset = self.reporting.reporting_offset();
        let today = Utc::now().with_timezone(&offset).date_naive();
        let shift = Duration::seconds(i64::from(offset.local_minus_utc()));
        let day_start = (today.and_hms_opt(0, 0, 0).unwrap() - shift).and_utc();
        let day_end = ((today + Duration::days(1)).and_hms_opt(0, 0, 0).unwrap() - shift).and_utc();

        let products = self.store.active_products().await?;
        let batches = self.store.active_batches().await?;
        let transactions = self.store.transactions_between(day_start, day_end).await?;

        Ok(compute_dashboard_metrics(
            &products,
            &batches,
            &transactions,
            today,
            &self.alerts,
        ))
    }
}

/// Pure computation over one snapshot; `transactions` must already be
/// restricted to `today` in the reporting timezone
pub fn compute_dashboard_metrics(
    products: &[Product],
    batches: &[ProductBatch],
    todays_transactions: &[Transaction],
    today: NaiveDate,
    config: &AlertConfig,
) -> DashboardMetrics {
    let mut stock_by_product: HashMap<Uuid, f64> = HashMap::new();
    for batch in batches.iter().filter(|b| b.is_active) {
        let stock = batch.stock.max(Decimal::ZERO).to_f64().unwrap_or(0.0);
        *stock_by_product.entry(batch.product_id).or_insert(0.0) += stock;
    }

    let mut total_products = 0;
    let mut low_stock_products = 0;
    let mut out_of_stock_products = 0;
    for product in products.iter().filter(|p| p.is_active) {
        total_products += 1;
        let stock = stock_by_product.get(&product.id).copied().unwrap_or(0.0);
        if stock <= 0.0 {
            out_of_stock_products += 1;
        } else if stock <= config.low_stock_threshold {
            low_stock_products += 1;
        }
    }

    let mut expiring_batches = 0;
    let mut expired_batches = 0;
    for batch in batches.iter().filter(|b| b.is_active) {
        if batch.is_expired(today) {
            expired_batches += 1;
        } else if batch.expires_within(today, config.expiry_warning_days) {
            expiring_batches += 1;
        }
    }

    let sales_today: Decimal = todays_transactions.iter().map(|t| t.total).sum();

    DashboardMetrics {
        total_products,
        low_stock_products,
        out_of_stock_products,
        expiring_batches,
        expired_batches,
        transactions_today: todays_transactions.len() as i64,
        sales_today: sales_today.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
    }
}
