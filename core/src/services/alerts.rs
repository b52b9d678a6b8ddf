//! Stock alert digest for the scheduled notification job
//!
//! Evaluates which products sit at or below their reorder level and
//! which batches are expired or close to expiry, and renders each
//! finding as a queueable notification payload plus a one-line summary
//! suitable for an SMS body. Delivery (SMS, LINE, email, push) is the
//! host scheduler's concern.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::{AlertConfig, ReorderConfig, ReportingConfig};
use crate::error::AppResult;
use crate::services::reorder::{compute_reorder_advice, ReorderAdvice, StockStatus};
use crate::store::Store;
use pims_shared::{Product, ProductBatch};

/// What a stock alert is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowStock,
    Expiring,
    Expired,
}

/// How urgently a stock alert should be acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

/// One finding of the alert evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub product_id: Uuid,
    pub product_name: String,
    pub message: String,
    /// Shaped for the external notification queue
    pub payload: serde_json::Value,
}

/// The full output of one alert evaluation run
#[derive(Debug, Clone, Serialize)]
pub struct AlertDigest {
    pub generated_at: DateTime<Utc>,
    pub alerts: Vec<StockAlert>,
    /// One-line summary suitable for an SMS body
    pub summary: String,
}

/// Alert evaluation service
#[derive(Clone)]
pub struct AlertService {
    store: Store,
    reorder: ReorderConfig,
    reporting: ReportingConfig,
    alerts: AlertConfig,
}

impl AlertService {
    pub fn new(
        db: PgPool,
        reorder: ReorderConfig,
        reporting: ReportingConfig,
        alerts: AlertConfig,
    ) -> Self {
        Self {
            store: Store::new(db),
            reorder,
            reporting,
            alerts,
        }
    }

    /// Evaluate all stock alerts over a fresh snapshot
    pub async fn build_digest(&self) -> AppResult<AlertDigest> {
        let now = Utc::now();
        let today = now
            .with_timezone(&self.reporting.reporting_offset())
            .date_naive();
        let window_start = now - Duration::days(i64::from(self.reorder.usage_window_days));

        let products = self.store.active_products().await?;
        let batches = self.store.active_batches().await?;
        let orders = self.store.fulfilled_purchase_orders().await?;
        let items = self.store.transaction_items_between(window_start, now).await?;

        let advice = compute_reorder_advice(&products, &batches, &orders, &items, &self.reorder);
        let alerts = build_stock_alerts(
            &advice,
            &products,
            &batches,
            today,
            self.alerts.expiry_warning_days,
        );
        let summary = render_summary(&alerts, self.alerts.expiry_warning_days);

        tracing::info!(alerts = alerts.len(), "alert digest built");
        Ok(AlertDigest {
            generated_at: now,
            alerts,
            summary,
        })
    }
}

/// Turn reorder advice and batch expiry state into alert entries
///
/// Low-stock entries keep the advice order (most urgent first); expiry
/// entries follow, soonest expiry first. Batches of inactive products
/// are ignored.
pub fn build_stock_alerts(
    advice: &[ReorderAdvice],
    products: &[Product],
    batches: &[ProductBatch],
    today: NaiveDate,
    expiry_warning_days: i64,
) -> Vec<StockAlert> {
    let mut alerts = Vec::new();

    for entry in advice.iter().filter(|a| a.status == StockStatus::Low) {
        let severity = if entry.current_stock <= 0.0 {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        };
        alerts.push(StockAlert {
            kind: AlertKind::LowStock,
            severity,
            product_id: entry.product_id,
            product_name: entry.product_name.clone(),
            message: format!(
                "{} is low on stock: {} units left, reorder level {}",
                entry.product_name, entry.current_stock, entry.reorder_level
            ),
            payload: json!({
                "type": "low_stock",
                "product_id": entry.product_id,
                "current_stock": entry.current_stock,
                "reorder_level": entry.reorder_level,
                "suggested_quantity": entry.suggested_quantity,
            }),
        });
    }

    let names: HashMap<Uuid, &str> = products
        .iter()
        .filter(|p| p.is_active)
        .map(|p| (p.id, p.name.as_str()))
        .collect();

    let mut expiry_alerts: Vec<(NaiveDate, StockAlert)> = Vec::new();
    for batch in batches.iter().filter(|b| b.is_active) {
        let Some(name) = names.get(&batch.product_id) else {
            continue;
        };
        let Some(expiry_date) = batch.expiry_date else {
            continue;
        };
        let alert = if batch.is_expired(today) {
            StockAlert {
                kind: AlertKind::Expired,
                severity: AlertSeverity::Critical,
                product_id: batch.product_id,
                product_name: name.to_string(),
                message: format!("A batch of {} expired on {}", name, expiry_date),
                payload: json!({
                    "type": "batch_expiry",
                    "batch_id": batch.id,
                    "product_id": batch.product_id,
                    "expiry_date": expiry_date.to_string(),
                    "expired": true,
                }),
            }
        } else if batch.expires_within(today, expiry_warning_days) {
            let days_left = (expiry_date - today).num_days();
            StockAlert {
                kind: AlertKind::Expiring,
                severity: AlertSeverity::Warning,
                product_id: batch.product_id,
                product_name: name.to_string(),
                message: format!(
                    "A batch of {} expires on {} ({} days left)",
                    name, expiry_date, days_left
                ),
                payload: json!({
                    "type": "batch_expiry",
                    "batch_id": batch.id,
                    "product_id": batch.product_id,
                    "expiry_date": expiry_date.to_string(),
                    "expired": false,
                }),
            }
        } else {
            continue;
        };
        expiry_alerts.push((expiry_date, alert));
    }

    expiry_alerts.sort_by_key(|(date, _)| *date);
    alerts.extend(expiry_alerts.into_iter().map(|(_, alert)| alert));
    alerts
}

/// Render the digest's one-line summary
pub fn render_summary(alerts: &[StockAlert], expiry_warning_days: i64) -> String {
    if alerts.is_empty() {
        return "No stock alerts today".to_string();
    }

    let low = alerts.iter().filter(|a| a.kind == AlertKind::LowStock).count();
    let expired = alerts.iter().filter(|a| a.kind == AlertKind::Expired).count();
    let expiring = alerts.iter().filter(|a| a.kind == AlertKind::Expiring).count();

    let mut parts = Vec::new();
    if low > 0 {
        parts.push(format!("{} product(s) at or below reorder level", low));
    }
    if expired > 0 {
        parts.push(format!("{} batch(es) expired", expired));
    }
    if expiring > 0 {
        parts.push(format!(
            "{} batch(es) expiring within {} days",
            expiring, expiry_warning_days
        ));
    }
    parts.join("; ")
}
