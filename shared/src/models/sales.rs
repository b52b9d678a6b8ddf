//! Sale transaction models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed sale, immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub ordered_at: DateTime<Utc>,
    pub total: Decimal,
    /// Zero for rows that predate VAT tracking
    pub vat: Decimal,
}

/// A line item of a sale, denormalized with the parent transaction's
/// timestamp and the product's name and category at fetch time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionItem {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub product_id: Option<Uuid>,
    pub quantity: i64,
    pub subtotal: Decimal,
    pub ordered_at: DateTime<Utc>,
    /// `None` when the product row no longer exists
    pub product_name: Option<String>,
    pub category: Option<String>,
}
