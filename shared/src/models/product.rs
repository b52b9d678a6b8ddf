//! Product and batch models

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product on the pharmacy shelf
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub is_active: bool,
}

/// A physical batch of a product with its own stock level and expiry date
///
/// A product's total stock is the sum over its active batches; a product
/// with no batches has stock zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductBatch {
    pub id: Uuid,
    pub product_id: Uuid,
    /// Units on hand; never negative after store-boundary normalization
    pub stock: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub is_active: bool,
}

impl ProductBatch {
    /// Whether the batch has passed its expiry date
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.map(|d| d < today).unwrap_or(false)
    }

    /// Whether the batch expires within `days` days of `today`, today included
    pub fn expires_within(&self, today: NaiveDate, days: i64) -> bool {
        match self.expiry_date {
            Some(d) => d >= today && d <= today + Duration::days(days),
            None => false,
        }
    }
}
