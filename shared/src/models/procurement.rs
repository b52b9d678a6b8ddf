//! Supplier and purchase order models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A supplier the pharmacy orders from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
}

/// A fulfilled purchase order
///
/// The store only hands out orders where both timestamps are present;
/// orders still in flight carry no lead-time information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub product_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub placed_at: DateTime<Utc>,
    pub arrived_at: DateTime<Utc>,
}

impl PurchaseOrder {
    /// Lead time in fractional days, or `None` unless arrival is strictly
    /// after placement
    pub fn lead_time_days(&self) -> Option<f64> {
        let seconds = (self.arrived_at - self.placed_at).num_seconds();
        if seconds > 0 {
            Some(seconds as f64 / 86_400.0)
        } else {
            None
        }
    }
}
