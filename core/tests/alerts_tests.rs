//! Alert digest tests
//!
//! The digest is what the scheduled notification job forwards to the
//! delivery channels; these tests pin its composition and ordering.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use pims_core::config::ReorderConfig;
use pims_core::services::alerts::{build_stock_alerts, render_summary, AlertKind, AlertSeverity};
use pims_core::services::reorder::compute_reorder_advice;
use pims_shared::{Product, ProductBatch, TransactionItem};

fn product(name: &str) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        category: None,
        brand: None,
        is_active: true,
    }
}

fn batch(product_id: Uuid, stock: i64, expiry: Option<NaiveDate>) -> ProductBatch {
    ProductBatch {
        id: Uuid::new_v4(),
        product_id,
        stock: Decimal::from(stock),
        expiry_date: expiry,
        is_active: true,
    }
}

fn sale(product_id: Uuid, quantity: i64) -> TransactionItem {
    TransactionItem {
        id: Uuid::new_v4(),
        transaction_id: Uuid::new_v4(),
        product_id: Some(product_id),
        quantity,
        subtotal: Decimal::ZERO,
        ordered_at: chrono::Utc::now(),
        product_name: None,
        category: None,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2024, 6, 10)
}

#[test]
fn test_low_stock_products_become_alerts() {
    let p = product("Amoxicillin 250mg");
    let batches = vec![batch(p.id, 2, None)];
    let sales = vec![sale(p.id, 60)];
    let advice =
        compute_reorder_advice(&[p.clone()], &batches, &[], &sales, &ReorderConfig::default());

    let alerts = build_stock_alerts(&advice, &[p.clone()], &batches, today(), 90);

    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.kind, AlertKind::LowStock);
    assert_eq!(alert.severity, AlertSeverity::Warning);
    assert_eq!(alert.product_id, p.id);
    assert!(alert.message.contains("Amoxicillin 250mg"));
    assert_eq!(alert.payload["type"], "low_stock");
    assert_eq!(alert.payload["current_stock"], 2.0);
}

#[test]
fn test_out_of_stock_is_critical() {
    let p = product("Insulin pen");
    let sales = vec![sale(p.id, 10)];
    let advice = compute_reorder_advice(&[p.clone()], &[], &[], &sales, &ReorderConfig::default());

    let alerts = build_stock_alerts(&advice, &[p], &[], today(), 90);
    assert_eq!(alerts[0].severity, AlertSeverity::Critical);
}

#[test]
fn test_adequately_stocked_products_raise_nothing() {
    let p = product("Gauze roll");
    let batches = vec![batch(p.id, 400, None)];
    let sales = vec![sale(p.id, 5)];
    let advice =
        compute_reorder_advice(&[p.clone()], &batches, &[], &sales, &ReorderConfig::default());

    let alerts = build_stock_alerts(&advice, &[p], &batches, today(), 90);
    assert!(alerts.is_empty());
}

#[test]
fn test_expired_and_expiring_batches_are_classified() {
    let p = product("Eye drops");
    let batches = vec![
        batch(p.id, 5, Some(date(2024, 6, 1))),
        batch(p.id, 5, Some(date(2024, 7, 15))),
        batch(p.id, 5, Some(date(2026, 1, 1))),
    ];

    let alerts = build_stock_alerts(&[], &[p], &batches, today(), 90);

    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].kind, AlertKind::Expired);
    assert_eq!(alerts[0].severity, AlertSeverity::Critical);
    assert_eq!(alerts[1].kind, AlertKind::Expiring);
    assert_eq!(alerts[1].payload["expired"], false);
}

#[test]
fn test_expiry_alerts_sorted_soonest_first() {
    let p = product("Syrup");
    let batches = vec![
        batch(p.id, 1, Some(date(2024, 8, 1))),
        batch(p.id, 1, Some(date(2024, 6, 20))),
        batch(p.id, 1, Some(date(2024, 7, 5))),
    ];

    let alerts = build_stock_alerts(&[], &[p], &batches, today(), 90);
    let dates: Vec<&serde_json::Value> =
        alerts.iter().map(|a| &a.payload["expiry_date"]).collect();
    assert_eq!(dates, vec!["2024-06-20", "2024-07-05", "2024-08-01"]);
}

#[test]
fn test_batches_of_inactive_products_are_skipped() {
    let mut p = product("Retired product");
    p.is_active = false;
    let batches = vec![batch(p.id, 1, Some(date(2024, 6, 1)))];

    let alerts = build_stock_alerts(&[], &[p], &batches, today(), 90);
    assert!(alerts.is_empty());
}

#[test]
fn test_summary_counts_each_kind() {
    let low = product("Amoxicillin 250mg");
    let shelf = product("Eye drops");
    let batches = vec![
        batch(shelf.id, 5, Some(date(2024, 6, 1))),
        batch(shelf.id, 5, Some(date(2024, 7, 1))),
    ];
    let sales = vec![sale(low.id, 60)];
    let advice =
        compute_reorder_advice(&[low.clone()], &[], &[], &sales, &ReorderConfig::default());

    let alerts = build_stock_alerts(
        &advice,
        &[low, shelf],
        &batches,
        today(),
        90,
    );
    let summary = render_summary(&alerts, 90);

    assert!(summary.contains("1 product(s) at or below reorder level"));
    assert!(summary.contains("1 batch(es) expired"));
    assert!(summary.contains("1 batch(es) expiring within 90 days"));
}

#[test]
fn test_empty_digest_summary() {
    assert_eq!(render_summary(&[], 90), "No stock alerts today");
}
