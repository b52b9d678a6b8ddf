//! Dashboard metrics tests

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use pims_core::config::AlertConfig;
use pims_core::services::dashboard::compute_dashboard_metrics;
use pims_shared::{Product, ProductBatch, Transaction};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

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

fn sale(total: &str) -> Transaction {
    Transaction {
        id: Uuid::new_v4(),
        ordered_at: Utc.with_ymd_and_hms(2024, 6, 10, 9, 30, 0).unwrap(),
        total: dec(total),
        vat: Decimal::ZERO,
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
}

#[test]
fn test_stock_counters_split_low_and_out_of_stock() {
    let well = product("Well stocked");
    let low = product("Low stocked");
    let empty = product("Out of stock");
    let batchless = product("Never stocked");

    let batches = vec![
        batch(well.id, 80, None),
        batch(low.id, 4, None),
        batch(low.id, 3, None),
        batch(empty.id, 0, None),
    ];
    let metrics = compute_dashboard_metrics(
        &[well, low, empty, batchless],
        &batches,
        &[],
        today(),
        &AlertConfig::default(),
    );

    assert_eq!(metrics.total_products, 4);
    assert_eq!(metrics.low_stock_products, 1);
    // Products with zero stock, batchless ones included, count as out of stock
    assert_eq!(metrics.out_of_stock_products, 2);
}

#[test]
fn test_expiry_counters_split_expired_and_expiring() {
    let p = product("Eye drops");
    let batches = vec![
        batch(p.id, 5, Some(NaiveDate::from_ymd_opt(2024, 6, 9).unwrap())),
        batch(p.id, 5, Some(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())),
        batch(p.id, 5, Some(NaiveDate::from_ymd_opt(2024, 8, 1).unwrap())),
        batch(p.id, 5, Some(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())),
        batch(p.id, 5, None),
    ];
    let metrics =
        compute_dashboard_metrics(&[p], &batches, &[], today(), &AlertConfig::default());

    // Expiry on the report date itself still warns; far-future and
    // undated batches do not
    assert_eq!(metrics.expired_batches, 1);
    assert_eq!(metrics.expiring_batches, 2);
}

#[test]
fn test_todays_sales_are_summed_and_rounded() {
    let transactions = vec![sale("10.555"), sale("20"), sale("0.01")];
    let metrics =
        compute_dashboard_metrics(&[], &[], &transactions, today(), &AlertConfig::default());

    assert_eq!(metrics.transactions_today, 3);
    assert_eq!(metrics.sales_today, dec("30.57"));
}

#[test]
fn test_inactive_products_and_batches_are_ignored() {
    let mut retired = product("Retired product");
    retired.is_active = false;
    let active = product("Active product");
    let mut stale = batch(active.id, 2, Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    stale.is_active = false;

    let metrics = compute_dashboard_metrics(
        &[retired, active],
        &[stale],
        &[],
        today(),
        &AlertConfig::default(),
    );

    assert_eq!(metrics.total_products, 1);
    assert_eq!(metrics.expired_batches, 0);
    assert_eq!(metrics.out_of_stock_products, 1);
}

#[test]
fn test_custom_threshold_widens_low_stock_net() {
    let p = product("Thermometer");
    let config = AlertConfig {
        low_stock_threshold: 50.0,
        ..AlertConfig::default()
    };
    let metrics =
        compute_dashboard_metrics(&[p.clone()], &[batch(p.id, 30, None)], &[], today(), &config);
    assert_eq!(metrics.low_stock_products, 1);
}
