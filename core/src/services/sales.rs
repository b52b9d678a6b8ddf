//! Sales aggregation service
//!
//! Buckets transactions and their line items into calendar periods
//! (day, week, month, year) and ranks top-selling products or
//! categories by revenue over a date range. All grouping happens in
//! memory over a handful of bulk reads; money stays in `Decimal` and is
//! rounded to two decimals only at output.

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use crate::config::ReportingConfig;
use crate::error::AppResult;
use crate::store::Store;
use pims_shared::{Transaction, TransactionItem};

const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Calendar period granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Day,
    Week,
    Month,
    Year,
}

/// Parameters for a period totals query, as translated by the host layer
#[derive(Debug, Clone, Deserialize)]
pub struct PeriodQuery {
    pub period: PeriodType,
    /// Day scope: trailing window length
    pub days: Option<u32>,
    /// Week scope: report year, defaults to the current year
    pub year: Option<i32>,
    /// Week scope: restrict to one month of the year
    pub month: Option<u32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// One aggregate record per period instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSales {
    pub period: String,
    pub transaction_count: i64,
    pub total_sales: Decimal,
    pub total_vat: Decimal,
    pub total_units_sold: i64,
    /// Product with the highest summed quantity in the period; ties go
    /// to the alphabetically first name
    pub best_seller: Option<String>,
}

/// Ranking dimension for top-item queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopItemKind {
    Product,
    Category,
}

/// Date-range selector for top-item queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSelector {
    Day,
    Week,
    Month,
    Year,
    Range { from: NaiveDate, to: NaiveDate },
}

impl Default for RangeSelector {
    fn default() -> Self {
        RangeSelector::Month
    }
}

impl RangeSelector {
    /// Resolve to an inclusive local date range relative to `today`
    pub fn resolve(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            RangeSelector::Day => (today, today),
            RangeSelector::Week => {
                let start =
                    today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
                (start, start + Duration::days(6))
            }
            RangeSelector::Month => (month_start_of(today), month_end_of(today)),
            RangeSelector::Year => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap(),
            ),
            RangeSelector::Range { from, to } => {
                if from <= to {
                    (from, to)
                } else {
                    (to, from)
                }
            }
        }
    }
}

/// One entry of a top-N ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopItem {
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: Decimal,
    /// Revenue divided by quantity; zero when nothing was sold
    pub avg_unit_price: Decimal,
    /// Number of distinct transactions the item appeared in
    pub transaction_count: i64,
    /// Share of the total in-range revenue, in percent
    pub percentage_of_sales: Decimal,
}

/// Sales aggregation service
#[derive(Clone)]
pub struct SalesService {
    store: Store,
    config: ReportingConfig,
}

impl SalesService {
    pub fn new(db: PgPool, config: ReportingConfig) -> Self {
        Self {
            store: Store::new(db),
            config,
        }
    }

    /// Dispatch a period totals query to the matching report
    pub async fn period_totals(&self, query: &PeriodQuery) -> AppResult<Vec<PeriodSales>> {
        match query.period {
            PeriodType::Day => self.daily_totals(query.days).await,
            PeriodType::Week => self.weekly_totals(query.year, query.month).await,
            PeriodType::Month => self.monthly_totals(query.from, query.to).await,
            PeriodType::Year => {
                self.yearly_totals(
                    query.from.map(|d| d.year()),
                    query.to.map(|d| d.year()),
                )
                .await
            }
        }
    }

    /// Per-day totals over a trailing window ending today
    pub async fn daily_totals(&self, days: Option<u32>) -> AppResult<Vec<PeriodSales>> {
        let offset = self.config.reporting_offset();
        let days = days.unwrap_or(self.config.daily_window_days).max(1);
        let today = Utc::now().with_timezone(&offset).date_naive();
        let start = today - Duration::days(i64::from(days) - 1);

        let (from, to) = local_range_to_utc(start, today, offset);
        let transactions = self.store.transactions_between(from, to).await?;
        let items = self.store.transaction_items_between(from, to).await?;

        Ok(daily_sales(&transactions, &items, offset, today, days))
    }

    /// Per-week totals: ISO weeks of a year, or Monday-aligned spans of
    /// one month when `month` is given
    pub async fn weekly_totals(
        &self,
        year: Option<i32>,
        month: Option<u32>,
    ) -> AppResult<Vec<PeriodSales>> {
        let offset = self.config.reporting_offset();
        let today = Utc::now().with_timezone(&offset).date_naive();
        let year = year.unwrap_or_else(|| today.year());

        match month {
            Some(month) => {
                let month = month.clamp(1, 12);
                let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
                let end = month_end_of(start);
                let (from, to) = local_range_to_utc(start, end, offset);
                let transactions = self.store.transactions_between(from, to).await?;
                let items = self.store.transaction_items_between(from, to).await?;
                Ok(weekly_sales_for_month(
                    &transactions,
                    &items,
                    offset,
                    year,
                    month,
                ))
            }
            None => {
                let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
                let end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap();
                let (from, to) = local_range_to_utc(start, end, offset);
                let transactions = self.store.transactions_between(from, to).await?;
                let items = self.store.transaction_items_between(from, to).await?;
                Ok(weekly_sales_for_year(&transactions, &items, offset, year))
            }
        }
    }

    /// Per-month totals; defaults to the current calendar year
    pub async fn monthly_totals(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<PeriodSales>> {
        let offset = self.config.reporting_offset();
        let today = Utc::now().with_timezone(&offset).date_naive();
        let from = from.unwrap_or_else(|| NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap());
        let to = to.unwrap_or_else(|| NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap());
        let (from, to) = if from <= to { (from, to) } else { (to, from) };

        let start = month_start_of(from);
        let end = month_end_of(to);
        let (fetch_from, fetch_to) = local_range_to_utc(start, end, offset);
        let transactions = self.store.transactions_between(fetch_from, fetch_to).await?;
        let items = self
            .store
            .transaction_items_between(fetch_from, fetch_to)
            .await?;

        Ok(monthly_sales(&transactions, &items, offset, start, end))
    }

    /// Per-year totals; defaults to a trailing five-year window
    pub async fn yearly_totals(
        &self,
        from: Option<i32>,
        to: Option<i32>,
    ) -> AppResult<Vec<PeriodSales>> {
        let offset = self.config.reporting_offset();
        let today = Utc::now().with_timezone(&offset).date_naive();
        let to = to.unwrap_or_else(|| today.year());
        let from =
            from.unwrap_or_else(|| to - i32::try_from(self.config.yearly_window_years).unwrap_or(5) + 1);
        let (from, to) = if from <= to { (from, to) } else { (to, from) };

        let start = NaiveDate::from_ymd_opt(from, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(to, 12, 31).unwrap();
        let (fetch_from, fetch_to) = local_range_to_utc(start, end, offset);
        let transactions = self.store.transactions_between(fetch_from, fetch_to).await?;
        let items = self
            .store
            .transaction_items_between(fetch_from, fetch_to)
            .await?;

        Ok(yearly_sales(&transactions, &items, offset, from, to))
    }

    /// Top products or categories by revenue over the selected range
    pub async fn top_items(
        &self,
        kind: TopItemKind,
        limit: u32,
        range: RangeSelector,
    ) -> AppResult<Vec<TopItem>> {
        let offset = self.config.reporting_offset();
        let today = Utc::now().with_timezone(&offset).date_naive();
        let (start, end) = range.resolve(today);

        let (from, to) = local_range_to_utc(start, end, offset);
        let items = self.store.transaction_items_between(from, to).await?;

        let ranked = rank_top_items(&items, kind, limit);
        tracing::info!(entries = ranked.len(), ?kind, "top items ranked");
        Ok(ranked)
    }
}

/// Working accumulator for one period instance
#[derive(Debug, Default)]
struct Bucket {
    transaction_count: i64,
    total_sales: Decimal,
    total_vat: Decimal,
    total_units_sold: i64,
    units_by_product: HashMap<String, i64>,
}

impl Bucket {
    fn add_transaction(&mut self, tx: &Transaction) {
        self.transaction_count += 1;
        self.total_sales += tx.total;
        self.total_vat += tx.vat;
    }

    fn add_item(&mut self, item: &TransactionItem) {
        let quantity = item.quantity.max(0);
        self.total_units_sold += quantity;
        if let Some(name) = &item.product_name {
            *self.units_by_product.entry(name.clone()).or_insert(0) += quantity;
        }
    }

    fn into_period(self, label: String) -> PeriodSales {
        let best_seller = best_seller(&self.units_by_product);
        PeriodSales {
            period: label,
            transaction_count: self.transaction_count,
            total_sales: round_money(self.total_sales),
            total_vat: round_money(self.total_vat),
            total_units_sold: self.total_units_sold,
            best_seller,
        }
    }
}

/// Highest summed quantity wins; ties go to the alphabetically first name
fn best_seller(units: &HashMap<String, i64>) -> Option<String> {
    let mut best: Option<(&String, i64)> = None;
    for (name, &quantity) in units {
        if quantity <= 0 {
            continue;
        }
        match best {
            None => best = Some((name, quantity)),
            Some((best_name, best_quantity)) => {
                if quantity > best_quantity
                    || (quantity == best_quantity && name.as_str() < best_name.as_str())
                {
                    best = Some((name, quantity));
                }
            }
        }
    }
    best.map(|(name, _)| name.clone())
}

/// Group transactions and items into buckets keyed by `key_of` applied
/// to the local calendar date
fn bucket_by<K: Ord>(
    transactions: &[Transaction],
    items: &[TransactionItem],
    offset: FixedOffset,
    key_of: impl Fn(NaiveDate) -> Option<K>,
) -> BTreeMap<K, Bucket> {
    let mut buckets: BTreeMap<K, Bucket> = BTreeMap::new();
    for tx in transactions {
        let date = tx.ordered_at.with_timezone(&offset).date_naive();
        if let Some(key) = key_of(date) {
            buckets.entry(key).or_default().add_transaction(tx);
        }
    }
    for item in items {
        let date = item.ordered_at.with_timezone(&offset).date_naive();
        if let Some(key) = key_of(date) {
            buckets.entry(key).or_default().add_item(item);
        }
    }
    buckets
}

/// Daily totals for a trailing window of `days` ending on `window_end`,
/// zero-filled, labeled `YYYY-MM-DD`
pub fn daily_sales(
    transactions: &[Transaction],
    items: &[TransactionItem],
    offset: FixedOffset,
    window_end: NaiveDate,
    days: u32,
) -> Vec<PeriodSales> {
    let days = days.max(1);
    let start = window_end - Duration::days(i64::from(days) - 1);
    let mut buckets = bucket_by(transactions, items, offset, |d| {
        (d >= start && d <= window_end).then_some(d)
    });

    let mut out = Vec::with_capacity(days as usize);
    let mut day = start;
    while day <= window_end {
        out.push(
            buckets
                .remove(&day)
                .unwrap_or_default()
                .into_period(day.format("%Y-%m-%d").to_string()),
        );
        day += Duration::days(1);
    }
    out
}

/// Weekly totals for one calendar year, keyed by ISO week
///
/// Weeks start Monday; the week's Thursday determines which year owns
/// it. Every week of the target ISO year appears zero-filled; boundary
/// weeks owned by an adjacent ISO year appear only when they contain
/// data, labeled with their own year.
pub fn weekly_sales_for_year(
    transactions: &[Transaction],
    items: &[TransactionItem],
    offset: FixedOffset,
    year: i32,
) -> Vec<PeriodSales> {
    let mut buckets = bucket_by(transactions, items, offset, |d| {
        let week = d.iso_week();
        Some((week.year(), week.week()))
    });

    let keys: Vec<(i32, u32)> = buckets.keys().copied().collect();
    let mut out = Vec::new();
    for key in keys.iter().filter(|(y, _)| *y < year) {
        if let Some(bucket) = buckets.remove(key) {
            out.push(bucket.into_period(week_label(key.0, key.1)));
        }
    }
    for week in 1..=weeks_in_iso_year(year) {
        out.push(
            buckets
                .remove(&(year, week))
                .unwrap_or_default()
                .into_period(week_label(year, week)),
        );
    }
    for key in keys.iter().filter(|(y, _)| *y > year) {
        if let Some(bucket) = buckets.remove(key) {
            out.push(bucket.into_period(week_label(key.0, key.1)));
        }
    }
    out
}

/// Weekly totals for one month, partitioned into Monday-aligned 7-day
/// spans starting from the first Monday on or before the 1st
///
/// Spans are labeled `Week 1..n`. The final span is emitted zero-filled
/// when it lies fully inside the month; when it runs past the month end
/// it is folded in only if it actually contains transactions.
pub fn weekly_sales_for_month(
    transactions: &[Transaction],
    items: &[TransactionItem],
    offset: FixedOffset,
    year: i32,
    month: u32,
) -> Vec<PeriodSales> {
    let month = month.clamp(1, 12);
    let month_start = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    let month_end = month_end_of(month_start);
    let anchor =
        month_start - Duration::days(i64::from(month_start.weekday().num_days_from_monday()));
    let last_span = ((month_end - anchor).num_days() / 7) as u32;

    let mut buckets = bucket_by(transactions, items, offset, |d| {
        (d >= month_start && d <= month_end).then(|| ((d - anchor).num_days() / 7) as u32)
    });

    let mut out = Vec::new();
    for span in 0..=last_span {
        let span_end = anchor + Duration::days(i64::from(span) * 7 + 6);
        let bucket = buckets.remove(&span).unwrap_or_default();
        if span == last_span && span_end > month_end && bucket.transaction_count == 0 {
            continue;
        }
        out.push(bucket.into_period(format!("Week {}", span + 1)));
    }
    out
}

/// Monthly totals between two dates (normalized to whole months),
/// zero-filled, labeled by 3-letter abbreviation; the year is appended
/// when the range spans more than one calendar year
pub fn monthly_sales(
    transactions: &[Transaction],
    items: &[TransactionItem],
    offset: FixedOffset,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<PeriodSales> {
    let (from, to) = if from <= to { (from, to) } else { (to, from) };
    let first = (from.year(), from.month());
    let last = (to.year(), to.month());
    let multi_year = first.0 != last.0;

    let mut buckets = bucket_by(transactions, items, offset, |d| {
        let key = (d.year(), d.month());
        (key >= first && key <= last).then_some(key)
    });

    let mut out = Vec::new();
    let (mut year, mut month) = first;
    loop {
        let abbr = MONTH_ABBR[(month - 1) as usize];
        let label = if multi_year {
            format!("{} {}", abbr, year)
        } else {
            abbr.to_string()
        };
        out.push(
            buckets
                .remove(&(year, month))
                .unwrap_or_default()
                .into_period(label),
        );
        if (year, month) == last {
            break;
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    out
}

/// Yearly totals for an inclusive year range, zero-filled
pub fn yearly_sales(
    transactions: &[Transaction],
    items: &[TransactionItem],
    offset: FixedOffset,
    from_year: i32,
    to_year: i32,
) -> Vec<PeriodSales> {
    let (from_year, to_year) = if from_year <= to_year {
        (from_year, to_year)
    } else {
        (to_year, from_year)
    };

    let mut buckets = bucket_by(transactions, items, offset, |d| {
        (d.year() >= from_year && d.year() <= to_year).then_some(d.year())
    });

    (from_year..=to_year)
        .map(|year| {
            buckets
                .remove(&year)
                .unwrap_or_default()
                .into_period(year.to_string())
        })
        .collect()
}

/// Rank products or categories by summed revenue, descending, name
/// ascending on ties, truncated to the clamped limit
pub fn rank_top_items(
    items: &[TransactionItem],
    kind: TopItemKind,
    limit: u32,
) -> Vec<TopItem> {
    let limit = clamp_limit(limit);
    let total_revenue: Decimal = items.iter().map(|i| i.subtotal).sum();

    #[derive(Default)]
    struct Entry {
        quantity: i64,
        revenue: Decimal,
        transactions: HashSet<Uuid>,
    }

    let mut groups: HashMap<String, Entry> = HashMap::new();
    for item in items {
        let name = match kind {
            TopItemKind::Product => match &item.product_name {
                Some(name) => name.clone(),
                None => continue,
            },
            TopItemKind::Category => item
                .category
                .clone()
                .unwrap_or_else(|| "Uncategorized".to_string()),
        };
        let entry = groups.entry(name).or_default();
        entry.quantity += item.quantity.max(0);
        entry.revenue += item.subtotal;
        entry.transactions.insert(item.transaction_id);
    }

    let mut ranked: Vec<TopItem> = groups
        .into_iter()
        .map(|(name, entry)| {
            let avg_unit_price = if entry.quantity > 0 {
                round_money(entry.revenue / Decimal::from(entry.quantity))
            } else {
                Decimal::ZERO
            };
            let percentage_of_sales = if total_revenue > Decimal::ZERO {
                round_money(entry.revenue / total_revenue * Decimal::from(100))
            } else {
                Decimal::ZERO
            };
            TopItem {
                name,
                quantity_sold: entry.quantity,
                revenue: round_money(entry.revenue),
                avg_unit_price,
                transaction_count: entry.transactions.len() as i64,
                percentage_of_sales,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(limit);
    ranked
}

/// Clamp a requested top-N limit to the nearest accepted value (5 or 10)
pub fn clamp_limit(limit: u32) -> usize {
    if limit <= 7 {
        5
    } else {
        10
    }
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn week_label(year: i32, week: u32) -> String {
    format!("{}-W{:02}", year, week)
}

/// Number of ISO weeks in a year: the week containing December 28th
fn weeks_in_iso_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 28).unwrap().iso_week().week()
}

fn month_start_of(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap()
}

fn month_end_of(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap() - Duration::days(1)
}

/// Convert an inclusive local date range into UTC fetch bounds `[from, to)`
fn local_range_to_utc(
    from: NaiveDate,
    to: NaiveDate,
    offset: FixedOffset,
) -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
    let shift = Duration::seconds(i64::from(offset.local_minus_utc()));
    let start = (from.and_hms_opt(0, 0, 0).unwrap() - shift).and_utc();
    let end = ((to + Duration::days(1)).and_hms_opt(0, 0, 0).unwrap() - shift).and_utc();
    (start, end)
}
