//! # Sales Aggregator
//!
//! Folds orders and refunds into one [`AggregateSummary`]: gross and net
//! sales, counts, payment breakdowns, top products and a daily series.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Order[] ──┐                                                            │
//! │            ├──► aggregate(orders, refunds, window?, options)            │
//! │  Refund[] ─┘         │                                                  │
//! │                      ├── drop Cancelled orders                          │
//! │                      ├── drop undated, window? drop out-of-range        │
//! │                      ├── negative amounts count as zero                 │
//! │                      ▼                                                  │
//! │              AggregateSummary (derived fresh, never stored)             │
//! │                      │                                                  │
//! │        dashboard ◄───┼───► branch report ◄───► shift close              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Aggregation never fails. Records the aggregator had to drop or correct
//! are counted in `skipped_records`.
//!
//! ```rust
//! use tally_core::report::{aggregate, AggregateOptions};
//!
//! let summary = aggregate(&[], &[], None, &AggregateOptions::default());
//! assert_eq!(summary.order_count, 0);
//! assert!(summary.avg_order_value.is_zero());
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Order, OrderStatus, PaymentType, Refund};

/// Default length of the top products list.
pub const DEFAULT_TOP_PRODUCTS: usize = 5;

// =============================================================================
// Window & Options
// =============================================================================

/// An inclusive `[from, to]` time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ReportWindow {
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        ReportWindow { from, to }
    }

    /// Start of `start` through the last instant of `end`, in `offset` local time.
    pub fn days(start: NaiveDate, end: NaiveDate, offset: FixedOffset) -> Self {
        let shift = Duration::seconds(i64::from(offset.local_minus_utc()));
        let from = start.and_time(NaiveTime::MIN).and_utc() - shift;
        let to = end.and_time(NaiveTime::MIN).and_utc() - shift + Duration::days(1)
            - Duration::nanoseconds(1);
        ReportWindow { from, to }
    }

    #[inline]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }
}

/// Knobs for one aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Length of `top_products`.
    pub top_n: usize,
    /// Offset used to decide which calendar day a record falls on.
    pub utc_offset: FixedOffset,
}

impl AggregateOptions {
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Out-of-range offsets fall back to UTC.
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        self
    }
}

impl Default for AggregateOptions {
    fn default() -> Self {
        AggregateOptions {
            top_n: DEFAULT_TOP_PRODUCTS,
            utc_offset: Utc.fix(),
        }
    }
}

// =============================================================================
// Summary Types
// =============================================================================

/// One row of the top products list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSales {
    pub product_id: String,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: Money,
}

/// Totals for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailySales {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub sales: Money,
    pub refunds: Money,
    pub order_count: usize,
}

/// The derived view every dashboard, report and shift close renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AggregateSummary {
    pub gross_sales: Money,
    /// `gross_sales − refund_total`; negative when refunds outrun sales.
    pub net_sales: Money,
    pub refund_total: Money,
    pub order_count: usize,
    pub refund_count: usize,
    pub avg_order_value: Money,
    /// Gross sales by verbatim payment code.
    pub payment_breakdown: BTreeMap<PaymentType, Money>,
    /// Refunds by disbursement method.
    pub refund_breakdown: BTreeMap<PaymentType, Money>,
    pub top_products: Vec<ProductSales>,
    pub daily_series: Vec<DailySales>,
    /// Records dropped for a missing timestamp or counted with a zeroed amount.
    pub skipped_records: usize,
}

// =============================================================================
// Aggregate
// =============================================================================

#[derive(Default)]
struct ProductAcc {
    name: String,
    quantity: i64,
    revenue: Money,
}

#[derive(Default)]
struct DayAcc {
    sales: Money,
    refunds: Money,
    order_count: usize,
}

/// The local day a record lands on, or `None` to drop it.
///
/// Undated records are always dropped and counted as skipped; dated records
/// outside the window are dropped silently.
fn place(
    created_at: Option<DateTime<Utc>>,
    window: Option<&ReportWindow>,
    offset: FixedOffset,
    skipped: &mut usize,
) -> Option<NaiveDate> {
    let Some(at) = created_at else {
        *skipped += 1;
        return None;
    };
    if window.is_some_and(|w| !w.contains(at)) {
        return None;
    }
    Some(at.with_timezone(&offset).date_naive())
}

/// Sums an amount, treating negatives as zero.
fn tolerant(amount: Money, skipped: &mut usize) -> Money {
    if amount.is_negative() {
        *skipped += 1;
        return Money::zero();
    }
    amount
}

/// Aggregates orders and refunds into a summary.
///
/// ## Rules
/// - `Cancelled` orders are left out entirely.
/// - Records without a `created_at` are left out and counted in
///   `skipped_records`. With a window, a record must also fall inside it.
/// - The daily series is zero-filled over the window, or over the dated
///   records' span when there is no window.
/// - Top products sort by revenue, then quantity (both descending), then
///   product id.
///
/// The result depends only on the multiset of inputs, never their order.
pub fn aggregate(
    orders: &[Order],
    refunds: &[Refund],
    window: Option<&ReportWindow>,
    options: &AggregateOptions,
) -> AggregateSummary {
    let offset = options.utc_offset;
    let mut summary = AggregateSummary::default();
    let mut products: HashMap<&str, ProductAcc> = HashMap::new();
    let mut days: BTreeMap<NaiveDate, DayAcc> = BTreeMap::new();

    for order in orders.iter().filter(|o| o.status != OrderStatus::Cancelled) {
        let Some(day) = place(order.created_at, window, offset, &mut summary.skipped_records)
        else {
            continue;
        };
        let amount = tolerant(order.total_amount, &mut summary.skipped_records);

        summary.gross_sales += amount;
        summary.order_count += 1;
        *summary
            .payment_breakdown
            .entry(order.payment_type.clone())
            .or_default() += amount;

        let acc = days.entry(day).or_default();
        acc.sales += amount;
        acc.order_count += 1;

        for line in &order.lines {
            let acc = products.entry(line.product_id.as_str()).or_default();
            acc.quantity = acc.quantity.saturating_add(line.quantity.max(0));
            acc.revenue += line.line_total.floor_zero();
            // Smallest non-empty name keeps the pick independent of input order
            if !line.name.is_empty() && (acc.name.is_empty() || line.name < acc.name) {
                acc.name = line.name.clone();
            }
        }
    }

    for refund in refunds {
        let Some(day) = place(refund.created_at, window, offset, &mut summary.skipped_records)
        else {
            continue;
        };
        let amount = tolerant(refund.amount, &mut summary.skipped_records);

        summary.refund_total += amount;
        summary.refund_count += 1;
        *summary
            .refund_breakdown
            .entry(refund.payment_type.clone())
            .or_default() += amount;

        days.entry(day).or_default().refunds += amount;
    }

    summary.net_sales = summary.gross_sales - summary.refund_total;
    summary.avg_order_value = summary.gross_sales.average_over(summary.order_count);
    summary.top_products = rank_products(products, options.top_n);
    summary.daily_series = fill_days(days, window, offset);
    summary
}

fn rank_products(products: HashMap<&str, ProductAcc>, top_n: usize) -> Vec<ProductSales> {
    let mut ranked: Vec<ProductSales> = products
        .into_iter()
        .map(|(product_id, acc)| ProductSales {
            product_id: product_id.to_string(),
            name: acc.name,
            quantity_sold: acc.quantity,
            revenue: acc.revenue,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| b.quantity_sold.cmp(&a.quantity_sold))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    ranked.truncate(top_n);
    ranked
}

fn fill_days(
    mut days: BTreeMap<NaiveDate, DayAcc>,
    window: Option<&ReportWindow>,
    offset: FixedOffset,
) -> Vec<DailySales> {
    let span = match window {
        Some(w) => Some((
            w.from.with_timezone(&offset).date_naive(),
            w.to.with_timezone(&offset).date_naive(),
        )),
        None => days
            .keys()
            .next()
            .copied()
            .zip(days.keys().next_back().copied()),
    };
    let Some((first, last)) = span else {
        return Vec::new();
    };

    let mut series = Vec::new();
    let mut date = first;
    while date <= last {
        let acc = days.remove(&date).unwrap_or_default();
        series.push(DailySales {
            date,
            sales: acc.sales,
            refunds: acc.refunds,
            order_count: acc.order_count,
        });
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    series
}

// =============================================================================
// Unit Tests
// =============================================================================
