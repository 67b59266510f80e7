//! # Branch Reports
//!
//! Dashboard summaries for one branch. Records are fetched by branch and
//! the window is applied by the aggregator, so undated records are reported
//! in `skipped_records` instead of vanishing in the store query.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use tally_core::report::aggregate;
use tally_core::{AggregateOptions, AggregateSummary, ReportWindow};

use crate::error::LedgerResult;
use crate::store::{OrderStore, RecordQuery, RefundStore};

pub struct BranchReports {
    orders: Arc<dyn OrderStore>,
    refunds: Arc<dyn RefundStore>,
    options: AggregateOptions,
}

impl BranchReports {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        refunds: Arc<dyn RefundStore>,
        options: AggregateOptions,
    ) -> Self {
        BranchReports {
            orders,
            refunds,
            options,
        }
    }

    /// Summary over an optional window.
    pub async fn summary(
        &self,
        branch_id: &str,
        window: Option<ReportWindow>,
    ) -> LedgerResult<AggregateSummary> {
        let query = RecordQuery::all().branch(branch_id);
        let orders = self.orders.list(&query).await?;
        let refunds = self.refunds.list(&query).await?;

        let summary = aggregate(&orders, &refunds, window.as_ref(), &self.options);
        debug!(
            branch_id = %branch_id,
            orders = summary.order_count,
            refunds = summary.refund_count,
            skipped = summary.skipped_records,
            "Branch summary computed"
        );
        Ok(summary)
    }

    /// Summary over whole local days `start..=end`.
    pub async fn days(
        &self,
        branch_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<AggregateSummary> {
        let window = ReportWindow::days(start, end, self.options.utc_offset);
        self.summary(branch_id, Some(window)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryOrderStore, InMemoryRefundStore};
    use chrono::{DateTime, TimeZone, Utc};
    use tally_core::{Money, Order, OrderStatus, PaymentType, Refund};

    fn order(id: &str, branch: &str, total: i64, at: Option<DateTime<Utc>>) -> Order {
        Order {
            id: id.into(),
            branch_id: branch.into(),
            cashier_id: "c-1".into(),
            customer_id: None,
            lines: vec![],
            payment_type: PaymentType::card(),
            status: OrderStatus::Completed,
            subtotal: Money::from_major(total),
            discount: Money::zero(),
            total_amount: Money::from_major(total),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_branch_day_summary() {
        let day = Utc.with_ymd_and_hms(2024, 8, 2, 11, 0, 0).unwrap();
        let orders = Arc::new(InMemoryOrderStore::new());
        let refunds = Arc::new(InMemoryRefundStore::new());

        orders.save(order("o-1", "b-1", 225, Some(day))).await.unwrap();
        orders.save(order("o-2", "b-1", 75, Some(day))).await.unwrap();
        orders.save(order("o-3", "b-2", 500, Some(day))).await.unwrap();
        orders.save(order("o-4", "b-1", 10, None)).await.unwrap();
        refunds
            .save(Refund {
                id: "r-1".into(),
                order_id: "o-1".into(),
                reason: "damaged".into(),
                amount: Money::from_major(50),
                payment_type: PaymentType::card(),
                cashier_id: "c-1".into(),
                branch_id: "b-1".into(),
                shift_report_id: None,
                lines: vec![],
                created_at: Some(day),
            })
            .await
            .unwrap();

        let reports = BranchReports::new(orders, refunds, AggregateOptions::default());
        let summary = reports
            .days("b-1", day.date_naive(), day.date_naive())
            .await
            .unwrap();

        assert_eq!(summary.gross_sales, Money::from_major(300));
        assert_eq!(summary.net_sales, Money::from_major(250));
        assert_eq!(summary.avg_order_value, Money::from_major(150));
        assert_eq!(summary.skipped_records, 1);

        let all_time = reports.summary("b-1", None).await.unwrap();
        assert_eq!(all_time.gross_sales, Money::from_major(300));
        assert_eq!(all_time.skipped_records, 1);
    }
}
