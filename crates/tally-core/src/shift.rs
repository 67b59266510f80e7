//! # Shift/Session Aggregator
//!
//! Opening and closing cashier sessions, who is on duty, and the
//! shift-close summary.
//!
//! ## Session Lifecycle
//! ```text
//! open_session() ──► ShiftSession { shift_end: None }
//!                          │
//!                          │  active_staff() / current_session() see it
//!                          ▼
//! close_session() ──► ShiftSession { shift_end: Some(t) }   (exactly once)
//!                          │
//!                          ▼
//! shift_summary() ──► aggregate() over the cashier's records in [start, end]
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ShiftError;
use crate::report::{aggregate, AggregateOptions, AggregateSummary, ReportWindow};
use crate::types::{Order, Refund, ShiftSession};

/// Default number of days without a session before a cashier is inactive.
pub const DEFAULT_INACTIVE_AFTER_DAYS: i64 = 7;

/// Thresholds for the staff activity view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffPolicy {
    pub inactive_after_days: i64,
}

impl Default for StaffPolicy {
    fn default() -> Self {
        StaffPolicy {
            inactive_after_days: DEFAULT_INACTIVE_AFTER_DAYS,
        }
    }
}

/// One roster entry of the staff activity view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StaffStatus {
    pub cashier_id: String,
    /// Holds a session open at `as_of`.
    pub active: bool,
    /// Latest session activity at or before `as_of`.
    #[ts(as = "Option<String>")]
    pub last_seen: Option<DateTime<Utc>>,
    pub inactive: bool,
}

/// The shift-close report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShiftSummary {
    pub session_id: String,
    pub cashier_id: String,
    pub summary: AggregateSummary,
    /// Whole hours, rounded down.
    pub duration_hours: i64,
    pub is_open: bool,
}

/// Starts a session for a cashier with none open.
pub fn open_session(
    cashier_id: &str,
    branch_id: &str,
    existing: &[ShiftSession],
    now: DateTime<Utc>,
) -> Result<ShiftSession, ShiftError> {
    if let Some(open) = current_session(cashier_id, existing) {
        return Err(ShiftError::SessionAlreadyOpen {
            cashier_id: cashier_id.to_string(),
            session_id: open.id.clone(),
        });
    }

    Ok(ShiftSession {
        id: Uuid::new_v4().to_string(),
        cashier_id: cashier_id.to_string(),
        branch_id: branch_id.to_string(),
        shift_start: now,
        shift_end: None,
    })
}

/// The cashier's open session; the latest started if there are several.
pub fn current_session<'a>(
    cashier_id: &str,
    sessions: &'a [ShiftSession],
) -> Option<&'a ShiftSession> {
    sessions
        .iter()
        .filter(|s| s.cashier_id == cashier_id && s.is_open())
        .max_by(|a, b| a.shift_start.cmp(&b.shift_start).then_with(|| a.id.cmp(&b.id)))
}

/// Cashiers with a session open and started at `as_of`.
pub fn active_staff(sessions: &[ShiftSession], as_of: DateTime<Utc>) -> BTreeSet<String> {
    sessions
        .iter()
        .filter(|s| s.is_active_at(as_of))
        .map(|s| s.cashier_id.clone())
        .collect()
}

/// Returns the closed copy of `session`; the input is left as is.
pub fn close_session(
    session: &ShiftSession,
    end_time: DateTime<Utc>,
) -> Result<ShiftSession, ShiftError> {
    if !session.is_open() {
        return Err(ShiftError::AlreadyClosed(session.id.clone()));
    }
    if end_time < session.shift_start {
        return Err(ShiftError::InvalidEndTime {
            session_id: session.id.clone(),
        });
    }

    let mut closed = session.clone();
    closed.shift_end = Some(end_time);
    Ok(closed)
}

/// Aggregates the session cashier's orders and refunds over the session.
///
/// An open session runs until `now`.
pub fn shift_summary(
    session: &ShiftSession,
    orders: &[Order],
    refunds: &[Refund],
    now: DateTime<Utc>,
    options: &AggregateOptions,
) -> ShiftSummary {
    let end = session.end_or(now);
    let window = ReportWindow::between(session.shift_start, end);

    let orders: Vec<Order> = orders
        .iter()
        .filter(|o| o.cashier_id == session.cashier_id)
        .cloned()
        .collect();
    let refunds: Vec<Refund> = refunds
        .iter()
        .filter(|r| r.cashier_id == session.cashier_id)
        .cloned()
        .collect();

    ShiftSummary {
        session_id: session.id.clone(),
        cashier_id: session.cashier_id.clone(),
        summary: aggregate(&orders, &refunds, Some(&window), options),
        duration_hours: (end - session.shift_start).num_hours().max(0),
        is_open: session.is_open(),
    }
}

/// Activity for each roster cashier as of `as_of`.
///
/// A cashier is inactive when not on duty and their last activity is older
/// than the policy threshold, or when they have never worked a session.
pub fn staff_activity(
    roster: &[String],
    sessions: &[ShiftSession],
    as_of: DateTime<Utc>,
    policy: &StaffPolicy,
) -> Vec<StaffStatus> {
    let threshold = Duration::days(policy.inactive_after_days.max(0));

    roster
        .iter()
        .map(|cashier_id| {
            let own = sessions
                .iter()
                .filter(|s| &s.cashier_id == cashier_id && s.shift_start <= as_of);
            let active = own.clone().any(|s| s.is_active_at(as_of));
            let last_seen = own
                .map(|s| match s.shift_end {
                    Some(end) => end.min(as_of),
                    None => as_of,
                })
                .max();
            let inactive = !active && last_seen.map_or(true, |seen| as_of - seen > threshold);

            StaffStatus {
                cashier_id: cashier_id.clone(),
                active,
                last_seen,
                inactive,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::{OrderStatus, PaymentType};
    use chrono::TimeZone;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, hour, 0, 0).unwrap()
    }

    fn session(
        id: &str,
        cashier: &str,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> ShiftSession {
        ShiftSession {
            id: id.into(),
            cashier_id: cashier.into(),
            branch_id: "b-1".into(),
            shift_start: start,
            shift_end: end,
        }
    }

    fn order(cashier: &str, total: i64, at: DateTime<Utc>) -> Order {
        Order {
            id: format!("o-{cashier}-{total}"),
            branch_id: "b-1".into(),
            cashier_id: cashier.into(),
            customer_id: None,
            lines: vec![],
            payment_type: PaymentType::cash(),
            status: OrderStatus::Completed,
            subtotal: Money::from_major(total),
            discount: Money::zero(),
            total_amount: Money::from_major(total),
            created_at: Some(at),
        }
    }

    #[test]
    fn test_active_staff() {
        let sessions = vec![
            session("s-1", "1", t(8), None),
            session("s-2", "2", t(8), Some(t(12))),
        ];
        let active = active_staff(&sessions, t(13));
        assert_eq!(active, BTreeSet::from(["1".to_string()]));

        // Not yet started
        assert!(active_staff(&sessions, t(7)).is_empty());
    }

    #[test]
    fn test_open_session_rejects_second_open() {
        let first = open_session("c-1", "b-1", &[], t(8)).unwrap();
        assert!(first.is_open());

        let err = open_session("c-1", "b-1", &[first.clone()], t(9)).unwrap_err();
        assert_eq!(
            err,
            ShiftError::SessionAlreadyOpen {
                cashier_id: "c-1".into(),
                session_id: first.id.clone(),
            }
        );

        // Another cashier is unaffected
        assert!(open_session("c-2", "b-1", &[first], t(9)).is_ok());
    }

    #[test]
    fn test_close_session_once() {
        let open = session("s-1", "c-1", t(8), None);
        let closed = close_session(&open, t(16)).unwrap();
        assert_eq!(closed.shift_end, Some(t(16)));
        assert!(open.is_open());

        assert_eq!(
            close_session(&closed, t(17)).unwrap_err(),
            ShiftError::AlreadyClosed("s-1".into())
        );
        assert_eq!(
            close_session(&open, t(7)).unwrap_err(),
            ShiftError::InvalidEndTime {
                session_id: "s-1".into()
            }
        );
    }

    #[test]
    fn test_current_session_picks_open_one() {
        let sessions = vec![
            session("s-1", "c-1", t(1), Some(t(2))),
            session("s-2", "c-1", t(3), None),
            session("s-3", "c-2", t(4), None),
        ];
        assert_eq!(current_session("c-1", &sessions).map(|s| s.id.as_str()), Some("s-2"));
        assert!(current_session("c-9", &sessions).is_none());
    }

    #[test]
    fn test_shift_summary_scopes_cashier_and_window() {
        let session = session("s-1", "c-1", t(8), Some(t(13)));
        let orders = vec![
            order("c-1", 40, t(9)),
            order("c-1", 60, t(13)),
            order("c-1", 99, t(14)),
            order("c-2", 70, t(10)),
        ];
        let summary = shift_summary(&session, &orders, &[], t(20), &AggregateOptions::default());

        assert_eq!(summary.summary.gross_sales, Money::from_major(100));
        assert_eq!(summary.summary.order_count, 2);
        assert_eq!(summary.duration_hours, 5);
        assert!(!summary.is_open);
    }

    #[test]
    fn test_open_shift_runs_until_now() {
        let session = session("s-1", "c-1", t(8), None);
        let now = t(11) + Duration::minutes(59);
        let orders = vec![order("c-1", 10, t(11))];
        let summary = shift_summary(&session, &orders, &[], now, &AggregateOptions::default());

        assert!(summary.is_open);
        assert_eq!(summary.duration_hours, 3);
        assert_eq!(summary.summary.gross_sales, Money::from_major(10));
    }

    #[test]
    fn test_staff_activity_threshold() {
        let as_of = t(12);
        let sessions = vec![
            session("s-1", "on-duty", t(8), None),
            session("s-2", "recent", as_of - Duration::days(2), Some(as_of - Duration::days(2))),
            session("s-3", "stale", as_of - Duration::days(30), Some(as_of - Duration::days(29))),
        ];
        let roster: Vec<String> = ["on-duty", "recent", "stale", "never"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let statuses = staff_activity(&roster, &sessions, as_of, &StaffPolicy::default());
        let flags: Vec<(bool, bool)> = statuses.iter().map(|s| (s.active, s.inactive)).collect();
        assert_eq!(
            flags,
            vec![(true, false), (false, false), (false, true), (false, true)]
        );
        assert_eq!(statuses[0].last_seen, Some(as_of));
        assert!(statuses[3].last_seen.is_none());

        let strict = StaffPolicy {
            inactive_after_days: 1,
        };
        assert!(staff_activity(&roster, &sessions, as_of, &strict)[1].inactive);
    }
}
