//! # Shift Desk
//!
//! Opens and closes cashier sessions and builds the shift-close report.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use tally_core::shift::{self, ShiftSummary, StaffPolicy, StaffStatus};
use tally_core::{AggregateOptions, ReportWindow, ShiftError, ShiftSession};

use crate::error::LedgerResult;
use crate::store::{OrderStore, RecordQuery, RefundStore, ShiftSessionStore};

pub struct ShiftDesk {
    sessions: Arc<dyn ShiftSessionStore>,
    orders: Arc<dyn OrderStore>,
    refunds: Arc<dyn RefundStore>,
    options: AggregateOptions,
    policy: StaffPolicy,
    // Serializes open/close so a cashier cannot end up with two open sessions
    writes: Mutex<()>,
}

impl ShiftDesk {
    pub fn new(
        sessions: Arc<dyn ShiftSessionStore>,
        orders: Arc<dyn OrderStore>,
        refunds: Arc<dyn RefundStore>,
        options: AggregateOptions,
        policy: StaffPolicy,
    ) -> Self {
        ShiftDesk {
            sessions,
            orders,
            refunds,
            options,
            policy,
            writes: Mutex::new(()),
        }
    }

    async fn cashier_sessions(&self, cashier_id: &str) -> LedgerResult<Vec<ShiftSession>> {
        self.sessions
            .list(&RecordQuery::all().cashier(cashier_id))
            .await
    }

    async fn load(&self, session_id: &str) -> LedgerResult<ShiftSession> {
        self.sessions
            .get(session_id)
            .await?
            .ok_or_else(|| ShiftError::SessionNotFound(session_id.to_string()).into())
    }

    pub async fn open(&self, cashier_id: &str, branch_id: &str) -> LedgerResult<ShiftSession> {
        self.open_at(cashier_id, branch_id, Utc::now()).await
    }

    pub async fn open_at(
        &self,
        cashier_id: &str,
        branch_id: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<ShiftSession> {
        let _guard = self.writes.lock().await;

        let existing = self.cashier_sessions(cashier_id).await?;
        let session = match shift::open_session(cashier_id, branch_id, &existing, now) {
            Ok(session) => session,
            Err(e) => {
                warn!(cashier_id = %cashier_id, error = %e, "Shift open rejected");
                return Err(e.into());
            }
        };
        let session = self.sessions.save(session).await?;

        info!(
            session_id = %session.id,
            cashier_id = %cashier_id,
            branch_id = %branch_id,
            "Shift opened"
        );
        Ok(session)
    }

    pub async fn close(&self, session_id: &str) -> LedgerResult<ShiftSession> {
        self.close_at(session_id, Utc::now()).await
    }

    pub async fn close_at(
        &self,
        session_id: &str,
        end_time: DateTime<Utc>,
    ) -> LedgerResult<ShiftSession> {
        let _guard = self.writes.lock().await;

        let session = self.load(session_id).await?;
        let closed = shift::close_session(&session, end_time)?;
        let closed = self.sessions.save(closed).await?;

        info!(session_id = %closed.id, cashier_id = %closed.cashier_id, "Shift closed");
        Ok(closed)
    }

    pub async fn current(&self, cashier_id: &str) -> LedgerResult<Option<ShiftSession>> {
        let sessions = self.cashier_sessions(cashier_id).await?;
        Ok(shift::current_session(cashier_id, &sessions).cloned())
    }

    /// The shift-close report; an open session is reported up to `now`.
    pub async fn summary(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<ShiftSummary> {
        let session = self.load(session_id).await?;
        let query = RecordQuery::all()
            .cashier(&session.cashier_id)
            .within(ReportWindow::between(session.shift_start, session.end_or(now)));

        let orders = self.orders.list(&query).await?;
        let refunds = self.refunds.list(&query).await?;
        Ok(shift::shift_summary(&session, &orders, &refunds, now, &self.options))
    }

    pub async fn active_staff(
        &self,
        branch_id: &str,
        as_of: DateTime<Utc>,
    ) -> LedgerResult<BTreeSet<String>> {
        let sessions = self
            .sessions
            .list(&RecordQuery::all().branch(branch_id))
            .await?;
        Ok(shift::active_staff(&sessions, as_of))
    }

    pub async fn staff_activity(
        &self,
        branch_id: &str,
        roster: &[String],
        as_of: DateTime<Utc>,
    ) -> LedgerResult<Vec<StaffStatus>> {
        let sessions = self
            .sessions
            .list(&RecordQuery::all().branch(branch_id))
            .await?;
        Ok(shift::staff_activity(roster, &sessions, as_of, &self.policy))
    }
}
