//! Result objects produced by the reconciliation engine and the tenant monitor. All of these are
//! ephemeral: regenerated on every run, never persisted.

use chrono::{Datelike, Duration, NaiveDate};
use rpg_common::Ugx;
use serde::{Deserialize, Serialize};

use crate::db_types::TenantCategory;

//--------------------------------------       Period         ---------------------------------------------------------
/// A calendar-month reconciliation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    /// The inclusive first and last day of the month, or `None` for a nonsense year/month pair.
    pub fn window(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = NaiveDate::from_ymd_opt(self.year, self.month, 1)?;
        let next_month = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)?
        };
        Some((start, next_month - Duration::days(1)))
    }
}

//--------------------------------------  ReconciliationReport ------------------------------------------------------
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_transactions: usize,
    pub total_expected: usize,
    pub matched: usize,
    pub unmatched_mobile: usize,
    pub unmatched_expected: usize,
    pub amount_discrepancies: usize,
    pub total_received: Ugx,
    pub total_expected_amount: Ugx,
    pub discrepancies: Vec<AmountDiscrepancy>,
    pub unpaid_tenants: Vec<UnpaidTenant>,
    pub unmatched_payments: Vec<UnmatchedPayment>,
}

/// A matched transaction whose amount strays further from the expectation than the configured
/// tolerance allows.
#[derive(Debug, Clone, Serialize)]
pub struct AmountDiscrepancy {
    pub tenant_id: i64,
    pub tenant_name: String,
    pub transaction_id: i64,
    pub expected: Ugx,
    pub paid: Ugx,
    /// Signed: positive when the tenant overpaid, negative when they underpaid.
    pub difference: Ugx,
}

/// An active tenant the window expected rent from, with no matching transaction.
#[derive(Debug, Clone, Serialize)]
pub struct UnpaidTenant {
    pub tenant_id: i64,
    pub tenant_name: String,
    pub unit_id: i64,
    pub expected_amount: Ugx,
    pub category: TenantCategory,
    pub due_date: Option<NaiveDate>,
}

/// A confirmed money movement with no tenant link.
#[derive(Debug, Clone, Serialize)]
pub struct UnmatchedPayment {
    pub transaction_id: i64,
    pub external_id: String,
    pub amount: Ugx,
    pub payer_phone: String,
    pub provider_tx_id: Option<String>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

//--------------------------------------   AutoMatchOutcome   ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize)]
pub struct AutoMatchOutcome {
    pub matched: usize,
    pub unmatched: usize,
    pub ambiguous: Vec<AmbiguousMatch>,
}

/// More than one tenant fits an unlinked transaction. Reported, never guessed at.
#[derive(Debug, Clone, Serialize)]
pub struct AmbiguousMatch {
    pub transaction_id: i64,
    pub external_id: String,
    pub candidate_tenant_ids: Vec<i64>,
}
