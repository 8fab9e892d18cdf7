use std::collections::{HashMap, HashSet};

use chrono::Utc;
use log::*;
use rpg_common::{helpers::normalize_phone, Ugx};

use crate::{
    db_types::{MobileTransaction, Tenant},
    rpe_api::report_objects::{
        AmbiguousMatch,
        AmountDiscrepancy,
        AutoMatchOutcome,
        Period,
        ReconciliationReport,
        UnmatchedPayment,
        UnpaidTenant,
    },
    traits::{PaymentEngineError, PaymentStore, TenantDirectory},
};

/// Matched amounts may stray this far from the expectation before being reported.
pub const DEFAULT_DISCREPANCY_TOLERANCE: i64 = 1;
/// Auto-match accepts amounts within this fraction of the tenant's monthly rent.
pub const DEFAULT_AUTO_MATCH_VARIANCE: f64 = 0.10;

/// `ReconciliationApi` batch-matches confirmed money movements against what tenants owe for a
/// period, and reports what it could not match rather than guessing.
#[derive(Clone)]
pub struct ReconciliationApi<B> {
    db: B,
    discrepancy_tolerance: Ugx,
    auto_match_variance: f64,
}

impl<B> ReconciliationApi<B> {
    pub fn new(db: B) -> Self {
        Self {
            db,
            discrepancy_tolerance: Ugx::from(DEFAULT_DISCREPANCY_TOLERANCE),
            auto_match_variance: DEFAULT_AUTO_MATCH_VARIANCE,
        }
    }

    /// Overrides the matching tolerances. Both defaults are operational judgement calls, so they
    /// are data here, not semantics.
    pub fn with_tolerances(mut self, discrepancy_tolerance: Ugx, auto_match_variance: f64) -> Self {
        self.discrepancy_tolerance = discrepancy_tolerance;
        self.auto_match_variance = auto_match_variance;
        self
    }
}

impl<B> ReconciliationApi<B>
where B: PaymentStore + TenantDirectory
{
    /// Reconciles one calendar month: confirmed transactions completed in the window against the
    /// active tenants expected to pay rent in it.
    pub async fn reconcile(
        &self,
        period: Period,
        property_id: Option<i64>,
    ) -> Result<ReconciliationReport, PaymentEngineError> {
        let (start, end) =
            period.window().ok_or(PaymentEngineError::InvalidPeriod(period.year, period.month))?;
        let transactions = self.db.paid_transactions_in_window(start, end).await?;
        let tenants = self.db.active_tenants(property_id).await?;
        let tenant_index: HashMap<i64, &Tenant> = tenants.iter().map(|t| (t.id, t)).collect();

        let mut report = ReconciliationReport {
            period_start: start,
            period_end: end,
            total_transactions: transactions.len(),
            total_expected: tenants.len(),
            matched: 0,
            unmatched_mobile: 0,
            unmatched_expected: 0,
            amount_discrepancies: 0,
            total_received: transactions.iter().map(|tx| tx.amount).sum(),
            total_expected_amount: tenants.iter().map(|t| t.monthly_rent).sum(),
            discrepancies: Vec::new(),
            unpaid_tenants: Vec::new(),
            unmatched_payments: Vec::new(),
        };

        let mut matched_tenant_ids = HashSet::new();
        for tx in &transactions {
            let tenant_id = match tx.tenant_id {
                Some(id) => id,
                None => {
                    report.unmatched_mobile += 1;
                    report.unmatched_payments.push(unmatched_payment(tx));
                    continue;
                },
            };
            matched_tenant_ids.insert(tenant_id);
            report.matched += 1;
            // The linked tenant may have gone inactive since paying; fall back to a point lookup.
            let tenant = match tenant_index.get(&tenant_id) {
                Some(t) => (*t).clone(),
                None => match self.db.tenant_by_id(tenant_id).await? {
                    Some(t) => t,
                    None => {
                        warn!("🧮️ Transaction [{}] links to missing tenant #{tenant_id}", tx.external_id);
                        continue;
                    },
                },
            };
            let expected = tenant.monthly_rent * tx.months_advance.max(1);
            if expected.abs_diff(tx.amount) > self.discrepancy_tolerance {
                report.amount_discrepancies += 1;
                report.discrepancies.push(AmountDiscrepancy {
                    tenant_id,
                    tenant_name: tenant.full_name(),
                    transaction_id: tx.id,
                    expected,
                    paid: tx.amount,
                    difference: tx.amount - expected,
                });
            }
        }

        for tenant in tenants.iter().filter(|t| !matched_tenant_ids.contains(&t.id)) {
            report.unmatched_expected += 1;
            report.unpaid_tenants.push(UnpaidTenant {
                tenant_id: tenant.id,
                tenant_name: tenant.full_name(),
                unit_id: tenant.unit_id,
                expected_amount: tenant.monthly_rent,
                category: tenant.category,
                due_date: tenant.next_payment_due,
            });
        }

        info!(
            "🧮️ Reconciliation {start}..{end}: {} matched, {} unmatched tenants, {} unmatched payments, {} discrepancies",
            report.matched, report.unmatched_expected, report.unmatched_mobile, report.amount_discrepancies
        );
        Ok(report)
    }

    /// Attempts to resolve unlinked confirmed transactions by payer phone plus amount proximity.
    /// A unique candidate is linked and receives the same tenant-side effects as a confirmed
    /// payment; anything ambiguous is reported untouched.
    pub async fn auto_match(&self, property_id: Option<i64>) -> Result<AutoMatchOutcome, PaymentEngineError> {
        let unlinked = self.db.unlinked_paid_transactions().await?;
        let tenants = self.db.active_tenants(property_id).await?;
        let mut outcome = AutoMatchOutcome::default();

        for tx in &unlinked {
            let candidates: Vec<&Tenant> =
                tenants.iter().filter(|t| self.is_match_candidate(t, tx)).collect();
            match candidates.as_slice() {
                [] => outcome.unmatched += 1,
                [tenant] => {
                    self.db.link_transaction_to_tenant(tx.id, tenant.id).await?;
                    let paid_on = tx.completed_at.map(|t| t.date_naive()).unwrap_or_else(|| Utc::now().date_naive());
                    self.db.record_rent_payment(tenant.id, paid_on, tx.months_advance.max(1)).await?;
                    info!("🧮️ Auto-matched transaction [{}] to tenant #{}", tx.external_id, tenant.id);
                    outcome.matched += 1;
                },
                several => {
                    debug!(
                        "🧮️ Transaction [{}] is ambiguous: {} candidate tenants",
                        tx.external_id,
                        several.len()
                    );
                    outcome.ambiguous.push(AmbiguousMatch {
                        transaction_id: tx.id,
                        external_id: tx.external_id.clone(),
                        candidate_tenant_ids: several.iter().map(|t| t.id).collect(),
                    });
                },
            }
        }
        Ok(outcome)
    }

    fn is_match_candidate(&self, tenant: &Tenant, tx: &MobileTransaction) -> bool {
        if normalize_phone(&tenant.phone) != normalize_phone(&tx.payer_phone) {
            return false;
        }
        let expected = tenant.monthly_rent.value() as f64;
        let paid = tx.amount.value() as f64;
        (expected - paid).abs() < expected * self.auto_match_variance
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn unmatched_payment(tx: &MobileTransaction) -> UnmatchedPayment {
    UnmatchedPayment {
        transaction_id: tx.id,
        external_id: tx.external_id.clone(),
        amount: tx.amount,
        payer_phone: tx.payer_phone.clone(),
        provider_tx_id: tx.provider_tx_id.clone(),
        completed_at: tx.completed_at,
    }
}
