use chrono::NaiveDate;
use log::*;
use rpg_common::Ugx;
use serde::Serialize;

use crate::{
    db_types::{Tenant, TenantCategory},
    traits::{PaymentEngineError, TenantDirectory},
};

/// A payment is `Due` for this many days past its due date before it counts as `Overdue`.
pub const OVERDUE_GRACE_DAYS: i64 = 7;

/// Computes the payment category a tenant should carry on `today`.
///
/// A passed move-out date overrides every other signal. Otherwise the category follows the due
/// date: more than [`OVERDUE_GRACE_DAYS`] past due is `Overdue`, up to the grace window is `Due`,
/// and a future (or absent) due date is `Pending`. `Paid` is never produced here; only the
/// confirmation flow sets it.
pub fn categorize(tenant: &Tenant, today: NaiveDate) -> TenantCategory {
    if tenant.move_out_date.is_some_and(|d| d <= today) {
        return TenantCategory::MovedOut;
    }
    let due = match tenant.next_payment_due {
        Some(d) => d,
        None => return TenantCategory::Pending,
    };
    let days_overdue = (today - due).num_days();
    if days_overdue > OVERDUE_GRACE_DAYS {
        TenantCategory::Overdue
    } else if days_overdue >= 0 {
        TenantCategory::Due
    } else {
        TenantCategory::Pending
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitoringSummary {
    pub total_processed: usize,
    pub overdue_updated: usize,
    pub due_updated: usize,
    pub pending_updated: usize,
    pub moved_out_updated: usize,
    pub errors: Vec<String>,
}

/// Per-category tenant listing for dashboards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TenantCategories {
    pub overdue: Vec<Tenant>,
    pub due: Vec<Tenant>,
    pub pending: Vec<Tenant>,
    pub paid: Vec<Tenant>,
    pub moved_out: Vec<Tenant>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PaymentSummary {
    pub total_tenants: usize,
    pub overdue_count: usize,
    pub due_count: usize,
    pub pending_count: usize,
    pub paid_count: usize,
    pub moved_out_count: usize,
    pub total_overdue_amount: Ugx,
    pub total_due_amount: Ugx,
    pub total_pending_amount: Ugx,
}

/// `TenantMonitorApi` recomputes tenant payment categories from date arithmetic. Each pass is an
/// idempotent recomputation over a snapshot of the active tenants, so overlapping or repeated runs
/// converge on the same result.
#[derive(Clone)]
pub struct TenantMonitorApi<B> {
    db: B,
}

impl<B> TenantMonitorApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> TenantMonitorApi<B>
where B: TenantDirectory
{
    /// Recomputes every active tenant's category and persists the changes. Newly moved-out
    /// tenants are deactivated and their unit released back to `Available`. Per-tenant failures
    /// are collected, not fatal.
    pub async fn run_monitoring_pass(&self, today: NaiveDate) -> Result<MonitoringSummary, PaymentEngineError> {
        let tenants = self.db.active_tenants(None).await?;
        let mut summary = MonitoringSummary { total_processed: tenants.len(), ..Default::default() };
        for tenant in tenants {
            let category = categorize(&tenant, today);
            if category == tenant.category {
                continue;
            }
            let result = match category {
                TenantCategory::MovedOut => self.db.mark_moved_out(tenant.id, today).await,
                other => self.db.set_category(tenant.id, other).await,
            };
            match result {
                Ok(()) => {
                    debug!("📅️ Tenant #{} ({}) recategorised to {category}", tenant.id, tenant.full_name());
                    match category {
                        TenantCategory::Overdue => summary.overdue_updated += 1,
                        TenantCategory::Due => summary.due_updated += 1,
                        TenantCategory::Pending => summary.pending_updated += 1,
                        TenantCategory::MovedOut => summary.moved_out_updated += 1,
                        TenantCategory::Paid => {},
                    }
                },
                Err(e) => {
                    error!("📅️ Could not update tenant #{}: {e}", tenant.id);
                    summary.errors.push(format!("tenant {}: {e}", tenant.id));
                },
            }
        }
        info!(
            "📅️ Monitoring pass over {} tenants: {} overdue, {} due, {} pending, {} moved out",
            summary.total_processed,
            summary.overdue_updated,
            summary.due_updated,
            summary.pending_updated,
            summary.moved_out_updated
        );
        Ok(summary)
    }

    /// Groups the active tenants by their computed category, for dashboard display. Tenants whose
    /// stored category is `Paid` stay in the paid bucket until their next due date approaches.
    pub async fn tenant_categories(&self, today: NaiveDate) -> Result<TenantCategories, PaymentEngineError> {
        let tenants = self.db.active_tenants(None).await?;
        let mut categories = TenantCategories::default();
        for tenant in tenants {
            let computed = if tenant.category == TenantCategory::Paid
                && categorize(&tenant, today) == TenantCategory::Pending
            {
                TenantCategory::Paid
            } else {
                categorize(&tenant, today)
            };
            match computed {
                TenantCategory::Overdue => categories.overdue.push(tenant),
                TenantCategory::Due => categories.due.push(tenant),
                TenantCategory::Pending => categories.pending.push(tenant),
                TenantCategory::Paid => categories.paid.push(tenant),
                TenantCategory::MovedOut => categories.moved_out.push(tenant),
            }
        }
        Ok(categories)
    }

    /// Headline counts and amounts per category.
    pub async fn payment_summary(&self, today: NaiveDate) -> Result<PaymentSummary, PaymentEngineError> {
        let categories = self.tenant_categories(today).await?;
        let rent_total = |tenants: &[Tenant]| tenants.iter().map(|t| t.monthly_rent).sum();
        Ok(PaymentSummary {
            total_tenants: categories.overdue.len()
                + categories.due.len()
                + categories.pending.len()
                + categories.paid.len()
                + categories.moved_out.len(),
            overdue_count: categories.overdue.len(),
            due_count: categories.due.len(),
            pending_count: categories.pending.len(),
            paid_count: categories.paid.len(),
            moved_out_count: categories.moved_out.len(),
            total_overdue_amount: rent_total(&categories.overdue),
            total_due_amount: rent_total(&categories.due),
            total_pending_amount: rent_total(&categories.pending),
        })
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;
    use rpg_common::Ugx;

    use super::*;
    use crate::db_types::TenantCategory;

    fn tenant(due: Option<NaiveDate>, move_out: Option<NaiveDate>) -> Tenant {
        Tenant {
            id: 1,
            property_id: 1,
            unit_id: 1,
            first_name: "Amara".into(),
            last_name: "Okello".into(),
            phone: "0772123456".into(),
            monthly_rent: Ugx::from(500_000),
            is_active: true,
            last_payment_date: None,
            next_payment_due: due,
            move_out_date: move_out,
            category: TenantCategory::Pending,
        }
    }

    #[test]
    fn ten_days_overdue_is_overdue() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 15).unwrap();
        let t = tenant(Some(today - Duration::days(10)), None);
        assert_eq!(categorize(&t, today), TenantCategory::Overdue);
    }

    #[test]
    fn three_days_overdue_is_due() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 15).unwrap();
        let t = tenant(Some(today - Duration::days(3)), None);
        assert_eq!(categorize(&t, today), TenantCategory::Due);
    }

    #[test]
    fn due_today_is_due_and_grace_boundary_holds() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 15).unwrap();
        assert_eq!(categorize(&tenant(Some(today), None), today), TenantCategory::Due);
        assert_eq!(
            categorize(&tenant(Some(today - Duration::days(7)), None), today),
            TenantCategory::Due
        );
        assert_eq!(
            categorize(&tenant(Some(today - Duration::days(8)), None), today),
            TenantCategory::Overdue
        );
    }

    #[test]
    fn future_due_date_is_pending() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 15).unwrap();
        let t = tenant(Some(today + Duration::days(5)), None);
        assert_eq!(categorize(&t, today), TenantCategory::Pending);
    }

    #[test]
    fn no_due_date_is_pending() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 15).unwrap();
        assert_eq!(categorize(&tenant(None, None), today), TenantCategory::Pending);
    }

    #[test]
    fn move_out_overrides_everything() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 15).unwrap();
        // overdue by 10 days, but moved out yesterday
        let t = tenant(Some(today - Duration::days(10)), Some(today - Duration::days(1)));
        assert_eq!(categorize(&t, today), TenantCategory::MovedOut);
        // a future move-out date does not
        let t = tenant(Some(today - Duration::days(10)), Some(today + Duration::days(30)));
        assert_eq!(categorize(&t, today), TenantCategory::Overdue);
    }
}
