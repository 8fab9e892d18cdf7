//! The cadence-driven background scheduler.
//!
//! An explicit, long-lived service object: the cadence table is data, [`Scheduler::start`] spawns
//! one task per cadence, and [`Scheduler::stop`] flips a watch channel and joins them. A job that
//! overruns its period causes the next tick to be skipped, not queued, and a stop never interrupts
//! a pass that is already running - the task only observes the shutdown signal between jobs.
use std::time::Duration;

use chrono::Utc;
use log::*;
use rent_payment_engine::Period;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::{
    config::ServerConfig,
    routes::{FlowApi, MonitorApi, ReconApi},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    MonitoringPass,
    Reconciliation,
    RequestExpirySweep,
}

#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    pub label: &'static str,
    pub period: Duration,
    pub job: Job,
}

/// The default cadence table: daily tenant monitoring, reconciliation on the long cadence, and an
/// hourly sweep of stale payment requests. Periods come from the configuration.
pub fn default_cadences(config: &ServerConfig) -> Vec<Cadence> {
    vec![
        Cadence { label: "tenant status monitoring", period: config.monitor_interval, job: Job::MonitoringPass },
        Cadence { label: "reconciliation", period: config.reconcile_interval, job: Job::Reconciliation },
        Cadence {
            label: "request expiry sweep",
            period: config.expiry_sweep_interval,
            job: Job::RequestExpirySweep,
        },
    ]
}

pub struct Scheduler {
    flow: FlowApi,
    recon: ReconApi,
    monitor: MonitorApi,
    cadences: Vec<Cadence>,
    shutdown: Option<watch::Sender<bool>>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(flow: FlowApi, recon: ReconApi, monitor: MonitorApi, cadences: Vec<Cadence>) -> Self {
        Self { flow, recon, monitor, cadences, shutdown: None, handles: Vec::new() }
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_some()
    }

    /// Spawns the cadence tasks. Starting an already-running scheduler is a no-op.
    pub fn start(&mut self) {
        if self.is_running() {
            warn!("🕰️ Scheduler is already running");
            return;
        }
        let (tx, rx) = watch::channel(false);
        for cadence in &self.cadences {
            let handle = tokio::spawn(run_cadence(
                *cadence,
                self.flow.clone(),
                self.recon.clone(),
                self.monitor.clone(),
                rx.clone(),
            ));
            self.handles.push(handle);
        }
        self.shutdown = Some(tx);
        info!("🕰️ Scheduler started with {} cadences", self.cadences.len());
    }

    /// Signals the cadence tasks to stop and waits for them. An in-flight pass finishes first.
    pub async fn stop(&mut self) {
        let Some(shutdown) = self.shutdown.take() else {
            warn!("🕰️ Scheduler is not running");
            return;
        };
        let _ = shutdown.send(true);
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!("🕰️ Scheduler task did not shut down cleanly. {e}");
            }
        }
        info!("🕰️ Scheduler stopped");
    }
}

async fn run_cadence(
    cadence: Cadence,
    flow: FlowApi,
    recon: ReconApi,
    monitor: MonitorApi,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut timer = tokio::time::interval(cadence.period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick completes immediately; consume it so the job first runs one period from now
    timer.tick().await;
    info!("🕰️ {} worker started (every {}s)", cadence.label, cadence.period.as_secs());
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("🕰️ {} worker stopping", cadence.label);
                break;
            }
            _ = timer.tick() => {
                run_job(cadence.job, &flow, &recon, &monitor).await;
            }
        }
    }
}

async fn run_job(job: Job, flow: &FlowApi, recon: &ReconApi, monitor: &MonitorApi) {
    let today = Utc::now().date_naive();
    match job {
        Job::MonitoringPass => match monitor.run_monitoring_pass(today).await {
            Ok(summary) => {
                info!(
                    "🕰️ Monitoring pass: {} processed, {} overdue, {} due, {} pending, {} moved out",
                    summary.total_processed,
                    summary.overdue_updated,
                    summary.due_updated,
                    summary.pending_updated,
                    summary.moved_out_updated
                );
                if !summary.errors.is_empty() {
                    warn!("🕰️ Monitoring pass had {} errors: {:?}", summary.errors.len(), summary.errors);
                }
            },
            Err(e) => error!("🕰️ Error running monitoring pass: {e}"),
        },
        Job::Reconciliation => match recon.reconcile(Period::containing(today), None).await {
            Ok(report) => info!(
                "🕰️ Reconciliation {}..{}: {} matched, {} unmatched tenants, {} unmatched payments, {} discrepancies",
                report.period_start,
                report.period_end,
                report.matched,
                report.unmatched_expected,
                report.unmatched_mobile,
                report.amount_discrepancies
            ),
            Err(e) => error!("🕰️ Error running reconciliation: {e}"),
        },
        Job::RequestExpirySweep => match flow.expire_stale_requests().await {
            Ok(expired) => {
                if expired.is_empty() {
                    debug!("🕰️ Expiry sweep: nothing to retire");
                } else {
                    info!("🕰️ Expiry sweep retired {} payment requests", expired.len());
                }
            },
            Err(e) => error!("🕰️ Error running expiry sweep: {e}"),
        },
    }
}

#[cfg(test)]
mod test {
    use rent_payment_engine::{
        events::EventProducers,
        providers::GatewayRegistry,
        PaymentFlowApi,
        ReconciliationApi,
        SqliteDatabase,
        TenantMonitorApi,
    };

    use super::*;

    async fn test_scheduler(period: Duration) -> Scheduler {
        let db = SqliteDatabase::new_with_url("sqlite::memory:", 1).await.unwrap();
        let flow = PaymentFlowApi::new(db.clone(), GatewayRegistry::default(), EventProducers::default());
        let recon = ReconciliationApi::new(db.clone());
        let monitor = TenantMonitorApi::new(db);
        let cadences =
            vec![Cadence { label: "request expiry sweep", period, job: Job::RequestExpirySweep }];
        Scheduler::new(flow, recon, monitor, cadences)
    }

    #[tokio::test]
    async fn start_and_stop_are_clean() {
        let mut scheduler = test_scheduler(Duration::from_secs(3600)).await;
        assert!(!scheduler.is_running());
        scheduler.start();
        assert!(scheduler.is_running());
        // starting twice is a no-op, not a second fleet of workers
        scheduler.start();
        scheduler.stop().await;
        assert!(!scheduler.is_running());
        // stopping a stopped scheduler is harmless
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn stop_joins_the_workers_even_mid_cadence() {
        let mut scheduler = test_scheduler(Duration::from_millis(10)).await;
        scheduler.start();
        tokio::time::sleep(Duration::from_millis(35)).await;
        scheduler.stop().await;
        assert!(scheduler.handles.is_empty());
    }
}
