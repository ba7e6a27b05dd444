//! Scheduler Engine: the once-a-minute loop driving both passes.
//! Uses tokio::interval; the first tick fires immediately on start.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use billnudge_core::{BillNudgeConfig, MessageGateway};
use billnudge_store::SharedStore;

use crate::automation::AutomationRunner;
use crate::delivery::PassReport;
use crate::dispatch::ScheduledDispatcher;

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub scheduled: PassReport,
    pub automation: PassReport,
}

/// One tick: the scheduled dispatcher, then the automation pass.
pub struct TickRunner {
    dispatcher: ScheduledDispatcher,
    automation: AutomationRunner,
}

impl TickRunner {
    pub fn new(store: SharedStore, gateway: Arc<dyn MessageGateway>, config: &BillNudgeConfig) -> Self {
        Self {
            dispatcher: ScheduledDispatcher::new(store.clone(), gateway.clone()),
            automation: AutomationRunner::new(
                store,
                gateway,
                config.automation.clone(),
                config.scheduler.offset(),
            ),
        }
    }

    pub async fn tick(&self, now: DateTime<Utc>, previous: Option<DateTime<Utc>>) -> TickReport {
        let scheduled = self.dispatcher.run_scheduled_pass(now).await;
        let automation = self.automation.run_automation_pass(now, previous).await;
        TickReport {
            scheduled,
            automation,
        }
    }
}

/// Owns the background tick task.
///
/// `stop` only prevents future ticks; a pass already running finishes.
/// Dropping the engine stops it.
pub struct SchedulerEngine {
    runner: Arc<TickRunner>,
    period: Duration,
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
    ticks: Arc<AtomicU64>,
}

impl SchedulerEngine {
    pub fn new(store: SharedStore, gateway: Arc<dyn MessageGateway>, config: &BillNudgeConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            runner: Arc::new(TickRunner::new(store, gateway, config)),
            period: Duration::from_secs(config.scheduler.tick_interval_secs.max(1)),
            shutdown_tx,
            handle: None,
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spawn the tick loop. Calling it while running does nothing.
    ///
    /// Each loop gets its own shutdown channel, so a loop stopped earlier
    /// still sees its `true` and exits even if it has not woken yet.
    pub fn start(&mut self) {
        if self.is_running() {
            tracing::debug!("⏰ Scheduler already running");
            return;
        }
        let (shutdown_tx, mut shutdown) = watch::channel(false);
        self.shutdown_tx = shutdown_tx;
        let runner = self.runner.clone();
        let ticks = self.ticks.clone();
        let period = self.period;

        tracing::info!("⏰ Scheduler started (check every {}s)", period.as_secs());
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut previous = None;

            loop {
                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                    _ = interval.tick() => {}
                }
                if *shutdown.borrow() {
                    break;
                }

                let now = Utc::now();
                let report = runner.tick(now, previous).await;
                ticks.fetch_add(1, Ordering::Relaxed);
                if !report.scheduled.is_empty() || !report.automation.is_empty() {
                    tracing::debug!(?report, "⏰ Tick complete");
                }
                previous = Some(now);
            }
            tracing::info!("🛑 Scheduler stopped");
        }));
    }

    /// Stop future ticks. Safe to call more than once.
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Stop and wait for the loop to exit, including any in-flight pass.
    pub async fn shutdown(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("⚠️ Scheduler task ended abnormally: {e}");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        !*self.shutdown_tx.borrow() && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ticks completed by the background loop since the engine was built.
    pub fn ticks_completed(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Run a single tick right now, outside the loop.
    pub async fn run_once(&self) -> TickReport {
        self.runner.tick(Utc::now(), None).await
    }
}

impl Drop for SchedulerEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
