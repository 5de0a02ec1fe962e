use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::services::availability_service::AvailabilityService;

/// Periodic task runner driving the reminder and lateness scans.
///
/// The scheduler itself holds no per-record state: idempotency across
/// ticks, overlapping instances and process restarts comes from the
/// per-reservation flags the scans flip. `tick` is public so tests can
/// drive a scan pass deterministically without wall-clock timers.
pub struct AutomationScheduler {
    service: Arc<AvailabilityService>,
    tick_interval: Duration,
    reminder_lead_minutes: i64,
    running: AtomicBool,
    shutdown: Notify,
}

impl AutomationScheduler {
    pub fn new(
        service: Arc<AvailabilityService>,
        tick_interval: Duration,
        reminder_lead_minutes: i64,
    ) -> Self {
        Self {
            service,
            tick_interval,
            reminder_lead_minutes,
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    /// Spawns the periodic loop. A second call while running is a no-op.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("automation scheduler already running; ignoring start");
            return;
        }

        info!(
            interval_secs = self.tick_interval.as_secs(),
            reminder_lead_minutes = self.reminder_lead_minutes,
            "automation scheduler started"
        );

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(scheduler.tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if !scheduler.running.load(Ordering::SeqCst) {
                            break;
                        }
                        scheduler.tick().await;
                    }
                    _ = scheduler.shutdown.notified() => {
                        if !scheduler.running.load(Ordering::SeqCst) {
                            break;
                        }
                    }
                }
            }
            info!("automation scheduler stopped");
        });
    }

    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.shutdown.notify_one();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// One scan pass. A failing scan is logged; the other scan still runs.
    pub async fn tick(&self) {
        match self
            .service
            .send_job_start_reminders(self.reminder_lead_minutes)
            .await
        {
            Ok(count) if count > 0 => info!(count, "dispatched job start reminders"),
            Ok(_) => {}
            Err(err) => error!(error = %err, "reminder scan failed"),
        }

        match self.service.send_lateness_alerts().await {
            Ok(count) if count > 0 => info!(count, "dispatched lateness alerts"),
            Ok(_) => {}
            Err(err) => error!(error = %err, "lateness scan failed"),
        }
    }
}
