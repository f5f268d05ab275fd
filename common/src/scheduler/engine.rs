// Per-event job scheduler: one recurring poll job per live event

use crate::errors::ScheduleError;
use crate::scheduler::poll::{PollTask, TickOutcome};
use crate::telemetry;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Configuration for the job scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Period between ticks of one event's job
    pub poll_interval: Duration,
    /// Maximum number of ticks running at once across all events
    pub worker_pool_size: usize,
    /// How long `shutdown` waits for job tasks before aborting them
    pub shutdown_grace: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            worker_pool_size: 4,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// The recurring job owned by the scheduler for one event
struct ScheduledJob {
    generation: u64,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

/// Owns at most one recurring poll job per event identifier.
///
/// `on_live` and `on_not_live` never fail: scheduling problems are logged and
/// the caller carries on. Transitions for the same identifier are serialized by
/// the job table, so the table never holds two jobs for one event.
pub struct JobScheduler {
    config: SchedulerConfig,
    poll_task: Arc<PollTask>,
    jobs: DashMap<String, ScheduledJob>,
    permits: Arc<Semaphore>,
    root: CancellationToken,
    next_generation: AtomicU64,
}

impl JobScheduler {
    pub fn new(config: SchedulerConfig, poll_task: Arc<PollTask>) -> Self {
        let permits = Arc::new(Semaphore::new(config.worker_pool_size.max(1)));
        Self {
            config,
            poll_task,
            jobs: DashMap::new(),
            permits,
            root: CancellationToken::new(),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Start polling `event_id`, replacing any job it already has.
    ///
    /// A replacement cancels the old job first and starts the new one with an
    /// immediate first tick, which resets the polling phase.
    #[instrument(skip(self))]
    pub fn on_live(&self, event_id: &str) {
        match self.start_or_replace(event_id) {
            Ok((generation, replaced)) => {
                info!(generation, replaced, "Scheduled job for event");
            }
            Err(e) => {
                error!(error = %e, "Failed to schedule job for event");
            }
        }
        telemetry::update_scheduled_jobs(self.jobs.len());
    }

    /// Stop polling `event_id`. No-op when it has no job.
    #[instrument(skip(self))]
    pub fn on_not_live(&self, event_id: &str) {
        match self.jobs.remove(event_id) {
            Some((_, job)) => {
                job.cancel.cancel();
                info!(generation = job.generation, "Cancelled job for event");
            }
            None => debug!("No job to cancel for event"),
        }
        telemetry::update_scheduled_jobs(self.jobs.len());
    }

    fn start_or_replace(&self, event_id: &str) -> Result<(u64, bool), ScheduleError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            ScheduleError::RuntimeUnavailable {
                event_id: event_id.to_string(),
                reason: e.to_string(),
            }
        })?;

        // The entry guard serializes transitions for this identifier
        let entry = self.jobs.entry(event_id.to_string());

        // Checked under the guard: `shutdown` cancels the root before it drains
        // the table, so a job inserted past this point is always drained
        if self.root.is_cancelled() {
            if let Entry::Occupied(stale) = entry {
                stale.get().cancel.cancel();
                stale.remove();
            }
            return Err(ScheduleError::ShutDown(event_id.to_string()));
        }

        let replaced = match &entry {
            Entry::Occupied(existing) => {
                existing.get().cancel.cancel();
                debug!(
                    generation = existing.get().generation,
                    "Cancelled superseded job"
                );
                true
            }
            Entry::Vacant(_) => false,
        };

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = self.root.child_token();
        let join = runtime.spawn(run_job(
            event_id.to_string(),
            generation,
            self.config.poll_interval,
            self.poll_task.clone(),
            self.permits.clone(),
            cancel.clone(),
        ));

        entry.insert(ScheduledJob {
            generation,
            cancel,
            join,
        });

        Ok((generation, replaced))
    }

    /// Whether `event_id` currently has a job
    pub fn is_scheduled(&self, event_id: &str) -> bool {
        self.jobs.contains_key(event_id)
    }

    /// Generation of the job currently owned for `event_id`.
    /// Every start or restart gets a new, strictly larger generation.
    pub fn job_generation(&self, event_id: &str) -> Option<u64> {
        self.jobs.get(event_id).map(|job| job.generation)
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Sorted identifiers of every event with a job
    pub fn scheduled_events(&self) -> Vec<String> {
        let mut events: Vec<String> = self.jobs.iter().map(|job| job.key().clone()).collect();
        events.sort_unstable();
        events
    }

    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Cancel every job and release the worker pool.
    ///
    /// Waits up to the configured grace period for job tasks to exit, then
    /// aborts the stragglers. Later `on_live` calls are refused. Safe to call
    /// more than once.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        info!(active_jobs = self.jobs.len(), "Shutting down job scheduler");

        self.root.cancel();
        self.permits.close();

        let event_ids: Vec<String> = self.jobs.iter().map(|job| job.key().clone()).collect();
        let mut joins = Vec::with_capacity(event_ids.len());
        for event_id in event_ids {
            if let Some((_, job)) = self.jobs.remove(&event_id) {
                job.cancel.cancel();
                joins.push(job.join);
            }
        }
        telemetry::update_scheduled_jobs(0);

        if joins.is_empty() {
            info!("Job scheduler shut down with no active jobs");
            return;
        }

        let abort_handles: Vec<_> = joins.iter().map(|join| join.abort_handle()).collect();
        let job_total = joins.len();
        match tokio::time::timeout(self.config.shutdown_grace, futures::future::join_all(joins))
            .await
        {
            Ok(_) => info!(jobs = job_total, "Job scheduler shut down successfully"),
            Err(_) => {
                warn!(
                    grace_ms = self.config.shutdown_grace.as_millis() as u64,
                    "Job tasks still running after grace period, aborting"
                );
                for handle in abort_handles {
                    handle.abort();
                }
            }
        }
    }
}

impl Drop for JobScheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

/// Recurring loop of one job: tick immediately, then every `period`
#[instrument(skip(poll_task, permits, cancel))]
async fn run_job(
    event_id: String,
    generation: u64,
    period: Duration,
    poll_task: Arc<PollTask>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                // Pool closed by shutdown
                Err(_) => break,
            },
        };

        let tick = AssertUnwindSafe(poll_task.run(&event_id, &cancel)).catch_unwind();
        match tick.await {
            Ok(TickOutcome::Published(outcome)) => {
                debug!(outcome = outcome.label(), attempts = outcome.attempts(), "Tick finished");
            }
            Ok(other) => debug!(outcome = ?other, "Tick finished without publishing"),
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                let err = ScheduleError::JobPanicked {
                    event_id: event_id.clone(),
                    reason,
                };
                error!(error = %err, "Tick panicked, schedule continues");
            }
        }
        drop(permit);
    }

    debug!("Job loop exited");
}
