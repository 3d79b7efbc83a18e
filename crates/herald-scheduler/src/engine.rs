//! The scheduler engine.
//!
//! Owns the in-memory registry of armed jobs, one per record identity. A
//! one-time send is a single `tokio` sleep; a recurring send is a loop that
//! sleeps until each next cron occurrence. Every execution attempt ends with
//! a reconciling store write, so the persisted status always reflects the
//! last known outcome.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use herald_core::config::SchedulerConfig;
use herald_delivery::SendExecutor;

use crate::cron::{next_occurrence, parse_expression};
use crate::error::{Result, SchedulerError};
use crate::store::{NewScheduledSend, SendStore, SendUpdate};
use crate::types::{ScheduleRequest, ScheduledSend, SendPayload};

/// Kind of job armed for a record identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Single-fire timer for a one-time send.
    OneTime,
    /// Cron-driven trigger for a recurring send.
    Recurring,
}

/// An armed in-memory job: the task driving it, tagged by how it fires.
struct ActiveJob {
    kind: JobKind,
    handle: JoinHandle<()>,
}

impl ActiveJob {
    fn stop(&self) {
        self.handle.abort();
    }
}

struct EngineInner {
    store: Arc<dyn SendStore>,
    executor: Arc<dyn SendExecutor>,
    /// Registry of armed jobs keyed by record identity. Locked only for
    /// short, await-free sections.
    jobs: Mutex<HashMap<String, ActiveJob>>,
    retry_recurring_on_failure: bool,
}

impl EngineInner {
    /// Shared firing path. Returns `false` when the job must stop re-arming.
    async fn execute(&self, record: &ScheduledSend) -> bool {
        let result = match &record.payload {
            SendPayload::Text { body } => {
                self.executor.send_text(&record.destination, body).await
            }
            SendPayload::Media { body, path } => {
                self.executor
                    .send_media(&record.destination, body, path)
                    .await
            }
        };

        let now = Local::now();
        match result {
            Ok(_receipt) => {
                info!(send_id = %record.id, destination = %record.destination, "scheduled send delivered");
                if record.repeat {
                    self.apply_update(&record.id, SendUpdate::fired(now)).await;
                    true
                } else {
                    self.apply_update(&record.id, SendUpdate::delivered(now))
                        .await;
                    self.retire(&record.id);
                    false
                }
            }
            Err(e) => {
                error!(send_id = %record.id, error = %e, "scheduled send delivery failed");
                if record.repeat && self.retry_recurring_on_failure {
                    // Note the failure but keep the record pending and the
                    // trigger armed for the next occurrence.
                    self.apply_update(&record.id, SendUpdate::noted(e.to_string()))
                        .await;
                    true
                } else {
                    self.apply_update(&record.id, SendUpdate::failed(e.to_string()))
                        .await;
                    self.retire(&record.id);
                    false
                }
            }
        }
    }

    /// Store write on the firing path: logged and swallowed, never propagated.
    async fn apply_update(&self, id: &str, update: SendUpdate) {
        if let Err(e) = self.store.update_by_id(id, update).await {
            warn!(send_id = %id, error = %e, "status reconciliation write failed");
        }
    }

    async fn mark_failed(&self, id: &str, note: &str) {
        self.apply_update(id, SendUpdate::failed(note)).await;
    }

    /// Drop the registry entry without aborting. Called from inside the job
    /// task itself; dropping a JoinHandle detaches the running task.
    fn retire(&self, id: &str) {
        self.jobs.lock().unwrap().remove(id);
    }
}

/// The scheduling engine. Cheap to clone; all clones share one job registry.
#[derive(Clone)]
pub struct SchedulerEngine {
    inner: Arc<EngineInner>,
}

impl SchedulerEngine {
    pub fn new(
        store: Arc<dyn SendStore>,
        executor: Arc<dyn SendExecutor>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store,
                executor,
                jobs: Mutex::new(HashMap::new()),
                retry_recurring_on_failure: config.retry_recurring_on_failure,
            }),
        }
    }

    /// Rehydrate the registry from every record still `pending` in the store.
    ///
    /// Precondition: called once per process lifetime, after the outbound
    /// transport is ready. A second call would double-arm every pending job.
    ///
    /// A store-read failure aborts initialization and is returned to the
    /// host; nothing is partially armed in that case.
    pub async fn initialize(&self) -> Result<()> {
        let pending = match self.inner.store.find_pending().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "failed to load pending scheduled sends");
                return Err(SchedulerError::Store(e));
            }
        };

        info!(count = pending.len(), "rehydrating scheduled sends");
        for record in pending {
            if wants_recurring(&record) {
                self.schedule_recurring(record).await;
            } else {
                self.schedule_one_time(record).await;
            }
        }
        Ok(())
    }

    /// Validate and persist a new scheduled send, then arm it.
    ///
    /// Returns the persisted record. Arming problems (past time, bad cron)
    /// do not fail the call; they are visible on the returned record's
    /// status, and later fire-time outcomes only through re-reading it.
    pub async fn schedule_new(&self, request: ScheduleRequest) -> Result<ScheduledSend> {
        if request.destination.trim().is_empty() {
            return Err(SchedulerError::Validation(
                "destination must not be empty".to_string(),
            ));
        }
        if request.repeat
            && request
                .cron_expression
                .as_deref()
                .is_none_or(|c| c.trim().is_empty())
        {
            return Err(SchedulerError::Validation(
                "recurring sends require a cron expression".to_string(),
            ));
        }
        if request.body.is_empty() && request.media_path.as_deref().is_none_or(str::is_empty) {
            return Err(SchedulerError::Validation(
                "body must not be empty for text sends".to_string(),
            ));
        }

        let record = self
            .inner
            .store
            .insert(NewScheduledSend {
                destination: request.destination,
                payload: SendPayload::new(request.body, request.media_path),
                scheduled_time: request.scheduled_time,
                repeat: request.repeat,
                cron_expression: request.cron_expression,
            })
            .await?;
        info!(send_id = %record.id, destination = %record.destination, repeat = record.repeat, "scheduled send created");

        if wants_recurring(&record) {
            self.schedule_recurring(record.clone()).await;
        } else {
            self.schedule_one_time(record.clone()).await;
        }

        // Re-read so an immediately failed record comes back with its
        // final status instead of the pre-arming snapshot.
        match self.inner.store.find_by_id(&record.id).await {
            Ok(Some(current)) => Ok(current),
            Ok(None) => Ok(record),
            Err(e) => {
                warn!(send_id = %record.id, error = %e, "re-read after arming failed");
                Ok(record)
            }
        }
    }

    /// Arm a single-fire timer for `record`.
    ///
    /// A `scheduled_time` already in the past marks the record `failed`
    /// without arming anything; there is no retro-active firing.
    pub async fn schedule_one_time(&self, record: ScheduledSend) {
        let now = Local::now();
        if record.scheduled_time <= now {
            warn!(send_id = %record.id, scheduled = %record.scheduled_time.to_rfc3339(), "scheduled time already passed");
            self.inner
                .mark_failed(&record.id, "scheduled time is in the past")
                .await;
            return;
        }

        let delay = (record.scheduled_time - now)
            .to_std()
            .unwrap_or(Duration::ZERO);
        let id = record.id.clone();
        let inner = Arc::clone(&self.inner);

        // The registry lock spans spawn + insert so the job cannot retire
        // itself before its handle is registered.
        let mut jobs = self.inner.jobs.lock().unwrap();
        if let Some(prev) = jobs.remove(&id) {
            prev.stop();
        }
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.execute(&record).await;
        });
        jobs.insert(
            id.clone(),
            ActiveJob {
                kind: JobKind::OneTime,
                handle,
            },
        );
        drop(jobs);

        info!(send_id = %id, delay_secs = delay.as_secs(), "one-time send armed");
    }

    /// Arm a cron trigger for `record`.
    ///
    /// The record is captured at schedule time: edits to the stored record
    /// are not picked up without a cancel + reschedule cycle.
    pub async fn schedule_recurring(&self, record: ScheduledSend) {
        let expr = record.cron_expression.clone().unwrap_or_default();
        let schedule = match parse_expression(&expr) {
            Ok(s) => s,
            Err(e) => {
                warn!(send_id = %record.id, expr = %expr, error = %e, "rejecting recurring send");
                self.inner
                    .mark_failed(&record.id, &format!("invalid cron expression: {expr}"))
                    .await;
                return;
            }
        };

        let id = record.id.clone();
        let inner = Arc::clone(&self.inner);

        let mut jobs = self.inner.jobs.lock().unwrap();
        if let Some(prev) = jobs.remove(&id) {
            prev.stop();
        }
        let handle = tokio::spawn(async move {
            loop {
                let Some(next) = next_occurrence(&schedule, Local::now()) else {
                    warn!(send_id = %record.id, "cron schedule exhausted");
                    inner
                        .mark_failed(&record.id, "cron schedule exhausted")
                        .await;
                    inner.retire(&record.id);
                    break;
                };
                let wait = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait).await;
                if !inner.execute(&record).await {
                    break;
                }
            }
        });
        jobs.insert(
            id.clone(),
            ActiveJob {
                kind: JobKind::Recurring,
                handle,
            },
        );
        drop(jobs);

        info!(send_id = %id, expr = %expr, "recurring send armed");
    }

    /// Stop and forget the armed job for `id`. Silent no-op when there is
    /// none (already fired, already canceled, or never armed). The persisted
    /// record is not touched.
    pub fn cancel(&self, id: &str) {
        let mut jobs = self.inner.jobs.lock().unwrap();
        if let Some(job) = jobs.remove(id) {
            job.stop();
            info!(send_id = %id, "scheduled send canceled");
        }
    }

    /// Number of armed jobs.
    pub fn active_jobs(&self) -> usize {
        self.inner.jobs.lock().unwrap().len()
    }

    /// Kind of the job armed for `id`, if any.
    pub fn job_kind(&self, id: &str) -> Option<JobKind> {
        self.inner.jobs.lock().unwrap().get(id).map(|j| j.kind)
    }
}

/// Dispatch rule shared by `schedule_new` and `initialize`: a repeat flag
/// with a non-empty cron expression arms a recurring trigger, anything else
/// goes down the one-time path.
fn wants_recurring(record: &ScheduledSend) -> bool {
    record.repeat
        && record
            .cron_expression
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
}
