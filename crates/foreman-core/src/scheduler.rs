//! Scheduler façade: the one surface external callers interact with.

use crate::domain::{Priority, TaskEnvelope, TaskId, TaskState, WorkerId};
use crate::error::ForemanError;
use crate::observability::SchedulerCounts;
use crate::ports::{Clock, IdGenerator, SystemClock, UlidGenerator};
use crate::snapshot::SchedulerSnapshot;
use crate::store::TaskLifecycleStore;

/// Tunables for a `Scheduler`.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Applied to every item left behind by a dispatch (anti-starvation).
    pub boost_multiplier: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            boost_multiplier: 2.0,
        }
    }
}

/// Priority-based admission scheduler.
///
/// Coordinates the admission queue and the lifecycle store; every method is
/// a synchronous in-memory transition that either succeeds and mutates the
/// two consistently, or fails and mutates nothing. There is no I/O in here
/// — submitting dispatched tasks to workers and persisting snapshots are
/// the embedding application's responsibility, invoked around these calls.
///
/// Not internally thread-safe: concurrent access must be serialized by the
/// caller (one mutex around the whole value, or one owning task — see
/// `DispatchPump`). The queue and the store have to move together on every
/// transition, so there is nothing finer-grained to lock.
pub struct Scheduler {
    config: SchedulerConfig,
    store: TaskLifecycleStore,
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Clock>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self::with_parts(
            config,
            Box::new(UlidGenerator::new(SystemClock)),
            Box::new(SystemClock),
        )
    }

    /// Full injection point for tests and embedders with their own clock.
    pub fn with_parts(
        config: SchedulerConfig,
        ids: Box<dyn IdGenerator>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store: TaskLifecycleStore::new(config.boost_multiplier),
            ids,
            clock,
        }
    }

    /// The config this scheduler was built with (an embedder persisting
    /// snapshots wants to persist this next to them).
    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Admit a task at the given priority; returns its fresh TaskId.
    ///
    /// Never fails: the `Priority` type already guarantees a valid value.
    pub fn enqueue_task(&mut self, payload: serde_json::Value, priority: Priority) -> TaskId {
        let task_id = self.ids.generate_task_id();
        let envelope = TaskEnvelope::new(task_id, payload);
        self.store
            .insert_scheduled(envelope, priority, self.clock.now());
        task_id
    }

    /// Hand out the highest-ranked scheduled task for submission.
    ///
    /// The task moves to Pending; actually submitting it to the execution
    /// system is the caller's job.
    pub fn dispatch_next(&mut self) -> Result<(TaskId, TaskEnvelope), ForemanError> {
        let envelope = self.store.dispatch_next(self.clock.now())?;
        Ok((envelope.task_id(), envelope))
    }

    /// Record which external worker a Pending task landed on.
    pub fn assign_worker(&mut self, task_id: TaskId, worker: WorkerId) -> Result<(), ForemanError> {
        self.store.assign_worker(task_id, worker)
    }

    /// Pending -> Completed. Duplicate or late signals are rejected with
    /// `InvalidState` so the caller can tell them apart from fresh ones.
    pub fn report_completion(
        &mut self,
        task_id: TaskId,
        result: serde_json::Value,
    ) -> Result<(), ForemanError> {
        self.store.report_completion(task_id, result)
    }

    /// Deliver the result and drop the task from all bookkeeping.
    ///
    /// Drives Completed -> Ready -> Gone in one call; a task restored from
    /// a snapshot in Ready is consumed directly. A second call for the
    /// same id reports `TaskNotFound`.
    pub fn consume_result(&mut self, task_id: TaskId) -> Result<serde_json::Value, ForemanError> {
        match self.store.state_of(task_id) {
            Some(TaskState::Completed) => {
                self.store.mark_ready(task_id)?;
                self.store.take_ready(task_id)
            }
            Some(TaskState::Ready) => self.store.take_ready(task_id),
            Some(actual) => Err(ForemanError::InvalidState {
                task_id,
                expected: TaskState::Completed,
                actual,
            }),
            None => Err(ForemanError::TaskNotFound(task_id)),
        }
    }

    /// Cancel a task that has no result yet (Scheduled or Pending).
    pub fn cancel_task(&mut self, task_id: TaskId) -> Result<(), ForemanError> {
        self.store.cancel(task_id)
    }

    pub fn state_of(&self, task_id: TaskId) -> Option<TaskState> {
        self.store.state_of(task_id)
    }

    pub fn counts(&self) -> SchedulerCounts {
        self.store.counts()
    }

    /// Serializable capture of the working set, for caller-owned
    /// persistence after successful calls.
    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot::capture(&self.store)
    }

    /// Cold-start seeding: rebuild a scheduler from a persisted snapshot.
    pub fn restore(snapshot: SchedulerSnapshot, config: SchedulerConfig) -> Result<Self, ForemanError> {
        Self::restore_with_parts(
            snapshot,
            config,
            Box::new(UlidGenerator::new(SystemClock)),
            Box::new(SystemClock),
        )
    }

    pub fn restore_with_parts(
        snapshot: SchedulerSnapshot,
        config: SchedulerConfig,
        ids: Box<dyn IdGenerator>,
        clock: Box<dyn Clock>,
    ) -> Result<Self, ForemanError> {
        let mut scheduler = Self::with_parts(config, ids, clock);
        snapshot.replay_into(&mut scheduler.store)?;
        Ok(scheduler)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
