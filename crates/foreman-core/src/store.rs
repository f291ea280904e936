//! Lifecycle store: which state every live task is in.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Priority, TaskEnvelope, TaskId, TaskState, WorkerId};
use crate::error::ForemanError;
use crate::observability::SchedulerCounts;
use crate::queue::{PriorityQueue, QueueItem};

/// Metadata kept for a task while it is out with the external execution
/// system.
///
/// `worker` starts out unknown: the worker identity only exists once the
/// caller has actually submitted the task, which happens after dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub dispatched_at: DateTime<Utc>,
    pub worker: Option<WorkerId>,
}

/// The four collections tracking every live task.
///
/// Partition invariant: a TaskId exists in at most one of
/// {scheduled, pending, completed, ready} at any time. Every transition
/// removes from exactly one collection and inserts into at most one other,
/// so the invariant holds structurally. Terminal transitions (cancel,
/// consume) drop the id entirely; later lookups report `TaskNotFound`.
#[derive(Debug, Clone)]
pub struct TaskLifecycleStore {
    scheduled: PriorityQueue,
    pending: HashMap<TaskId, DispatchRecord>,
    completed: HashMap<TaskId, serde_json::Value>,
    ready: HashMap<TaskId, serde_json::Value>,
}

impl TaskLifecycleStore {
    pub fn new(boost_multiplier: f64) -> Self {
        Self {
            scheduled: PriorityQueue::new(boost_multiplier),
            pending: HashMap::new(),
            completed: HashMap::new(),
            ready: HashMap::new(),
        }
    }

    /// Current lifecycle state of `task_id`, or None if the store has no
    /// record of it (never enqueued, cancelled, or consumed).
    pub fn state_of(&self, task_id: TaskId) -> Option<TaskState> {
        if self.scheduled.contains(task_id) {
            Some(TaskState::Scheduled)
        } else if self.pending.contains_key(&task_id) {
            Some(TaskState::Pending)
        } else if self.completed.contains_key(&task_id) {
            Some(TaskState::Completed)
        } else if self.ready.contains_key(&task_id) {
            Some(TaskState::Ready)
        } else {
            None
        }
    }

    /// Admit a task: enters Scheduled.
    pub fn insert_scheduled(
        &mut self,
        envelope: TaskEnvelope,
        priority: Priority,
        now: DateTime<Utc>,
    ) {
        debug_assert!(
            self.state_of(envelope.task_id()).is_none(),
            "task_id already tracked"
        );
        self.scheduled.enqueue(envelope, priority, now);
    }

    /// Scheduled -> Pending for the queue's current head.
    ///
    /// Fails with `EmptyQueue` when nothing is scheduled; the store is
    /// unchanged on any failure.
    pub fn dispatch_next(&mut self, now: DateTime<Utc>) -> Result<TaskEnvelope, ForemanError> {
        let item = self.scheduled.dequeue()?;
        let envelope = item.into_envelope();
        self.pending.insert(
            envelope.task_id(),
            DispatchRecord {
                dispatched_at: now,
                worker: None,
            },
        );
        Ok(envelope)
    }

    /// Record the external worker a Pending task landed on.
    pub fn assign_worker(&mut self, task_id: TaskId, worker: WorkerId) -> Result<(), ForemanError> {
        match self.pending.get_mut(&task_id) {
            Some(record) => {
                record.worker = Some(worker);
                Ok(())
            }
            None => Err(self.wrong_state(task_id, TaskState::Pending)),
        }
    }

    /// Pending -> Completed with the raw result.
    ///
    /// A second completion signal for the same task is rejected, keeping
    /// the lifecycle invariant over duplicate or stale worker callbacks.
    pub fn report_completion(
        &mut self,
        task_id: TaskId,
        result: serde_json::Value,
    ) -> Result<(), ForemanError> {
        match self.pending.remove(&task_id) {
            Some(_) => {
                self.completed.insert(task_id, result);
                Ok(())
            }
            None => Err(self.wrong_state(task_id, TaskState::Pending)),
        }
    }

    /// Completed -> Ready: the result becomes deliverable.
    pub fn mark_ready(&mut self, task_id: TaskId) -> Result<(), ForemanError> {
        match self.completed.remove(&task_id) {
            Some(result) => {
                self.ready.insert(task_id, result);
                Ok(())
            }
            None => Err(self.wrong_state(task_id, TaskState::Completed)),
        }
    }

    /// Ready -> Gone: hand over the result and drop all bookkeeping.
    pub fn take_ready(&mut self, task_id: TaskId) -> Result<serde_json::Value, ForemanError> {
        match self.ready.remove(&task_id) {
            Some(result) => Ok(result),
            None => Err(self.wrong_state(task_id, TaskState::Ready)),
        }
    }

    /// Scheduled|Pending -> Cancelled: drop the task before it has a result.
    pub fn cancel(&mut self, task_id: TaskId) -> Result<(), ForemanError> {
        if self.scheduled.remove(task_id).is_some() {
            return Ok(());
        }
        if self.pending.remove(&task_id).is_some() {
            return Ok(());
        }
        Err(self.wrong_state(task_id, TaskState::Pending))
    }

    pub fn counts(&self) -> SchedulerCounts {
        SchedulerCounts {
            scheduled: self.scheduled.len(),
            pending: self.pending.len(),
            completed: self.completed.len(),
            ready: self.ready.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
            && self.pending.is_empty()
            && self.completed.is_empty()
            && self.ready.is_empty()
    }

    fn wrong_state(&self, task_id: TaskId, expected: TaskState) -> ForemanError {
        match self.state_of(task_id) {
            Some(actual) => ForemanError::InvalidState {
                task_id,
                expected,
                actual,
            },
            None => ForemanError::TaskNotFound(task_id),
        }
    }

    // Snapshot accessors (see `snapshot.rs`).

    pub(crate) fn scheduled_items(&self) -> impl Iterator<Item = &QueueItem> {
        self.scheduled.iter()
    }

    pub(crate) fn pending_entries(&self) -> impl Iterator<Item = (&TaskId, &DispatchRecord)> {
        self.pending.iter()
    }

    pub(crate) fn completed_entries(&self) -> impl Iterator<Item = (&TaskId, &serde_json::Value)> {
        self.completed.iter()
    }

    pub(crate) fn ready_entries(&self) -> impl Iterator<Item = (&TaskId, &serde_json::Value)> {
        self.ready.iter()
    }

    pub(crate) fn restore_scheduled(&mut self, item: QueueItem) {
        self.scheduled.insert_item(item);
    }

    pub(crate) fn restore_pending(&mut self, task_id: TaskId, record: DispatchRecord) {
        self.pending.insert(task_id, record);
    }

    pub(crate) fn restore_completed(&mut self, task_id: TaskId, result: serde_json::Value) {
        self.completed.insert(task_id, result);
    }

    pub(crate) fn restore_ready(&mut self, task_id: TaskId, result: serde_json::Value) {
        self.ready.insert(task_id, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ulid::Ulid;

    fn envelope() -> TaskEnvelope {
        TaskEnvelope::new(TaskId::from_ulid(Ulid::new()), serde_json::json!({}))
    }

    fn store_with_one_scheduled() -> (TaskLifecycleStore, TaskId) {
        let mut store = TaskLifecycleStore::new(2.0);
        let env = envelope();
        let id = env.task_id();
        store.insert_scheduled(env, Priority::new(10.0).unwrap(), Utc::now());
        (store, id)
    }

    #[test]
    fn full_lifecycle_walk() {
        let (mut store, id) = store_with_one_scheduled();
        assert_eq!(store.state_of(id), Some(TaskState::Scheduled));

        let env = store.dispatch_next(Utc::now()).unwrap();
        assert_eq!(env.task_id(), id);
        assert_eq!(store.state_of(id), Some(TaskState::Pending));

        store
            .report_completion(id, serde_json::json!({"ok": true}))
            .unwrap();
        assert_eq!(store.state_of(id), Some(TaskState::Completed));

        store.mark_ready(id).unwrap();
        assert_eq!(store.state_of(id), Some(TaskState::Ready));

        let result = store.take_ready(id).unwrap();
        assert_eq!(result, serde_json::json!({"ok": true}));
        assert_eq!(store.state_of(id), None);
        assert!(store.is_empty());
    }

    #[test]
    fn completion_on_scheduled_task_names_both_states() {
        let (mut store, id) = store_with_one_scheduled();

        let err = store
            .report_completion(id, serde_json::json!(null))
            .unwrap_err();
        assert!(matches!(
            err,
            ForemanError::InvalidState {
                expected: TaskState::Pending,
                actual: TaskState::Scheduled,
                ..
            }
        ));
        // 失敗した呼び出しは何も変えない
        assert_eq!(store.state_of(id), Some(TaskState::Scheduled));
    }

    #[test]
    fn completion_on_unknown_task_is_not_found() {
        let mut store = TaskLifecycleStore::new(2.0);
        let ghost = TaskId::from_ulid(Ulid::new());
        assert!(matches!(
            store.report_completion(ghost, serde_json::json!(null)),
            Err(ForemanError::TaskNotFound(_))
        ));
    }

    #[test]
    fn duplicate_completion_is_rejected() {
        let (mut store, id) = store_with_one_scheduled();
        store.dispatch_next(Utc::now()).unwrap();
        store.report_completion(id, serde_json::json!(1)).unwrap();

        let err = store.report_completion(id, serde_json::json!(2)).unwrap_err();
        assert!(matches!(
            err,
            ForemanError::InvalidState {
                expected: TaskState::Pending,
                actual: TaskState::Completed,
                ..
            }
        ));
    }

    #[rstest]
    #[case::scheduled(false)]
    #[case::pending(true)]
    fn cancel_drops_live_tasks(#[case] dispatch_first: bool) {
        let (mut store, id) = store_with_one_scheduled();
        if dispatch_first {
            store.dispatch_next(Utc::now()).unwrap();
        }

        store.cancel(id).unwrap();
        assert_eq!(store.state_of(id), None);

        // completion from a worker that never heard about the cancel
        assert!(matches!(
            store.report_completion(id, serde_json::json!(null)),
            Err(ForemanError::TaskNotFound(_))
        ));
    }

    #[test]
    fn cancel_on_completed_task_is_invalid() {
        let (mut store, id) = store_with_one_scheduled();
        store.dispatch_next(Utc::now()).unwrap();
        store.report_completion(id, serde_json::json!(null)).unwrap();

        assert!(matches!(
            store.cancel(id),
            Err(ForemanError::InvalidState {
                actual: TaskState::Completed,
                ..
            })
        ));
        assert_eq!(store.state_of(id), Some(TaskState::Completed));
    }

    #[test]
    fn assign_worker_requires_pending() {
        let (mut store, id) = store_with_one_scheduled();
        assert!(store.assign_worker(id, WorkerId::new("bot-1")).is_err());

        store.dispatch_next(Utc::now()).unwrap();
        store.assign_worker(id, WorkerId::new("bot-1")).unwrap();

        let (_, record) = store.pending_entries().next().unwrap();
        assert_eq!(record.worker, Some(WorkerId::new("bot-1")));
    }

    #[test]
    fn counts_track_the_partition() {
        let (mut store, id) = store_with_one_scheduled();
        let env2 = envelope();
        store.insert_scheduled(env2, Priority::new(5.0).unwrap(), Utc::now());

        let c = store.counts();
        assert_eq!((c.scheduled, c.pending, c.completed, c.ready), (2, 0, 0, 0));

        store.dispatch_next(Utc::now()).unwrap();
        let c = store.counts();
        assert_eq!((c.scheduled, c.pending), (1, 1));

        store.report_completion(id, serde_json::json!(null)).unwrap();
        let c = store.counts();
        assert_eq!((c.pending, c.completed), (0, 1));
    }
}
