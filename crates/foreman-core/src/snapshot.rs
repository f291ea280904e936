//! Serializable capture of the scheduler's working set.
//!
//! Persistence itself is the embedding application's job: it may write the
//! snapshot after every successful scheduler call and feed it back on
//! process restart (cold-start seeding). The core only produces and accepts
//! the value.

use serde::{Deserialize, Serialize};

use crate::domain::{TaskId, TaskState};
use crate::error::ForemanError;
use crate::queue::QueueItem;
use crate::store::{DispatchRecord, TaskLifecycleStore};

/// The four collections, flattened to plain serializable data.
///
/// Maps are captured as pair lists so the JSON form stays readable (TaskId
/// is a structured key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    pub scheduled: Vec<QueueItem>,
    pub pending: Vec<(TaskId, DispatchRecord)>,
    pub completed: Vec<(TaskId, serde_json::Value)>,
    pub ready: Vec<(TaskId, serde_json::Value)>,
}

impl SchedulerSnapshot {
    pub(crate) fn capture(store: &TaskLifecycleStore) -> Self {
        Self {
            scheduled: store.scheduled_items().cloned().collect(),
            pending: store
                .pending_entries()
                .map(|(id, record)| (*id, record.clone()))
                .collect(),
            completed: store
                .completed_entries()
                .map(|(id, result)| (*id, result.clone()))
                .collect(),
            ready: store
                .ready_entries()
                .map(|(id, result)| (*id, result.clone()))
                .collect(),
        }
    }

    /// Rebuild the store's collections from this snapshot.
    ///
    /// Re-establishes the queue's sort invariant (the persisted order is
    /// not trusted) and rejects snapshots that list one TaskId under two
    /// states. Priorities were already re-validated during deserialization.
    pub(crate) fn replay_into(self, store: &mut TaskLifecycleStore) -> Result<(), ForemanError> {
        for item in self.scheduled {
            ensure_untracked(store, item.task_id(), TaskState::Scheduled)?;
            store.restore_scheduled(item);
        }
        for (task_id, record) in self.pending {
            ensure_untracked(store, task_id, TaskState::Pending)?;
            store.restore_pending(task_id, record);
        }
        for (task_id, result) in self.completed {
            ensure_untracked(store, task_id, TaskState::Completed)?;
            store.restore_completed(task_id, result);
        }
        for (task_id, result) in self.ready {
            ensure_untracked(store, task_id, TaskState::Ready)?;
            store.restore_ready(task_id, result);
        }
        Ok(())
    }
}

fn ensure_untracked(
    store: &TaskLifecycleStore,
    task_id: TaskId,
    expected: TaskState,
) -> Result<(), ForemanError> {
    match store.state_of(task_id) {
        None => Ok(()),
        Some(actual) => Err(ForemanError::InvalidState {
            task_id,
            expected,
            actual,
        }),
    }
}
