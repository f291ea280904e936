//! Queue entry: envelope + ranking key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Priority, TaskEnvelope, TaskId};
use crate::error::ForemanError;

/// One entry in the admission queue.
///
/// Design:
/// - The envelope is owned exclusively by the item and never mutated here.
/// - `priority` changes only through `boost`, the queue's anti-starvation
///   step. Callers cannot touch it after enqueue.
/// - `enqueued_at` is set once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    envelope: TaskEnvelope,
    priority: Priority,
    enqueued_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn new(envelope: TaskEnvelope, priority: Priority, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            envelope,
            priority,
            enqueued_at,
        }
    }

    pub fn envelope(&self) -> &TaskEnvelope {
        &self.envelope
    }

    pub fn task_id(&self) -> TaskId {
        self.envelope.task_id()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    pub fn into_envelope(self) -> TaskEnvelope {
        self.envelope
    }

    /// Multiply the priority by `multiplier` (anti-starvation step).
    ///
    /// Fails without mutating if the boosted value would not be a finite
    /// positive number, or if `multiplier` is not > 1.
    pub fn boost(&mut self, multiplier: f64) -> Result<(), ForemanError> {
        self.priority = self.priority.boosted(multiplier)?;
        Ok(())
    }

    /// Queue-internal: apply a pre-validated boosted priority.
    pub(crate) fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }
}
