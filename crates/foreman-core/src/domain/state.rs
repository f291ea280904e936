//! Task lifecycle state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a task.
///
/// State transitions:
/// - Scheduled -> Pending -> Completed -> Ready -> Gone
/// - Scheduled -> Cancelled, Pending -> Cancelled (caller-driven)
///
/// Transitions are one-directional; a task never re-enters Scheduled from a
/// later state (a caller-driven re-enqueue gets a fresh TaskId). Cancelled
/// and Gone drop the task from all bookkeeping, so they are observable only
/// as the expected/actual half of an `InvalidState` error, never via lookup.
///
/// Design note: Using an enum ensures exhaustive matching and prevents
/// invalid states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Admitted, waiting in the priority queue.
    Scheduled,

    /// Dequeued and handed to the caller for submission to the external
    /// execution system; result not yet reported.
    Pending,

    /// Execution finished; raw result held, not yet delivered.
    Completed,

    /// Result delivered but not yet consumed by the caller.
    Ready,

    /// Cancelled while Scheduled or Pending (terminal).
    Cancelled,

    /// Result consumed; all bookkeeping dropped (terminal).
    Gone,
}

impl TaskState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Cancelled | TaskState::Gone)
    }

    /// Can the caller still cancel a task in this state?
    pub fn is_cancellable(self) -> bool {
        matches!(self, TaskState::Scheduled | TaskState::Pending)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Scheduled => "scheduled",
            TaskState::Pending => "pending",
            TaskState::Completed => "completed",
            TaskState::Ready => "ready",
            TaskState::Cancelled => "cancelled",
            TaskState::Gone => "gone",
        };
        f.write_str(s)
    }
}
