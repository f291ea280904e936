use thiserror::Error;

use crate::domain::{TaskId, TaskState};

#[derive(Debug, Error)]
pub enum ForemanError {
    #[error("invalid priority {0}: must be a finite number > 0")]
    InvalidPriority(f64),

    #[error("nothing scheduled")]
    EmptyQueue,

    #[error("invalid state for task_id={task_id}: expected {expected}, actual {actual}")]
    InvalidState {
        task_id: TaskId,
        expected: TaskState,
        actual: TaskState,
    },

    #[error("task not found: task_id={0}")]
    TaskNotFound(TaskId),
}
