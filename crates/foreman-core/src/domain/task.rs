use serde::{Deserialize, Serialize};

use super::TaskId;

/// TaskId + Payload の“運搬用”データ。
///
/// The payload is opaque to the scheduler: it is carried to the dispatch
/// result untouched and never interpreted. Callers put whatever their
/// execution system needs in it (swarming request body, command line, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    task_id: TaskId,
    payload: serde_json::Value,
}

impl TaskEnvelope {
    pub fn new(task_id: TaskId, payload: serde_json::Value) -> Self {
        Self { task_id, payload }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }
}
