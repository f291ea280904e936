use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerCounts {
    pub scheduled: usize,
    pub pending: usize,
    pub completed: usize,
    pub ready: usize,
}

impl SchedulerCounts {
    /// Total number of live tasks across all states.
    pub fn total(&self) -> usize {
        self.scheduled + self.pending + self.completed + self.ready
    }
}
