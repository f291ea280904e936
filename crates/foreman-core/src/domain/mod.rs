//! Domain model (IDs, envelopes, priorities, lifecycle states).

pub mod ids;
pub mod priority;
pub mod state;
pub mod task;

pub use ids::{Id, IdMarker, TaskId, WorkerId};
pub use priority::{Priority, PriorityClass};
pub use state::TaskState;
pub use task::TaskEnvelope;
