//! Worker-submission port.

use async_trait::async_trait;

use crate::domain::{TaskEnvelope, TaskId};
use crate::error::ForemanError;

/// The seam to the external execution system.
///
/// Design intent:
/// - The scheduler only tracks intent; actually getting a task onto a
///   worker is the embedding application's job, behind this trait.
/// - `submit` receives exactly what `dispatch_next` produced. Once the
///   execution system finishes, the application reports back through
///   `Scheduler::report_completion` — there is no callback on this trait,
///   because completion signals arrive on the application's own channel
///   (push or poll).
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn submit(&self, task_id: TaskId, envelope: TaskEnvelope) -> Result<(), ForemanError>;
}
