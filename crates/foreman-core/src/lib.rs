//! foreman-core
//!
//! Priority-based admission scheduling for tasks executed by an external
//! worker pool (a swarming-style execution system).
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, priority, state）
//! - **queue**: 優先度順の admission queue（anti-starvation boost 付き）
//! - **store**: ライフサイクル 4 集合（scheduled/pending/completed/ready）
//! - **scheduler**: 外部に公開する唯一のファサード
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator, Dispatcher）
//! - **pump**: tokio 上で Scheduler を 1 つのロックの内側で回すループ
//! - **snapshot**: cold-start seeding 用のシリアライズ可能なビュー
//!
//! The scheduler itself is synchronous and single-writer; everything async
//! lives at the edges (`ports::Dispatcher`, `pump`).

pub mod domain;
pub mod error;
pub mod observability;
pub mod ports;
pub mod pump;
pub mod queue;
pub mod scheduler;
pub mod snapshot;
pub mod store;

pub use domain::{Priority, PriorityClass, TaskEnvelope, TaskId, TaskState, WorkerId};
pub use error::ForemanError;
pub use observability::SchedulerCounts;
pub use ports::{Clock, Dispatcher, FixedClock, IdGenerator, SystemClock, UlidGenerator};
pub use pump::DispatchPump;
pub use queue::{PriorityQueue, QueueItem};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use snapshot::SchedulerSnapshot;
pub use store::{DispatchRecord, TaskLifecycleStore};
