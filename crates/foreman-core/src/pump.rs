use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::error::ForemanError;
use crate::ports::Dispatcher;
use crate::scheduler::Scheduler;

/// Dispatch pump handle.
/// - `request_shutdown()` でループが止まる
/// - `shutdown_and_join()` で終了を待てる
///
/// The scheduler is not internally thread-safe, so the whole value sits
/// behind one mutex and this single task serializes every dispatch; other
/// parties (enqueuers, completion callbacks) lock the same mutex for their
/// calls. One lock around the whole scheduler, not per-part locks: queue
/// and store must move together on every transition.
pub struct DispatchPump {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl DispatchPump {
    /// Spawn the pump loop.
    ///
    /// `idle_poll` is how long the loop sleeps when nothing is scheduled;
    /// there is no enqueue-side notification channel in this design.
    pub fn spawn(
        scheduler: Arc<Mutex<Scheduler>>,
        dispatcher: Arc<dyn Dispatcher>,
        idle_poll: Duration,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            pump_loop(scheduler, dispatcher, idle_poll, &mut shutdown_rx).await;
        });

        Self { shutdown_tx, join }
    }

    /// Request shutdown. In-flight submissions finish; no new dispatches
    /// are taken.
    pub fn request_shutdown(&self) {
        // ignore send error: receiver may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for the loop to exit.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

async fn pump_loop(
    scheduler: Arc<Mutex<Scheduler>>,
    dispatcher: Arc<dyn Dispatcher>,
    idle_poll: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // ロックは dispatch の間だけ保持する（submit の await を跨がない）
        let dispatched = {
            let mut scheduler = scheduler.lock().await;
            scheduler.dispatch_next()
        };

        match dispatched {
            Ok((task_id, envelope)) => {
                if let Err(e) = dispatcher.submit(task_id, envelope).await {
                    eprintln!("[pump] submit failed for {task_id}: {e}");
                    // the execution system never saw the task; pull it back
                    // out of Pending so it doesn't hang there forever
                    let mut scheduler = scheduler.lock().await;
                    if let Err(e) = scheduler.cancel_task(task_id) {
                        eprintln!("[pump] cancel after failed submit: {e}");
                    }
                }
            }
            Err(ForemanError::EmptyQueue) => {
                // 空のときは少し待つ（shutdown とは select で競合させる）
                tokio::select! {
                    _ = shutdown_rx.changed() => {}
                    _ = tokio::time::sleep(idle_poll) => {}
                }
            }
            Err(e) => {
                // dispatch_next has no other recoverable failure; stop the
                // loop rather than spin on a poisoned queue
                eprintln!("[pump] dispatch failed: {e}");
                break;
            }
        }
    }
}
