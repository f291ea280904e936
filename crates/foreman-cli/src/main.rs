use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::sleep;

use foreman_core::{
    DispatchPump, Dispatcher, ForemanError, Priority, PriorityClass, Scheduler, TaskEnvelope,
    TaskId, WorkerId,
};

#[derive(Debug, Deserialize)]
struct JobPayload {
    name: String,
}

/// Dispatcher の実装例：乱数レイテンシで外部ワーカープールを模したもの。
/// submit は即座に返し、完了通知は後からスケジューラに書き戻される。
struct SimulatedPool {
    scheduler: Arc<Mutex<Scheduler>>,
}

#[async_trait]
impl Dispatcher for SimulatedPool {
    async fn submit(&self, task_id: TaskId, envelope: TaskEnvelope) -> Result<(), ForemanError> {
        let scheduler = Arc::clone(&self.scheduler);
        let bot = format!("bot-{}", rand::thread_rng().gen_range(0..4));
        let latency = Duration::from_millis(rand::thread_rng().gen_range(10..80));

        tokio::spawn(async move {
            sleep(latency).await;

            let job = serde_json::from_value::<JobPayload>(envelope.payload().clone())
                .map(|p| p.name)
                .unwrap_or_else(|_| "unnamed".to_string());

            let mut s = scheduler.lock().await;
            if s.assign_worker(task_id, WorkerId::new(bot.clone())).is_err() {
                // すでに cancel されたタスク。完了通知も無意味なので捨てる
                return;
            }
            let result = serde_json::json!({
                "bot": bot,
                "job": job,
            });
            if let Err(e) = s.report_completion(task_id, result) {
                eprintln!("late completion for {task_id}: {e}");
            }
        });

        Ok(())
    }
}

#[tokio::main]
async fn main() {
    // (A) Scheduler を 1 つのロックの内側に置く（single-writer 前提のため）
    let scheduler = Arc::new(Mutex::new(Scheduler::new()));

    // (B) タスク投入（優先度ティアをまたいで）
    let mut outstanding = Vec::new();
    {
        let mut s = scheduler.lock().await;
        for (name, class) in [
            ("force-rerun", PriorityClass::Force),
            ("failure-analysis", PriorityClass::Failure),
            ("flake-analysis", PriorityClass::Flake),
            ("api-request", PriorityClass::ApiCall),
        ] {
            let id = s.enqueue_task(serde_json::json!({ "name": name }), class.priority());
            println!("enqueued {name}: {id}");
            outstanding.push(id);
        }

        // 生の数値優先度もそのまま使える
        let id = s.enqueue_task(
            serde_json::json!({ "name": "odd-job" }),
            Priority::new(7.5).expect("7.5 is a valid priority"),
        );
        println!("enqueued odd-job: {id}");
        outstanding.push(id);
    }

    // (C) pump を起動（submit 先は擬似プール）
    let pool = Arc::new(SimulatedPool {
        scheduler: Arc::clone(&scheduler),
    });
    let pump = DispatchPump::spawn(Arc::clone(&scheduler), pool, Duration::from_millis(10));

    // (D) 完了をポーリングで待って結果を消費する
    while !outstanding.is_empty() {
        sleep(Duration::from_millis(20)).await;

        let mut s = scheduler.lock().await;
        outstanding.retain(|&id| match s.consume_result(id) {
            Ok(result) => {
                println!("consumed {id}: {result}");
                false
            }
            // まだ Completed まで来ていないだけ
            Err(_) => true,
        });
    }

    // (E) 後片付け
    pump.shutdown_and_join().await;
    let s = scheduler.lock().await;
    println!("final counts: {:?}", s.counts());
}
