//! 缓存重建执行器
//!
//! 固定数量的 worker 消费一个有界队列，队列满时提交直接失败而不是排队等待

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use review_errors::{AppError, AppResult};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// 重建任务
pub type RebuildJob = BoxFuture<'static, AppResult<()>>;

struct QueuedJob {
    key: String,
    task: RebuildJob,
}

/// 有界后台执行器
pub struct RebuildExecutor {
    sender: mpsc::Sender<QueuedJob>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl RebuildExecutor {
    /// 启动 `workers` 个 worker，必须在 tokio 运行时内调用
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();

        for worker_id in 0..workers {
            tracker.spawn(run_worker(worker_id, receiver.clone(), shutdown.clone()));
        }
        tracker.close();

        info!(workers, queue_capacity, "Rebuild executor started");

        Self {
            sender,
            shutdown,
            tracker,
        }
    }

    /// 提交任务，不等待执行
    pub fn submit(&self, key: impl Into<String>, task: RebuildJob) -> AppResult<()> {
        if self.shutdown.is_cancelled() {
            return Err(AppError::internal("Rebuild executor is shut down"));
        }

        let key = key.into();
        self.sender
            .try_send(QueuedJob { key, task })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(job) => AppError::resource_exhausted(format!(
                    "Rebuild queue is full, dropping rebuild of {}",
                    job.key
                )),
                mpsc::error::TrySendError::Closed(job) => AppError::internal(format!(
                    "Rebuild executor is closed, dropping rebuild of {}",
                    job.key
                )),
            })
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// 停止接收新任务并等待 worker 退出，尚未开始的任务被丢弃
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.wait().await;
        info!("Rebuild executor stopped");
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<QueuedJob>>>,
    shutdown: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            job = async { receiver.lock().await.recv().await } => job,
        };

        let Some(QueuedJob { key, task }) = job else {
            break;
        };

        match AssertUnwindSafe(task).catch_unwind().await {
            Ok(Ok(())) => debug!(worker_id, key = %key, "Rebuild finished"),
            Ok(Err(e)) => warn!(worker_id, key = %key, error = %e, "Rebuild failed"),
            Err(_) => error!(worker_id, key = %key, "Rebuild panicked"),
        }
    }
    debug!(worker_id, "Rebuild worker exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_runs_submitted_jobs() {
        let executor = RebuildExecutor::new(2, 8);
        let counter = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(Notify::new());

        for i in 0..4 {
            let counter = counter.clone();
            let done = done.clone();
            executor
                .submit(
                    format!("job:{}", i),
                    Box::pin(async move {
                        if counter.fetch_add(1, Ordering::SeqCst) == 3 {
                            done.notify_one();
                        }
                        Ok(())
                    }),
                )
                .unwrap();
        }

        tokio::time::timeout(Duration::from_secs(1), done.notified())
            .await
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        executor.shutdown().await;
    }

    #[tokio::test]
    async fn test_full_queue_rejects() {
        let executor = RebuildExecutor::new(1, 1);
        let gate = Arc::new(Notify::new());
        let started = Arc::new(Notify::new());

        let (g, s) = (gate.clone(), started.clone());
        executor
            .submit(
                "blocking",
                Box::pin(async move {
                    s.notify_one();
                    g.notified().await;
                    Ok(())
                }),
            )
            .unwrap();
        started.notified().await;

        executor.submit("queued", Box::pin(async { Ok(()) })).unwrap();
        let rejected = executor.submit("overflow", Box::pin(async { Ok(()) }));
        assert!(matches!(rejected, Err(AppError::ResourceExhausted(_))));

        gate.notify_one();
        executor.shutdown().await;
    }

    #[tokio::test]
    async fn test_panicking_job_keeps_worker_alive() {
        let executor = RebuildExecutor::new(1, 4);
        let done = Arc::new(Notify::new());

        executor
            .submit(
                "boom",
                Box::pin(async {
                    if true {
                        panic!("rebuild exploded");
                    }
                    Ok(())
                }),
            )
            .unwrap();

        let d = done.clone();
        executor
            .submit(
                "after",
                Box::pin(async move {
                    d.notify_one();
                    Ok(())
                }),
            )
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), done.notified())
            .await
            .unwrap();
        executor.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_after_shutdown() {
        let executor = RebuildExecutor::new(1, 4);
        executor.shutdown().await;
        assert!(executor.is_shut_down());
        assert!(matches!(
            executor.submit("late", Box::pin(async { Ok(()) })),
            Err(AppError::Internal(_))
        ));
    }
}
