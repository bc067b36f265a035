//! 刷盘调度：定时刷盘、按量提前刷盘，以及停机时有超时的全量排空。

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::buffer::{FlushResult, WriteBuffer};

pub struct FlushScheduler;

impl FlushScheduler {
    /// 启动刷盘任务。
    pub fn spawn(buffer: WriteBuffer) -> SchedulerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_flush_loop(buffer.clone(), stop_rx));
        tracing::info!(
            target: "feedhub.pipeline",
            batch_size = buffer.config().batch_size,
            flush_interval_ms = buffer.config().flush_interval.as_millis() as u64,
            max_queue = buffer.config().max_queue_capacity,
            policy = buffer.config().overflow_policy.as_str(),
            "flush scheduler started"
        );
        SchedulerHandle {
            buffer,
            stop: stop_tx,
            task,
        }
    }
}

pub struct SchedulerHandle {
    buffer: WriteBuffer,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// 停止刷盘循环并排空队列，两步共用一个 shutdown_timeout 截止时间。
    ///
    /// 超时返回 None：刷盘任务被中止，进行中的批次和队列中剩余的写入丢失。
    pub async fn shutdown(mut self) -> Option<FlushResult> {
        let _ = self.stop.send(true);
        let timeout = self.buffer.config().shutdown_timeout;
        let deadline = time::Instant::now() + timeout;

        match time::timeout_at(deadline, &mut self.task).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(target: "feedhub.pipeline", error = %err, "flush task aborted");
            }
            Err(_) => {
                self.task.abort();
                tracing::error!(
                    target: "feedhub.pipeline",
                    timeout_ms = timeout.as_millis() as u64,
                    queue_depth = self.buffer.queue_depth(),
                    "flush task did not stop in time, buffered writes lost"
                );
                return None;
            }
        }

        match time::timeout_at(deadline, self.buffer.flush(true)).await {
            Ok(result) => {
                if result.failed > 0 {
                    tracing::error!(
                        target: "feedhub.pipeline",
                        failed = result.failed,
                        "shutdown drain failed, buffered writes lost"
                    );
                } else {
                    tracing::info!(
                        target: "feedhub.pipeline",
                        drained = result.drained,
                        committed = result.committed,
                        "write buffer drained"
                    );
                }
                Some(result)
            }
            Err(_) => {
                tracing::error!(
                    target: "feedhub.pipeline",
                    timeout_ms = timeout.as_millis() as u64,
                    queue_depth = self.buffer.queue_depth(),
                    "shutdown drain timed out, buffered writes lost"
                );
                None
            }
        }
    }
}

async fn run_flush_loop(buffer: WriteBuffer, mut stop: watch::Receiver<bool>) {
    let period = buffer.config().flush_interval;
    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = buffer.flush_requested() => {}
            _ = ticker.tick() => {}
        }
        if *stop.borrow() {
            break;
        }

        buffer.flush(false).await;
        if buffer.queue_depth() >= buffer.config().batch_size {
            buffer.request_flush();
        }
    }
}
