//! Цикл воркера: ждёт первое из — конверт в очереди, остановка пула,
//! сигнал выхода при scale(-n).

use super::{
    envelope::{deliver, Envelope},
    errors::PoolError,
    events::PoolEvent,
    pool::WorkerPoolInner,
    result::TaskResult,
};
use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};
use tokio::time::Instant;
use tracing::{debug, trace};


fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Ждать, пока не истечёт timeout задачи; без timeout — никогда
async fn deadline(timeout: Option<tokio::time::Duration>) {
    match timeout {
        Some(after) => tokio::time::sleep(after).await,
        None => std::future::pending().await,
    }
}

impl<T: Send + 'static> WorkerPoolInner<T> {
    pub(crate) async fn worker_loop(self: Arc<Self>) {
        trace!("worker started");
        let mut acknowledged_exit = false;
        loop {
            if self.stop_token.is_cancelled() {
                break;
            }

            // сигнал выхода раньше очереди: иначе при постоянном backlog
            // scale(-n) никогда не дождётся подтверждения
            if self.accept_exit() {
                acknowledged_exit = true;
                self.pass_baton();
                debug!("worker exiting on scale-down signal");
                break;
            }

            if let Some(envelope) = self.queue.pop() {
                self.pass_baton();
                self.execute(envelope).await;
                continue;
            }

            let notified = self.queue.notify().notified();
            tokio::pin!(notified);
            // регистрируемся до повторной проверки, иначе теряем notify_one
            notified.as_mut().enable();
            if self.queue.has_work() {
                continue;
            }

            tokio::select! {
                biased;
                _ = self.stop_token.cancelled() => break,
                _ = &mut notified => {}
            }
        }
        if !acknowledged_exit {
            self.metrics.add_active_workers(-1);
        }
        trace!("worker stopped");
    }

    /// Забирает сигнал выхода. Счётчик воркеров уменьшаем до подтверждения,
    /// чтобы scale видел его уже уменьшенным. Сигналы, чей scale отвалился
    /// по таймауту, пропускаются.
    fn accept_exit(&self) -> bool {
        while let Some(ack) = self.queue.pop_exit() {
            if ack.is_closed() {
                continue;
            }
            self.metrics.add_active_workers(-1);
            if ack.send(()).is_ok() {
                return true;
            }
            self.metrics.add_active_workers(1);
        }
        false
    }

    /// Один notify_one будит одного воркера; если работа осталась, будим следующего
    #[inline]
    fn pass_baton(&self) {
        if self.queue.has_work() {
            self.queue.notify().notify_one();
        }
    }

    async fn execute(&self, envelope: Envelope<T>) {
        self.metrics.add_queue_length(-1);
        self.metrics.add_active_tasks(1);

        let (job, dest) = envelope.into_parts();
        let started = Instant::now();
        let run = tokio::task::spawn_blocking(move || catch_unwind(AssertUnwindSafe(job)));

        let result: TaskResult<T> = tokio::select! {
            biased;
            joined = run => match joined {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(payload)) => Err(PoolError::TaskFaulted(panic_message(payload.as_ref()))),
                Err(join_err) => Err(PoolError::TaskFaulted(join_err.to_string())),
            },
            // вычисление продолжает работать в blocking pool, мы просто перестаём ждать
            _ = self.stop_token.cancelled() => Err(PoolError::TaskCancelled),
            _ = deadline(self.config.task_timeout) => Err(PoolError::TaskTimedOut),
        };

        self.report(&result);
        // false: задачу уже списал stop по истечении shutdown_timeout
        if self.metrics.release_active_task() {
            match &result {
                Ok(_) => self.metrics.inc_completed(),
                Err(err) => {
                    self.metrics.add_errors(1);
                    if matches!(err, PoolError::TaskTimedOut) {
                        self.metrics.inc_timed_out();
                    }
                }
            }
            self.metrics.record_latency(started.elapsed());
        }

        deliver(dest, result);
    }

    fn report(&self, result: &TaskResult<T>) {
        match result {
            Err(PoolError::TaskFaulted(detail)) => {
                self.sink.record(&PoolEvent::TaskFaulted { detail: detail.clone() });
            }
            Err(PoolError::TaskTimedOut) => {
                if let Some(after) = self.config.task_timeout {
                    self.sink.record(&PoolEvent::TaskTimedOut { after });
                }
            }
            _ => {}
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
