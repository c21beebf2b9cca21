//! Контроллер пула: состояние, очередь, submit/start/stop/scale/metrics.

use super::{
    autoscaler,
    config::Config,
    envelope::{Envelope, ResultSender},
    errors::{ConfigError, PoolError},
    events::{EventSink, PoolEvent, TracingSink},
    handle::JoinHandle,
    metrics::MetricsRegistry,
    model::PoolMetrics,
    queue::TaskQueue,
};
use std::sync::{
    atomic::{AtomicU8, AtomicUsize, Ordering},
    Arc,
};
use tokio::{
    sync::oneshot,
    time::Duration,
};
use tokio_util::{
    sync::CancellationToken,
    task::TaskTracker,
};
use tracing::debug;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PoolState {
    Created = 0,
    Running = 1,
    Draining = 2,
    Stopped = 3,
}

impl PoolState {
    #[inline]
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => PoolState::Created,
            1 => PoolState::Running,
            2 => PoolState::Draining,
            _ => PoolState::Stopped,
        }
    }
}


pub type WorkerPool<T> = Arc<WorkerPoolInner<T>>;


/// Адаптивный пул воркеров над ограниченной очередью
pub struct WorkerPoolInner<T> {
    pub(crate) config: Config,
    pub(crate) queue: TaskQueue<T>,
    pub(crate) metrics: MetricsRegistry,
    pub(crate) stop_token: CancellationToken,
    pub(crate) sink: Arc<dyn EventSink>,
    state: AtomicU8,
    // желаемое число воркеров; через CAS на нём держатся границы [min, max]
    target_workers: AtomicUsize,
    // сигналы выхода, ещё не подтверждённые воркерами
    pending_exits: AtomicUsize,
    tracker: TaskTracker,
}

impl<T: Send + 'static> WorkerPoolInner<T> {
    pub fn new(config: Config) -> Result<WorkerPool<T>, ConfigError> {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    pub fn with_sink(config: Config, sink: Arc<dyn EventSink>) -> Result<WorkerPool<T>, ConfigError> {
        config.validate()?;
        Ok(Arc::new(Self {
            queue: TaskQueue::new(config.queue_capacity),
            metrics: MetricsRegistry::new(),
            stop_token: CancellationToken::new(),
            sink,
            state: AtomicU8::new(PoolState::Created as u8),
            target_workers: AtomicUsize::new(0),
            pending_exits: AtomicUsize::new(0),
            tracker: TaskTracker::new(),
            config,
        }))
    }

    #[inline]
    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::SeqCst))
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    fn transition(&self, from: PoolState, to: PoolState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Запускает min_workers воркеров и, если max > min, автоскейлер.
    /// Вызывать внутри tokio runtime.
    pub fn start(self: &Arc<Self>) -> Result<(), PoolError> {
        if !self.transition(PoolState::Created, PoolState::Running) {
            return Err(match self.state() {
                PoolState::Running => PoolError::AlreadyStarted,
                _ => PoolError::PoolStopped,
            });
        }

        let workers = self.config.min_workers;
        self.target_workers.store(workers, Ordering::SeqCst);
        for _ in 0..workers {
            self.spawn_worker();
        }

        let autoscaling = self.config.autoscaling_enabled();
        if autoscaling {
            let pool = self.clone();
            self.tracker.spawn(async move {
                autoscaler::run(pool).await;
            });
        }

        self.sink.record(&PoolEvent::Started { workers, autoscaling });
        Ok(())
    }

    fn spawn_worker(self: &Arc<Self>) {
        self.metrics.add_active_workers(1);
        let pool = self.clone();
        self.tracker.spawn(async move {
            pool.worker_loop().await;
        });
    }

    /// Ставит задачу в очередь, ожидая свободного слота.
    ///
    /// Результат приходит в `dest` ровно один раз. Если submit отклонён
    /// (пул не запущен, остановлен или `cancel` сработал раньше слота),
    /// та же ошибка возвращается и синхронно, и через `dest`.
    pub async fn submit<F>(
        &self,
        cancel: &CancellationToken,
        f: F,
        dest: ResultSender<T>,
    ) -> Result<(), PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let envelope = Envelope::new(f, dest);

        if self.state() != PoolState::Running {
            return self.reject(envelope, PoolError::PoolStopped);
        }

        let acquired = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PoolError::SubmitCancelled),
            _ = self.stop_token.cancelled() => Err(PoolError::PoolStopped),
            permit = self.queue.slots().acquire() => permit.map_err(|_| PoolError::PoolStopped),
        };

        match acquired {
            Ok(permit) => {
                permit.forget();
                self.metrics.inc_submitted();
                self.metrics.add_queue_length(1);
                self.queue.push(envelope);
                // stop мог успеть слить очередь между acquire и push
                if self.state() != PoolState::Running && self.stop_token.is_cancelled() {
                    self.drain_queue();
                }
                Ok(())
            }
            Err(err) => self.reject(envelope, err),
        }
    }

    fn reject(&self, envelope: Envelope<T>, err: PoolError) -> Result<(), PoolError> {
        self.metrics.inc_rejected();
        envelope.reject(err.clone());
        Err(err)
    }

    /// Submit с собственным назначением результата
    pub async fn spawn<F>(&self, f: F) -> Result<JoinHandle<T>, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.submit(&CancellationToken::new(), f, tx).await?;
        Ok(JoinHandle::new(rx))
    }

    /// Graceful shutdown с ограничением по shutdown_timeout.
    ///
    /// Повторный вызов ничего не делает. Задачи в работе отчитываются как
    /// TaskCancelled, но сами вычисления не прерываются.
    pub async fn stop(&self) -> Result<(), PoolError> {
        if self.transition(PoolState::Created, PoolState::Stopped) {
            self.stop_token.cancel();
            self.queue.close();
            self.sink.record(&PoolEvent::Stopped { drained: 0 });
            return Ok(());
        }
        if !self.transition(PoolState::Running, PoolState::Draining) {
            return Ok(());
        }

        self.stop_token.cancel();
        self.tracker.close();

        let finished = tokio::time::timeout(self.config.shutdown_timeout, self.tracker.wait())
            .await
            .is_ok();
        if !finished {
            // забираем задачи себе: воркер, вернувшийся позже, их уже не посчитает
            let stranded = self.metrics.claim_active_tasks();
            self.metrics.add_errors(stranded as u64);
            self.sink.record(&PoolEvent::ShutdownTimedOut { stranded });
        }

        self.queue.close();
        let drained = self.drain_queue();

        self.state.store(PoolState::Stopped as u8, Ordering::SeqCst);
        self.sink.record(&PoolEvent::Stopped { drained });
        Ok(())
    }

    fn drain_queue(&self) -> usize {
        let envelopes = self.queue.drain();
        let drained = envelopes.len();
        for envelope in envelopes {
            self.metrics.add_queue_length(-1);
            self.metrics.add_errors(1);
            envelope.reject(PoolError::TaskCancelled);
        }
        drained
    }

    /// Stop по внешнему сигналу жизненного цикла процесса
    pub fn stop_on(self: &Arc<Self>, shutdown: CancellationToken) {
        let pool = self.clone();
        // не через tracker: stop ждёт tracker и ждал бы сам себя
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("external shutdown signal received");
                    let _ = pool.stop().await;
                }
                _ = pool.stop_token.cancelled() => {}
            }
        });
    }

    /// Меняет число воркеров на delta в пределах [min_workers, max_workers].
    ///
    /// При delta < 0 каждый сигнал выхода забирает первый свободный воркер;
    /// неподтверждённый за scale_down_grace сигнал даёт ScaleFailure и
    /// прерывает оставшиеся уменьшения.
    pub async fn scale(self: &Arc<Self>, delta: i64) -> Result<(), PoolError> {
        match self.state() {
            PoolState::Running => {}
            PoolState::Created => return Err(PoolError::NotStarted),
            _ => return Err(PoolError::PoolStopped),
        }
        if delta == 0 {
            return Ok(());
        }

        let exits = if delta < 0 {
            usize::try_from(delta.unsigned_abs()).unwrap_or(usize::MAX)
        } else {
            0
        };
        let reserved = if exits > self.config.max_workers {
            Err(self.out_of_bounds(self.target_workers.load(Ordering::SeqCst), delta))
        } else if exits > 0 {
            self.begin_scale_down(exits)
        } else {
            self.reserve(delta).map(drop)
        };
        if let Err(err) = reserved {
            self.sink.record(&PoolEvent::ScaleRejected { delta, error: err.clone() });
            return Err(err);
        }

        if delta > 0 {
            for _ in 0..delta {
                self.spawn_worker();
            }
        } else {
            for sent in 0..exits {
                if let Err(err) = self.signal_exit().await {
                    // target возвращаем раньше pending: сумма не должна проседать
                    self.target_workers.fetch_add(exits - sent, Ordering::SeqCst);
                    self.pending_exits.fetch_sub(exits - sent, Ordering::SeqCst);
                    self.sink.record(&PoolEvent::ScaleRejected { delta, error: err.clone() });
                    return Err(err);
                }
                self.pending_exits.fetch_sub(1, Ordering::SeqCst);
            }
        }

        self.sink.record(&PoolEvent::Scaled {
            delta,
            active_workers: self.metrics.active_workers(),
        });
        Ok(())
    }

    /// Уходящие воркеры попадают в pending раньше, чем уменьшается target:
    /// параллельный рост всё время видит их живыми.
    fn begin_scale_down(&self, exits: usize) -> Result<(), PoolError> {
        self.pending_exits.fetch_add(exits, Ordering::SeqCst);
        let reserved = self.reserve(-(exits as i64));
        if reserved.is_err() {
            self.pending_exits.fetch_sub(exits, Ordering::SeqCst);
        }
        reserved.map(drop)
    }

    /// Резервирует новое значение target. Для роста учитываем воркеров,
    /// которые уже получили сигнал выхода, но ещё живы.
    fn reserve(&self, delta: i64) -> Result<usize, PoolError> {
        let (min, max) = (self.config.min_workers as i64, self.config.max_workers as i64);
        self.target_workers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                let requested = (current as i64).checked_add(delta)?;
                let pending = self.pending_exits.load(Ordering::SeqCst) as i64;
                let fits = requested >= min && (delta < 0 || requested.saturating_add(pending) <= max);
                fits.then_some(requested as usize)
            })
            .map_err(|current| self.out_of_bounds(current, delta))
    }

    fn out_of_bounds(&self, current: usize, delta: i64) -> PoolError {
        PoolError::ScaleOutOfBounds {
            requested: (current as i64).saturating_add(delta),
            min: self.config.min_workers,
            max: self.config.max_workers,
        }
    }

    /// Ждёт подтверждения выхода; stop пула прерывает ожидание
    async fn signal_exit(&self) -> Result<(), PoolError> {
        let (ack, acked) = oneshot::channel();
        self.queue.push_exit(ack);
        tokio::select! {
            biased;
            acked = tokio::time::timeout(self.config.scale_down_grace, acked) => match acked {
                Ok(Ok(())) => Ok(()),
                _ => Err(PoolError::ScaleFailure),
            },
            _ = self.stop_token.cancelled() => Err(PoolError::PoolStopped),
        }
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        self.metrics.snapshot()
    }

    /// Обнуляет метрики. Число живых воркеров — не счётчик, его сохраняем.
    /// Точные нули только на простаивающем пуле.
    pub fn reset_metrics(&self) {
        let workers = self.metrics.active_workers();
        self.metrics.reset();
        self.metrics.add_active_workers(workers as i64);
    }

    /// Мониторинг метрик с callback.
    /// Останавливается по token.cancel() или вместе с пулом.
    pub fn start_monitoring<F>(self: &Arc<Self>, interval: Duration, callback: F) -> CancellationToken
    where
        F: Fn(PoolMetrics) + Send + 'static,
    {
        let pool = Arc::clone(self);
        let token = self.stop_token.child_token();
        let token_clone = token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        callback(pool.metrics());
                    }
                    _ = token_clone.cancelled() => {
                        drop(pool);
                        break;
                    }
                }
            }
        });

        token
    }
}
