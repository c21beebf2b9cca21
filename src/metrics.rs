//! Lock-free реестр метрик пула.
//!
//! Каждое поле атомарно само по себе, согласованности между полями нет:
//! снимок посреди обновления может показать active_tasks уже уменьшенным,
//! а completed ещё не увеличенным.

use super::model::PoolMetrics;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tokio::time::Duration;


/// Вес нового замера в EMA латентности
pub const LATENCY_ALPHA: f64 = 0.1;


#[derive(Debug, Default)]
pub struct MetricsRegistry {
    submitted: AtomicU64,
    queue_length: AtomicI64,
    active_tasks: AtomicI64,
    rejected: AtomicU64,
    timed_out: AtomicU64,
    completed: AtomicU64,
    error_count: AtomicU64,
    active_workers: AtomicI64,
    // f64 наносекунд в битах
    average_latency_nanos: AtomicU64,
}

#[inline(always)]
fn gauge(value: i64) -> usize {
    value.max(0) as usize
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_queue_length(&self, delta: i64) {
        self.queue_length.fetch_add(delta, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_active_tasks(&self, delta: i64) {
        self.active_tasks.fetch_add(delta, Ordering::Relaxed);
    }

    /// false, если задачу уже забрал `claim_active_tasks`
    #[inline]
    pub fn release_active_task(&self) -> bool {
        self.active_tasks
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n > 0).then(|| n - 1))
            .is_ok()
    }

    /// Списывает все задачи в работе разом, возвращает их число
    pub fn claim_active_tasks(&self) -> usize {
        gauge(self.active_tasks.swap(0, Ordering::AcqRel))
    }

    #[inline]
    pub fn inc_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_errors(&self, delta: u64) {
        self.error_count.fetch_add(delta, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_active_workers(&self, delta: i64) {
        self.active_workers.fetch_add(delta, Ordering::AcqRel);
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn queue_length(&self) -> usize {
        gauge(self.queue_length.load(Ordering::Relaxed))
    }

    pub fn active_tasks(&self) -> usize {
        gauge(self.active_tasks.load(Ordering::Relaxed))
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn timed_out(&self) -> u64 {
        self.timed_out.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn active_workers(&self) -> usize {
        gauge(self.active_workers.load(Ordering::Acquire))
    }

    pub fn average_latency(&self) -> Duration {
        let nanos = f64::from_bits(self.average_latency_nanos.load(Ordering::Relaxed));
        Duration::from_nanos(nanos.max(0.0).round() as u64)
    }

    /// new = old·(1-α) + sample·α
    pub fn record_latency(&self, sample: Duration) {
        let sample = sample.as_nanos() as f64;
        let _ = self.average_latency_nanos.fetch_update(
            Ordering::Relaxed,
            Ordering::Relaxed,
            |bits| {
                let old = f64::from_bits(bits);
                Some((old * (1.0 - LATENCY_ALPHA) + sample * LATENCY_ALPHA).to_bits())
            },
        );
    }

    /// Обнуляет поля по отдельности. Точный ноль гарантирован только на
    /// простаивающем пуле.
    pub fn reset(&self) {
        self.submitted.store(0, Ordering::Relaxed);
        self.queue_length.store(0, Ordering::Relaxed);
        self.active_tasks.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
        self.timed_out.store(0, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.error_count.store(0, Ordering::Relaxed);
        self.active_workers.store(0, Ordering::Release);
        self.average_latency_nanos.store(0f64.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn snapshot(&self) -> PoolMetrics {
        PoolMetrics {
            submitted: self.submitted(),
            queue_length: self.queue_length(),
            active_tasks: self.active_tasks(),
            rejected: self.rejected(),
            timed_out: self.timed_out(),
            completed: self.completed(),
            error_count: self.error_count(),
            active_workers: self.active_workers(),
            average_latency: self.average_latency(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_weights_recent_samples() {
        let m = MetricsRegistry::new();
        m.record_latency(Duration::from_millis(100));
        assert_eq!(m.average_latency(), Duration::from_millis(10));
        m.record_latency(Duration::from_millis(100));
        // 10·0.9 + 100·0.1 = 19
        assert_eq!(m.average_latency().as_millis(), 19);
    }

    #[test]
    fn gauges_never_report_negative() {
        let m = MetricsRegistry::new();
        m.add_queue_length(-1);
        assert_eq!(m.queue_length(), 0);
        m.add_queue_length(2);
        assert_eq!(m.queue_length(), 1);
    }

    #[test]
    fn claimed_tasks_are_not_released_twice() {
        let m = MetricsRegistry::new();
        m.add_active_tasks(2);
        assert_eq!(m.claim_active_tasks(), 2);
        assert!(!m.release_active_task());
        assert_eq!(m.active_tasks(), 0);

        m.add_active_tasks(1);
        assert!(m.release_active_task());
        assert!(!m.release_active_task());
    }

    #[test]
    fn reset_zeroes_everything() {
        let m = MetricsRegistry::new();
        m.inc_submitted();
        m.add_queue_length(3);
        m.add_active_tasks(2);
        m.inc_rejected();
        m.inc_timed_out();
        m.inc_completed();
        m.add_errors(4);
        m.add_active_workers(5);
        m.record_latency(Duration::from_millis(7));

        m.reset();
        let snap = m.snapshot();
        assert_eq!(snap, PoolMetrics::default());
    }
}
