use super::errors::ConfigError;
use tokio::{
    sync::Semaphore,
    time::Duration,
};


pub const DEFAULT_SCALE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_SCALE_DOWN_GRACE: Duration = Duration::from_millis(50);
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);


/// Конфигурация пула воркеров
#[derive(Debug, Clone)]
pub struct Config {
    /// Нижняя граница автоскейлинга и число воркеров при старте
    pub min_workers: usize,
    /// Верхняя граница; автоскейлер работает только если max > min
    pub max_workers: usize,
    /// Порог backpressure для submit
    pub queue_capacity: usize,
    pub shutdown_timeout: Duration,
    pub scale_interval: Duration,
    /// Сколько ждать подтверждения одного сигнала выхода при scale(-n)
    pub scale_down_grace: Duration,
    pub task_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            min_workers: num_cpus,
            max_workers: num_cpus,
            queue_capacity: num_cpus * 10,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            scale_interval: DEFAULT_SCALE_INTERVAL,
            scale_down_grace: DEFAULT_SCALE_DOWN_GRACE,
            task_timeout: None,
        }
    }
}

impl Config {
    pub fn new(min_workers: usize, max_workers: usize, queue_capacity: usize) -> Self {
        Self {
            min_workers,
            max_workers,
            queue_capacity,
            ..Default::default()
        }
    }

    pub fn cpu_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            min_workers: num_cpus.div_ceil(2),
            max_workers: num_cpus,
            queue_capacity: num_cpus * 10,
            task_timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        }
    }

    pub fn io_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            min_workers: num_cpus,
            max_workers: num_cpus * 4,
            queue_capacity: num_cpus * 20,
            task_timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        }
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_scale_interval(mut self, interval: Duration) -> Self {
        self.scale_interval = interval;
        self
    }

    pub fn with_scale_down_grace(mut self, grace: Duration) -> Self {
        self.scale_down_grace = grace;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    #[inline]
    pub fn autoscaling_enabled(&self) -> bool {
        self.max_workers > self.min_workers
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_workers == 0 {
            return Err(ConfigError::ZeroMinWorkers);
        }
        if self.max_workers < self.min_workers {
            return Err(ConfigError::MaxBelowMin {
                min: self.min_workers,
                max: self.max_workers,
            });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        // слоты очереди — permits семафора
        if self.queue_capacity > Semaphore::MAX_PERMITS {
            return Err(ConfigError::QueueCapacityTooLarge {
                capacity: self.queue_capacity,
                max: Semaphore::MAX_PERMITS,
            });
        }
        if self.scale_interval.is_zero() {
            return Err(ConfigError::ZeroScaleInterval);
        }
        if self.scale_down_grace.is_zero() {
            return Err(ConfigError::ZeroScaleDownGrace);
        }
        Ok(())
    }
}
