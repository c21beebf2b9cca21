use thiserror::Error;


/// Ошибки пула: нарушения контракта возвращаются синхронно,
/// исходы задач приходят через назначение результата.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PoolError {
    #[error("worker pool is not started, call start() first")]
    NotStarted,
    #[error("worker pool is already started")]
    AlreadyStarted,
    #[error("worker pool has been stopped")]
    PoolStopped,
    #[error("submit cancelled while waiting for a queue slot")]
    SubmitCancelled,
    #[error("task execution cancelled by pool shutdown")]
    TaskCancelled,
    #[error("task panicked: {0}")]
    TaskFaulted(String),
    #[error("task exceeded its execution timeout")]
    TaskTimedOut,
    #[error("scale to {requested} workers is outside [{min}, {max}]")]
    ScaleOutOfBounds {
        requested: i64,
        min: usize,
        max: usize,
    },
    #[error("failed to scale down workers: exit signal was not acknowledged")]
    ScaleFailure,
}


/// Ошибки валидации конфигурации, только на этапе создания пула.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("min_workers must be at least 1")]
    ZeroMinWorkers,
    #[error("max_workers ({max}) must be greater than or equal to min_workers ({min})")]
    MaxBelowMin { min: usize, max: usize },
    #[error("queue_capacity must be greater than 0")]
    ZeroQueueCapacity,
    #[error("queue_capacity ({capacity}) exceeds the maximum of {max}")]
    QueueCapacityTooLarge { capacity: usize, max: usize },
    #[error("scale_interval must be greater than 0")]
    ZeroScaleInterval,
    #[error("scale_down_grace must be greater than 0")]
    ZeroScaleDownGrace,
}
