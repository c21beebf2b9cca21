//! Адаптивный пул воркеров для блокирующих задач
//!
//! # Features
//! - Ограниченная очередь с backpressure и отменой ожидания слота
//! - Число воркеров меняется автоскейлером в пределах [min, max]
//! - Изоляция паник: упавшая задача не убивает воркер
//! - Graceful shutdown с таймаутом
//! - Lock-free метрики и мониторинг

pub mod autoscaler;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod events;
pub mod handle;
pub mod metrics;
pub mod model;
pub mod pool;
mod queue;
pub mod result;
pub mod telemetry;
mod worker;

pub use config::Config;
pub use errors::{ConfigError, PoolError};
pub use pool::{PoolState, WorkerPool, WorkerPoolInner};
