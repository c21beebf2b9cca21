//! Узкий интерфейс к внешнему observability-стоку.
//!
//! Пулу нужна только одна операция — записать событие. По умолчанию
//! события уходят в `tracing`.

use super::errors::PoolError;
use tokio::time::Duration;
use tracing::{debug, info, warn};


#[derive(Debug, Clone, PartialEq)]
pub enum PoolEvent {
    Started { workers: usize, autoscaling: bool },
    Scaled { delta: i64, active_workers: usize },
    ScaleRejected { delta: i64, error: PoolError },
    TaskFaulted { detail: String },
    TaskTimedOut { after: Duration },
    ShutdownTimedOut { stranded: usize },
    Stopped { drained: usize },
}


pub trait EventSink: Send + Sync + 'static {
    fn record(&self, event: &PoolEvent);
}


#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &PoolEvent) {
        match event {
            PoolEvent::Started { workers, autoscaling } => {
                info!(workers, autoscaling, "worker pool started");
            }
            PoolEvent::Scaled { delta, active_workers } => {
                info!(delta, active_workers, "worker pool scaled");
            }
            PoolEvent::ScaleRejected { delta, error } => {
                warn!(delta, %error, "scale request rejected");
            }
            PoolEvent::TaskFaulted { detail } => {
                warn!(%detail, "task panicked");
            }
            PoolEvent::TaskTimedOut { after } => {
                debug!(?after, "task timed out");
            }
            PoolEvent::ShutdownTimedOut { stranded } => {
                warn!(stranded, "shutdown timed out, stranded tasks counted as errors");
            }
            PoolEvent::Stopped { drained } => {
                info!(drained, "worker pool stopped");
            }
        }
    }
}
