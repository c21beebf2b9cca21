//! Периодическая политика масштабирования.
//!
//! Асимметричные шаги (+2 / -1 за тик) и двойной порог (очередь и
//! пропускная способность) дают гистерезис против кратких всплесков.

use super::pool::WorkerPoolInner;
use std::sync::Arc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};


const BACKLOG_FACTOR: usize = 2;
const SCALE_UP_RATE: f64 = 0.8;
const SCALE_DOWN_RATE: f64 = 0.2;
const MAX_SCALE_UP_STEP: usize = 2;


#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleInputs {
    pub queue_length: usize,
    pub active_workers: usize,
    pub completed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    Up(usize),
    Down,
    Hold,
}

/// Первое сработавшее правило. None — тик пропускается (нет воркеров).
pub fn decide(inputs: ScaleInputs, min_workers: usize, max_workers: usize) -> Option<ScaleDecision> {
    let ScaleInputs { queue_length, active_workers, completed } = inputs;
    if active_workers == 0 {
        return None;
    }
    let processing_rate = completed as f64 / active_workers as f64;

    if queue_length > BACKLOG_FACTOR * active_workers
        && processing_rate >= SCALE_UP_RATE
        && active_workers < max_workers
    {
        return Some(ScaleDecision::Up((max_workers - active_workers).min(MAX_SCALE_UP_STEP)));
    }

    if queue_length == 0 && processing_rate < SCALE_DOWN_RATE && active_workers > min_workers {
        return Some(ScaleDecision::Down);
    }

    Some(ScaleDecision::Hold)
}

pub(crate) async fn run<T: Send + 'static>(pool: Arc<WorkerPoolInner<T>>) {
    let period = pool.config.scale_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = pool.stop_token.cancelled() => break,
            _ = ticker.tick() => tick(&pool).await,
        }
    }
    debug!("autoscaler stopped");
}

async fn tick<T: Send + 'static>(pool: &Arc<WorkerPoolInner<T>>) {
    let inputs = ScaleInputs {
        queue_length: pool.metrics.queue_length(),
        active_workers: pool.metrics.active_workers(),
        completed: pool.metrics.completed(),
    };
    let Some(decision) = decide(inputs, pool.config.min_workers, pool.config.max_workers) else {
        return;
    };

    let delta = match decision {
        ScaleDecision::Up(step) => step as i64,
        ScaleDecision::Down => -1,
        ScaleDecision::Hold => return,
    };
    debug!(?inputs, delta, "autoscaler decision");
    if let Err(err) = pool.scale(delta).await {
        warn!(%err, delta, "autoscaler could not scale");
    }
}
