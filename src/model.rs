use std::fmt;
use tokio::time::Duration;


/// Снимок метрик на момент вызова. Поля читаются независимо.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolMetrics {
    pub submitted: u64,
    pub queue_length: usize,
    pub active_tasks: usize,
    pub rejected: u64,
    pub timed_out: u64,
    pub completed: u64,
    pub error_count: u64,
    pub active_workers: usize,
    pub average_latency: Duration,
}

impl PoolMetrics {
    pub fn success_rate(&self) -> f64 {
        let total = self.completed + self.error_count;
        if total == 0 {
            return 1.0;
        }
        self.completed as f64 / total as f64
    }

    /// Задачи, по которым результат уже отдан
    pub fn finished(&self) -> u64 {
        self.completed + self.error_count
    }
}

impl fmt::Display for PoolMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Metrics:")?;
        writeln!(f, "- Submitted: {}", self.submitted)?;
        writeln!(f, "- Active Tasks: {}", self.active_tasks)?;
        writeln!(f, "- Queue Length: {}", self.queue_length)?;
        writeln!(f, "- Rejected Tasks: {}", self.rejected)?;
        writeln!(f, "- Timeout Tasks: {}", self.timed_out)?;
        writeln!(f, "- Completed Tasks: {}", self.completed)?;
        writeln!(f, "- Error Count: {}", self.error_count)?;
        writeln!(f, "- Active Workers: {}", self.active_workers)?;
        writeln!(f, "- Average Task Time: {:?}", self.average_latency)
    }
}
