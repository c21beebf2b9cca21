use super::{
    errors::PoolError,
    result::TaskResult,
};
use tokio::sync::oneshot;


pub type Job<T> = Box<dyn FnOnce() -> T + Send + 'static>;

/// Внешнее назначение результата: ёмкость один, запись один раз.
/// Пул не владеет временем жизни получателя.
pub type ResultSender<T> = oneshot::Sender<TaskResult<T>>;
pub type ResultReceiver<T> = oneshot::Receiver<TaskResult<T>>;


/// Задача вместе с её одноразовым назначением результата
pub struct Envelope<T> {
    job: Job<T>,
    dest: ResultSender<T>,
}

impl<T: Send + 'static> Envelope<T> {
    pub fn new<F>(job: F, dest: ResultSender<T>) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Self {
            job: Box::new(job),
            dest,
        }
    }

    #[inline]
    pub fn into_parts(self) -> (Job<T>, ResultSender<T>) {
        (self.job, self.dest)
    }

    /// Отвечает ошибкой, не выполняя задачу
    pub fn reject(self, err: PoolError) {
        deliver(self.dest, Err(err));
    }
}

/// Закрытый получатель — не ошибка пула
#[inline(always)]
pub fn deliver<T>(dest: ResultSender<T>, result: TaskResult<T>) {
    let _ = dest.send(result);
}
