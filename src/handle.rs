use super::{
    envelope::ResultReceiver,
    errors::PoolError,
    result::TaskResult,
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll}
};
use tokio::time::Duration;


/// Handle на результат задачи, отправленной через Pool::spawn
pub struct JoinHandle<T> {
    receiver: ResultReceiver<T>,
}

impl<T> JoinHandle<T> {

    pub fn new(receiver: ResultReceiver<T>) -> Self {
        Self { receiver }
    }

    /// Timeout здесь только прекращает ожидание, задача в пуле продолжает работу
    pub async fn await_timeout(self, timeout: Duration) -> TaskResult<T> {
        match tokio::time::timeout(timeout, self.receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(PoolError::TaskCancelled),
            Err(_) => Err(PoolError::TaskTimedOut),
        }
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = TaskResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(res) => Poll::Ready(res.unwrap_or(Err(PoolError::TaskCancelled))),
            Poll::Pending => Poll::Pending,
        }
    }
}
