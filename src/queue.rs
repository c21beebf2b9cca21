use super::envelope::Envelope;
use crossbeam::deque::{Injector, Steal};
use tokio::sync::{oneshot, Notify, Semaphore};


/// Подтверждение выхода воркера при scale(-n)
pub(crate) type ExitAck = oneshot::Sender<()>;


/// Ограниченная очередь задач.
///
/// Injector хранит конверты (FIFO), semaphore ограничивает ёмкость,
/// Notify будит простаивающих воркеров. Сигналы выхода лежат рядом
/// и забираются первым свободным воркером.
pub(crate) struct TaskQueue<T> {
    inject: Injector<Envelope<T>>,
    exits: Injector<ExitAck>,
    slots: Semaphore,
    notify: Notify,
}

#[inline(always)]
fn steal<I>(injector: &Injector<I>) -> Option<I> {
    loop {
        match injector.steal() {
            Steal::Success(item) => return Some(item),
            Steal::Empty => return None,
            Steal::Retry => std::hint::spin_loop(),
        }
    }
}

impl<T> TaskQueue<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inject: Injector::new(),
            exits: Injector::new(),
            slots: Semaphore::new(capacity),
            notify: Notify::new(),
        }
    }

    #[inline]
    pub(crate) fn slots(&self) -> &Semaphore {
        &self.slots
    }

    #[inline]
    pub(crate) fn notify(&self) -> &Notify {
        &self.notify
    }

    /// Вызывать только с уже забытым permit'ом
    #[inline]
    pub(crate) fn push(&self, envelope: Envelope<T>) {
        self.inject.push(envelope);
        self.notify.notify_one();
    }

    /// Освобождает слот под следующую задачу
    #[inline]
    pub(crate) fn pop(&self) -> Option<Envelope<T>> {
        let envelope = steal(&self.inject)?;
        self.slots.add_permits(1);
        Some(envelope)
    }

    pub(crate) fn push_exit(&self, ack: ExitAck) {
        self.exits.push(ack);
        self.notify.notify_one();
    }

    #[inline]
    pub(crate) fn pop_exit(&self) -> Option<ExitAck> {
        steal(&self.exits)
    }

    #[inline]
    pub(crate) fn has_work(&self) -> bool {
        !self.inject.is_empty() || !self.exits.is_empty()
    }

    /// Закрывает приём: ждущие submit получают ошибку
    pub(crate) fn close(&self) {
        self.slots.close();
    }

    pub(crate) fn drain(&self) -> Vec<Envelope<T>> {
        while steal(&self.exits).is_some() {}
        std::iter::from_fn(|| steal(&self.inject)).collect()
    }
}
