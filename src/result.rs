use super::errors::PoolError;


/// Ровно один результат на каждый вызов submit.
pub type TaskResult<T> = Result<T, PoolError>;
