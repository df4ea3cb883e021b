use std::time::Duration;

use futures::executor::ThreadPool;
use once_cell::sync::OnceCell;

use super::{Delayed, Scheduler, TaskHandle};
use crate::error::RxError;

static DEFAULT_POOL: OnceCell<ThreadPool> = OnceCell::new();

/// Runs actions concurrently on a `futures` thread pool. Delays are waited
/// out with `futures-time` timers, without blocking a pool thread.
///
/// No ordering holds between actions; operators that need ordered delivery
/// serialize it themselves.
#[derive(Clone, Debug)]
pub struct PoolScheduler(ThreadPool);

impl PoolScheduler {
  /// A scheduler backed by a new, private pool.
  pub fn new() -> Result<Self, RxError> { Ok(PoolScheduler(ThreadPool::new()?)) }

  /// A scheduler backed by the process-wide pool, started on first use.
  pub fn shared() -> Result<Self, RxError> {
    let pool = DEFAULT_POOL.get_or_try_init(ThreadPool::new)?;
    Ok(PoolScheduler(pool.clone()))
  }

  pub fn with_pool(pool: ThreadPool) -> Self { PoolScheduler(pool) }
}

impl Scheduler for PoolScheduler {
  fn schedule<F>(&self, delay: Duration, action: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let handle = TaskHandle::new();
    let timer = (!delay.is_zero()).then(|| futures_time::task::sleep(delay.into()));
    self.0.spawn_ok(Delayed::new(timer, handle.clone(), action));
    handle
  }
}
