use std::time::Duration;

use tokio::runtime::Handle;

use super::{Delayed, Scheduler, TaskHandle};

/// Runs actions as tasks on a tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioScheduler(Handle);

impl TokioScheduler {
  pub fn new(handle: Handle) -> Self { TokioScheduler(handle) }

  /// The runtime the caller is running on, if any.
  pub fn try_current() -> Option<Self> { Handle::try_current().ok().map(TokioScheduler) }
}

impl Scheduler for TokioScheduler {
  fn schedule<F>(&self, delay: Duration, action: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let handle = TaskHandle::new();
    let timer = (!delay.is_zero()).then(|| tokio::time::sleep(delay));
    let task = Delayed::new(timer, handle.clone(), action);
    self.0.spawn(task);
    handle
  }
}
