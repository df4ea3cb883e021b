use std::time::Duration;

use super::{Scheduler, TaskHandle};

/// Runs every action synchronously on the calling thread, ignoring the
/// delay.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  fn schedule<F>(&self, _delay: Duration, action: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let handle = TaskHandle::new();
    handle.run(action);
    handle
  }
}
