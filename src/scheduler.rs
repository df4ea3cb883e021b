//! Where work runs.
//!
//! A [`Scheduler`] runs an action after a delay on some execution context and
//! hands back a [`TaskHandle`] that can cancel it. Cancelling before the
//! action starts guarantees it never runs; an action already running is not
//! interrupted.

use std::{
  future::Future,
  pin::Pin,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  task::{Context, Poll},
  time::Duration,
};

use futures::task::AtomicWaker;
use pin_project_lite::pin_project;

use crate::subscription::Cancellable;

mod immediate;
pub use immediate::ImmediateScheduler;
mod serial;
pub use serial::SerialScheduler;
mod test_scheduler;
pub use test_scheduler::TestScheduler;
#[cfg(feature = "pool-scheduler")]
mod pool;
#[cfg(feature = "pool-scheduler")]
pub use pool::PoolScheduler;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;

/// An execution context that runs actions after a delay.
///
/// A scheduler that runs actions on one thread must run actions with equal
/// delays in the order they were scheduled.
pub trait Scheduler: Clone + Send + Sync + 'static {
  fn schedule<F>(&self, delay: Duration, action: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static;
}

#[derive(Default)]
struct TaskFlags {
  cancelled: AtomicBool,
  finished: AtomicBool,
  waker: AtomicWaker,
}

/// Token identifying one scheduled action.
#[derive(Clone, Default)]
pub struct TaskHandle(Arc<TaskFlags>);

impl TaskHandle {
  pub fn new() -> Self { Self::default() }

  /// Prevents the action from running if it has not started yet.
  pub fn cancel(&self) {
    if !self.0.cancelled.swap(true, Ordering::AcqRel) {
      self.0.waker.wake();
    }
  }

  pub fn is_cancelled(&self) -> bool { self.0.cancelled.load(Ordering::Acquire) }

  pub fn is_finished(&self) -> bool { self.0.finished.load(Ordering::Acquire) }

  /// Runs `action` unless the handle was cancelled first. Scheduler
  /// implementations call this when the action's time has come.
  pub fn run<F: FnOnce()>(&self, action: F) {
    if self.is_cancelled() {
      tracing::debug!("scheduled task skipped, it was cancelled");
    } else {
      action();
    }
    self.0.finished.store(true, Ordering::Release);
  }

  fn register(&self, cx: &Context<'_>) { self.0.waker.register(cx.waker()); }
}

impl Cancellable for TaskHandle {
  fn cancel(&self) { TaskHandle::cancel(self) }
}

impl std::fmt::Debug for TaskHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TaskHandle")
      .field("cancelled", &self.is_cancelled())
      .field("finished", &self.is_finished())
      .finish()
  }
}

pin_project! {
  /// Future that waits on `timer`, then runs `action` through `handle`.
  /// Cancelling the handle wakes it so the action and the timer are
  /// dropped without waiting for the deadline.
  pub(crate) struct Delayed<T, A> {
    #[pin]
    timer: Option<T>,
    handle: TaskHandle,
    action: Option<A>,
  }
}

#[cfg_attr(not(any(feature = "pool-scheduler", feature = "tokio-scheduler")), allow(dead_code))]
impl<T, A> Delayed<T, A> {
  pub(crate) fn new(timer: Option<T>, handle: TaskHandle, action: A) -> Self {
    Delayed { timer, handle, action: Some(action) }
  }
}

impl<T, A> Future for Delayed<T, A>
where
  T: Future,
  A: FnOnce(),
{
  type Output = ();

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
    let mut this = self.project();
    this.handle.register(cx);
    if this.handle.is_cancelled() {
      this.action.take();
      return Poll::Ready(());
    }
    if let Some(timer) = this.timer.as_mut().as_pin_mut() {
      if timer.poll(cx).is_pending() {
        return Poll::Pending;
      }
      this.timer.set(None);
    }
    if let Some(action) = this.action.take() {
      this.handle.run(action);
    }
    Poll::Ready(())
  }
}
