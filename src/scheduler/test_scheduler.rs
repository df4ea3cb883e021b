//! Virtual-time scheduler for deterministic tests of time-based operators.
//!
//! Time only moves when the test says so:
//!
//! ```
//! use std::time::Duration;
//! use rxcombine::prelude::*;
//!
//! let scheduler = TestScheduler::new();
//! let subject = PassthroughSubject::<i32>::new();
//! let _c = subject
//!   .clone()
//!   .debounce(Duration::from_millis(100), scheduler.clone())
//!   .sink_value(|v| println!("{v}"));
//! subject.send(1);
//! scheduler.advance_by(Duration::from_millis(100));
//! ```
//!
//! Clones share one clock and one task queue. Actions run on the thread
//! calling `advance_by` or `flush`, with no internal lock held, so an action
//! may schedule further work.

use std::{cmp::Ordering, collections::BinaryHeap, sync::Arc, time::Duration};

use parking_lot::Mutex;

use super::{Scheduler, TaskHandle};

struct ScheduledTask {
  scheduled_time: Duration,
  task_id: usize,
  handle: TaskHandle,
  action: Box<dyn FnOnce() + Send>,
}

impl PartialEq for ScheduledTask {
  fn eq(&self, other: &Self) -> bool {
    self.scheduled_time == other.scheduled_time && self.task_id == other.task_id
  }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledTask {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by task_id
    other
      .scheduled_time
      .cmp(&self.scheduled_time)
      .then_with(|| other.task_id.cmp(&self.task_id))
  }
}

#[derive(Default)]
struct TestSchedulerState {
  virtual_time: Duration,
  task_queue: BinaryHeap<ScheduledTask>,
  next_task_id: usize,
}

#[derive(Clone, Default)]
pub struct TestScheduler(Arc<Mutex<TestSchedulerState>>);

impl TestScheduler {
  pub fn new() -> Self { Self::default() }

  /// Current virtual time, starting at zero.
  pub fn now(&self) -> Duration { self.0.lock().virtual_time }

  /// Number of scheduled actions that have neither run nor been cancelled.
  pub fn pending_count(&self) -> usize {
    self
      .0
      .lock()
      .task_queue
      .iter()
      .filter(|t| !t.handle.is_cancelled())
      .count()
  }

  pub fn is_empty(&self) -> bool { self.pending_count() == 0 }

  /// Moves virtual time forward by `duration`, running every action that
  /// falls due, in time order.
  pub fn advance_by(&self, duration: Duration) {
    let target_time = self.now() + duration;
    self.execute_tasks_until(Some(target_time));
    let mut state = self.0.lock();
    if state.virtual_time < target_time {
      state.virtual_time = target_time;
    }
  }

  /// Runs every pending action, jumping virtual time to each one's deadline.
  pub fn flush(&self) { self.execute_tasks_until(None); }

  fn execute_tasks_until(&self, target_time: Option<Duration>) {
    loop {
      let task = {
        let mut state = self.0.lock();
        let due = state
          .task_queue
          .peek()
          .is_some_and(|peek| target_time.is_none_or(|limit| peek.scheduled_time <= limit));
        if !due {
          return;
        }
        let task = state.task_queue.pop();
        if let Some(task) = &task {
          state.virtual_time = state.virtual_time.max(task.scheduled_time);
        }
        task
      };

      if let Some(task) = task {
        task.handle.run(task.action);
      }
    }
  }
}

impl Scheduler for TestScheduler {
  fn schedule<F>(&self, delay: Duration, action: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let handle = TaskHandle::new();
    let mut state = self.0.lock();
    let task_id = state.next_task_id;
    state.next_task_id += 1;
    let scheduled_time = state.virtual_time + delay;
    state.task_queue.push(ScheduledTask {
      scheduled_time,
      task_id,
      handle: handle.clone(),
      action: Box::new(action),
    });
    handle
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn log_into(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> impl FnOnce() + Send {
    let log = log.clone();
    move || log.lock().push(name)
  }

  #[test]
  fn advance_runs_only_due_tasks() {
    let scheduler = TestScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    scheduler.schedule(Duration::from_millis(10), log_into(&log, "a"));
    scheduler.schedule(Duration::from_millis(30), log_into(&log, "b"));

    scheduler.advance_by(Duration::from_millis(20));
    assert_eq!(*log.lock(), vec!["a"]);
    assert_eq!(scheduler.now(), Duration::from_millis(20));
    assert_eq!(scheduler.pending_count(), 1);

    scheduler.advance_by(Duration::from_millis(10));
    assert_eq!(*log.lock(), vec!["a", "b"]);
    assert!(scheduler.is_empty());
  }

  #[test]
  fn same_deadline_keeps_fifo_order() {
    let scheduler = TestScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    scheduler.schedule(Duration::from_millis(5), log_into(&log, "first"));
    scheduler.schedule(Duration::from_millis(5), log_into(&log, "second"));
    scheduler.flush();
    assert_eq!(*log.lock(), vec!["first", "second"]);
    assert_eq!(scheduler.now(), Duration::from_millis(5));
  }

  #[test]
  fn cancelled_task_is_skipped() {
    let scheduler = TestScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    let handle = scheduler.schedule(Duration::from_millis(5), log_into(&log, "never"));
    handle.cancel();
    assert_eq!(scheduler.pending_count(), 0);
    scheduler.flush();
    assert!(log.lock().is_empty());
  }

  #[test]
  fn actions_may_schedule_more_work() {
    let scheduler = TestScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_scheduler = scheduler.clone();
    let c_log = log.clone();
    scheduler.schedule(Duration::from_millis(5), move || {
      c_log.lock().push("outer");
      c_scheduler.schedule(Duration::from_millis(5), log_into(&c_log, "inner"));
    });
    scheduler.advance_by(Duration::from_millis(10));
    assert_eq!(*log.lock(), vec!["outer", "inner"]);
  }
}
