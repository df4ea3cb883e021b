use std::{
  cmp::Ordering,
  collections::BinaryHeap,
  sync::{
    atomic::{self, AtomicU64},
    mpsc::{channel, Receiver, RecvTimeoutError, Sender},
    Arc,
  },
  thread,
  time::{Duration, Instant},
};

use parking_lot::Mutex;

use super::{Scheduler, TaskHandle};
use crate::error::RxError;

struct Job {
  due: Instant,
  seq: u64,
  handle: TaskHandle,
  action: Box<dyn FnOnce() + Send>,
}

impl PartialEq for Job {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.seq == other.seq }
}

impl Eq for Job {}

impl PartialOrd for Job {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Job {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earliest deadline first, then submission order.
    other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
  }
}

struct SerialInner {
  label: String,
  sender: Mutex<Sender<Job>>,
  seq: AtomicU64,
}

/// Runs actions one at a time on a dedicated, named worker thread.
///
/// Actions with the same delay run in submission order. The worker exits once
/// every clone of the scheduler is dropped and the remaining actions have run.
#[derive(Clone)]
pub struct SerialScheduler(Arc<SerialInner>);

impl SerialScheduler {
  pub fn new(label: impl Into<String>) -> Result<Self, RxError> {
    let label = label.into();
    let (sender, receiver) = channel();
    thread::Builder::new().name(label.clone()).spawn(move || worker(receiver))?;
    Ok(SerialScheduler(Arc::new(SerialInner {
      label,
      sender: Mutex::new(sender),
      seq: AtomicU64::new(0),
    })))
  }

  pub fn label(&self) -> &str { &self.0.label }
}

impl Scheduler for SerialScheduler {
  fn schedule<F>(&self, delay: Duration, action: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let handle = TaskHandle::new();
    let job = Job {
      due: Instant::now() + delay,
      seq: self.0.seq.fetch_add(1, atomic::Ordering::Relaxed),
      handle: handle.clone(),
      action: Box::new(action),
    };
    if self.0.sender.lock().send(job).is_err() {
      tracing::warn!(label = %self.0.label, "serial scheduler worker is gone, task dropped");
      handle.cancel();
    }
    handle
  }
}

impl std::fmt::Debug for SerialScheduler {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_tuple("SerialScheduler").field(&self.0.label).finish()
  }
}

fn worker(receiver: Receiver<Job>) {
  let mut jobs = BinaryHeap::<Job>::new();
  let mut open = true;
  loop {
    while let Some(job) = jobs.peek() {
      if !job.handle.is_cancelled() && job.due > Instant::now() {
        break;
      }
      if let Some(job) = jobs.pop() {
        job.handle.run(job.action);
      }
    }

    let next_due = jobs.peek().map(|job| job.due);
    if !open {
      match next_due {
        Some(due) => {
          thread::sleep(due.saturating_duration_since(Instant::now()));
          continue;
        }
        None => return,
      }
    }

    let received = match next_due {
      Some(due) => receiver.recv_timeout(due.saturating_duration_since(Instant::now())),
      None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
      Ok(job) => jobs.push(job),
      Err(RecvTimeoutError::Timeout) => {}
      Err(RecvTimeoutError::Disconnected) => open = false,
    }
  }
}

#[cfg(test)]
mod test {
  use std::sync::mpsc;

  use super::*;

  const WAIT: Duration = Duration::from_secs(5);

  #[test]
  fn runs_in_submission_order_on_worker_thread() {
    let scheduler = SerialScheduler::new("serial-order").unwrap();
    let (tx, rx) = mpsc::channel();
    for i in 0..5 {
      let tx = tx.clone();
      scheduler.schedule(Duration::ZERO, move || {
        let name = thread::current().name().map(str::to_owned);
        tx.send((i, name)).unwrap();
      });
    }
    let got: Vec<_> = (0..5).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
    assert_eq!(got.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    assert!(got.iter().all(|(_, name)| name.as_deref() == Some("serial-order")));
  }

  #[test]
  fn shorter_delay_runs_first() {
    let scheduler = SerialScheduler::new("serial-delay").unwrap();
    let (tx, rx) = mpsc::channel();
    let c_tx = tx.clone();
    scheduler.schedule(Duration::from_millis(60), move || c_tx.send("late").unwrap());
    scheduler.schedule(Duration::from_millis(5), move || tx.send("early").unwrap());
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), "early");
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), "late");
  }

  #[test]
  fn cancelled_task_never_runs() {
    let scheduler = SerialScheduler::new("serial-cancel").unwrap();
    let (tx, rx) = mpsc::channel();
    let c_tx = tx.clone();
    let handle = scheduler.schedule(Duration::from_millis(30), move || c_tx.send("cancelled").unwrap());
    handle.cancel();
    scheduler.schedule(Duration::from_millis(60), move || tx.send("kept").unwrap());
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), "kept");
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
  }

  #[test]
  fn pending_work_runs_after_last_clone_drops() {
    let scheduler = SerialScheduler::new("serial-drop").unwrap();
    let (tx, rx) = mpsc::channel();
    scheduler.schedule(Duration::from_millis(20), move || tx.send(1).unwrap());
    drop(scheduler);
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 1);
  }
}
