//! End-to-end checks of the publish/subscribe contract through the public
//! API only.

use std::{
  convert::Infallible,
  sync::{mpsc::channel, Arc},
  time::Duration,
};

use parking_lot::Mutex;
use rxcombine::prelude::*;

#[derive(Clone, Debug, PartialEq)]
enum Seen<T, E> {
  Subscribed,
  Value(T),
  Done(Completion<E>),
}

/// Subscriber that asks for `initial` once and nothing more.
struct Manual<T, E> {
  initial: Demand,
  log: Arc<Mutex<Vec<Seen<T, E>>>>,
  subscription: Arc<Mutex<Option<SubscriptionRef>>>,
}

type Handles<T, E> = (Arc<Mutex<Vec<Seen<T, E>>>>, Arc<Mutex<Option<SubscriptionRef>>>);

fn manual<T, E>(initial: Demand) -> (Manual<T, E>, Handles<T, E>) {
  let log = Arc::new(Mutex::new(vec![]));
  let subscription = Arc::new(Mutex::new(None));
  (Manual { initial, log: log.clone(), subscription: subscription.clone() }, (log, subscription))
}

impl<T: Send, E: Send> Subscriber<T, E> for Manual<T, E> {
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.log.lock().push(Seen::Subscribed);
    *self.subscription.lock() = Some(subscription.clone());
    subscription.request(self.initial);
  }

  fn receive(&mut self, value: T) -> Demand {
    self.log.lock().push(Seen::Value(value));
    Demand::none()
  }

  fn receive_completion(&mut self, completion: Completion<E>) {
    self.log.lock().push(Seen::Done(completion));
  }
}

#[test]
fn finite_sequence_then_exactly_one_finished() {
  let (subscriber, (log, _)) = manual::<char, Infallible>(Demand::unlimited());
  from_iter("rust".chars()).subscribe(subscriber);
  assert_eq!(
    *log.lock(),
    vec![
      Seen::Subscribed,
      Seen::Value('r'),
      Seen::Value('u'),
      Seen::Value('s'),
      Seen::Value('t'),
      Seen::Done(Completion::Finished),
    ]
  );
}

#[test]
fn bounded_demand_caps_an_unbounded_source() {
  let (subscriber, (log, subscription)) = manual::<u64, Infallible>(Demand::max(2));
  from_iter(0u64..).subscribe(subscriber);
  assert_eq!(*log.lock(), vec![Seen::Subscribed, Seen::Value(0), Seen::Value(1)]);

  let subscription = subscription.lock().clone().unwrap();
  subscription.request(Demand::max(1));
  assert_eq!(log.lock().last(), Some(&Seen::Value(2)));
  assert_eq!(log.lock().len(), 4);
}

#[test]
fn cancel_is_idempotent_and_final() {
  let subject = PassthroughSubject::<i32>::new();
  let (subscriber, (log, subscription)) = manual::<i32, Infallible>(Demand::unlimited());
  subject.clone().map(|v| v + 1).subscribe(subscriber);
  subject.send(1);

  let subscription = subscription.lock().clone().unwrap();
  subscription.cancel();
  subscription.cancel();
  subscription.request(Demand::max(10));
  subject.send(2);
  subject.send_completion(Completion::Finished);

  assert_eq!(*log.lock(), vec![Seen::Subscribed, Seen::Value(2)]);
  assert_eq!(subject.subscriber_count(), 0);
}

#[test]
fn current_value_is_first_delivery() {
  let subject = CurrentValueSubject::<&str>::new("initial");
  let (subscriber, (log, _)) = manual::<&str, Infallible>(Demand::unlimited());
  subject.clone().subscribe(subscriber);
  subject.send("next");
  assert_eq!(*log.lock(), vec![Seen::Subscribed, Seen::Value("initial"), Seen::Value("next")]);
}

#[test]
fn completed_subject_only_replays_completion() {
  let subject = CurrentValueSubject::<i32, String>::new(0);
  subject.send(1);
  subject.send_completion(Completion::Failed("closed".to_owned()));
  subject.send(2);

  let (subscriber, (log, _)) = manual::<i32, String>(Demand::unlimited());
  subject.subscribe(subscriber);
  assert_eq!(
    *log.lock(),
    vec![Seen::Subscribed, Seen::Done(Completion::Failed("closed".to_owned()))]
  );
}

#[test]
fn deduplicate_removes_adjacent_repeats_only() {
  let out = Arc::new(Mutex::new(vec![]));
  let c_out = out.clone();
  let _c = from_iter([1, 1, 2, 2, 2, 3, 1])
    .deduplicate()
    .sink_value(move |v| c_out.lock().push(v));
  assert_eq!(*out.lock(), vec![1, 2, 3, 1]);
}

#[test]
fn debounce_keeps_last_of_burst() {
  let scheduler = TestScheduler::new();
  let subject = PassthroughSubject::<&str>::new();
  let out = Arc::new(Mutex::new(vec![]));
  let c_out = out.clone();
  let _c = subject
    .clone()
    .debounce(Duration::from_millis(500), scheduler.clone())
    .sink_value(move |v| c_out.lock().push(v));

  for v in ["a", "b", "c"] {
    subject.send(v);
    scheduler.advance_by(Duration::from_millis(100));
  }
  scheduler.advance_by(Duration::from_secs(2));
  assert_eq!(*out.lock(), vec!["c"]);
}

#[test]
fn failure_short_circuits_every_operator() {
  let (subscriber, (log, _)) = manual::<usize, String>(Demand::unlimited());
  from_iter(["ok", "", "never"])
    .set_failure_type::<String>()
    .try_map(|s| if s.is_empty() { Err("empty key".to_owned()) } else { Ok(s) })
    .map(str::len)
    .deduplicate()
    .drop_first(0)
    .subscribe(subscriber);
  assert_eq!(
    *log.lock(),
    vec![Seen::Subscribed, Seen::Value(2), Seen::Done(Completion::Failed("empty key".to_owned()))]
  );
}

#[test]
fn erased_chain_keeps_its_behaviour() {
  fn evens(limit: u32) -> BoxedPublisher<u32, Infallible> {
    from_iter(0..limit).map(|v| v * 2).box_it()
  }
  let (subscriber, (log, _)) = manual::<u32, Infallible>(Demand::max(3));
  evens(10).subscribe(subscriber);
  assert_eq!(
    *log.lock(),
    vec![Seen::Subscribed, Seen::Value(0), Seen::Value(2), Seen::Value(4)]
  );
}

#[test]
fn cancel_bag_cancels_everything_on_drop() {
  let subject = PassthroughSubject::<i32>::new();
  let out = Arc::new(Mutex::new(vec![]));
  {
    let mut bag = CancelBag::new();
    for _ in 0..3 {
      let c_out = out.clone();
      subject.clone().sink_value(move |v| c_out.lock().push(v)).store(&mut bag);
    }
    subject.send(1);
    assert_eq!(subject.subscriber_count(), 3);
  }
  subject.send(2);
  assert_eq!(*out.lock(), vec![1, 1, 1]);
  assert_eq!(subject.subscriber_count(), 0);
}

#[test]
fn serial_hand_off_keeps_order_across_threads() {
  let worker = SerialScheduler::new("delivery").unwrap();
  let subject = PassthroughSubject::<usize>::new();
  let (tx, rx) = channel();
  let done = tx.clone();
  let _c = subject.clone().receive_on(worker).sink(
    move |v| {
      let _ = tx.send(Some(v));
    },
    move |_| {
      let _ = done.send(None);
    },
  );

  let producers: Vec<_> = (0..4)
    .map(|t| {
      let subject = subject.clone();
      std::thread::spawn(move || {
        for i in 0..25 {
          subject.send(t * 100 + i);
        }
      })
    })
    .collect();
  for p in producers {
    p.join().unwrap();
  }
  subject.send_completion(Completion::Finished);

  let mut seen = vec![];
  while let Some(v) = rx.recv_timeout(Duration::from_secs(5)).unwrap() {
    seen.push(v);
  }
  assert_eq!(seen.len(), 100);
  for t in 0..4 {
    let from_t: Vec<_> = seen.iter().copied().filter(|v| v / 100 == t).collect();
    assert_eq!(from_t, (0..25).map(|i| t * 100 + i).collect::<Vec<_>>());
  }
}
