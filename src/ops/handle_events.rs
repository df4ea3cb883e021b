//! Side-effect hooks on every lifecycle event of a stream.
//!
//! Hooks run before the event is passed on, on whichever thread the event
//! happens on. `print` is built from the same hooks and logs through
//! `tracing`.

use std::{
  fmt::Debug,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::{Cancellable, Subscription, SubscriptionRef},
};

type Hook = Arc<dyn Fn() + Send + Sync>;
type ValueHook<Item> = Arc<dyn Fn(&Item) + Send + Sync>;
type CompletionHook<Err> = Arc<dyn Fn(&Completion<Err>) + Send + Sync>;
type RequestHook = Arc<dyn Fn(Demand) + Send + Sync>;

/// Set of optional lifecycle callbacks. Unset hooks cost nothing.
///
/// ```
/// use rxcombine::prelude::*;
///
/// let hooks = EventHooks::new()
///   .on_output(|v: &i32| println!("got {v}"))
///   .on_completion(|c: &Completion<std::convert::Infallible>| println!("{c:?}"));
/// let _c = from_iter(0..3).handle_events(hooks).sink_value(|_| {});
/// ```
pub struct EventHooks<Item, Err> {
  subscription: Option<Hook>,
  output: Option<ValueHook<Item>>,
  completion: Option<CompletionHook<Err>>,
  cancel: Option<Hook>,
  request: Option<RequestHook>,
}

impl<Item, Err> Default for EventHooks<Item, Err> {
  fn default() -> Self {
    EventHooks { subscription: None, output: None, completion: None, cancel: None, request: None }
  }
}

impl<Item, Err> Clone for EventHooks<Item, Err> {
  fn clone(&self) -> Self {
    EventHooks {
      subscription: self.subscription.clone(),
      output: self.output.clone(),
      completion: self.completion.clone(),
      cancel: self.cancel.clone(),
      request: self.request.clone(),
    }
  }
}

impl<Item, Err> EventHooks<Item, Err> {
  pub fn new() -> Self { Self::default() }

  /// Runs when the upstream subscription arrives.
  pub fn on_subscribe(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
    self.subscription = Some(Arc::new(f));
    self
  }

  pub fn on_output(mut self, f: impl Fn(&Item) + Send + Sync + 'static) -> Self {
    self.output = Some(Arc::new(f));
    self
  }

  pub fn on_completion(mut self, f: impl Fn(&Completion<Err>) + Send + Sync + 'static) -> Self {
    self.completion = Some(Arc::new(f));
    self
  }

  /// Runs once, on the first downstream cancel.
  pub fn on_cancel(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
    self.cancel = Some(Arc::new(f));
    self
  }

  /// Runs for every non-zero demand sent upstream, whether requested through
  /// the subscription or returned from `receive`.
  pub fn on_request(mut self, f: impl Fn(Demand) + Send + Sync + 'static) -> Self {
    self.request = Some(Arc::new(f));
    self
  }
}

impl<Item: Debug, Err: Debug> EventHooks<Item, Err> {
  pub(crate) fn logging(prefix: impl Into<String>) -> Self {
    let prefix: Arc<str> = prefix.into().into();
    let p = prefix.clone();
    let hooks = EventHooks::new().on_subscribe(move || tracing::info!("{p}: receive subscription"));
    let p = prefix.clone();
    let hooks = hooks.on_request(move |d| match d.max_value() {
      Some(n) => tracing::info!("{p}: request max: ({n})"),
      None => tracing::info!("{p}: request unlimited"),
    });
    let p = prefix.clone();
    let hooks = hooks.on_output(move |v| tracing::info!("{p}: receive value: ({v:?})"));
    let p = prefix.clone();
    let hooks = hooks.on_completion(move |c| match c {
      Completion::Finished => tracing::info!("{p}: receive finished"),
      Completion::Failed(e) => tracing::info!("{p}: receive error: ({e:?})"),
    });
    hooks.on_cancel(move || tracing::info!("{prefix}: receive cancel"))
  }
}

pub struct HandleEventsOp<P: Publisher> {
  source: P,
  hooks: EventHooks<P::Item, P::Err>,
}

impl<P: Publisher> HandleEventsOp<P> {
  pub(crate) fn new(source: P, hooks: EventHooks<P::Item, P::Err>) -> Self {
    HandleEventsOp { source, hooks }
  }
}

impl<P: Publisher + Clone> Clone for HandleEventsOp<P> {
  fn clone(&self) -> Self { HandleEventsOp { source: self.source.clone(), hooks: self.hooks.clone() } }
}

impl<P> Publisher for HandleEventsOp<P>
where
  P: Publisher,
  P::Item: 'static,
  P::Err: 'static,
{
  type Item = P::Item;
  type Err = P::Err;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Item, P::Err> + 'static,
  {
    self
      .source
      .subscribe(HandleEventsSubscriber { subscriber, hooks: self.hooks })
  }
}

pub struct HandleEventsSubscriber<S, Item, Err> {
  subscriber: S,
  hooks: EventHooks<Item, Err>,
}

impl<Item, Err, S> Subscriber<Item, Err> for HandleEventsSubscriber<S, Item, Err>
where
  S: Subscriber<Item, Err>,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    if let Some(f) = &self.hooks.subscription {
      f();
    }
    let tap = TapSubscription {
      upstream: subscription,
      on_request: self.hooks.request.clone(),
      on_cancel: self.hooks.cancel.clone(),
      cancelled: AtomicBool::new(false),
    };
    self.subscriber.receive_subscription(Arc::new(tap))
  }

  fn receive(&mut self, value: Item) -> Demand {
    if let Some(f) = &self.hooks.output {
      f(&value);
    }
    let more = self.subscriber.receive(value);
    if !more.is_none() {
      if let Some(f) = &self.hooks.request {
        f(more);
      }
    }
    more
  }

  fn receive_completion(&mut self, completion: Completion<Err>) {
    if let Some(f) = &self.hooks.completion {
      f(&completion);
    }
    self.subscriber.receive_completion(completion)
  }
}

struct TapSubscription {
  upstream: SubscriptionRef,
  on_request: Option<RequestHook>,
  on_cancel: Option<Hook>,
  cancelled: AtomicBool,
}

impl Cancellable for TapSubscription {
  fn cancel(&self) {
    if !self.cancelled.swap(true, Ordering::AcqRel) {
      if let Some(f) = &self.on_cancel {
        f();
      }
    }
    self.upstream.cancel();
  }
}

impl Subscription for TapSubscription {
  fn request(&self, demand: Demand) {
    if !demand.is_none() {
      if let Some(f) = &self.on_request {
        f(demand);
      }
    }
    self.upstream.request(demand);
  }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::{prelude::*, test_support::recorder};

  fn journal() -> (Arc<Mutex<Vec<String>>>, impl Fn(String) + Clone + Send + Sync + 'static) {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    (log, move |s| c_log.lock().push(s))
  }

  #[test]
  fn hooks_see_every_event_in_order() {
    let (log, note) = journal();
    let (n1, n2, n3, n4) = (note.clone(), note.clone(), note.clone(), note);
    let hooks = EventHooks::new()
      .on_subscribe(move || n1("subscribe".into()))
      .on_request(move |d| n2(format!("request {d:?}")))
      .on_output(move |v: &i32| n3(format!("value {v}")))
      .on_completion(move |c: &Completion<std::convert::Infallible>| n4(format!("{c:?}")));

    let (r, probe) = recorder(Demand::max(2));
    from_iter([1, 2]).handle_events(hooks).subscribe(r);

    assert_eq!(probe.values(), vec![1, 2]);
    assert_eq!(
      *log.lock(),
      vec!["subscribe", "request Max(2)", "value 1", "value 2", "Finished"]
    );
  }

  #[test]
  fn cancel_hook_fires_once() {
    let (log, note) = journal();
    let hooks = EventHooks::<i32, std::convert::Infallible>::new()
      .on_cancel(move || note("cancel".into()));
    let subject = PassthroughSubject::new();
    let (r, probe) = recorder(Demand::unlimited());
    subject.clone().handle_events(hooks).subscribe(r);

    probe.cancel();
    probe.cancel();
    subject.send(1);
    assert_eq!(*log.lock(), vec!["cancel"]);
    assert!(probe.values().is_empty());
    assert_eq!(subject.subscriber_count(), 0);
  }

  #[test]
  fn demand_from_receive_reports_request() {
    let (log, note) = journal();
    let hooks = EventHooks::<i32, std::convert::Infallible>::new()
      .on_request(move |d| note(format!("{d:?}")));
    let (r, probe) = crate::test_support::recorder_with(Demand::max(1), Demand::max(1));
    from_iter([7, 8]).handle_events(hooks).subscribe(r);
    assert_eq!(probe.values(), vec![7, 8]);
    assert_eq!(*log.lock(), vec!["Max(1)", "Max(1)", "Max(1)"]);
  }

  #[test]
  fn print_passes_everything_through() {
    let (r, probe) = recorder::<i32, &str>(Demand::unlimited());
    fail("boom").print("fetch").subscribe(r);
    assert_eq!(probe.completion(), Some(Completion::Failed("boom")));
  }
}
