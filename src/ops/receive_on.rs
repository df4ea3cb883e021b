//! Hands delivery of values and the completion over to a scheduler.
//!
//! Upstream events land in the subscription's outlet queue and a drain task
//! is scheduled; at most one drain task is outstanding per subscription, and
//! the outlet lets only one drain emit at a time, so order is kept even on a
//! concurrent scheduler. Demand goes upstream directly from whichever thread
//! requested it.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  outlet::Outlet,
  publisher::Publisher,
  scheduler::{Scheduler, TaskHandle},
  subscriber::{Completion, Subscriber},
  subscription::{Cancellable, Subscription, SubscriptionRef},
};

#[derive(Clone)]
pub struct ReceiveOnOp<P, Sch> {
  source: P,
  scheduler: Sch,
}

impl<P, Sch> ReceiveOnOp<P, Sch> {
  pub(crate) fn new(source: P, scheduler: Sch) -> Self { ReceiveOnOp { source, scheduler } }
}

impl<P, Sch> Publisher for ReceiveOnOp<P, Sch>
where
  P: Publisher,
  P::Item: Send + 'static,
  P::Err: Send + 'static,
  Sch: Scheduler,
{
  type Item = P::Item;
  type Err = P::Err;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Item, P::Err> + 'static,
  {
    let core = Arc::new(ReceiveOnCore {
      outlet: Outlet::new(),
      scheduler: self.scheduler,
      state: Mutex::new(ReceiveOnState::default()),
    });
    self
      .source
      .subscribe(ReceiveOnSubscriber { downstream: Some(subscriber), core })
  }
}

#[derive(Default)]
struct ReceiveOnState {
  upstream: Option<SubscriptionRef>,
  scheduled: Option<TaskHandle>,
  pending: bool,
  cancelled: bool,
}

struct ReceiveOnCore<S, Item, Err, Sch> {
  outlet: Outlet<S, Item, Err>,
  scheduler: Sch,
  state: Mutex<ReceiveOnState>,
}

impl<S, Item, Err, Sch> ReceiveOnCore<S, Item, Err, Sch>
where
  S: Subscriber<Item, Err> + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Sch: Scheduler,
{
  fn schedule_drain(self: &Arc<Self>) {
    {
      let mut state = self.state.lock();
      if state.pending || state.cancelled {
        return;
      }
      state.pending = true;
    }
    let core = self.clone();
    let handle = self.scheduler.schedule(Duration::ZERO, move || core.run_drain());
    let mut state = self.state.lock();
    if state.pending {
      state.scheduled = Some(handle);
    }
  }

  fn run_drain(&self) {
    {
      let mut state = self.state.lock();
      state.pending = false;
      state.scheduled = None;
    }
    let more = self.outlet.drain();
    if !more.is_none() {
      self.request_upstream(more);
    }
  }

  fn request_upstream(&self, demand: Demand) {
    let upstream = self.state.lock().upstream.clone();
    if let Some(upstream) = upstream {
      upstream.request(demand);
    }
  }
}

pub struct ReceiveOnSubscriber<S, Item, Err, Sch> {
  downstream: Option<S>,
  core: Arc<ReceiveOnCore<S, Item, Err, Sch>>,
}

impl<S, Item, Err, Sch> Subscriber<Item, Err> for ReceiveOnSubscriber<S, Item, Err, Sch>
where
  S: Subscriber<Item, Err> + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Sch: Scheduler,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.core.state.lock().upstream = Some(subscription);
    if let Some(downstream) = self.downstream.take() {
      let handle = ReceiveOnSubscription { core: self.core.clone() };
      self.core.outlet.attach(downstream, Arc::new(handle));
    }
  }

  fn receive(&mut self, value: Item) -> Demand {
    self.core.outlet.push(value);
    self.core.schedule_drain();
    Demand::none()
  }

  fn receive_completion(&mut self, completion: Completion<Err>) {
    self.core.outlet.finish_later(completion);
    self.core.state.lock().upstream = None;
    self.core.schedule_drain();
  }
}

struct ReceiveOnSubscription<S, Item, Err, Sch> {
  core: Arc<ReceiveOnCore<S, Item, Err, Sch>>,
}

impl<S, Item, Err, Sch> Cancellable for ReceiveOnSubscription<S, Item, Err, Sch>
where
  S: Subscriber<Item, Err> + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Sch: Scheduler,
{
  fn cancel(&self) {
    let (upstream, scheduled) = {
      let mut state = self.core.state.lock();
      state.cancelled = true;
      (state.upstream.take(), state.scheduled.take())
    };
    self.core.outlet.cancel();
    if let Some(scheduled) = scheduled {
      scheduled.cancel();
    }
    if let Some(upstream) = upstream {
      upstream.cancel();
    }
  }
}

impl<S, Item, Err, Sch> Subscription for ReceiveOnSubscription<S, Item, Err, Sch>
where
  S: Subscriber<Item, Err> + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Sch: Scheduler,
{
  fn request(&self, demand: Demand) {
    self.core.outlet.add_demand(demand);
    self.core.request_upstream(demand);
    self.core.schedule_drain();
  }
}
