//! Debounce operator.
//!
//! Each subscription owns a single pending slot:
//!
//! ```text
//!   Idle --value--> Pending(value, token) --timer(token)--> Idle + emit
//!                     |  ^
//!                     +--+ value: cancel timer, new token
//! ```
//!
//! A timer only emits if its token still matches the slot, so a timer that
//! fires while being superseded on another thread emits nothing. Completion
//! drops a pending value and is forwarded at once.

use std::{sync::Arc, time::Duration};

use crate::{
  demand::Demand,
  outlet::Outlet,
  publisher::Publisher,
  rc::MutArc,
  scheduler::{Scheduler, TaskHandle},
  subscriber::{Completion, Subscriber},
  subscription::{Cancellable, Subscription, SubscriptionRef},
};

#[derive(Clone)]
pub struct DebounceOp<P, Sch> {
  source: P,
  interval: Duration,
  scheduler: Sch,
}

impl<P, Sch> DebounceOp<P, Sch> {
  pub(crate) fn new(source: P, interval: Duration, scheduler: Sch) -> Self {
    DebounceOp { source, interval, scheduler }
  }
}

impl<P, Sch> Publisher for DebounceOp<P, Sch>
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
    self.source.subscribe(DebounceSubscriber {
      downstream: Some(subscriber),
      outlet: Outlet::new(),
      state: MutArc::own(DebounceState {
        slot: Slot::Idle,
        next_token: 0,
        upstream: None,
        closed: false,
      }),
      interval: self.interval,
      scheduler: self.scheduler,
    })
  }
}

enum Slot<Item> {
  Idle,
  Pending { value: Item, token: u64, timer: Option<TaskHandle> },
}

impl<Item> Slot<Item> {
  fn cancel_timer(self) {
    if let Slot::Pending { timer: Some(timer), .. } = self {
      timer.cancel();
    }
  }
}

struct DebounceState<Item> {
  slot: Slot<Item>,
  next_token: u64,
  upstream: Option<SubscriptionRef>,
  closed: bool,
}

pub struct DebounceSubscriber<S, Item, Err, Sch> {
  downstream: Option<S>,
  outlet: Outlet<S, Item, Err>,
  state: MutArc<DebounceState<Item>>,
  interval: Duration,
  scheduler: Sch,
}

impl<S, Item, Err, Sch> Subscriber<Item, Err> for DebounceSubscriber<S, Item, Err, Sch>
where
  S: Subscriber<Item, Err> + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Sch: Scheduler,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.state.rc_deref_mut().upstream = Some(subscription.clone());
    if let Some(downstream) = self.downstream.take() {
      let handle = DebounceSubscription { outlet: self.outlet.clone(), state: self.state.clone() };
      self.outlet.attach(downstream, Arc::new(handle));
    }
    if !self.state.rc_deref_mut().closed {
      subscription.request(Demand::unlimited());
    }
  }

  fn receive(&mut self, value: Item) -> Demand {
    let (token, superseded) = {
      let mut state = self.state.rc_deref_mut();
      if state.closed {
        return Demand::none();
      }
      let token = state.next_token;
      state.next_token += 1;
      let superseded = std::mem::replace(&mut state.slot, Slot::Pending { value, token, timer: None });
      (token, superseded)
    };
    superseded.cancel_timer();

    let state = self.state.clone();
    let outlet = self.outlet.clone();
    let timer = self
      .scheduler
      .schedule(self.interval, move || fire(&state, &outlet, token));

    let mut state = self.state.rc_deref_mut();
    match &mut state.slot {
      Slot::Pending { token: t, timer: slot, .. } if *t == token => *slot = Some(timer),
      // already fired or superseded
      _ => {}
    }
    Demand::none()
  }

  fn receive_completion(&mut self, completion: Completion<Err>) {
    let dropped = {
      let mut state = self.state.rc_deref_mut();
      state.closed = true;
      state.upstream = None;
      std::mem::replace(&mut state.slot, Slot::Idle)
    };
    if matches!(dropped, Slot::Pending { .. }) {
      tracing::debug!("debounce completed with a value pending, value dropped");
    }
    dropped.cancel_timer();
    self.outlet.finish(completion);
  }
}

fn fire<S, Item, Err>(state: &MutArc<DebounceState<Item>>, outlet: &Outlet<S, Item, Err>, token: u64)
where
  S: Subscriber<Item, Err>,
{
  let value = {
    let mut state = state.rc_deref_mut();
    match std::mem::replace(&mut state.slot, Slot::Idle) {
      Slot::Pending { value, token: t, .. } if t == token => Some(value),
      other => {
        state.slot = other;
        None
      }
    }
  };
  if let Some(value) = value {
    outlet.offer(value);
  }
}

struct DebounceSubscription<S, Item, Err> {
  outlet: Outlet<S, Item, Err>,
  state: MutArc<DebounceState<Item>>,
}

impl<S, Item, Err> Cancellable for DebounceSubscription<S, Item, Err>
where
  S: Subscriber<Item, Err>,
  Item: Send,
  Err: Send,
{
  fn cancel(&self) {
    self.outlet.cancel();
    let (slot, upstream) = {
      let mut state = self.state.rc_deref_mut();
      state.closed = true;
      (std::mem::replace(&mut state.slot, Slot::Idle), state.upstream.take())
    };
    slot.cancel_timer();
    if let Some(upstream) = upstream {
      upstream.cancel();
    }
  }
}

impl<S, Item, Err> Subscription for DebounceSubscription<S, Item, Err>
where
  S: Subscriber<Item, Err>,
  Item: Send,
  Err: Send,
{
  fn request(&self, demand: Demand) { self.outlet.request(demand); }
}
