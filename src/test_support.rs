use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Event<Item, Err> {
  Value(Item),
  Done(Completion<Err>),
}

/// Subscriber that records everything it sees and lets the test drive demand.
pub(crate) struct Recorder<Item, Err> {
  probe: Probe<Item, Err>,
  initial: Demand,
  per_value: Demand,
}

pub(crate) struct Probe<Item, Err> {
  events: Arc<Mutex<Vec<Event<Item, Err>>>>,
  subscription: Arc<Mutex<Option<SubscriptionRef>>>,
}

impl<Item, Err> Clone for Probe<Item, Err> {
  fn clone(&self) -> Self {
    Probe { events: self.events.clone(), subscription: self.subscription.clone() }
  }
}

pub(crate) fn recorder<Item, Err>(initial: Demand) -> (Recorder<Item, Err>, Probe<Item, Err>) {
  recorder_with(initial, Demand::none())
}

pub(crate) fn recorder_with<Item, Err>(
  initial: Demand, per_value: Demand,
) -> (Recorder<Item, Err>, Probe<Item, Err>) {
  let probe = Probe { events: Arc::default(), subscription: Arc::default() };
  (Recorder { probe: probe.clone(), initial, per_value }, probe)
}

impl<Item: Send, Err: Send> Subscriber<Item, Err> for Recorder<Item, Err> {
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    *self.probe.subscription.lock() = Some(subscription.clone());
    if !self.initial.is_none() {
      subscription.request(self.initial);
    }
  }

  fn receive(&mut self, value: Item) -> Demand {
    self.probe.events.lock().push(Event::Value(value));
    self.per_value
  }

  fn receive_completion(&mut self, completion: Completion<Err>) {
    self.probe.events.lock().push(Event::Done(completion));
  }
}

impl<Item: Clone, Err: Clone> Probe<Item, Err> {
  pub(crate) fn events(&self) -> Vec<Event<Item, Err>> { self.events.lock().clone() }

  pub(crate) fn values(&self) -> Vec<Item> {
    self
      .events
      .lock()
      .iter()
      .filter_map(|e| match e {
        Event::Value(v) => Some(v.clone()),
        Event::Done(_) => None,
      })
      .collect()
  }

  pub(crate) fn completion(&self) -> Option<Completion<Err>> {
    self.events.lock().iter().find_map(|e| match e {
      Event::Done(c) => Some(c.clone()),
      Event::Value(_) => None,
    })
  }

  pub(crate) fn completions(&self) -> usize {
    self.events.lock().iter().filter(|e| matches!(e, Event::Done(_))).count()
  }
}

impl<Item, Err> Probe<Item, Err> {
  pub(crate) fn is_subscribed(&self) -> bool { self.subscription.lock().is_some() }

  pub(crate) fn request(&self, demand: Demand) {
    let subscription = self.subscription.lock().clone();
    if let Some(s) = subscription {
      s.request(demand);
    }
  }

  pub(crate) fn cancel(&self) {
    let subscription = self.subscription.lock().clone();
    if let Some(s) = subscription {
      s.cancel();
    }
  }
}
