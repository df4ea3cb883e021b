//! Deduplicate operator: suppresses consecutive duplicates.
//!
//! Only the most recently forwarded value is remembered, so a value equal to
//! an earlier, non-adjacent one is forwarded again.

use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

#[derive(Clone)]
pub struct DeduplicateOp<P, F> {
  source: P,
  eq: F,
}

impl<P, F> DeduplicateOp<P, F> {
  pub(crate) fn new(source: P, eq: F) -> Self { DeduplicateOp { source, eq } }
}

impl<P, F> Publisher for DeduplicateOp<P, F>
where
  P: Publisher,
  P::Item: Clone + Send + 'static,
  F: FnMut(&P::Item, &P::Item) -> bool + Send + 'static,
{
  type Item = P::Item;
  type Err = P::Err;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Item, P::Err> + 'static,
  {
    self
      .source
      .subscribe(DeduplicateSubscriber { subscriber, eq: self.eq, last: None })
  }
}

pub struct DeduplicateSubscriber<S, F, Item> {
  subscriber: S,
  eq: F,
  last: Option<Item>,
}

impl<Item, Err, S, F> Subscriber<Item, Err> for DeduplicateSubscriber<S, F, Item>
where
  S: Subscriber<Item, Err>,
  F: FnMut(&Item, &Item) -> bool + Send,
  Item: Clone + Send,
{
  #[inline]
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.subscriber.receive_subscription(subscription)
  }

  fn receive(&mut self, value: Item) -> Demand {
    if let Some(last) = &self.last {
      if (self.eq)(last, &value) {
        // the suppressed value used up one unit of demand upstream
        return Demand::max(1);
      }
    }
    self.last = Some(value.clone());
    self.subscriber.receive(value)
  }

  #[inline]
  fn receive_completion(&mut self, completion: Completion<Err>) {
    self.subscriber.receive_completion(completion)
  }
}
