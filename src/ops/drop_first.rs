use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

#[derive(Clone)]
pub struct DropFirstOp<P> {
  source: P,
  count: usize,
}

impl<P> DropFirstOp<P> {
  pub(crate) fn new(source: P, count: usize) -> Self { DropFirstOp { source, count } }
}

impl<P: Publisher> Publisher for DropFirstOp<P> {
  type Item = P::Item;
  type Err = P::Err;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Item, P::Err> + 'static,
  {
    self
      .source
      .subscribe(DropFirstSubscriber { subscriber, remaining: self.count })
  }
}

pub struct DropFirstSubscriber<S> {
  subscriber: S,
  remaining: usize,
}

impl<Item, Err, S> Subscriber<Item, Err> for DropFirstSubscriber<S>
where
  S: Subscriber<Item, Err>,
{
  #[inline]
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.subscriber.receive_subscription(subscription)
  }

  fn receive(&mut self, value: Item) -> Demand {
    if self.remaining > 0 {
      self.remaining -= 1;
      // replace the demand the dropped value consumed
      Demand::max(1)
    } else {
      self.subscriber.receive(value)
    }
  }

  #[inline]
  fn receive_completion(&mut self, completion: Completion<Err>) {
    self.subscriber.receive_completion(completion)
  }
}
