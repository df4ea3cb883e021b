use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

#[derive(Clone)]
pub struct MapOp<P, F> {
  source: P,
  func: F,
}

impl<P, F> MapOp<P, F> {
  pub(crate) fn new(source: P, func: F) -> Self { MapOp { source, func } }
}

impl<P, F, B> Publisher for MapOp<P, F>
where
  P: Publisher,
  F: FnMut(P::Item) -> B + Send + 'static,
{
  type Item = B;
  type Err = P::Err;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<B, P::Err> + 'static,
  {
    self.source.subscribe(MapSubscriber { subscriber, func: self.func })
  }
}

pub struct MapSubscriber<S, F> {
  subscriber: S,
  func: F,
}

impl<Item, Err, S, F, B> Subscriber<Item, Err> for MapSubscriber<S, F>
where
  S: Subscriber<B, Err>,
  F: FnMut(Item) -> B + Send,
{
  #[inline]
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.subscriber.receive_subscription(subscription)
  }

  #[inline]
  fn receive(&mut self, value: Item) -> Demand { self.subscriber.receive((self.func)(value)) }

  #[inline]
  fn receive_completion(&mut self, completion: Completion<Err>) {
    self.subscriber.receive_completion(completion)
  }
}

#[derive(Clone)]
pub struct TryMapOp<P, F> {
  source: P,
  func: F,
}

impl<P, F> TryMapOp<P, F> {
  pub(crate) fn new(source: P, func: F) -> Self { TryMapOp { source, func } }
}

impl<P, F, B> Publisher for TryMapOp<P, F>
where
  P: Publisher,
  F: FnMut(P::Item) -> Result<B, P::Err> + Send + 'static,
{
  type Item = B;
  type Err = P::Err;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<B, P::Err> + 'static,
  {
    self.source.subscribe(TryMapSubscriber {
      subscriber,
      func: self.func,
      upstream: None,
      done: false,
    })
  }
}

pub struct TryMapSubscriber<S, F> {
  subscriber: S,
  func: F,
  upstream: Option<SubscriptionRef>,
  done: bool,
}

impl<Item, Err, S, F, B> Subscriber<Item, Err> for TryMapSubscriber<S, F>
where
  S: Subscriber<B, Err>,
  F: FnMut(Item) -> Result<B, Err> + Send,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.upstream = Some(subscription.clone());
    self.subscriber.receive_subscription(subscription)
  }

  fn receive(&mut self, value: Item) -> Demand {
    if self.done {
      return Demand::none();
    }
    match (self.func)(value) {
      Ok(v) => self.subscriber.receive(v),
      Err(err) => {
        self.done = true;
        if let Some(upstream) = self.upstream.take() {
          upstream.cancel();
        }
        self.subscriber.receive_completion(Completion::Failed(err));
        Demand::none()
      }
    }
  }

  fn receive_completion(&mut self, completion: Completion<Err>) {
    if !self.done {
      self.done = true;
      self.upstream = None;
      self.subscriber.receive_completion(completion)
    }
  }
}
