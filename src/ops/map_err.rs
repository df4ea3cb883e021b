use std::{convert::Infallible, marker::PhantomData};

use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

#[derive(Clone)]
pub struct MapErrOp<P, F> {
  source: P,
  func: F,
}

impl<P, F> MapErrOp<P, F> {
  pub(crate) fn new(source: P, func: F) -> Self { MapErrOp { source, func } }
}

impl<P, F, E> Publisher for MapErrOp<P, F>
where
  P: Publisher,
  F: FnOnce(P::Err) -> E + Send + 'static,
{
  type Item = P::Item;
  type Err = E;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Item, E> + 'static,
  {
    self.source.subscribe(MapErrSubscriber { subscriber, func: Some(self.func) })
  }
}

pub struct MapErrSubscriber<S, F> {
  subscriber: S,
  func: Option<F>,
}

impl<Item, Err, S, F, E> Subscriber<Item, Err> for MapErrSubscriber<S, F>
where
  S: Subscriber<Item, E>,
  F: FnOnce(Err) -> E + Send,
{
  #[inline]
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.subscriber.receive_subscription(subscription)
  }

  #[inline]
  fn receive(&mut self, value: Item) -> Demand { self.subscriber.receive(value) }

  fn receive_completion(&mut self, completion: Completion<Err>) {
    match (completion, self.func.take()) {
      (Completion::Finished, _) => self.subscriber.receive_completion(Completion::Finished),
      (Completion::Failed(err), Some(f)) => self.subscriber.receive_completion(Completion::Failed(f(err))),
      (Completion::Failed(_), None) => {}
    }
  }
}

/// Widens a publisher that cannot fail to any failure type, so it can be
/// combined with fallible ones.
pub struct SetFailureTypeOp<P, E> {
  source: P,
  _err: PhantomData<fn() -> E>,
}

impl<P, E> SetFailureTypeOp<P, E> {
  pub(crate) fn new(source: P) -> Self { SetFailureTypeOp { source, _err: PhantomData } }
}

impl<P: Clone, E> Clone for SetFailureTypeOp<P, E> {
  fn clone(&self) -> Self { SetFailureTypeOp::new(self.source.clone()) }
}

impl<P, E> Publisher for SetFailureTypeOp<P, E>
where
  P: Publisher<Err = Infallible>,
  E: 'static,
{
  type Item = P::Item;
  type Err = E;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Item, E> + 'static,
  {
    self.source.subscribe(SetFailureTypeSubscriber { subscriber, _err: PhantomData })
  }
}

pub struct SetFailureTypeSubscriber<S, E> {
  subscriber: S,
  _err: PhantomData<fn() -> E>,
}

impl<Item, S, E> Subscriber<Item, Infallible> for SetFailureTypeSubscriber<S, E>
where
  S: Subscriber<Item, E>,
{
  #[inline]
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.subscriber.receive_subscription(subscription)
  }

  #[inline]
  fn receive(&mut self, value: Item) -> Demand { self.subscriber.receive(value) }

  fn receive_completion(&mut self, completion: Completion<Infallible>) {
    match completion {
      Completion::Finished => self.subscriber.receive_completion(Completion::Finished),
      Completion::Failed(never) => match never {},
    }
  }
}

#[cfg(test)]
mod test {
  use crate::{
    prelude::*,
    test_support::{recorder, Event},
  };

  #[derive(Clone, Debug, PartialEq)]
  enum FetchError {
    BadRequest(String),
  }

  #[test]
  fn converts_failure() {
    let (r, probe) = recorder(Demand::unlimited());
    fail::<i32, _>("no host")
      .map_err(|e: &str| FetchError::BadRequest(e.to_owned()))
      .subscribe(r);
    assert_eq!(
      probe.events(),
      vec![Event::Done(Completion::Failed(FetchError::BadRequest("no host".to_owned())))]
    );
  }

  #[test]
  fn values_and_finish_pass_untouched() {
    let (r, probe) = recorder::<i32, FetchError>(Demand::unlimited());
    from_iter(vec![1, 2])
      .set_failure_type::<&str>()
      .map_err(|e| FetchError::BadRequest(e.to_owned()))
      .subscribe(r);
    assert_eq!(
      probe.events(),
      vec![Event::Value(1), Event::Value(2), Event::Done(Completion::Finished)]
    );
  }

  #[test]
  fn set_failure_type_lets_infallible_join_fallible_chain() {
    let (r, probe) = recorder::<i32, String>(Demand::unlimited());
    just(3).set_failure_type::<String>().subscribe(r);
    assert_eq!(probe.values(), vec![3]);
  }
}
