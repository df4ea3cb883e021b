//! Subscriber trait, terminal completion and the closure-based `Sink`.
//!
//! A subscriber is told about its subscription exactly once, then receives
//! values only up to the demand it granted, then at most one completion.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  subscription::{AnyCancellable, Cancellable, SubscriptionRef},
};

/// Terminal event of a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Completion<E> {
  Finished,
  Failed(E),
}

impl<E> Completion<E> {
  #[inline]
  pub fn is_finished(&self) -> bool { matches!(self, Completion::Finished) }

  #[inline]
  pub fn is_failed(&self) -> bool { matches!(self, Completion::Failed(_)) }

  pub fn map_err<F, E2>(self, f: F) -> Completion<E2>
  where
    F: FnOnce(E) -> E2,
  {
    match self {
      Completion::Finished => Completion::Finished,
      Completion::Failed(e) => Completion::Failed(f(e)),
    }
  }

  pub fn as_ref(&self) -> Completion<&E> {
    match self {
      Completion::Finished => Completion::Finished,
      Completion::Failed(e) => Completion::Failed(e),
    }
  }

  pub fn into_result(self) -> Result<(), E> {
    match self {
      Completion::Finished => Ok(()),
      Completion::Failed(e) => Err(e),
    }
  }
}

impl<E> From<Completion<E>> for Result<(), E> {
  fn from(c: Completion<E>) -> Self { c.into_result() }
}

/// The consuming side of the publish/subscribe handshake.
pub trait Subscriber<Item, Err>: Send {
  /// Called once, before anything else. Nothing is delivered until the
  /// subscriber requests demand through `subscription`.
  fn receive_subscription(&mut self, subscription: SubscriptionRef);

  /// Receives one value and returns how much *additional* demand to grant.
  fn receive(&mut self, value: Item) -> Demand;

  /// Receives the terminal event. Nothing follows it.
  fn receive_completion(&mut self, completion: Completion<Err>);
}

/// Boxed subscriber, used where concrete subscriber types must be erased.
pub type BoxedSubscriber<Item, Err> = Box<dyn Subscriber<Item, Err>>;

impl<Item, Err> Subscriber<Item, Err> for BoxedSubscriber<Item, Err> {
  #[inline]
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    (**self).receive_subscription(subscription)
  }

  #[inline]
  fn receive(&mut self, value: Item) -> Demand { (**self).receive(value) }

  #[inline]
  fn receive_completion(&mut self, completion: Completion<Err>) {
    (**self).receive_completion(completion)
  }
}

enum SinkLink {
  Waiting,
  Linked(SubscriptionRef),
  Closed,
}

/// Cancel side of a [`Sink`]; cancelling before the subscription arrives
/// cancels it on arrival.
pub struct SinkHandle(Mutex<SinkLink>);

impl Cancellable for SinkHandle {
  fn cancel(&self) {
    let link = std::mem::replace(&mut *self.0.lock(), SinkLink::Closed);
    if let SinkLink::Linked(subscription) = link {
      subscription.cancel();
    }
  }
}

/// Subscriber built from a value callback and an optional completion
/// callback. Requests unlimited demand as soon as it is subscribed.
pub struct Sink<N, C> {
  on_value: N,
  on_completion: Option<C>,
  handle: Arc<SinkHandle>,
}

impl<N, C> Sink<N, C> {
  /// Returns the sink together with the handle that cancels it.
  pub fn new(on_value: N, on_completion: C) -> (Self, AnyCancellable) {
    Self::with_parts(on_value, Some(on_completion))
  }

  fn with_parts(on_value: N, on_completion: Option<C>) -> (Self, AnyCancellable) {
    let handle = Arc::new(SinkHandle(Mutex::new(SinkLink::Waiting)));
    let cancellable = AnyCancellable::new(handle.clone());
    (Sink { on_value, on_completion, handle }, cancellable)
  }
}

impl<N, Err> Sink<N, fn(Completion<Err>)> {
  /// A sink that ignores the completion.
  pub fn values_only(on_value: N) -> (Self, AnyCancellable) { Self::with_parts(on_value, None) }
}

impl<Item, Err, N, C> Subscriber<Item, Err> for Sink<N, C>
where
  N: FnMut(Item) + Send,
  C: FnOnce(Completion<Err>) + Send,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    let accepted = {
      let mut link = self.handle.0.lock();
      if let SinkLink::Waiting = *link {
        *link = SinkLink::Linked(subscription.clone());
        true
      } else {
        false
      }
    };
    if accepted {
      subscription.request(Demand::unlimited());
    } else {
      subscription.cancel();
    }
  }

  fn receive(&mut self, value: Item) -> Demand {
    (self.on_value)(value);
    Demand::none()
  }

  fn receive_completion(&mut self, completion: Completion<Err>) {
    let link = std::mem::replace(&mut *self.handle.0.lock(), SinkLink::Closed);
    drop(link);
    if let Some(on_completion) = self.on_completion.take() {
      on_completion(completion);
    }
  }
}
