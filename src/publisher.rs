//! The publishing side: the [`Publisher`] capability, the operator-chaining
//! [`PublisherExt`] trait and the built-in sources.

use std::time::Duration;

use crate::{
  demand::Demand,
  ops::{
    debounce::DebounceOp,
    deduplicate::DeduplicateOp,
    drop_first::DropFirstOp,
    flat_map::{FlatMapBoundedOp, FlatMapPolicy},
    handle_events::{EventHooks, HandleEventsOp},
    map::{MapOp, TryMapOp},
    map_err::{MapErrOp, SetFailureTypeOp},
    receive_on::ReceiveOnOp,
  },
  scheduler::Scheduler,
  subscriber::{Completion, Sink, Subscriber},
  subscription::AnyCancellable,
};

mod boxed;
pub use boxed::*;
mod from_iter;
pub use from_iter::*;
mod trivial;
pub use trivial::*;

/// A source of values that delivers them, under demand, to each subscriber
/// it is given.
pub trait Publisher {
  type Item;
  type Err;

  /// Attaches `subscriber`. The subscriber first receives its subscription,
  /// then values up to the demand it grants, then at most one completion.
  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<Self::Item, Self::Err> + 'static,
    Self: Sized;
}

/// Operators and terminal sinks available on every publisher.
pub trait PublisherExt: Publisher + Sized {
  /// Transforms each value with `f`.
  fn map<B, F>(self, f: F) -> MapOp<Self, F>
  where
    F: FnMut(Self::Item) -> B,
  {
    MapOp::new(self, f)
  }

  /// Transforms each value with a fallible `f`; the first `Err` cancels the
  /// upstream and fails the stream.
  fn try_map<B, F>(self, f: F) -> TryMapOp<Self, F>
  where
    F: FnMut(Self::Item) -> Result<B, Self::Err>,
  {
    TryMapOp::new(self, f)
  }

  fn map_err<E, F>(self, f: F) -> MapErrOp<Self, F>
  where
    F: FnOnce(Self::Err) -> E,
  {
    MapErrOp::new(self, f)
  }

  /// Gives a publisher that cannot fail any failure type.
  fn set_failure_type<E>(self) -> SetFailureTypeOp<Self, E>
  where
    Self: Publisher<Err = std::convert::Infallible>,
  {
    SetFailureTypeOp::new(self)
  }

  /// Suppresses values equal to the previous forwarded one.
  #[allow(clippy::type_complexity)]
  fn deduplicate(self) -> DeduplicateOp<Self, fn(&Self::Item, &Self::Item) -> bool>
  where
    Self::Item: PartialEq,
  {
    DeduplicateOp::new(self, <Self::Item as PartialEq>::eq)
  }

  /// Suppresses values that `eq` reports equal to the previous forwarded one.
  fn deduplicate_by<F>(self, eq: F) -> DeduplicateOp<Self, F>
  where
    F: FnMut(&Self::Item, &Self::Item) -> bool,
  {
    DeduplicateOp::new(self, eq)
  }

  /// Skips the first `count` values.
  fn drop_first(self, count: usize) -> DropFirstOp<Self> { DropFirstOp::new(self, count) }

  /// Forwards a value only once `interval` has passed without a newer one.
  /// A completion drops any value still waiting on its timer.
  fn debounce<Sch: Scheduler>(self, interval: Duration, scheduler: Sch) -> DebounceOp<Self, Sch> {
    DebounceOp::new(self, interval, scheduler)
  }

  /// Delivers values and the completion on `scheduler`, in order.
  fn receive_on<Sch: Scheduler>(self, scheduler: Sch) -> ReceiveOnOp<Self, Sch> {
    ReceiveOnOp::new(self, scheduler)
  }

  /// Maps each value to an inner publisher and merges their outputs, keeping
  /// at most `max_publishers` inner publishers subscribed at a time. An inner
  /// failure fails the merged stream.
  fn flat_map_bounded<F, Inner>(self, max_publishers: Demand, f: F) -> FlatMapBoundedOp<Self, F>
  where
    F: FnMut(Self::Item) -> Inner,
    Inner: Publisher<Err = Self::Err>,
  {
    FlatMapBoundedOp::new(self, max_publishers, FlatMapPolicy::default(), f)
  }

  fn flat_map_bounded_with<F, Inner>(
    self, max_publishers: Demand, policy: FlatMapPolicy, f: F,
  ) -> FlatMapBoundedOp<Self, F>
  where
    F: FnMut(Self::Item) -> Inner,
    Inner: Publisher<Err = Self::Err>,
  {
    FlatMapBoundedOp::new(self, max_publishers, policy, f)
  }

  /// Runs side effects at each lifecycle point, before the event moves on.
  fn handle_events(self, hooks: EventHooks<Self::Item, Self::Err>) -> HandleEventsOp<Self> {
    HandleEventsOp::new(self, hooks)
  }

  /// Logs every lifecycle event at `info` level, prefixed with `prefix`.
  fn print(self, prefix: impl Into<String>) -> HandleEventsOp<Self>
  where
    Self::Item: std::fmt::Debug,
    Self::Err: std::fmt::Debug,
  {
    HandleEventsOp::new(self, EventHooks::logging(prefix))
  }

  /// Hides the concrete operator chain behind a [`BoxedPublisher`].
  fn box_it(self) -> BoxedPublisher<Self::Item, Self::Err>
  where
    Self: Send + 'static,
    Self::Item: 'static,
    Self::Err: 'static,
  {
    BoxedPublisher::new(self)
  }

  /// Subscribes with unlimited demand. Dropping the returned handle cancels.
  fn sink<N, C>(self, receive_value: N, receive_completion: C) -> AnyCancellable
  where
    N: FnMut(Self::Item) + Send + 'static,
    C: FnOnce(Completion<Self::Err>) + Send + 'static,
  {
    let (sink, cancellable) = Sink::new(receive_value, receive_completion);
    self.subscribe(sink);
    cancellable
  }

  /// Like [`sink`](PublisherExt::sink), ignoring the completion.
  fn sink_value<N>(self, receive_value: N) -> AnyCancellable
  where
    N: FnMut(Self::Item) + Send + 'static,
    Self::Err: 'static,
  {
    let (sink, cancellable) = Sink::<N, fn(Completion<Self::Err>)>::values_only(receive_value);
    self.subscribe(sink);
    cancellable
  }
}

impl<P: Publisher> PublisherExt for P {}
