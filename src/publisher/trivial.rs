use std::{convert::Infallible, marker::PhantomData};

use crate::{
  outlet::complete_immediately,
  publisher::{from_iter, Publisher},
  subscriber::{Completion, Subscriber},
};

/// Emits `value` once the subscriber asks for it, then finishes.
pub fn just<T>(value: T) -> Just<T> { Just(value) }

/// Fails every subscriber right away with `err`, without emitting values.
///
/// This is how a producer reports a problem it detects before any work
/// starts (a request that cannot even be built, say) through the same path
/// as any later failure.
pub fn fail<T, E>(err: E) -> Fail<T, E> { Fail(err, PhantomData) }

/// Finishes every subscriber right away, without emitting values.
pub fn empty<T>() -> Empty<T> { Empty(PhantomData) }

#[derive(Clone, Debug)]
pub struct Just<T>(T);

#[derive(Clone, Debug)]
pub struct Fail<T, E>(E, PhantomData<fn() -> T>);

#[derive(Clone, Debug)]
pub struct Empty<T>(PhantomData<fn() -> T>);

impl<T> Publisher for Just<T>
where
  T: Send + 'static,
{
  type Item = T;
  type Err = Infallible;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<T, Infallible> + 'static,
  {
    from_iter(std::iter::once(self.0)).subscribe(subscriber)
  }
}

impl<T, E> Publisher for Fail<T, E>
where
  T: Send + 'static,
  E: Send + 'static,
{
  type Item = T;
  type Err = E;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<T, E> + 'static,
  {
    complete_immediately(subscriber, Completion::Failed(self.0))
  }
}

impl<T> Publisher for Empty<T>
where
  T: Send + 'static,
{
  type Item = T;
  type Err = Infallible;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<T, Infallible> + 'static,
  {
    complete_immediately(subscriber, Completion::Finished)
  }
}
