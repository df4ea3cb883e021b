use std::convert::Infallible;

use super::subject_core::{self, NoReplay, SubjectPtr};
use crate::{
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
};

/// Subject without replay: subscribers only see values sent after they
/// attached and granted demand.
pub struct PassthroughSubject<Item, Err = Infallible>(SubjectPtr<Item, Err, NoReplay>);

impl<Item, Err> PassthroughSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new() -> Self { PassthroughSubject(subject_core::new_core(NoReplay)) }

  /// Forwards `value` to every subscriber with outstanding demand. Ignored
  /// after completion.
  pub fn send(&self, value: Item) { subject_core::send(&self.0, value) }

  /// Completes every subscriber. Only the first completion has an effect.
  pub fn send_completion(&self, completion: Completion<Err>) {
    subject_core::send_completion(&self.0, completion)
  }

  pub fn subscriber_count(&self) -> usize { self.0.rc_deref_mut().subscriber_count() }

  pub fn is_completed(&self) -> bool { self.0.rc_deref_mut().is_completed() }
}

impl<Item, Err> Default for PassthroughSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn default() -> Self { Self::new() }
}

impl<Item, Err> Clone for PassthroughSubject<Item, Err> {
  fn clone(&self) -> Self { PassthroughSubject(self.0.clone()) }
}

impl<Item, Err> Publisher for PassthroughSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<Item, Err> + 'static,
  {
    subject_core::subscribe(&self.0, Box::new(subscriber))
  }
}
