use std::convert::Infallible;

use super::subject_core::{self, Latest, SubjectPtr};
use crate::{
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
};

/// Subject holding a current value.
///
/// Every subscriber attaching before completion first receives the current
/// value, read when it first grants demand. `send` replaces the current
/// value, then multicasts it.
pub struct CurrentValueSubject<Item, Err = Infallible>(SubjectPtr<Item, Err, Latest<Item>>);

impl<Item, Err> CurrentValueSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new(initial: Item) -> Self { CurrentValueSubject(subject_core::new_core(Latest(initial))) }

  /// The latest value sent, or the initial one. Still readable after
  /// completion.
  pub fn value(&self) -> Item { self.0.rc_deref_mut().replay().0.clone() }

  /// Same as [`send`](Self::send).
  pub fn set_value(&self, value: Item) { self.send(value) }

  pub fn send(&self, value: Item) { subject_core::send(&self.0, value) }

  pub fn send_completion(&self, completion: Completion<Err>) {
    subject_core::send_completion(&self.0, completion)
  }

  pub fn subscriber_count(&self) -> usize { self.0.rc_deref_mut().subscriber_count() }

  pub fn is_completed(&self) -> bool { self.0.rc_deref_mut().is_completed() }
}

impl<Item, Err> Clone for CurrentValueSubject<Item, Err> {
  fn clone(&self) -> Self { CurrentValueSubject(self.0.clone()) }
}

impl<Item, Err> Publisher for CurrentValueSubject<Item, Err>
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
