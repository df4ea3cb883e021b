//! Type erasure for publishers.
//!
//! A chain of operators has a long, layered concrete type. Boxing it keeps
//! only the item and failure types visible, so it can be returned from a
//! function or stored next to publishers built differently.

use crate::{
  publisher::Publisher,
  subscriber::{BoxedSubscriber, Subscriber},
};

/// Object-safe counterpart of [`Publisher`].
pub trait DynPublisher<Item, Err>: Send {
  fn box_subscribe(self: Box<Self>, subscriber: BoxedSubscriber<Item, Err>);
}

impl<P> DynPublisher<P::Item, P::Err> for P
where
  P: Publisher + Send,
  P::Item: 'static,
  P::Err: 'static,
{
  fn box_subscribe(self: Box<Self>, subscriber: BoxedSubscriber<P::Item, P::Err>) {
    (*self).subscribe(subscriber)
  }
}

/// A publisher of `Item` that may fail with `Err`, with its concrete type
/// erased.
pub struct BoxedPublisher<Item, Err>(Box<dyn DynPublisher<Item, Err>>);

impl<Item, Err> BoxedPublisher<Item, Err> {
  pub fn new<P>(publisher: P) -> Self
  where
    P: Publisher<Item = Item, Err = Err> + Send + 'static,
    Item: 'static,
    Err: 'static,
  {
    BoxedPublisher(Box::new(publisher))
  }
}

impl<Item: 'static, Err: 'static> Publisher for BoxedPublisher<Item, Err> {
  type Item = Item;
  type Err = Err;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<Item, Err> + 'static,
  {
    self.0.box_subscribe(Box::new(subscriber))
  }
}
