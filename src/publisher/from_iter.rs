use std::{convert::Infallible, iter::Peekable, sync::Arc};

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  outlet::Outlet,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::{Cancellable, Subscription},
};

/// Creates a publisher that emits the items of `iter` in order, pulled one at
/// a time as demand allows, then finishes. Never fails.
///
/// ```
/// use rxcombine::prelude::*;
///
/// let _c = from_iter(0..3).sink_value(|v| println!("{v}"));
/// ```
pub fn from_iter<I>(iter: I) -> FromIter<I::IntoIter>
where
  I: IntoIterator,
{
  FromIter(iter.into_iter())
}

#[derive(Clone)]
pub struct FromIter<It>(It);

impl<It> Publisher for FromIter<It>
where
  It: Iterator + Send + 'static,
  It::Item: Send + 'static,
{
  type Item = It::Item;
  type Err = Infallible;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<Self::Item, Self::Err> + 'static,
  {
    let subscription = Arc::new(IterSubscription {
      iter: Mutex::new(Some(self.0.peekable())),
      outlet: Outlet::new(),
    });
    subscription.outlet.attach(subscriber, subscription.clone());
    subscription.pump();
  }
}

struct IterSubscription<It: Iterator, S> {
  iter: Mutex<Option<Peekable<It>>>,
  outlet: Outlet<S, It::Item, Infallible>,
}

impl<It, S> IterSubscription<It, S>
where
  It: Iterator,
  S: Subscriber<It::Item, Infallible>,
{
  /// Pulls and delivers one item at a time while the subscriber has unmet
  /// demand. A pump started from inside a delivery leaves the work to the
  /// outer pump, which re-checks demand once delivery returns. The
  /// completion follows the last item without waiting for more demand, and an
  /// empty sequence finishes right away.
  fn pump(&self) {
    loop {
      let mut guard = self.iter.lock();
      let Some(iter) = guard.as_mut() else { return };
      if iter.peek().is_none() {
        *guard = None;
        drop(guard);
        self.outlet.finish(Completion::Finished);
        return;
      }
      if !self.outlet.wants_more() {
        return;
      }
      let Some(value) = iter.next() else { return };
      let last = iter.peek().is_none();
      self.outlet.push(value);
      if last {
        *guard = None;
      }
      drop(guard);
      if last {
        self.outlet.finish(Completion::Finished);
        return;
      }
      self.outlet.drain();
    }
  }
}

impl<It, S> Cancellable for IterSubscription<It, S>
where
  It: Iterator + Send,
  It::Item: Send,
  S: Subscriber<It::Item, Infallible>,
{
  fn cancel(&self) {
    self.outlet.cancel();
    let iter = self.iter.lock().take();
    drop(iter);
  }
}

impl<It, S> Subscription for IterSubscription<It, S>
where
  It: Iterator + Send,
  It::Item: Send,
  S: Subscriber<It::Item, Infallible>,
{
  fn request(&self, demand: Demand) {
    self.outlet.add_demand(demand);
    self.pump();
  }
}
