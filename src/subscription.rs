//! Subscription handles and cancellation.
//!
//! A [`Subscription`] is the link a publisher hands to its subscriber: the
//! subscriber pulls values through [`Subscription::request`] and tears the
//! link down with [`Cancellable::cancel`]. Both calls are idempotent-safe and
//! may arrive from any thread, including from inside a delivery callback.

use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::demand::Demand;

/// Anything that can be cancelled.
pub trait Cancellable: Send + Sync {
  /// Stops the underlying activity. Calling it more than once has no further
  /// effect.
  fn cancel(&self);
}

/// Handle linking one subscriber to one publisher.
///
/// After `cancel` returns, the publisher delivers neither values nor a
/// completion to that subscriber, and further `request` calls are ignored.
pub trait Subscription: Cancellable {
  /// Adds `demand` to the number of values the publisher may still emit.
  fn request(&self, demand: Demand);
}

/// Shared subscription handle, owned jointly by a publisher and its
/// subscriber.
pub type SubscriptionRef = Arc<dyn Subscription>;

impl<T: Cancellable + ?Sized> Cancellable for Arc<T> {
  #[inline]
  fn cancel(&self) { (**self).cancel() }
}

impl<T: Subscription + ?Sized> Subscription for Arc<T> {
  #[inline]
  fn request(&self, demand: Demand) { (**self).request(demand) }
}

/// Subscription that never produces anything, handed to subscribers that
/// attach to an already completed publisher.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptySubscription;

impl Cancellable for EmptySubscription {
  fn cancel(&self) {}
}

impl Subscription for EmptySubscription {
  fn request(&self, _demand: Demand) {}
}

struct FnCancellable<F>(Mutex<Option<F>>);

impl<F> Cancellable for FnCancellable<F>
where
  F: FnOnce() + Send,
{
  fn cancel(&self) {
    let f = self.0.lock().take();
    if let Some(f) = f {
      f();
    }
  }
}

/// Type-erased cancellation handle that cancels when dropped.
///
/// **Attention:** dropping the value returned by `sink` cancels the
/// subscription immediately. Keep it in a variable or a [`CancelBag`] for as
/// long as values should keep flowing.
#[must_use]
pub struct AnyCancellable(Option<Box<dyn Cancellable>>);

impl AnyCancellable {
  pub fn new<C: Cancellable + 'static>(cancellable: C) -> Self {
    AnyCancellable(Some(Box::new(cancellable)))
  }

  /// Wraps an arbitrary cancel action; it runs at most once.
  pub fn from_fn<F>(f: F) -> Self
  where
    F: FnOnce() + Send + 'static,
  {
    Self::new(FnCancellable(Mutex::new(Some(f))))
  }

  pub fn cancel(&mut self) {
    if let Some(inner) = self.0.take() {
      inner.cancel();
    }
  }

  pub fn is_cancelled(&self) -> bool { self.0.is_none() }

  /// Moves this handle into `bag`, tying its lifetime to the bag's.
  pub fn store(self, bag: &mut CancelBag) { bag.insert(self); }
}

impl Drop for AnyCancellable {
  fn drop(&mut self) { self.cancel(); }
}

impl std::fmt::Debug for AnyCancellable {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AnyCancellable")
      .field("is_cancelled", &self.is_cancelled())
      .finish()
  }
}

/// Owns a set of cancellation handles and cancels every one of them, exactly
/// once, when it is dropped.
#[derive(Default)]
pub struct CancelBag {
  members: SmallVec<[AnyCancellable; 4]>,
}

impl CancelBag {
  pub fn new() -> Self { Self::default() }

  /// Takes ownership of `cancellable`. A handle that is already cancelled
  /// has nothing left to own and is not kept.
  pub fn insert(&mut self, cancellable: AnyCancellable) {
    if !cancellable.is_cancelled() {
      self.members.push(cancellable);
    }
  }

  pub fn len(&self) -> usize { self.members.len() }

  pub fn is_empty(&self) -> bool { self.members.is_empty() }

  /// Cancels and releases every member now; the bag stays usable.
  pub fn cancel_all(&mut self) {
    tracing::trace!(count = self.members.len(), "cancel bag emptied");
    self.members.clear();
  }
}

impl Drop for CancelBag {
  fn drop(&mut self) { self.cancel_all(); }
}

impl std::fmt::Debug for CancelBag {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CancelBag").field("len", &self.len()).finish()
  }
}
