//! Shared mutable cell used by every stateful publisher and operator.
//!
//! All state that can be touched from a subscriber callback, a subscription
//! handle and a scheduler task lives behind a `MutArc`. Guards must never be
//! held across a call into a subscriber or an upstream subscription, since
//! both may re-enter the same cell.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};

pub struct MutArc<T>(Arc<Mutex<T>>);

pub struct WeakMutArc<T>(Weak<Mutex<T>>);

impl<T> MutArc<T> {
  pub fn own(t: T) -> Self { Self(Arc::new(Mutex::new(t))) }

  #[inline]
  pub fn rc_deref_mut(&self) -> MutexGuard<'_, T> { self.0.lock() }

  pub fn downgrade(&self) -> WeakMutArc<T> { WeakMutArc(Arc::downgrade(&self.0)) }

  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl<T> WeakMutArc<T> {
  pub fn upgrade(&self) -> Option<MutArc<T>> { self.0.upgrade().map(MutArc) }
}

impl<T> Clone for MutArc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> Clone for WeakMutArc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T: Default> Default for MutArc<T> {
  fn default() -> Self { Self::own(T::default()) }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn shared_mutation_is_visible_to_clones() {
    let a = MutArc::own(vec![1]);
    let b = a.clone();
    b.rc_deref_mut().push(2);
    assert_eq!(*a.rc_deref_mut(), vec![1, 2]);
    assert!(a.ptr_eq(&b));
  }

  #[test]
  fn weak_reference_does_not_keep_value_alive() {
    let a = MutArc::own(1);
    let weak = a.downgrade();
    assert!(weak.upgrade().is_some());
    drop(a);
    assert!(weak.upgrade().is_none());
  }
}
