use std::sync::atomic::{AtomicBool, Ordering};

use super::subject_core::{Replay, SubjectCore, SubjectOutlet};
use crate::{
  demand::Demand,
  rc::WeakMutArc,
  subscription::{Cancellable, Subscription},
};

/// Link between a subject and one of its subscribers.
///
/// Holds the subject weakly: a subscriber never keeps a subject alive, and
/// cancelling after the subject is gone only closes the outlet.
pub(crate) struct SubjectSubscription<Item, Err, R> {
  core: WeakMutArc<SubjectCore<Item, Err, R>>,
  id: usize,
  outlet: SubjectOutlet<Item, Err>,
  replay_pending: AtomicBool,
}

impl<Item, Err, R> SubjectSubscription<Item, Err, R> {
  pub(crate) fn new(
    core: WeakMutArc<SubjectCore<Item, Err, R>>, id: usize, outlet: SubjectOutlet<Item, Err>,
  ) -> Self {
    Self { core, id, outlet, replay_pending: AtomicBool::new(true) }
  }
}

impl<Item: Send, Err: Send, R: Send> Cancellable for SubjectSubscription<Item, Err, R> {
  fn cancel(&self) {
    self.outlet.cancel();
    let removed = match self.core.upgrade() {
      Some(core) => {
        let mut core = core.rc_deref_mut();
        core.remove(self.id)
      }
      None => None,
    };
    if removed.is_some() {
      tracing::trace!(id = self.id, "subject subscriber removed");
    }
  }
}

impl<Item, Err, R> Subscription for SubjectSubscription<Item, Err, R>
where
  Item: Clone + Send,
  Err: Send,
  R: Replay<Item>,
{
  /// The first nonzero request queues the subject's latest value, read at
  /// that moment, ahead of anything sent afterwards.
  fn request(&self, demand: Demand) {
    if demand.is_none() || !self.replay_pending.swap(false, Ordering::AcqRel) {
      self.outlet.request(demand);
      return;
    }
    let Some(core) = self.core.upgrade() else {
      self.outlet.request(demand);
      return;
    };
    let guard = core.rc_deref_mut();
    if !guard.is_completed() {
      if let Some(latest) = guard.replay().latest() {
        self.outlet.push(latest.clone());
      }
    }
    // Demand lands while the subject is locked, so a concurrent `send` is
    // either covered by the replay or queued behind it.
    self.outlet.add_demand(demand);
    drop(guard);
    self.outlet.drain();
  }
}
