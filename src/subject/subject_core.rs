use std::sync::Arc;

use super::subject_subscription::SubjectSubscription;
use crate::{
  outlet::{complete_immediately, Outlet},
  rc::MutArc,
  subscriber::{BoxedSubscriber, Completion},
};

pub(crate) type SubjectOutlet<Item, Err> = Outlet<BoxedSubscriber<Item, Err>, Item, Err>;

/// What a subject remembers of the values sent through it.
pub(crate) trait Replay<Item>: Send + 'static {
  fn record(&mut self, value: &Item);

  /// The value a subscriber gets first, once it grants demand.
  fn latest(&self) -> Option<&Item>;
}

pub(crate) struct NoReplay;

impl<Item> Replay<Item> for NoReplay {
  fn record(&mut self, _: &Item) {}

  fn latest(&self) -> Option<&Item> { None }
}

pub(crate) struct Latest<Item>(pub(crate) Item);

impl<Item: Clone + Send + 'static> Replay<Item> for Latest<Item> {
  fn record(&mut self, value: &Item) { self.0 = value.clone(); }

  fn latest(&self) -> Option<&Item> { Some(&self.0) }
}

/// State shared by every handle of one subject.
pub(crate) struct SubjectCore<Item, Err, R> {
  subscribers: Vec<(usize, SubjectOutlet<Item, Err>)>,
  next_id: usize,
  completion: Option<Completion<Err>>,
  replay: R,
}

pub(crate) type SubjectPtr<Item, Err, R> = MutArc<SubjectCore<Item, Err, R>>;

pub(crate) fn new_core<Item, Err, R>(replay: R) -> SubjectPtr<Item, Err, R> {
  MutArc::own(SubjectCore { subscribers: vec![], next_id: 0, completion: None, replay })
}

impl<Item, Err, R> SubjectCore<Item, Err, R> {
  pub(crate) fn subscriber_count(&self) -> usize { self.subscribers.len() }

  pub(crate) fn is_completed(&self) -> bool { self.completion.is_some() }

  pub(crate) fn replay(&self) -> &R { &self.replay }

  pub(crate) fn remove(&mut self, id: usize) -> Option<SubjectOutlet<Item, Err>> {
    let idx = self.subscribers.iter().position(|(i, _)| *i == id)?;
    Some(self.subscribers.remove(idx).1)
  }
}

/// Registers `subscriber`, or hands it the stored completion if the subject
/// is already done. Any replayed value is read when the subscriber first
/// grants demand, see [`SubjectSubscription`].
pub(crate) fn subscribe<Item, Err, R>(
  core: &SubjectPtr<Item, Err, R>, subscriber: BoxedSubscriber<Item, Err>,
) where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
  R: Replay<Item>,
{
  let mut guard = core.rc_deref_mut();
  if let Some(completion) = guard.completion.clone() {
    drop(guard);
    tracing::trace!("late subscriber gets stored completion");
    complete_immediately(subscriber, completion);
    return;
  }

  let id = guard.next_id;
  guard.next_id += 1;
  let outlet = SubjectOutlet::new();
  guard.subscribers.push((id, outlet.clone()));
  drop(guard);

  tracing::trace!(id, "subject subscriber attached");
  let subscription = SubjectSubscription::new(core.downgrade(), id, outlet.clone());
  outlet.attach(subscriber, Arc::new(subscription));
}

/// Multicasts `value` in attachment order to every subscriber with
/// outstanding demand.
pub(crate) fn send<Item, Err, R>(core: &SubjectPtr<Item, Err, R>, value: Item)
where
  Item: Clone + Send + 'static,
  Err: Send + 'static,
  R: Replay<Item>,
{
  let outlets = {
    let mut guard = core.rc_deref_mut();
    if guard.completion.is_some() {
      return;
    }
    guard.replay.record(&value);
    guard.subscribers.iter().map(|(_, o)| o.clone()).collect::<Vec<_>>()
  };

  let mut iter = outlets.into_iter().peekable();
  while let Some(outlet) = iter.next() {
    if iter.peek().is_some() {
      outlet.offer(value.clone());
    } else {
      outlet.offer(value);
      break;
    }
  }
}

/// Stores the completion once and delivers it to every attached subscriber,
/// who are then released.
pub(crate) fn send_completion<Item, Err, R>(
  core: &SubjectPtr<Item, Err, R>, completion: Completion<Err>,
)
where
  Item: Send + 'static,
  Err: Clone + Send + 'static,
{
  let outlets = {
    let mut guard = core.rc_deref_mut();
    if guard.completion.is_some() {
      return;
    }
    guard.completion = Some(completion.clone());
    std::mem::take(&mut guard.subscribers)
  };

  tracing::trace!(subscribers = outlets.len(), "subject completed");
  for (_, outlet) in outlets {
    outlet.finish(completion.clone());
  }
}
