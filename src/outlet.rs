//! Demand-governed delivery cell in front of one subscriber.
//!
//! Every producer that can be driven from more than one place (a source
//! pumped by `request`, a subject fed by `send`, a scheduled drain task)
//! pushes into an `Outlet`. Exactly one caller at a time delivers: whoever
//! finds the `emitting` flag clear takes the subscriber out of the cell,
//! releases the lock and calls it. Callers arriving meanwhile only enqueue,
//! and the active emitter picks their work up before it returns.

use std::{collections::VecDeque, sync::Arc};

use crate::{
  demand::Demand,
  rc::MutArc,
  subscriber::{Completion, Subscriber},
  subscription::{Cancellable, Subscription, SubscriptionRef},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
  Attaching,
  Ready,
  Closed,
}

/// What happens to queued values when a completion is set.
#[derive(Clone, Copy)]
enum Backlog {
  /// Keep what current demand covers.
  Covered,
  Keep,
  Discard,
}

struct OutletState<S, Item, Err> {
  subscriber: Option<S>,
  phase: Phase,
  demand: Demand,
  queue: VecDeque<Item>,
  terminal: Option<Completion<Err>>,
  emitting: bool,
}

pub(crate) struct Outlet<S, Item, Err>(MutArc<OutletState<S, Item, Err>>);

impl<S, Item, Err> Clone for Outlet<S, Item, Err> {
  fn clone(&self) -> Self { Outlet(self.0.clone()) }
}

impl<S, Item, Err> Default for Outlet<S, Item, Err> {
  fn default() -> Self {
    Outlet(MutArc::own(OutletState {
      subscriber: None,
      phase: Phase::Attaching,
      demand: Demand::none(),
      queue: VecDeque::new(),
      terminal: None,
      emitting: false,
    }))
  }
}

impl<S, Item, Err> Outlet<S, Item, Err>
where
  S: Subscriber<Item, Err>,
{
  pub(crate) fn new() -> Self { Self::default() }

  /// Hands `subscription` to the subscriber, then starts delivering. Demand
  /// requested from inside `receive_subscription` is only accumulated.
  pub(crate) fn attach(&self, mut subscriber: S, subscription: SubscriptionRef) {
    subscriber.receive_subscription(subscription);
    let rejected = {
      let mut state = self.0.rc_deref_mut();
      if state.phase == Phase::Closed {
        Some(subscriber)
      } else {
        state.subscriber = Some(subscriber);
        state.phase = Phase::Ready;
        None
      }
    };
    if rejected.is_some() {
      tracing::trace!("subscriber cancelled during attach");
      return;
    }
    self.drain();
  }

  pub(crate) fn add_demand(&self, demand: Demand) {
    let mut state = self.0.rc_deref_mut();
    if state.phase != Phase::Closed {
      state.demand += demand;
    }
  }

  /// Adds demand and delivers whatever it unblocks.
  pub(crate) fn request(&self, demand: Demand) -> Demand {
    self.add_demand(demand);
    self.drain()
  }

  /// Enqueues without checking demand; delivery waits for demand.
  pub(crate) fn push(&self, value: Item) {
    let mut state = self.0.rc_deref_mut();
    if state.phase != Phase::Closed && state.terminal.is_none() {
      state.queue.push_back(value);
    }
  }

  /// Delivers `value` only if demand is left for it after what is already
  /// queued; otherwise the value is dropped for this subscriber.
  pub(crate) fn offer(&self, value: Item) -> Demand {
    let accepted = {
      let mut state = self.0.rc_deref_mut();
      let open = state.phase != Phase::Closed && state.terminal.is_none();
      if open && state.demand.exceeds(state.queue.len()) {
        state.queue.push_back(value);
        true
      } else {
        false
      }
    };
    if accepted {
      self.drain()
    } else {
      tracing::debug!("value dropped, subscriber has no outstanding demand");
      Demand::none()
    }
  }

  /// True when a producer may pull one more value for this subscriber right
  /// now without overrunning its demand.
  pub(crate) fn wants_more(&self) -> bool {
    let state = self.0.rc_deref_mut();
    state.phase == Phase::Ready
      && !state.emitting
      && state.terminal.is_none()
      && state.demand.exceeds(state.queue.len())
  }

  /// Completes after every queued value that demand already covers.
  pub(crate) fn finish(&self, completion: Completion<Err>) {
    self.set_terminal(completion, Backlog::Covered);
    self.drain();
  }

  /// Like [`finish`](Self::finish), but leaves delivery to the next `drain`.
  pub(crate) fn finish_later(&self, completion: Completion<Err>) {
    self.set_terminal(completion, Backlog::Covered);
  }

  /// Completes once the whole queue has gone out, however long the
  /// subscriber takes to demand it.
  pub(crate) fn finish_after_backlog(&self, completion: Completion<Err>) {
    self.set_terminal(completion, Backlog::Keep);
    self.drain();
  }

  /// Completes right away, discarding queued values.
  pub(crate) fn abort(&self, completion: Completion<Err>) {
    self.set_terminal(completion, Backlog::Discard);
    self.drain();
  }

  fn set_terminal(&self, completion: Completion<Err>, backlog: Backlog) {
    let discarded = {
      let mut state = self.0.rc_deref_mut();
      if state.phase == Phase::Closed || state.terminal.is_some() {
        return;
      }
      state.terminal = Some(completion);
      let keep = match backlog {
        Backlog::Covered => state.demand.max_value().unwrap_or(usize::MAX),
        Backlog::Keep => usize::MAX,
        Backlog::Discard => 0,
      };
      if state.queue.len() > keep {
        state.queue.split_off(keep)
      } else {
        VecDeque::new()
      }
    };
    drop(discarded);
  }

  /// Stops all further delivery and releases the subscriber.
  pub(crate) fn cancel(&self) {
    let released = {
      let mut state = self.0.rc_deref_mut();
      state.phase = Phase::Closed;
      state.terminal = None;
      state.queue.clear();
      state.subscriber.take()
    };
    if released.is_some() {
      tracing::trace!("outlet cancelled");
    }
  }

  #[cfg(test)]
  pub(crate) fn is_closed(&self) -> bool { self.0.rc_deref_mut().phase == Phase::Closed }

  /// Delivers queued values while demand lasts, then the pending completion
  /// once the queue is empty. Returns the extra demand the subscriber granted
  /// from `receive` during this call.
  pub(crate) fn drain(&self) -> Demand {
    let mut granted = Demand::none();
    loop {
      let mut state = self.0.rc_deref_mut();
      if state.emitting || state.phase != Phase::Ready {
        return granted;
      }

      if !state.queue.is_empty() && !state.demand.is_none() {
        let (Some(value), Some(mut subscriber)) = (state.queue.pop_front(), state.subscriber.take())
        else {
          return granted;
        };
        state.demand.consume_one();
        state.emitting = true;
        drop(state);

        let more = subscriber.receive(value);

        let mut state = self.0.rc_deref_mut();
        state.emitting = false;
        granted += more;
        if state.phase == Phase::Closed {
          drop(state);
          drop(subscriber);
          return granted;
        }
        state.demand += more;
        state.subscriber = Some(subscriber);
        continue;
      }

      if state.queue.is_empty() && state.terminal.is_some() {
        let completion = state.terminal.take();
        let subscriber = state.subscriber.take();
        state.phase = Phase::Closed;
        drop(state);
        if let (Some(completion), Some(mut subscriber)) = (completion, subscriber) {
          subscriber.receive_completion(completion);
        }
      }
      return granted;
    }
  }
}

/// Attaches `subscriber` and completes it at once, honouring a cancel issued
/// from inside `receive_subscription`.
pub(crate) fn complete_immediately<S, Item, Err>(subscriber: S, completion: Completion<Err>)
where
  S: Subscriber<Item, Err> + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  let outlet = Outlet::new();
  outlet.attach(subscriber, Arc::new(outlet.clone()));
  outlet.finish(completion);
}

/// An outlet is its own subscription for producers that only complete or
/// only emit through `push`/`finish`.
impl<S, Item, Err> Cancellable for Outlet<S, Item, Err>
where
  S: Subscriber<Item, Err>,
  Item: Send,
  Err: Send,
{
  fn cancel(&self) { Outlet::cancel(self) }
}

impl<S, Item, Err> Subscription for Outlet<S, Item, Err>
where
  S: Subscriber<Item, Err>,
  Item: Send,
  Err: Send,
{
  fn request(&self, demand: Demand) { Outlet::request(self, demand); }
}
