//! Bounded flat-map: maps each upstream value to an inner publisher and
//! merges the inner outputs.
//!
//! The outer publisher is asked for `max_publishers` values up front and for
//! one more each time an inner publisher completes, so no more than
//! `max_publishers` inner publishers are ever subscribed at once. Inner
//! publishers are asked for unlimited demand; their values wait in the
//! downstream queue until the downstream demands them. The merged stream
//! finishes once the outer publisher and every inner publisher have finished.

use std::{marker::PhantomData, sync::Arc};

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  outlet::Outlet,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::{Cancellable, Subscription, SubscriptionRef},
};

/// What an inner publisher's failure does to the merged stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlatMapPolicy {
  /// Fail the merged stream at once, cancelling the outer publisher and
  /// every inner publisher still running.
  #[default]
  FailFast,
  /// Treat the failed inner publisher as finished and keep going.
  IgnoreInnerFailure,
}

#[derive(Clone)]
pub struct FlatMapBoundedOp<P, F> {
  source: P,
  max_publishers: Demand,
  policy: FlatMapPolicy,
  func: F,
}

impl<P, F> FlatMapBoundedOp<P, F> {
  pub(crate) fn new(source: P, max_publishers: Demand, policy: FlatMapPolicy, func: F) -> Self {
    FlatMapBoundedOp { source, max_publishers, policy, func }
  }
}

impl<P, F, Inner> Publisher for FlatMapBoundedOp<P, F>
where
  P: Publisher,
  P::Err: Send + 'static,
  F: FnMut(P::Item) -> Inner + Send + 'static,
  Inner: Publisher<Err = P::Err>,
  Inner::Item: Send + 'static,
{
  type Item = Inner::Item;
  type Err = P::Err;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<Inner::Item, P::Err> + 'static,
  {
    let core = Arc::new(FlatMapCore {
      outlet: Outlet::new(),
      state: Mutex::new(FlatMapState::default()),
      policy: self.policy,
      max_publishers: self.max_publishers,
    });
    self.source.subscribe(FlatMapOuter {
      downstream: Some(subscriber),
      core,
      func: self.func,
      _inner: PhantomData,
    })
  }
}

#[derive(Default)]
struct FlatMapState {
  outer: Option<SubscriptionRef>,
  inners: Vec<(usize, SubscriptionRef)>,
  active: usize,
  next_id: usize,
  outer_finished: bool,
  done: bool,
}

struct FlatMapCore<S, Item, Err> {
  outlet: Outlet<S, Item, Err>,
  state: Mutex<FlatMapState>,
  policy: FlatMapPolicy,
  max_publishers: Demand,
}

impl<S, Item, Err> FlatMapCore<S, Item, Err>
where
  S: Subscriber<Item, Err>,
{
  fn inner_finished(&self, id: usize) {
    let (finish, outer) = {
      let mut state = self.state.lock();
      if state.done {
        return;
      }
      state.inners.retain(|(i, _)| *i != id);
      state.active -= 1;
      if state.outer_finished && state.active == 0 {
        state.done = true;
        (true, None)
      } else {
        (false, state.outer.clone())
      }
    };
    if finish {
      self.outlet.finish_after_backlog(Completion::Finished);
    } else if let Some(outer) = outer {
      outer.request(Demand::max(1));
    }
  }

  fn outer_finished(&self) {
    let finish = {
      let mut state = self.state.lock();
      if state.done {
        return;
      }
      state.outer_finished = true;
      state.outer = None;
      state.done = state.active == 0;
      state.done
    };
    if finish {
      self.outlet.finish_after_backlog(Completion::Finished);
    }
  }

  /// Marks the stream done and hands back every live upstream link.
  fn shut_down(&self) -> Option<(Option<SubscriptionRef>, Vec<(usize, SubscriptionRef)>)> {
    let mut state = self.state.lock();
    if state.done {
      return None;
    }
    state.done = true;
    Some((state.outer.take(), std::mem::take(&mut state.inners)))
  }

  fn fail(&self, err: Err) {
    let Some((outer, inners)) = self.shut_down() else { return };
    tracing::debug!(inners = inners.len(), "flat_map failed, cancelling upstream publishers");
    for (_, inner) in inners {
      inner.cancel();
    }
    if let Some(outer) = outer {
      outer.cancel();
    }
    self.outlet.abort(Completion::Failed(err));
  }
}

pub struct FlatMapOuter<S, F, Item, Err> {
  downstream: Option<S>,
  core: Arc<FlatMapCore<S, Item, Err>>,
  func: F,
  _inner: PhantomData<fn() -> Item>,
}

impl<S, F, OuterItem, Inner, Item, Err> Subscriber<OuterItem, Err> for FlatMapOuter<S, F, Item, Err>
where
  S: Subscriber<Item, Err> + 'static,
  F: FnMut(OuterItem) -> Inner + Send,
  Inner: Publisher<Item = Item, Err = Err>,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.core.state.lock().outer = Some(subscription.clone());
    if let Some(downstream) = self.downstream.take() {
      let handle = FlatMapSubscription { core: self.core.clone() };
      self.core.outlet.attach(downstream, Arc::new(handle));
    }
    if !self.core.state.lock().done {
      subscription.request(self.core.max_publishers);
    }
  }

  fn receive(&mut self, value: OuterItem) -> Demand {
    let id = {
      let mut state = self.core.state.lock();
      if state.done {
        return Demand::none();
      }
      state.active += 1;
      state.next_id += 1;
      state.next_id
    };
    (self.func)(value).subscribe(FlatMapInner { core: self.core.clone(), id });
    Demand::none()
  }

  fn receive_completion(&mut self, completion: Completion<Err>) {
    match completion {
      Completion::Finished => self.core.outer_finished(),
      Completion::Failed(err) => self.core.fail(err),
    }
  }
}

pub struct FlatMapInner<S, Item, Err> {
  core: Arc<FlatMapCore<S, Item, Err>>,
  id: usize,
}

impl<S, Item, Err> Subscriber<Item, Err> for FlatMapInner<S, Item, Err>
where
  S: Subscriber<Item, Err>,
  Item: Send,
  Err: Send,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    let late = {
      let mut state = self.core.state.lock();
      if !state.done {
        state.inners.push((self.id, subscription.clone()));
      }
      state.done
    };
    if late {
      subscription.cancel();
    } else {
      subscription.request(Demand::unlimited());
    }
  }

  fn receive(&mut self, value: Item) -> Demand {
    self.core.outlet.push(value);
    self.core.outlet.drain();
    Demand::none()
  }

  fn receive_completion(&mut self, completion: Completion<Err>) {
    match (completion, self.core.policy) {
      (Completion::Finished, _) => self.core.inner_finished(self.id),
      (Completion::Failed(_), FlatMapPolicy::IgnoreInnerFailure) => {
        tracing::debug!(id = self.id, "inner publisher failed, failure ignored");
        self.core.inner_finished(self.id)
      }
      (Completion::Failed(err), FlatMapPolicy::FailFast) => self.core.fail(err),
    }
  }
}

struct FlatMapSubscription<S, Item, Err> {
  core: Arc<FlatMapCore<S, Item, Err>>,
}

impl<S, Item, Err> Cancellable for FlatMapSubscription<S, Item, Err>
where
  S: Subscriber<Item, Err>,
  Item: Send,
  Err: Send,
{
  fn cancel(&self) {
    self.core.outlet.cancel();
    let Some((outer, inners)) = self.core.shut_down() else { return };
    if let Some(outer) = outer {
      outer.cancel();
    }
    for (_, inner) in inners {
      inner.cancel();
    }
  }
}

impl<S, Item, Err> Subscription for FlatMapSubscription<S, Item, Err>
where
  S: Subscriber<Item, Err>,
  Item: Send,
  Err: Send,
{
  fn request(&self, demand: Demand) { self.core.outlet.request(demand); }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::{
    prelude::*,
    test_support::{recorder, Event},
  };

  #[test]
  fn merges_synchronous_inners_in_order() {
    let (r, probe) = recorder(Demand::unlimited());
    from_iter([1, 2, 3])
      .flat_map_bounded(Demand::max(1), |v| from_iter([v * 10, v * 10 + 1]))
      .subscribe(r);
    assert_eq!(probe.values(), vec![10, 11, 20, 21, 30, 31]);
    assert_eq!(probe.completion(), Some(Completion::Finished));
  }

  #[test]
  fn at_most_one_inner_active_with_cap_of_one() {
    let inners: Vec<PassthroughSubject<&str>> = (0..2).map(|_| PassthroughSubject::new()).collect();
    let c_inners = inners.clone();
    let (r, probe) = recorder(Demand::unlimited());
    from_iter([0usize, 1])
      .flat_map_bounded(Demand::max(1), move |i| c_inners[i].clone())
      .subscribe(r);

    assert_eq!(inners[0].subscriber_count(), 1);
    assert_eq!(inners[1].subscriber_count(), 0);

    inners[0].send("x1-a");
    inners[1].send("x2-lost");
    inners[0].send_completion(Completion::Finished);
    assert_eq!(inners[1].subscriber_count(), 1);

    inners[1].send("x2-a");
    assert_eq!(probe.completion(), None);
    inners[1].send_completion(Completion::Finished);
    assert_eq!(
      probe.events(),
      vec![Event::Value("x1-a"), Event::Value("x2-a"), Event::Done(Completion::Finished)]
    );
  }

  #[test]
  fn cap_limits_concurrent_inners() {
    let active = Arc::new(Mutex::new((0usize, 0usize)));
    let inners: Vec<PassthroughSubject<i32>> = (0..5).map(|_| PassthroughSubject::new()).collect();
    let c_inners = inners.clone();
    let c_active = active.clone();
    let (r, _probe) = recorder(Demand::unlimited());
    from_iter(0..5usize)
      .flat_map_bounded(Demand::max(2), move |i| {
        let mut a = c_active.lock();
        a.0 += 1;
        a.1 = a.1.max(a.0);
        c_inners[i].clone()
      })
      .subscribe(r);

    let live = || inners.iter().filter(|s| s.subscriber_count() > 0).count();
    assert_eq!(live(), 2);
    for inner in &inners {
      if inner.subscriber_count() > 0 {
        active.lock().0 -= 1;
        inner.send_completion(Completion::Finished);
        assert!(live() <= 2);
      }
    }
    assert!(active.lock().1 <= 2);
  }

  #[test]
  fn outer_completion_waits_for_inners() {
    let outer = PassthroughSubject::<i32>::new();
    let inner = PassthroughSubject::<i32>::new();
    let c_inner = inner.clone();
    let (r, probe) = recorder(Demand::unlimited());
    outer
      .clone()
      .flat_map_bounded(Demand::unlimited(), move |_| c_inner.clone())
      .subscribe(r);

    outer.send(0);
    outer.send_completion(Completion::Finished);
    assert_eq!(probe.completion(), None);
    inner.send(5);
    inner.send_completion(Completion::Finished);
    assert_eq!(probe.events(), vec![Event::Value(5), Event::Done(Completion::Finished)]);
  }

  #[test]
  fn inner_failure_fails_fast() {
    let (r, probe) = recorder(Demand::unlimited());
    from_iter([1, 2, 3])
      .set_failure_type::<&str>()
      .flat_map_bounded(Demand::unlimited(), |v| {
        if v == 2 {
          fail::<i32, &str>("bad request").box_it()
        } else {
          just(v).set_failure_type::<&str>().box_it()
        }
      })
      .subscribe(r);
    assert_eq!(
      probe.events(),
      vec![Event::Value(1), Event::Done(Completion::Failed("bad request"))]
    );
  }

  #[test]
  fn fail_fast_cancels_running_inners() {
    let slow = PassthroughSubject::<i32, &str>::new();
    let c_slow = slow.clone();
    let (r, probe) = recorder(Demand::unlimited());
    from_iter([1, 2])
      .set_failure_type::<&str>()
      .flat_map_bounded(Demand::unlimited(), move |v| {
        if v == 1 { c_slow.clone().box_it() } else { fail("boom").box_it() }
      })
      .subscribe(r);
    assert_eq!(slow.subscriber_count(), 0);
    assert_eq!(probe.events(), vec![Event::Done(Completion::Failed("boom"))]);
  }

  #[test]
  fn ignore_policy_keeps_going() {
    let (r, probe) = recorder(Demand::unlimited());
    from_iter([1, 2, 3])
      .set_failure_type::<&str>()
      .flat_map_bounded_with(Demand::max(1), FlatMapPolicy::IgnoreInnerFailure, |v| {
        if v == 2 {
          fail::<i32, &str>("bad request").box_it()
        } else {
          just(v).set_failure_type::<&str>().box_it()
        }
      })
      .subscribe(r);
    assert_eq!(probe.values(), vec![1, 3]);
    assert_eq!(probe.completion(), Some(Completion::Finished));
  }

  #[test]
  fn outer_failure_cancels_inners() {
    let outer = PassthroughSubject::<i32, &str>::new();
    let inner = PassthroughSubject::<i32, &str>::new();
    let c_inner = inner.clone();
    let (r, probe) = recorder(Demand::unlimited());
    outer
      .clone()
      .flat_map_bounded(Demand::unlimited(), move |_| c_inner.clone())
      .subscribe(r);
    outer.send(0);
    assert_eq!(inner.subscriber_count(), 1);
    outer.send_completion(Completion::Failed("offline"));
    assert_eq!(inner.subscriber_count(), 0);
    assert_eq!(probe.events(), vec![Event::Done(Completion::Failed("offline"))]);
  }

  #[test]
  fn inner_values_wait_for_downstream_demand() {
    let (r, probe) = recorder(Demand::max(1));
    just(())
      .flat_map_bounded(Demand::max(1), |_| from_iter([1, 2, 3]))
      .subscribe(r);
    assert_eq!(probe.events(), vec![Event::Value(1)]);

    probe.request(Demand::max(2));
    assert_eq!(
      probe.events(),
      vec![Event::Value(1), Event::Value(2), Event::Value(3), Event::Done(Completion::Finished)]
    );
  }

  #[test]
  fn cancel_tears_down_outer_and_inners() {
    let outer = PassthroughSubject::<i32>::new();
    let inner = PassthroughSubject::<i32>::new();
    let c_inner = inner.clone();
    let (r, probe) = recorder(Demand::unlimited());
    outer
      .clone()
      .flat_map_bounded(Demand::unlimited(), move |_| c_inner.clone())
      .subscribe(r);
    outer.send(0);
    probe.cancel();
    assert_eq!(outer.subscriber_count(), 0);
    assert_eq!(inner.subscriber_count(), 0);
    inner.send(1);
    assert!(probe.events().is_empty());
  }

  #[test]
  fn benchmark() { do_bench(); }

  bencher::benchmark_group!(do_bench, bench);

  fn bench(b: &mut bencher::Bencher) { b.iter(merges_synchronous_inners_in_order); }
}
