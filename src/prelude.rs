//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Scheduler implementations behind feature flags
#[cfg(feature = "pool-scheduler")]
pub use crate::scheduler::PoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
pub use crate::{
  demand::Demand,
  error::RxError,
  ops::{flat_map::FlatMapPolicy, handle_events::EventHooks},
  publisher::{empty, fail, from_iter, just, BoxedPublisher, Publisher, PublisherExt},
  scheduler::{ImmediateScheduler, Scheduler, SerialScheduler, TaskHandle, TestScheduler},
  subject::{CurrentValueSubject, PassthroughSubject},
  subscriber::{BoxedSubscriber, Completion, Sink, Subscriber},
  subscription::{
    AnyCancellable, CancelBag, Cancellable, EmptySubscription, Subscription, SubscriptionRef,
  },
};
