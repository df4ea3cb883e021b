//! # rxcombine: demand-driven reactive streams
//!
//! Publishers deliver values to subscribers only as far as the subscribers
//! ask for them. Every stream follows one handshake: the publisher hands the
//! subscriber a [`Subscription`], the subscriber requests [`Demand`], values
//! flow up to that demand, and at most one [`Completion`] ends the stream.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxcombine::prelude::*;
//!
//! let query = PassthroughSubject::<String>::new();
//! let _c = query
//!   .clone()
//!   .map(|q| q.trim().to_lowercase())
//!   .deduplicate()
//!   .sink_value(|q| println!("search for {q}"));
//!
//! query.send("Lisbon ".to_owned());
//! query.send("lisbon".to_owned());
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Publisher`] | Source of values, subscribed to by value |
//! | [`Subscriber`] | Receives the subscription, values and the completion |
//! | [`Subscription`] | Pulls demand and cancels |
//! | [`PassthroughSubject`] / [`CurrentValueSubject`] | Imperative multicast sources |
//! | [`Scheduler`] | Where delayed and handed-off work runs |
//! | [`AnyCancellable`] / [`CancelBag`] | Cancel-on-drop lifetime handles |
//!
//! ## Feature Flags
//!
//! - **`pool-scheduler`** (default): [`PoolScheduler`] on a futures thread pool
//! - **`tokio-scheduler`**: [`TokioScheduler`] on a tokio runtime
//!
//! [`Publisher`]: publisher::Publisher
//! [`Subscriber`]: subscriber::Subscriber
//! [`Subscription`]: subscription::Subscription
//! [`Demand`]: demand::Demand
//! [`Completion`]: subscriber::Completion
//! [`PassthroughSubject`]: subject::PassthroughSubject
//! [`CurrentValueSubject`]: subject::CurrentValueSubject
//! [`Scheduler`]: scheduler::Scheduler
//! [`AnyCancellable`]: subscription::AnyCancellable
//! [`CancelBag`]: subscription::CancelBag
//! [`PoolScheduler`]: scheduler::PoolScheduler
//! [`TokioScheduler`]: scheduler::TokioScheduler

pub mod demand;
pub mod error;
pub mod ops;
pub mod prelude;
pub mod publisher;
pub mod rc;
pub mod scheduler;
pub mod subject;
pub mod subscriber;
pub mod subscription;

mod outlet;
#[cfg(test)]
mod test_support;

pub use prelude::*;
