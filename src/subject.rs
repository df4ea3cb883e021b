//! Subjects: publishers fed imperatively through `send`.
//!
//! A subject multicasts each value to the subscribers attached at the time,
//! in attachment order, skipping any that have no outstanding demand. Once
//! completed it ignores further input and hands the stored completion to
//! every later subscriber.
//!
//! Handles are cheap clones of one shared subject. Concurrent `send` calls
//! from different threads are accepted, but the relative order two such calls
//! reach each subscriber is only defined if the caller serializes them.

mod current_value;
mod passthrough;
mod subject_core;
mod subject_subscription;

pub use current_value::*;
pub use passthrough::*;
