//! Operators. Each wraps one upstream publisher and is built through the
//! matching [`PublisherExt`](crate::publisher::PublisherExt) method.

pub mod debounce;
pub mod deduplicate;
pub mod drop_first;
pub mod flat_map;
pub mod handle_events;
pub mod map;
pub mod map_err;
pub mod receive_on;
