//! Reward Dispatcher: delivers one reward event per engagement to the
//! downstream reward service.
//!
//! Delivery is attempted over an optional low-latency internal channel first
//! and falls back to the public HTTP endpoint. A dispatch either succeeds on
//! one channel or reports `false`; it never returns an error to the poller.

pub mod channel;
pub mod dispatcher;
pub mod error;

pub use channel::{HttpChannel, RewardChannel};
pub use dispatcher::RewardDispatcher;
pub use error::DispatchError;
