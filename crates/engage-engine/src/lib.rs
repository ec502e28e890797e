//! Engagement Poller and Tenant Orchestrator.
//!
//! [`Engine`] wires the credential vault, upstream client, reward dispatcher
//! and store together. [`Engine::run_cycle`] is the scheduled entry point;
//! [`Engine::poll_one`] and [`Engine::reset_cursor`] back the manual
//! commands.

mod engine;
pub mod error;
mod orchestrator;
mod poller;
pub mod report;

pub use engine::{Engine, EngineOptions};
pub use error::PollError;
pub use report::{CursorStatus, CycleReport, PollResult, TenantReport, TenantStatus, Totals};
