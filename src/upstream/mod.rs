//! Upstream simulator subsystem.
//!
//! # Data Flow
//! ```text
//! Request (any method, any path)
//!     → simulator.rs (limiter → draw → failure or sleep)
//!     → 500 empty | 200 "request ok from upstream"
//! ```
//!
//! # Design Decisions
//! - Randomness comes from a `DecisionSource` so tests can script draws
//! - The limiter is owned by the simulator, not a process global

pub mod decision;
pub mod simulator;

pub use decision::{DecisionSource, RandomDecisions, ScriptedDecisions};
pub use simulator::{upstream_handler, Outcome, UpstreamSimulator, UPSTREAM_OK_BODY};
