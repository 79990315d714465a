//! Admission control.
//!
//! # Data Flow
//! ```text
//! Incoming upstream request:
//!     → rate_limit.rs (take a token from the shared bucket)
//!     → on denial: 500, no further evaluation
//!     → otherwise: fault injection in upstream::simulator
//! ```
//!
//! # Design Decisions
//! - One limiter per process, constructed explicitly and owned by the simulator
//! - Internal locking so concurrent handlers can share it through an `Arc`

pub mod rate_limit;

pub use rate_limit::RateLimiter;
