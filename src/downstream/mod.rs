//! Downstream proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Request (any method, any path)
//!     → proxy.rs (one GET to the upstream, request id forwarded)
//!     → status/body translation
//!     → response to caller
//! ```

pub mod proxy;

pub use proxy::{downstream_handler, upstream_error_body, DownstreamProxy};
