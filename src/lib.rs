//! Two-tier HTTP fault injection harness.
//!
//! ```text
//!   client ──▶ downstream proxy ──GET──▶ upstream simulator
//!          ◀──                  ◀──────
//! ```
//!
//! The upstream answers with injected failures, latency, and rate-limit
//! rejections. The downstream relays it over one hop, turning upstream
//! error statuses into ordinary 200 responses with a descriptive body.

// Core subsystems
pub mod config;
pub mod downstream;
pub mod http;
pub mod upstream;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
