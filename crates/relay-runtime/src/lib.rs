//! Relay Runtime - configuration, logging and dispatch for Relay chains.
//!
//! This crate provides:
//! - Chain ownership and per-request dispatch (`ChainRuntime`)
//! - Containment of handler panics into errors or error responses
//! - A `tower::Service` over a runtime (`ChainService`)
//! - Figment-based configuration loading (`ConfigLoader`)
//! - Logging configuration (`LoggingBuilder`)
//!
//! ```ignore
//! use relay_core::{Request, respond};
//! use relay_runtime::ChainRuntime;
//!
//! let runtime = ChainRuntime::new();
//! runtime.register(respond(|_req, res| {
//!     res.set_body("pong");
//! }));
//!
//! let response = runtime.respond(Request::new("GET", "/ping"));
//! assert_eq!(response.body, "pong");
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod service;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, RelayConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{ChainRuntime, RuntimeBuilder, RuntimeStats};
pub use service::ChainService;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient logging imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
