//! # Relay
//!
//! A minimal in-process request pipeline: an ordered list of handlers, each of
//! which may inspect and mutate the request and response, then either hand
//! control to the next handler or stop the chain.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────────────────────────────────┐
//! │ ChainRuntime │────▶│ handler 0 ──next──▶ handler 1 ──next──▶ ...  │
//! │  (Request)   │◀────│        (no next: chain stops here)           │
//! └──────────────┘     └──────────────────────────────────────────────┘
//! ```
//!
//! - **Core**: `Request`, `Response`, `Handler`, `Next`, `HandlerChain`
//! - **Runtime**: configuration, logging, panic containment, tower service
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use relay::prelude::*;
//!
//! fn require_auth(req: &mut Request, res: &mut Response, next: Next<'_>) {
//!     if req.header("Authorization").is_some() {
//!         next.run(req, res);
//!     } else {
//!         res.set_status(401);
//!     }
//! }
//!
//! let runtime = ChainRuntime::new();
//! runtime.register(require_auth);
//! runtime.register(respond(|_req, res| {
//!     res.set_body("OK");
//! }));
//!
//! let response = runtime.respond(Request::new("GET", "/"));
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use relay_core as core;
pub use relay_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use relay::prelude::*;
/// ```
pub mod prelude {
    // Chain engine
    pub use relay_core::{Completion, Handler, HandlerChain, Next};

    // Shared values
    pub use relay_core::{Request, Response};

    // Handler adapters
    pub use relay_core::{from_fn, pass, respond, when};

    // Runtime - main entry point
    pub use relay_runtime::{ChainRuntime, ChainService, RelayConfig, RuntimeError};
}
