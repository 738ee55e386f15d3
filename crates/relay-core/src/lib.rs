//! # Relay Core
//!
//! The execution engine of the Relay request pipeline.
//!
//! This crate provides:
//! - [`Request`] / [`Response`]: the mutable values shared by every handler
//! - [`Handler`]: one pipeline stage, implemented for plain closures
//! - [`Next`]: the continuation a handler calls to run the rest of the chain
//! - [`HandlerChain`]: ordered registration and sequential dispatch
//!
//! Everything here is synchronous. Transports, configuration and logging setup
//! live in `relay-runtime`.

pub mod chain;
pub mod handler;
pub mod message;

pub use chain::{Completion, HandlerChain, Next};
pub use handler::{
    BoxedHandler, Handler, HandlerFn, Pass, Respond, When, from_fn, into_handler, pass, respond,
    when,
};
pub use message::{Request, Response};
