//! Handler units for the Relay pipeline.
//!
//! A [`Handler`] receives the shared [`Request`] and [`Response`] plus a
//! [`Next`] continuation. Calling `next.run(req, res)` hands control to the
//! rest of the chain; returning without calling it stops the chain.
//!
//! The trait is blanket-implemented for closures and plain functions with the
//! matching signature, so most handlers are written inline:
//!
//! ```rust,ignore
//! use relay_core::{HandlerChain, Next, Request, Response};
//!
//! fn require_auth(req: &mut Request, res: &mut Response, next: Next<'_>) {
//!     if req.header("Authorization").is_some() {
//!         next.run(req, res);
//!     } else {
//!         res.set_status(401);
//!     }
//! }
//!
//! let chain = HandlerChain::new()
//!     .with(require_auth)
//!     .with(relay_core::respond(|_req, res| {
//!         res.set_body("OK");
//!     }));
//! ```
//!
//! The adapters in this module ([`pass`], [`respond`], [`when`]) cover the
//! common shapes where a handler always continues, never continues, or only
//! applies to some requests.

use std::sync::Arc;

use crate::chain::Next;
use crate::message::{Request, Response};

// ============================================================================
// Handler Trait
// ============================================================================

/// One stage of a [`HandlerChain`](crate::chain::HandlerChain).
///
/// Implementations may inspect and mutate both values, then decide whether to
/// invoke `next`. There is no return value: whether `next.run` was called is
/// the only control signal.
pub trait Handler: Send + Sync + 'static {
    /// Handle the request, optionally continuing down the chain.
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>);
}

impl<F> Handler for F
where
    F: Fn(&mut Request, &mut Response, Next<'_>) + Send + Sync + 'static,
{
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) {
        (self)(req, res, next)
    }
}

/// A type-erased handler that can be stored in collections.
pub type BoxedHandler = Arc<dyn Handler>;

/// Convert a handler into a boxed handler.
pub fn into_handler<H: Handler>(handler: H) -> BoxedHandler {
    Arc::new(handler)
}

// ============================================================================
// HandlerFn - closure inference helper
// ============================================================================

/// Wraps a closure so its argument types are inferred without annotations.
///
/// Closures passed straight to a `H: Handler` bound need annotated
/// parameters; going through `from_fn` does not.
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Builds a handler from a three-argument closure.
pub fn from_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut Request, &mut Response, Next<'_>) + Send + Sync + 'static,
{
    HandlerFn { f }
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut Request, &mut Response, Next<'_>) + Send + Sync + 'static,
{
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) {
        (self.f)(req, res, next)
    }
}

// ============================================================================
// Adapters
// ============================================================================

/// A handler that runs a side effect and always continues.
///
/// Created by [`pass`].
#[derive(Clone)]
pub struct Pass<F> {
    f: F,
}

/// Runs `f` on every request, then continues to the next handler.
pub fn pass<F>(f: F) -> Pass<F>
where
    F: Fn(&mut Request, &mut Response) + Send + Sync + 'static,
{
    Pass { f }
}

impl<F> Handler for Pass<F>
where
    F: Fn(&mut Request, &mut Response) + Send + Sync + 'static,
{
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) {
        (self.f)(req, res);
        next.run(req, res);
    }
}

/// A terminal handler. Created by [`respond`].
#[derive(Clone)]
pub struct Respond<F> {
    f: F,
}

/// Builds the response with `f` and ends the chain.
pub fn respond<F>(f: F) -> Respond<F>
where
    F: Fn(&Request, &mut Response) + Send + Sync + 'static,
{
    Respond { f }
}

impl<F> Handler for Respond<F>
where
    F: Fn(&Request, &mut Response) + Send + Sync + 'static,
{
    fn handle(&self, req: &mut Request, res: &mut Response, _next: Next<'_>) {
        (self.f)(req, res);
    }
}

/// A handler guarded by a request predicate. Created by [`when`].
#[derive(Clone)]
pub struct When<P, H> {
    predicate: P,
    handler: H,
}

/// Runs `handler` only for requests matching `predicate`.
///
/// Non-matching requests skip straight to the next handler.
pub fn when<P, H>(predicate: P, handler: H) -> When<P, H>
where
    P: Fn(&Request) -> bool + Send + Sync + 'static,
    H: Handler,
{
    When { predicate, handler }
}

impl<P, H> Handler for When<P, H>
where
    P: Fn(&Request) -> bool + Send + Sync + 'static,
    H: Handler,
{
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) {
        if (self.predicate)(req) {
            self.handler.handle(req, res, next);
        } else {
            next.run(req, res);
        }
    }
}
