//! The handler chain engine.
//!
//! A [`HandlerChain`] holds handlers in registration order. Invoking it runs
//! handler 0 with a [`Next`] bound to position 1; each handler decides whether
//! to call `next.run(req, res)` and so hand control to the following one.
//!
//! # Execution Rules
//!
//! 1. Handlers run strictly in registration order
//! 2. A handler that does not call `next.run` stops the chain
//! 3. Running past the last handler is a no-op
//! 4. Panics are not caught; they unwind out of [`HandlerChain::invoke`]
//!
//! Code placed after `next.run` in a handler executes once the rest of the
//! chain has unwound, so a handler can post-process the response:
//!
//! ```rust,ignore
//! let chain = HandlerChain::new()
//!     .with(|req: &mut Request, res: &mut Response, next: Next<'_>| {
//!         next.run(req, res);
//!         res.set_header("X-Powered-By", "relay");
//!     })
//!     .with(respond(|_req, res| {
//!         res.set_body("hello");
//!     }));
//! ```
//!
//! `Next` is consumed by `run`, so a handler cannot run the rest of the chain
//! twice:
//!
//! ```compile_fail
//! use relay_core::{Next, Request, Response};
//!
//! fn twice(req: &mut Request, res: &mut Response, next: Next<'_>) {
//!     next.run(req, res);
//!     next.run(req, res);
//! }
//! ```

use std::cell::Cell;

use tracing::{Level, debug, span, trace};

use crate::handler::{BoxedHandler, Handler, into_handler};
use crate::message::{Request, Response};

// ============================================================================
// Next
// ============================================================================

/// The continuation handed to each handler: "run the rest of the chain".
///
/// Bound to the handlers after the current one. It is neither `Clone` nor
/// `Copy`; [`run`](Next::run) consumes it, so each handler can continue at
/// most once. Dropping it without calling `run` short-circuits the chain.
pub struct Next<'a> {
    remaining: &'a [BoxedHandler],
    position: usize,
    furthest: &'a Cell<usize>,
}

impl<'a> Next<'a> {
    fn new(handlers: &'a [BoxedHandler], furthest: &'a Cell<usize>) -> Self {
        Self {
            remaining: handlers,
            position: 0,
            furthest,
        }
    }

    /// Position of the handler this continuation will run.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of handlers left to run, including the one at [`position`](Next::position).
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Runs the remaining handlers against `req` and `res`.
    ///
    /// Returns once the sub-chain it triggered has fully unwound.
    pub fn run(self, req: &mut Request, res: &mut Response) {
        self.furthest.set(self.position);

        let Some((handler, rest)) = self.remaining.split_first() else {
            trace!(position = self.position, "Reached end of chain");
            return;
        };

        trace!(handler_index = self.position, "Executing handler");

        let next = Next {
            remaining: rest,
            position: self.position + 1,
            furthest: self.furthest,
        };
        handler.handle(req, res, next);
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position)
            .field("remaining", &self.remaining.len())
            .finish()
    }
}

// ============================================================================
// Completion
// ============================================================================

/// How far one traversal of a chain got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    executed: usize,
    total: usize,
    stopped_at: Option<usize>,
}

impl Completion {
    fn from_furthest(furthest: usize, total: usize) -> Self {
        if furthest >= total {
            Self {
                executed: total,
                total,
                stopped_at: None,
            }
        } else {
            Self {
                executed: furthest + 1,
                total,
                stopped_at: Some(furthest),
            }
        }
    }

    /// Number of handlers that were entered.
    pub fn executed(&self) -> usize {
        self.executed
    }

    /// Number of handlers registered at the time of the traversal.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Position of the handler that withheld its continuation, if any.
    pub fn stopped_at(&self) -> Option<usize> {
        self.stopped_at
    }

    /// Returns true if a handler ended the chain by not continuing.
    pub fn is_short_circuited(&self) -> bool {
        self.stopped_at.is_some()
    }

    /// Returns true if the last handler continued past the end of the chain.
    pub fn reached_end(&self) -> bool {
        self.stopped_at.is_none()
    }
}

// ============================================================================
// HandlerChain
// ============================================================================

/// An ordered, append-only list of handlers.
///
/// Registration order is execution order. Cloning is cheap: handlers are
/// shared, not copied.
///
/// # Thread Safety
///
/// `HandlerChain` is `Send + Sync`. Any number of threads may invoke the same
/// chain at once with their own request/response pairs.
#[derive(Default, Clone)]
pub struct HandlerChain {
    handlers: Vec<BoxedHandler>,
}

impl HandlerChain {
    /// Creates a new, empty chain.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Appends a handler to the end of the chain.
    pub fn register<H: Handler>(&mut self, handler: H) {
        self.handlers.push(into_handler(handler));
    }

    /// Appends a pre-built boxed handler.
    pub fn register_boxed(&mut self, handler: BoxedHandler) {
        self.handlers.push(handler);
    }

    /// Appends a handler (builder pattern).
    pub fn with<H: Handler>(mut self, handler: H) -> Self {
        self.register(handler);
        self
    }

    /// Appends every handler of `other`, keeping its order.
    pub fn append(&mut self, other: &HandlerChain) {
        self.handlers.extend(other.handlers.iter().cloned());
    }

    /// Returns the number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs the chain against `req` and `res`.
    ///
    /// Starts at position 0 and returns once every continuation that was
    /// called has unwound. The caller inspects `res` afterwards.
    pub fn invoke(&self, req: &mut Request, res: &mut Response) {
        self.run(req, res);
    }

    /// Runs the chain like [`invoke`](Self::invoke) and reports how far it got.
    pub fn run(&self, req: &mut Request, res: &mut Response) -> Completion {
        let span = span!(Level::DEBUG, "invoke", method = %req.method, path = %req.path);
        let _enter = span.enter();

        let furthest = Cell::new(0);
        Next::new(&self.handlers, &furthest).run(req, res);

        let completion = Completion::from_furthest(furthest.get(), self.handlers.len());
        match completion.stopped_at() {
            Some(position) => debug!(
                handler_index = position,
                handler_count = completion.total(),
                status = res.status,
                "Handler did not continue, chain stopped"
            ),
            None => trace!(
                handler_count = completion.total(),
                "Chain ran to completion"
            ),
        }

        completion
    }
}

impl std::fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerChain")
            .field("handler_count", &self.handlers.len())
            .finish()
    }
}
