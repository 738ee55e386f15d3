//! Tower integration for the chain runtime.
//!
//! [`ChainService`] implements `tower::Service<Request>`, so a handler chain
//! can sit at the bottom of an ordinary tower stack:
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use tower::ServiceBuilder;
//! use tower::timeout::TimeoutLayer;
//!
//! let service = ServiceBuilder::new()
//!     .layer(TimeoutLayer::new(Duration::from_secs(5)))
//!     .service(Arc::new(runtime).into_service());
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tower::Service;

use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::ChainRuntime;
use relay_core::{Request, Response};

/// A tower [`Service`] that dispatches each request through a [`ChainRuntime`].
///
/// Cloning is cheap; all clones share the same runtime.
#[derive(Clone, Debug)]
pub struct ChainService {
    runtime: Arc<ChainRuntime>,
}

impl ChainService {
    /// Creates a service over a shared runtime.
    pub fn new(runtime: Arc<ChainRuntime>) -> Self {
        Self { runtime }
    }

    /// Returns the underlying runtime.
    pub fn runtime(&self) -> &Arc<ChainRuntime> {
        &self.runtime
    }
}

impl Service<Request> for ChainService {
    type Response = Response;
    type Error = RuntimeError;
    type Future = BoxFuture<'static, RuntimeResult<Response>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let runtime = Arc::clone(&self.runtime);
        async move { runtime.dispatch_async(request).await }.boxed()
    }
}
