//! Chain runtime: the in-process stand-in for a transport layer.
//!
//! A [`ChainRuntime`] owns a [`HandlerChain`], builds a fresh [`Response`] for
//! every [`Request`] it receives, runs the chain, and deals with handlers that
//! panic. The chain itself never catches panics; containing them is the
//! caller's job, and this is that caller.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use relay_runtime::ChainRuntime;
//!
//! // Auto-loads relay.toml from the current directory
//! let runtime = ChainRuntime::new();
//! runtime.register(require_auth);
//! runtime.register(respond(|_req, res| { res.set_body("OK"); }));
//!
//! let response = runtime.respond(Request::new("GET", "/"));
//!
//! // Custom configuration
//! let runtime = ChainRuntime::builder()
//!     .config_file("config/relay.toml")
//!     .profile("production")
//!     .build()?;
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{Level, debug, error, info, span, warn};

use crate::config::{ConfigLoader, ConfigResult, RelayConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::service::ChainService;
use relay_core::{Handler, HandlerChain, Request, Response};

/// Snapshot of runtime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Requests handed to the chain.
    pub dispatched: u64,
    /// Requests where some handler withheld its continuation.
    ///
    /// A terminal handler such as `respond` never continues, so a chain that
    /// ends in one counts every request here, rejections and normal
    /// completions alike. Use [`Completion::stopped_at`] from
    /// [`HandlerChain::run`] to tell which handler stopped.
    ///
    /// [`Completion::stopped_at`]: relay_core::Completion::stopped_at
    pub stopped_early: u64,
    /// Requests where a handler panicked.
    pub panicked: u64,
}

#[derive(Default)]
struct Counters {
    dispatched: AtomicU64,
    stopped_early: AtomicU64,
    panicked: AtomicU64,
}

/// Owns a handler chain and drives it once per request.
///
/// # Thread Safety
///
/// `ChainRuntime` is `Send + Sync`. Registration takes a write lock;
/// dispatch clones the chain under a read lock and runs it unlocked, so
/// handlers registered mid-flight apply from the next request on.
pub struct ChainRuntime {
    config: RelayConfig,
    chain: RwLock<HandlerChain>,
    counters: Counters,
}

impl Default for ChainRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainRuntime {
    /// Creates a new runtime with automatic configuration loading.
    ///
    /// If no configuration file is found or it fails to load, default
    /// settings are used.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                RelayConfig::default()
            });

        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a new runtime from configuration.
    ///
    /// This initializes logging based on the configuration; an already
    /// installed subscriber is left in place.
    pub fn from_config(config: &RelayConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            catch_panics = config.runtime.catch_panics,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            chain: RwLock::new(HandlerChain::new()),
            counters: Counters::default(),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Appends a handler to the runtime's chain.
    pub fn register<H: Handler>(&self, handler: H) {
        let mut chain = self.chain.write();
        chain.register(handler);
        debug!(handler_count = chain.len(), "Registered handler");
    }

    /// Appends every handler of `chain`, keeping its order.
    pub fn register_chain(&self, chain: &HandlerChain) {
        let mut own = self.chain.write();
        own.append(chain);
        debug!(handler_count = own.len(), "Registered handler chain");
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.chain.read().len()
    }

    /// Returns a snapshot of the runtime counters.
    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            stopped_early: self.counters.stopped_early.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
        }
    }

    /// Runs the chain for `request` and returns the finished response.
    ///
    /// A handler panic is contained and reported as
    /// [`RuntimeError::HandlerPanicked`].
    pub fn dispatch(&self, request: Request) -> RuntimeResult<Response> {
        self.run_chain(request)
            .map_err(|payload| RuntimeError::from_panic(payload.as_ref()))
    }

    /// Runs the chain for `request`, turning a handler panic into an error
    /// response built from `runtime.panic_status` and `runtime.panic_body`.
    ///
    /// With `runtime.catch_panics = false` the panic is resumed instead.
    pub fn respond(&self, request: Request) -> Response {
        match self.run_chain(request) {
            Ok(response) => response,
            Err(_) if self.config.runtime.catch_panics => {
                let mut response = Response::new();
                response
                    .set_status(self.config.runtime.panic_status)
                    .set_body(self.config.runtime.panic_body.clone());
                response
            }
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Runs [`dispatch`](Self::dispatch) on the blocking thread pool.
    ///
    /// Handlers are synchronous and may block, so they never run on an async
    /// worker thread.
    pub async fn dispatch_async(self: &Arc<Self>, request: Request) -> RuntimeResult<Response> {
        let runtime = Arc::clone(self);
        tokio::task::spawn_blocking(move || runtime.dispatch(request))
            .await
            .map_err(|e| {
                warn!(error = %e, "Dispatch task did not complete");
                RuntimeError::Join(e.to_string())
            })?
    }

    /// Wraps this runtime in a `tower::Service<Request>`.
    pub fn into_service(self: Arc<Self>) -> ChainService {
        ChainService::new(self)
    }

    fn run_chain(&self, mut request: Request) -> Result<Response, Box<dyn Any + Send>> {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            method = %request.method,
            path = %request.path
        );
        let _enter = span.enter();

        let chain = self.chain.read().clone();
        let mut response = Response::new();
        self.counters.dispatched.fetch_add(1, Ordering::Relaxed);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            chain.run(&mut request, &mut response)
        }));

        match result {
            Ok(completion) => {
                if completion.is_short_circuited() {
                    self.counters.stopped_early.fetch_add(1, Ordering::Relaxed);
                }
                debug!(
                    status = response.status,
                    executed = completion.executed(),
                    handler_count = completion.total(),
                    "Request dispatched"
                );
                Ok(response)
            }
            Err(payload) => {
                self.counters.panicked.fetch_add(1, Ordering::Relaxed);
                error!(
                    error = %RuntimeError::from_panic(payload.as_ref()),
                    "Handler panicked during dispatch"
                );
                Err(payload)
            }
        }
    }
}

impl std::fmt::Debug for ChainRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainRuntime")
            .field("handler_count", &self.handler_count())
            .field("stats", &self.stats())
            .finish()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`ChainRuntime`] with custom configuration.
///
/// ```rust,ignore
/// let runtime = ChainRuntime::builder()
///     .config_file("config/relay.toml")
///     .chain(chain)
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    chain: HandlerChain,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            chain: HandlerChain::new(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges an additional configuration provider over files and env.
    pub fn merge<P: figment::Provider>(mut self, provider: P) -> Self {
        self.config_loader = self.config_loader.merge(provider);
        self
    }

    /// Overrides a single dotted configuration key.
    pub fn set<V: serde::Serialize>(mut self, key: &str, value: V) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    /// Sets the handlers the runtime starts with.
    pub fn chain(mut self, chain: HandlerChain) -> Self {
        self.chain = chain;
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> ConfigResult<ChainRuntime> {
        let config = self.config_loader.load()?;
        let runtime = ChainRuntime::from_config(&config);
        runtime.register_chain(&self.chain);
        Ok(runtime)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{Next, pass, respond};

    fn runtime() -> ChainRuntime {
        ChainRuntime::from_config(&RelayConfig::default())
    }

    fn require_auth(req: &mut Request, res: &mut Response, next: Next<'_>) {
        if req.header("Authorization").is_some() {
            next.run(req, res);
        } else {
            res.set_status(401);
        }
    }

    #[test]
    fn test_dispatch_runs_chain_on_fresh_response() {
        let runtime = runtime();
        runtime.register(pass(|req, res| {
            let path = req.path.clone();
            res.append_body(&path);
        }));

        let first = runtime.dispatch(Request::new("GET", "/a")).unwrap();
        let second = runtime.dispatch(Request::new("GET", "/b")).unwrap();

        assert_eq!(first.body, "/a");
        assert_eq!(second.body, "/b");
        assert_eq!(runtime.stats().dispatched, 2);
    }

    #[test]
    fn test_empty_runtime_returns_default_response() {
        let runtime = runtime();
        let response = runtime.dispatch(Request::default()).unwrap();

        assert_eq!(response, Response::default());
        assert_eq!(runtime.stats().stopped_early, 0);
    }

    #[test]
    fn test_short_circuit_is_counted() {
        let runtime = runtime();
        runtime.register(require_auth);
        runtime.register(respond(|_req, res| {
            res.set_body("OK");
        }));

        let denied = runtime.dispatch(Request::default()).unwrap();
        let allowed = runtime
            .dispatch(Request::default().with_header("Authorization", "token"))
            .unwrap();

        assert_eq!(denied.status, 401);
        assert_eq!(allowed.body, "OK");
        let stats = runtime.stats();
        assert_eq!(stats.dispatched, 2);
        // The terminal `respond` withholds its continuation as well.
        assert_eq!(stats.stopped_early, 2);
    }

    #[test]
    fn test_dispatch_reports_panic() {
        let runtime = runtime();
        runtime.register(pass(|_req, _res| panic!("database unavailable")));

        let result = runtime.dispatch(Request::default());

        assert_eq!(
            result,
            Err(RuntimeError::HandlerPanicked {
                message: "database unavailable".to_string()
            })
        );
        assert_eq!(runtime.stats().panicked, 1);
    }

    #[test]
    fn test_respond_converts_panic_to_error_response() {
        let mut config = RelayConfig::default();
        config.runtime.panic_status = 503;
        config.runtime.panic_body = "try later".to_string();
        let runtime = ChainRuntime::from_config(&config);
        runtime.register(pass(|_req, res| {
            res.set_body("partial");
        }));
        runtime.register(pass(|_req, _res| panic!("boom")));

        let response = runtime.respond(Request::default());

        assert_eq!(response.status, 503);
        assert_eq!(response.body, "try later");
    }

    #[test]
    fn test_respond_resumes_panic_when_not_catching() {
        let mut config = RelayConfig::default();
        config.runtime.catch_panics = false;
        let runtime = ChainRuntime::from_config(&config);
        runtime.register(pass(|_req, _res| panic!("boom")));

        let result = panic::catch_unwind(AssertUnwindSafe(|| runtime.respond(Request::default())));

        assert!(result.is_err());
        assert_eq!(runtime.stats().panicked, 1);
    }

    #[test]
    fn test_register_chain_appends() {
        let runtime = runtime();
        runtime.register(pass(|_req, res| {
            res.append_body("a");
        }));
        runtime.register_chain(&HandlerChain::new().with(pass(|_req, res| {
            res.append_body("b");
        })));

        assert_eq!(runtime.handler_count(), 2);
        assert_eq!(runtime.dispatch(Request::default()).unwrap().body, "ab");
    }

    #[test]
    fn test_register_during_dispatch_applies_to_next_request() {
        let runtime = Arc::new(runtime());
        let weak = Arc::downgrade(&runtime);
        let armed = Arc::new(AtomicU64::new(0));

        let flag = Arc::clone(&armed);
        runtime.register(move |req: &mut Request, res: &mut Response, next: Next<'_>| {
            res.append_body("first;");
            if flag.fetch_add(1, Ordering::SeqCst) == 0 {
                if let Some(runtime) = weak.upgrade() {
                    runtime.register(pass(|_req, res| {
                        res.append_body("late;");
                    }));
                }
            }
            next.run(req, res);
        });

        let in_flight = runtime.dispatch(Request::default()).unwrap();
        assert_eq!(in_flight.body, "first;");
        assert_eq!(runtime.handler_count(), 2);

        let next_request = runtime.dispatch(Request::default()).unwrap();
        assert_eq!(next_request.body, "first;late;");
        assert_eq!(runtime.handler_count(), 2);
    }

    #[test]
    fn test_register_from_other_thread_while_dispatching() {
        let runtime = runtime();
        let (entered_tx, entered_rx) = std::sync::mpsc::channel::<()>();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let entered_tx = parking_lot::Mutex::new(entered_tx);
        let release_rx = parking_lot::Mutex::new(release_rx);

        runtime.register(pass(move |_req, res| {
            res.append_body("a");
            if entered_tx.lock().send(()).is_ok() {
                let _ = release_rx.lock().recv();
            }
        }));

        std::thread::scope(|s| {
            let dispatching = s.spawn(|| runtime.dispatch(Request::default()).unwrap());

            entered_rx.recv().unwrap();
            runtime.register(pass(|_req, res| {
                res.append_body("b");
            }));
            release_tx.send(()).unwrap();

            assert_eq!(dispatching.join().unwrap().body, "a");
        });

        drop(release_tx);
        assert_eq!(runtime.dispatch(Request::default()).unwrap().body, "ab");
    }

    #[tokio::test]
    async fn test_dispatch_async() {
        let runtime = Arc::new(runtime());
        runtime.register(require_auth);
        runtime.register(respond(|req, res| {
            res.set_body(format!("hello {}", req.path));
        }));

        let response = runtime
            .dispatch_async(Request::new("GET", "/world").with_header("Authorization", "t"))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "hello /world");
    }

    #[tokio::test]
    async fn test_dispatch_async_reports_panic() {
        let runtime = Arc::new(runtime());
        runtime.register(pass(|_req, _res| panic!("async boom")));

        let result = runtime.dispatch_async(Request::default()).await;

        assert!(matches!(result, Err(RuntimeError::HandlerPanicked { .. })));
    }

    #[test]
    fn test_builder_with_chain() {
        let runtime = ChainRuntime::builder()
            .search_path(std::env::temp_dir().join("relay-runtime-builder-test"))
            .without_env()
            .set("runtime.panic_body", "unavailable")
            .chain(HandlerChain::new().with(respond(|_req, res| {
                res.set_status(204);
            })))
            .build()
            .unwrap();

        assert_eq!(runtime.config().runtime.panic_body, "unavailable");
        assert_eq!(runtime.config().runtime.panic_status, 500);
        assert_eq!(runtime.handler_count(), 1);
        assert_eq!(runtime.respond(Request::default()).status, 204);
    }
}
