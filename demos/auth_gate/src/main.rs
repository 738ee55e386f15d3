//! Auth Gate Example
//!
//! A Relay chain with four stages:
//!
//! ```text
//! access_log ──▶ require_token ──▶ admin_only (POST /admin) ──▶ greet
//!                      │                   │
//!                      └── 401, stop       └── 403, stop
//! ```
//!
//! `access_log` calls `next` first and annotates the response afterwards, so
//! it sees the final status even when a later stage stops the chain.
//!
//! # Usage
//!
//! ```bash
//! RELAY_LOGGING__LEVEL=debug cargo run --package auth-gate
//! ```

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use futures::future::join_all;
use relay::prelude::*;
use tower::ServiceExt;
use tracing::info;

const ADMIN_TOKEN: &str = "Bearer admin-secret";
const USER_TOKEN: &str = "Bearer user-secret";

// ============================================================================
// Handlers
// ============================================================================

/// Times the rest of the chain and records the outcome.
fn access_log(req: &mut Request, res: &mut Response, next: Next<'_>) {
    let started = Instant::now();
    next.run(req, res);

    let elapsed = started.elapsed();
    res.set_header("X-Elapsed-Micros", elapsed.as_micros().to_string());
    info!(
        method = %req.method,
        path = %req.path,
        status = res.status,
        "Request handled"
    );
}

/// Rejects requests without a known bearer token.
fn require_token(req: &mut Request, res: &mut Response, next: Next<'_>) {
    let role = match req.header("Authorization") {
        Some(ADMIN_TOKEN) => "admin",
        Some(USER_TOKEN) => "user",
        _ => {
            res.set_status(401).set_body("missing or unknown token");
            return;
        }
    };

    req.headers.insert("X-Role".to_string(), role.to_string());
    next.run(req, res);
}

fn build_chain() -> HandlerChain {
    HandlerChain::new()
        .with(access_log)
        .with(require_token)
        .with(when(
            |req| req.method == "POST" && req.path == "/admin",
            from_fn(|req, res, next| {
                if req.header("X-Role") == Some("admin") {
                    next.run(req, res);
                } else {
                    res.set_status(403).set_body("admins only");
                }
            }),
        ))
        .with(respond(|req, res| {
            let role = req.header("X-Role").unwrap_or("anonymous");
            res.set_header("Content-Type", "text/plain")
                .set_body(format!("hello {role}, you reached {}", req.path));
        }))
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let runtime = Arc::new(ChainRuntime::builder().chain(build_chain()).build()?);
    let service = Arc::clone(&runtime).into_service();

    let requests = vec![
        Request::new("GET", "/"),
        Request::new("GET", "/profile").with_header("Authorization", USER_TOKEN),
        Request::new("POST", "/admin").with_header("Authorization", USER_TOKEN),
        Request::new("POST", "/admin")
            .with_header("Authorization", ADMIN_TOKEN)
            .with_body("{\"action\":\"rotate\"}"),
    ];

    let responses = join_all(
        requests
            .into_iter()
            .map(|request| service.clone().oneshot(request)),
    )
    .await;

    for response in responses {
        println!("{}", serde_json::to_string_pretty(&response?)?);
    }

    info!(stats = ?runtime.stats(), "Done");
    Ok(())
}
