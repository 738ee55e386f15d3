//! Request and response values threaded through a [`HandlerChain`].
//!
//! The chain never looks inside these types. They exist so handlers have a
//! shared, mutable place to read the incoming request and build the outgoing
//! response.
//!
//! [`HandlerChain`]: crate::chain::HandlerChain

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An incoming request as seen by handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Request method, `"GET"` unless set otherwise.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request path, `"/"` unless set otherwise.
    #[serde(default = "default_path")]
    pub path: String,

    /// Header map. Keys are unique; order is irrelevant.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Raw body payload.
    #[serde(default)]
    pub body: String,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_path() -> String {
    "/".to_string()
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: default_method(),
            path: default_path(),
            headers: HashMap::new(),
            body: String::new(),
        }
    }
}

impl Request {
    /// Creates a request with the given method and path.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Adds a header (builder pattern). An existing value is replaced.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the body (builder pattern).
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Looks up a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// The response being built by handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Status code, `200` unless a handler overwrites it.
    #[serde(default = "default_status")]
    pub status: u16,

    /// Header map. Keys are unique; order is irrelevant.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Response body.
    #[serde(default)]
    pub body: String,
}

fn default_status() -> u16 {
    200
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: default_status(),
            headers: HashMap::new(),
            body: String::new(),
        }
    }
}

impl Response {
    /// Creates a response with the default `200` status and an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the status code.
    pub fn set_status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    /// Sets a header, replacing any previous value under the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Looks up a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: impl Into<String>) -> &mut Self {
        self.body = body.into();
        self
    }

    /// Appends to the body.
    pub fn append_body(&mut self, chunk: &str) -> &mut Self {
        self.body.push_str(chunk);
        self
    }

    /// Returns true for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req = Request::default();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/");
        assert!(req.headers.is_empty());
        assert!(req.body.is_empty());
    }

    #[test]
    fn test_request_builder() {
        let req = Request::new("POST", "/login")
            .with_header("Authorization", "Bearer a")
            .with_header("Authorization", "Bearer b")
            .with_body("payload");

        assert_eq!(req.method, "POST");
        assert_eq!(req.header("Authorization"), Some("Bearer b"));
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header("missing"), None);
        assert_eq!(req.body, "payload");
    }

    #[test]
    fn test_response_defaults_to_success() {
        let res = Response::new();
        assert_eq!(res.status, 200);
        assert!(res.is_success());
        assert!(res.body.is_empty());
    }

    #[test]
    fn test_response_mutators() {
        let mut res = Response::new();
        res.set_status(404)
            .set_header("Content-Type", "text/plain")
            .set_body("not ")
            .append_body("found");

        assert_eq!(res.status, 404);
        assert!(!res.is_success());
        assert_eq!(res.header("Content-Type"), Some("text/plain"));
        assert_eq!(res.body, "not found");
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let req: Request = serde_json::from_str(r#"{"path": "/health"}"#).unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/health");

        let res: Response = serde_json::from_str("{}").unwrap();
        assert_eq!(res, Response::default());
    }
}
