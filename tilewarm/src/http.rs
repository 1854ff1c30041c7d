//! HTTP client abstraction for tile requests.
//!
//! The orchestrator only needs "issue one request, tell me the status and
//! how many bytes came back". [`TileClient`] is that seam; tests substitute
//! scripted clients for [`ReqwestTileClient`].

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::Method;
use thiserror::Error;
use tracing::{debug, trace};

/// User agent sent unless the caller overrides it with a header.
pub const DEFAULT_USER_AGENT: &str = concat!("tilewarm/", env!("CARGO_PKG_VERSION"));

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileResponse {
    pub status: u16,
    /// Size of the response body.
    pub bytes: u64,
}

impl TileResponse {
    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failures that prevented a response from being received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Issues a single tile request.
///
/// Implementations report any received response as `Ok`, including non-2xx
/// statuses; classification is the caller's business.
pub trait TileClient: Send + Sync {
    fn request(&self, url: &str) -> impl Future<Output = Result<TileResponse, TransportError>> + Send;
}

/// [`TileClient`] backed by an async `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTileClient {
    client: reqwest::Client,
    method: Method,
}

impl ReqwestTileClient {
    /// Creates a client sending `method` with `headers` on every request.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method name, e.g. `GET` or `HEAD`
    /// * `headers` - Extra request headers as (name, value) pairs
    /// * `timeout` - Per-request timeout; `None` lets a stalled request wait forever
    pub fn new(
        method: &str,
        headers: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let method = Method::from_bytes(method.to_uppercase().as_bytes())
            .map_err(|e| TransportError::Client(format!("invalid method '{}': {}", method, e)))?;

        let mut header_map = HeaderMap::new();
        header_map.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Client(format!("invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Client(format!("invalid header value for '{}': {}", name, e)))?;
            header_map.insert(name, value);
        }

        let mut builder = reqwest::Client::builder().default_headers(header_map);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client, method })
    }

    /// The HTTP method used for every request.
    pub fn method(&self) -> &Method {
        &self.method
    }
}

impl TileClient for ReqwestTileClient {
    async fn request(&self, url: &str) -> Result<TileResponse, TransportError> {
        trace!(url = url, method = %self.method, "HTTP request starting");

        let response = self.client.request(self.method.clone(), url).send().await?;
        let status = response.status().as_u16();
        debug!(url = url, status = status, "HTTP response received");

        let body = response.bytes().await?;
        Ok(TileResponse {
            status,
            bytes: body.len() as u64,
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted client: each URL answers with a queue of results, the last
    /// one repeating once the queue runs dry.
    #[derive(Default)]
    pub struct ScriptedClient {
        scripts: Mutex<HashMap<String, Vec<Result<TileResponse, TransportError>>>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        pub fn script(self, url: &str, results: Vec<Result<TileResponse, TransportError>>) -> Self {
            self.scripts.lock().unwrap().insert(url.to_string(), results);
            self
        }
    }

    impl TileClient for ScriptedClient {
        async fn request(&self, url: &str) -> Result<TileResponse, TransportError> {
            self.calls.lock().unwrap().push(url.to_string());
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.remove(0),
                Some(queue) => queue[0].clone(),
                None => Ok(TileResponse { status: 200, bytes: 0 }),
            }
        }
    }

    #[test]
    fn test_tile_response_success_range() {
        assert!(TileResponse { status: 200, bytes: 0 }.is_success());
        assert!(TileResponse { status: 299, bytes: 0 }.is_success());
        assert!(!TileResponse { status: 304, bytes: 0 }.is_success());
        assert!(!TileResponse { status: 199, bytes: 0 }.is_success());
        assert!(!TileResponse { status: 500, bytes: 0 }.is_success());
    }

    #[test]
    fn test_client_accepts_method_and_headers() {
        let client = ReqwestTileClient::new(
            "head",
            &[("X-Warm".to_string(), "1".to_string())],
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(client.method(), &Method::HEAD);
    }

    #[test]
    fn test_client_rejects_invalid_header() {
        let result = ReqwestTileClient::new("GET", &[("bad header".to_string(), "v".to_string())], None);
        assert!(matches!(result, Err(TransportError::Client(_))));
    }

    #[test]
    fn test_client_rejects_invalid_method() {
        let result = ReqwestTileClient::new("GE T", &[], None);
        assert!(matches!(result, Err(TransportError::Client(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let client = ReqwestTileClient::new("GET", &[], Some(Duration::from_secs(5))).unwrap();
        let result = client.request("http://127.0.0.1:1/0/0/0.png").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_scripted_client_replays_then_repeats() {
        let client = ScriptedClient::default().script(
            "u",
            vec![
                Err(TransportError::Connect("refused".to_string())),
                Ok(TileResponse { status: 200, bytes: 7 }),
            ],
        );

        assert!(client.request("u").await.is_err());
        assert_eq!(client.request("u").await.unwrap().bytes, 7);
        assert_eq!(client.request("u").await.unwrap().bytes, 7);
        assert_eq!(client.calls.lock().unwrap().len(), 3);
    }
}
