//! HTTP Transport Utilities
//!
//! JSON-RPC over HTTP POST, the way node binaries expose their API services
//! (`/ext/health`, `/ext/info`, ...).
//!
//! Each call builds its own hyper client and connection, so concurrent
//! pollers targeting different nodes never share connection state.

use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::Request;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::Value;

use crate::protocol::error::{NetrunnerError, Result};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};

/// HTTP transport utility functions
pub struct HttpTransport;

impl HttpTransport {
    /// Joins a base endpoint and a service path without doubling slashes.
    ///
    /// ```
    /// use netrunner_common::transport::http::HttpTransport;
    ///
    /// assert_eq!(
    ///     HttpTransport::service_url("http://127.0.0.1:9650/", "/ext/health"),
    ///     "http://127.0.0.1:9650/ext/health"
    /// );
    /// ```
    pub fn service_url(endpoint: &str, path: &str) -> String {
        format!(
            "{}/{}",
            endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Extracts the `result` member of a JSON-RPC response body.
    ///
    /// # Errors
    /// - `JsonSerialization` if the body is not a JSON-RPC response
    /// - `InvalidResponse` if the response carries an error object or no result
    pub fn parse_response(body: &[u8]) -> Result<Value> {
        let response: JsonRpcResponse = serde_json::from_slice(body)?;

        if let Some(error) = response.error {
            return Err(NetrunnerError::InvalidResponse(format!(
                "node returned error {}: {}",
                error.code, error.message
            )));
        }

        response
            .result
            .ok_or_else(|| NetrunnerError::InvalidResponse("Response missing result".to_string()))
    }

    /// Posts a JSON-RPC request to `url` and returns its result.
    ///
    /// The whole exchange (connect, send, read body) is bounded by `timeout`.
    pub async fn post_jsonrpc(url: &str, req: &JsonRpcRequest, timeout: Duration) -> Result<Value> {
        let body = serde_json::to_vec(req)?;

        let http_request = Request::builder()
            .method("POST")
            .uri(url)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| NetrunnerError::Transport(format!("Failed to build request: {}", e)))?;

        let client = Client::builder(TokioExecutor::new()).build_http();

        let exchange = async {
            let response = client
                .request(http_request)
                .await
                .map_err(|e| NetrunnerError::Transport(format!("HTTP request failed: {}", e)))?;

            let status = response.status();
            let body_bytes = response
                .into_body()
                .collect()
                .await
                .map_err(|e| NetrunnerError::Transport(format!("Failed to read response: {}", e)))?
                .to_bytes();

            if !status.is_success() {
                return Err(NetrunnerError::Transport(format!(
                    "{} returned HTTP {}",
                    url, status
                )));
            }
            Ok(body_bytes)
        };

        let body_bytes = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| NetrunnerError::Timeout(timeout.as_millis() as u64))??;

        Self::parse_response(&body_bytes)
    }
}
