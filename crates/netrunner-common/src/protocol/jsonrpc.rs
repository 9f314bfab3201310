//! JSON-RPC 2.0 Types
//!
//! Node binaries expose their health and info services as JSON-RPC 2.0
//! endpoints. These are the envelopes the node API client sends and parses.
//!
//! - Request: `{"jsonrpc": "2.0", "method": "...", "params": ..., "id": ...}`
//! - Response: `{"jsonrpc": "2.0", "result": ..., "error": ..., "id": ...}`
//!
//! # Example
//!
//! ```
//! use netrunner_common::protocol::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
//! use serde_json::json;
//!
//! let request = JsonRpcRequest::new("health.health", json!({}), json!(1));
//! assert_eq!(request.jsonrpc, "2.0");
//!
//! let response = JsonRpcResponse::success(json!(1), json!({"healthy": true}));
//! assert!(response.error.is_none());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0")
    pub jsonrpc: String,
    /// Name of the method to invoke, e.g. `health.health`
    pub method: String,
    /// Parameter values
    #[serde(default)]
    pub params: Value,
    /// Request identifier
    pub id: Value,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// The method does not exist / is not available
pub const METHOD_NOT_FOUND: i32 = -32601;

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Value, id: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id,
        }
    }
}

impl JsonRpcError {
    /// Create a method not found error (-32601)
    pub fn method_not_found() -> Self {
        Self {
            code: METHOD_NOT_FOUND,
            message: "Method not found".into(),
            data: None,
        }
    }
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(error),
            id,
        }
    }
}
