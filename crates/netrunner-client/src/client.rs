use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use netrunner_common::api::{NodeApi, NodeApiFactory};
use netrunner_common::protocol::error::{NetrunnerError, Result};
use netrunner_common::protocol::JsonRpcRequest;
use netrunner_common::transport::HttpTransport;
use serde_json::{json, Value};
use tracing::debug;

/// Path of the node health service
pub const HEALTH_PATH: &str = "/ext/health";
/// Path of the node info service
pub const INFO_PATH: &str = "/ext/info";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound for a single request, connect included
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(2),
        }
    }
}

/// JSON-RPC client for one node's API endpoint.
///
/// Creates a fresh HTTP connection for each request, so a client can be
/// shared freely between pollers.
pub struct NodeApiClient {
    endpoint: String,
    config: ClientConfig,
    next_id: AtomicU64,
}

impl NodeApiClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_config(endpoint, ClientConfig::default())
    }

    pub fn with_config(endpoint: impl Into<String>, config: ClientConfig) -> Self {
        Self {
            endpoint: endpoint.into(),
            config,
            next_id: AtomicU64::new(1),
        }
    }

    /// Calls `method` on the service mounted at `path`.
    pub async fn call(&self, path: &str, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(method, params, json!(id));
        let url = HttpTransport::service_url(&self.endpoint, path);

        debug!("Calling {} on {}", method, url);
        HttpTransport::post_jsonrpc(&url, &request, self.config.request_timeout).await
    }
}

#[async_trait]
impl NodeApi for NodeApiClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn health(&self) -> Result<bool> {
        let result = self.call(HEALTH_PATH, "health.health", json!({})).await?;
        result
            .get("healthy")
            .and_then(Value::as_bool)
            .ok_or_else(|| {
                NetrunnerError::InvalidResponse("health result missing 'healthy'".to_string())
            })
    }

    async fn node_id(&self) -> Result<String> {
        let result = self.call(INFO_PATH, "info.getNodeID", json!({})).await?;
        result
            .get("nodeID")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                NetrunnerError::InvalidResponse("info result missing 'nodeID'".to_string())
            })
    }
}

/// Builds [`NodeApiClient`]s sharing one [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct NodeApiClientFactory {
    config: ClientConfig,
}

impl NodeApiClientFactory {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

impl NodeApiFactory for NodeApiClientFactory {
    fn new_api(&self, endpoint: &str) -> Arc<dyn NodeApi> {
        Arc::new(NodeApiClient::with_config(endpoint, self.config.clone()))
    }
}
