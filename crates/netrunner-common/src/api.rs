//! Node API contract.
//!
//! A [`NodeApi`] answers health and identity queries for one node endpoint.
//! Handles are shared read-only: the orchestrator polls them and callers get
//! an `Arc` clone through the network's node snapshots.

use std::sync::Arc;

use async_trait::async_trait;

use crate::protocol::error::Result;

#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Endpoint URI this handle talks to, e.g. `http://127.0.0.1:9650`
    fn endpoint(&self) -> &str;

    /// Queries the node's readiness. `Ok(false)` means the node answered but
    /// reported itself unhealthy.
    async fn health(&self) -> Result<bool>;

    /// Queries the node id the node reports for itself.
    async fn node_id(&self) -> Result<String>;
}

/// Builds [`NodeApi`] handles from endpoint URIs.
pub trait NodeApiFactory: Send + Sync {
    fn new_api(&self, endpoint: &str) -> Arc<dyn NodeApi>;
}

impl<F> NodeApiFactory for F
where
    F: Fn(&str) -> Arc<dyn NodeApi> + Send + Sync,
{
    fn new_api(&self, endpoint: &str) -> Arc<dyn NodeApi> {
        self(endpoint)
    }
}
