use std::sync::Arc;
use std::time::Duration;

use netrunner_common::protocol::error::{NetrunnerError, Result};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::node::{NodeRecord, NodeState};

/// Longest wait a deadline is set to; larger timeouts mean "no deadline".
const MAX_WAIT: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

fn deadline_after(timeout: Duration) -> Instant {
    Instant::now() + timeout.min(MAX_WAIT)
}

/// Health check configuration.
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    /// Time between two polls of the same node
    pub interval: Duration,
    /// Upper bound on a single poll
    pub request_timeout: Duration,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            request_timeout: Duration::from_millis(2000),
        }
    }
}

/// Polls node readiness until every node is healthy, a deadline passes or the
/// caller cancels.
///
/// Health failures only ever change record state. Processes are left running.
#[derive(Debug, Clone, Default)]
pub struct HealthChecker {
    config: HealthCheckConfig,
}

impl HealthChecker {
    pub fn new(config: HealthCheckConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HealthCheckConfig {
        &self.config
    }

    /// Waits for one node to report healthy.
    ///
    /// # Errors
    /// - `NodeFailed` if the record is already `Stopped` or `Failed`
    /// - `HealthTimeout` when `timeout` elapses (record becomes `Failed`)
    /// - `ProcessExited` if the process dies first (record becomes `Failed`)
    /// - `Cancelled` when `cancel` fires
    pub async fn await_node_healthy(
        &self,
        record: &NodeRecord,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let deadline = deadline_after(timeout);
        self.poll_until_healthy(record, deadline, timeout, cancel).await
    }

    /// Waits for every record to report healthy against one shared deadline.
    ///
    /// Each node is polled by its own task. The first failure cancels the
    /// rest, and all tasks have finished by the time this returns.
    pub async fn await_all_healthy(
        &self,
        records: Vec<Arc<NodeRecord>>,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let deadline = deadline_after(timeout);
        let child = cancel.child_token();
        let mut set = JoinSet::new();

        for record in records {
            let checker = self.clone();
            let token = child.clone();
            set.spawn(async move {
                checker
                    .poll_until_healthy(&record, deadline, timeout, &token)
                    .await
            });
        }

        let mut outcome = Ok(());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    outcome = Err(e);
                    break;
                }
                Err(e) if e.is_panic() => {
                    child.cancel();
                    set.shutdown().await;
                    std::panic::resume_unwind(e.into_panic());
                }
                Err(_) => {}
            }
        }

        child.cancel();
        set.shutdown().await;
        outcome
    }

    async fn poll_until_healthy(
        &self,
        record: &NodeRecord,
        deadline: Instant,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<()> {
        match record.state() {
            NodeState::Healthy => return Ok(()),
            state if state.is_terminal() => {
                return Err(NetrunnerError::NodeFailed(record.name().to_string()))
            }
            _ => {}
        }

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let expiry = tokio::time::sleep_until(deadline);
        tokio::pin!(expiry);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(NetrunnerError::Cancelled),
                _ = &mut expiry => return Err(Self::timed_out(record, timeout)),
                _ = interval.tick() => {}
            }

            match record.state() {
                NodeState::Healthy => return Ok(()),
                NodeState::Stopped | NodeState::Failed => {
                    return Err(NetrunnerError::NodeFailed(record.name().to_string()))
                }
                // not launched yet
                NodeState::Pending | NodeState::Starting => continue,
                NodeState::Running => {}
            }

            if !record.process().is_alive() {
                warn!("Node {} process exited before becoming healthy", record.name());
                record.record_failure("process exited");
                return Err(NetrunnerError::ProcessExited(record.name().to_string()));
            }

            let poll = tokio::time::timeout(self.config.request_timeout, record.api().health());
            let healthy = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(NetrunnerError::Cancelled),
                _ = &mut expiry => return Err(Self::timed_out(record, timeout)),
                result = poll => match result {
                    Ok(Ok(healthy)) => healthy,
                    Ok(Err(e)) => {
                        debug!("Health check for node {} failed: {}", record.name(), e);
                        false
                    }
                    Err(_) => {
                        debug!("Health check for node {} timed out", record.name());
                        false
                    }
                },
            };

            record.record_health_check(healthy);
            if record.state() == NodeState::Healthy {
                info!("Node {} is healthy", record.name());
                return Ok(());
            }
        }
    }

    fn timed_out(record: &NodeRecord, timeout: Duration) -> NetrunnerError {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        warn!("Node {} not healthy after {}ms", record.name(), timeout_ms);
        record.record_failure(format!("not healthy after {}ms", timeout_ms));
        NetrunnerError::HealthTimeout {
            name: record.name().to_string(),
            timeout_ms,
        }
    }
}
