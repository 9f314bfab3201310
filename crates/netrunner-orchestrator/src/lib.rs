//! netrunner Orchestrator
//!
//! Starts and manages a fleet of local node processes as one network:
//!
//! - [`sequencer`] launches beacons before everything else
//! - [`registry`] keeps the name to node mapping
//! - [`health_checker`] waits for readiness with a deadline and cancellation
//! - [`Network`] is the handle for adding, removing, inspecting and stopping
//!   nodes
//!
//! Process and API access go through the `NodeProcessFactory` and
//! `NodeApiFactory` traits from `netrunner-common`, handed to
//! [`Orchestrator::new`].

pub mod health_checker;
pub mod materialize;
pub mod network;
pub mod node;
pub mod orchestrator;
pub mod registry;
pub mod sequencer;

#[cfg(test)]
mod test_support;

pub use health_checker::{HealthCheckConfig, HealthChecker};
pub use network::Network;
pub use node::{NodeInfo, NodeRecord, NodeState};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use registry::NodeRegistry;
