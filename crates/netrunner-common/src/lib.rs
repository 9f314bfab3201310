//! netrunner Common Types
//!
//! Shared building blocks for the netrunner local network orchestrator:
//!
//! - [`config`] - network and node configuration and validation
//! - [`identity`] - staking identity generation and node ids
//! - [`process`] - the node process contract backends implement
//! - [`api`] - the node API contract clients implement
//! - [`protocol`] - error type and JSON-RPC envelopes
//! - [`transport`] - JSON-RPC over HTTP
//!
//! # Example
//!
//! ```
//! use netrunner_common::{NetworkConfig, NodeConfig};
//!
//! let config = NetworkConfig {
//!     network_id: 1337,
//!     genesis: br#"{"networkID":1337}"#.to_vec(),
//!     node_configs: vec![NodeConfig::new("node1").beacon(true)],
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

pub mod api;
pub mod config;
pub mod identity;
pub mod process;
pub mod protocol;
pub mod transport;

pub use api::{NodeApi, NodeApiFactory};
pub use config::{NetworkConfig, NodeConfig, StakingIdentity};
pub use identity::{generate_staking_identity, NodeId};
pub use process::{BootstrapPeer, LaunchContext, NodeProcess, NodeProcessFactory};
pub use protocol::*;
