//! # netrunner-local
//!
//! Runs each node as a child OS process on this host.
//!
//! [`LocalProcessFactory`] is the production [`NodeProcessFactory`]: it
//! resolves the binary from the node's implementation payload
//! (`{"binary_path": "..."}`), lays out a per-node data directory and spawns
//! the binary with the orchestrator's arguments.
//!
//! [`NodeProcessFactory`]: netrunner_common::process::NodeProcessFactory

pub mod node;
pub mod process;

pub use node::{LocalNodeConfig, NodeFiles};
pub use process::{LocalNodeProcess, LocalProcessFactory};
