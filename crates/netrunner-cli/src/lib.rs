//! # netrunner CLI
//!
//! Command-line front end for the local network orchestrator.
//!
//! The binary reads a JSON [`manifest`] describing the network, starts it with
//! the local process backend and the HTTP node API client, and keeps it
//! running until interrupted.
//!
//! ## Key Commands
//!
//! - `netrunner start`: start a network from a manifest and wait for ctrl-c
//! - `netrunner validate`: check a manifest without starting anything
//! - `netrunner gen-staking`: write a fresh staking certificate and key

pub mod manifest;
