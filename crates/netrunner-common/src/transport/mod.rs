//! Transport layer for talking to node APIs.
//!
//! Nodes expose JSON-RPC services over plain HTTP; [`HttpTransport`] posts a
//! request and unwraps the JSON-RPC result.

pub mod http;

pub use http::HttpTransport;
