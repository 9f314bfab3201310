pub mod client;

pub use client::{ClientConfig, NodeApiClient, NodeApiClientFactory};
