pub mod error;
pub mod jsonrpc;

pub use error::{NetrunnerError, Result};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
