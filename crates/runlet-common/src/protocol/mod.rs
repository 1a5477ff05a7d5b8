pub mod api;
pub mod error;
pub mod jsonrpc;

pub use api::*;
pub use error::{Result, RunletError};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
