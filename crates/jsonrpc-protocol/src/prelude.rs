//! # JSON-RPC Protocol Prelude
//!
//! ```rust
//! use jsonrpc_protocol::prelude::*;
//! ```

pub use crate::error::{
    JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, RpcError, RpcResult,
};
pub use crate::parser::{ResponseOutcome, ResponseParser};
pub use crate::request::{JsonRpcRequest, RequestBuilder, RequestParams};
pub use crate::response::{JsonRpcMessage, JsonRpcResponse};
pub use crate::types::{JsonRpcVersion, RequestId};

// Standard error codes
pub use crate::error_codes::*;
