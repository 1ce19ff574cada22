//! # JSON-RPC 2.0 Protocol
//!
//! Transport-agnostic building blocks shared by the client and the server:
//! wire envelopes, the error taxonomy and its code mapping, structural
//! validation, request construction and response interpretation.
//!
//! ## Features
//! - Request/notification envelopes with positional or named parameters
//! - Error codes mapped both ways between wire objects and [`RpcError`]
//! - Batch-aware response parsing that raises or returns errors

pub mod error;
pub mod parser;
pub mod prelude;
pub mod request;
pub mod response;
pub mod types;
pub mod validator;

// Re-export main types
pub use error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, RpcError, RpcResult};
pub use parser::{ResponseOutcome, ResponseParser};
pub use request::{JsonRpcRequest, RequestBuilder, RequestParams, next_request_id};
pub use response::{JsonRpcMessage, JsonRpcResponse};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;

    /// Credentials missing or rejected
    pub const UNAUTHENTICATED: i64 = -32001;
    /// Caller not allowed
    pub const UNAUTHORIZED: i64 = -32002;
}
