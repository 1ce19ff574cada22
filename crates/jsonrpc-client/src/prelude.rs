//! # JSON-RPC Client Prelude
//!
//! ```rust
//! use jsonrpc_client::prelude::*;
//! ```

pub use crate::client::{Batch, Client};
pub use crate::config::{ClientConfig, HttpTransportConfig};
#[cfg(feature = "http")]
pub use crate::transport::HttpTransport;
pub use crate::transport::Transport;

pub use jsonrpc_protocol::{
    RequestBuilder, RequestId, RequestParams, ResponseOutcome, RpcError, RpcResult,
};
