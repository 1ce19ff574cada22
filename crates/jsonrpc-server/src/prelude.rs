//! # JSON-RPC Server Prelude
//!
//! ```rust
//! use jsonrpc_server::prelude::*;
//! ```

pub use crate::access::Credentials;
pub use crate::config::ServerConfig;
pub use crate::error::{LocalError, LocalErrors};
pub use crate::logger::{DiagnosticLogger, RequestLogEntry, RequestLogger};
pub use crate::middleware::{Middleware, MiddlewareContext};
pub use crate::procedure::{Arguments, Service, Signature};
pub use crate::registry::ProcedureRegistry;
pub use crate::server::{Environment, Reply, Server, ServerBuilder};

#[cfg(feature = "http")]
pub use crate::http_server::{HttpRpcServer, HttpServerConfig};

pub use jsonrpc_protocol::{RequestParams, RpcError, RpcResult};
