//! # JSON-RPC 2.0 Server
//!
//! Procedure registry, middleware chain and request/batch processing for
//! JSON-RPC 2.0, behind a transport-agnostic [`Server`] facade. Request
//! processing is synchronous; the optional [`HttpRpcServer`] runs it on the
//! blocking pool of a hyper HTTP/1.1 server.
//!
//! ## Features
//! - Bare callables, bound methods, per-call class instances and attached services
//! - Positional and named argument binding with optional parameters
//! - Host and user gates, Basic credentials passed to middleware
//! - Local error kinds that escape to the host instead of being reported
//! - `http` (default): hyper adapter

pub mod access;
pub mod config;
pub mod error;
#[cfg(feature = "http")]
pub mod http_server;
pub mod logger;
pub mod middleware;
pub mod parser;
pub mod prelude;
pub mod procedure;
pub mod registry;
pub mod response_builder;
pub mod server;

// Re-export main types
pub use access::{Credentials, validate_host, validate_user};
pub use config::ServerConfig;
pub use error::{LocalError, LocalErrors};
#[cfg(feature = "http")]
pub use http_server::{
    HttpRpcServer, HttpRpcServerBuilder, HttpServerConfig, HttpServerError,
};
pub use logger::{
    DiagnosticLogger, MemoryRequestLogger, NullDiagnosticLogger, NullRequestLogger,
    RequestLogEntry, RequestLogger, TracingDiagnosticLogger, TracingRequestLogger,
};
pub use middleware::{Middleware, MiddlewareChain, MiddlewareContext};
pub use parser::{BatchRequestParser, Outgoing, ProcessingContext, RequestParser};
pub use procedure::{
    Arguments, Param, ProcedureFn, ProcedureTarget, Service, ServiceFactory, Signature,
};
pub use registry::ProcedureRegistry;
pub use response_builder::ResponseBuilder;
pub use server::{Environment, Reply, Server, ServerBuilder};

pub use jsonrpc_protocol;
