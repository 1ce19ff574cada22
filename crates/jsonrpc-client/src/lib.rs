//! # JSON-RPC 2.0 Client
//!
//! Builds request envelopes, sends them through a [`Transport`] and maps the
//! replies back to values or typed [`RpcError`]s.
//!
//! ## Features
//! - Positional or named parameters, inferred from the call site or forced
//! - Notifications and batches
//! - Errors raised as `Err` or returned as values
//! - `http` (default): reqwest transport with Basic credentials and status mapping

pub mod client;
pub mod config;
pub mod prelude;
pub mod transport;

// Re-export main types
pub use client::{Batch, Client};
pub use config::{ClientConfig, HttpTransportConfig};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::Transport;

pub use jsonrpc_protocol::{ResponseOutcome, RpcError, RpcResult};
