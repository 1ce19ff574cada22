//! Transport layer for the client

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use jsonrpc_protocol::RpcResult;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpTransport;

/// Moves serialized payloads to a server and back.
///
/// An empty reply is valid: servers send nothing back for notifications.
/// Failures to reach the server are [`RpcError::ConnectionFailure`];
/// rejections by the server map to the matching [`RpcError`] kind.
///
/// [`RpcError`]: jsonrpc_protocol::RpcError
/// [`RpcError::ConnectionFailure`]: jsonrpc_protocol::RpcError::ConnectionFailure
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, payload: String, headers: &HashMap<String, String>) -> RpcResult<String>;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn send(&self, payload: String, headers: &HashMap<String, String>) -> RpcResult<String> {
        (**self).send(payload, headers).await
    }
}
