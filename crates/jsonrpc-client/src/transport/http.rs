//! HTTP transport implementation

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};
use url::Url;

use jsonrpc_protocol::{RpcError, RpcResult};

use crate::config::HttpTransportConfig;
use crate::transport::Transport;

/// POSTs payloads to a JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Create a transport for `endpoint` with default settings
    pub fn new(endpoint: &str) -> RpcResult<Self> {
        Self::with_config(HttpTransportConfig::new(endpoint))
    }

    pub fn with_config(config: HttpTransportConfig) -> RpcResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                RpcError::ConnectionFailure(format!("Failed to create HTTP client: {}", e))
            })?;

        Self::with_client(config, client)
    }

    /// Create HTTP transport with custom client
    pub fn with_client(config: HttpTransportConfig, client: Client) -> RpcResult<Self> {
        let endpoint = Url::parse(&config.url)
            .map_err(|e| RpcError::ConnectionFailure(format!("Invalid URL: {}", e)))?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(RpcError::ConnectionFailure(format!(
                "Invalid scheme for HTTP transport: {}",
                endpoint.scheme()
            )));
        }

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn check_status(status: StatusCode) -> RpcResult<()> {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(RpcError::AccessDenied("Access denied".into()))
            }
            StatusCode::NOT_FOUND => Err(RpcError::ConnectionFailure("Endpoint not found".into())),
            status if status.is_server_error() => {
                Err(RpcError::ServerFailure(format!("Server responded with {}", status)))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, payload: String, headers: &HashMap<String, String>) -> RpcResult<String> {
        let start_time = Instant::now();

        let mut req_builder = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");

        for (name, value) in self.config.headers.iter().chain(headers) {
            req_builder = req_builder.header(name.as_str(), value.as_str());
        }

        if let Some(username) = &self.config.username {
            req_builder = req_builder.basic_auth(username, self.config.password.as_ref());
        }

        let response = req_builder.body(payload).send().await.map_err(|e| {
            warn!("HTTP request to {} failed: {}", self.endpoint, e);
            RpcError::ConnectionFailure(format!("Failed to send request: {}", e))
        })?;

        let status = response.status();
        debug!(
            status = status.as_u16(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "HTTP request completed"
        );
        Self::check_status(status)?;

        response
            .text()
            .await
            .map_err(|e| RpcError::ConnectionFailure(format!("Failed to read response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_endpoints() {
        assert!(matches!(
            HttpTransport::new("not a url"),
            Err(RpcError::ConnectionFailure(_))
        ));
        assert!(matches!(
            HttpTransport::new("ftp://example.com/rpc"),
            Err(RpcError::ConnectionFailure(_))
        ));
        assert!(HttpTransport::new("http://127.0.0.1:8000/jsonrpc").is_ok());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            HttpTransport::check_status(StatusCode::UNAUTHORIZED),
            Err(RpcError::AccessDenied(_))
        ));
        assert!(matches!(
            HttpTransport::check_status(StatusCode::FORBIDDEN),
            Err(RpcError::AccessDenied(_))
        ));
        assert!(matches!(
            HttpTransport::check_status(StatusCode::NOT_FOUND),
            Err(RpcError::ConnectionFailure(_))
        ));
        assert!(matches!(
            HttpTransport::check_status(StatusCode::INTERNAL_SERVER_ERROR),
            Err(RpcError::ServerFailure(_))
        ));
        assert!(HttpTransport::check_status(StatusCode::OK).is_ok());
    }
}
