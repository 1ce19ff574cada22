//! HTTP binding for [`Server`] on hyper.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::server::{Environment, Server};

/// Result type for the HTTP adapter
pub type Result<T> = std::result::Result<T, HttpServerError>;

#[derive(Debug, Error)]
pub enum HttpServerError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for the HTTP server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Path for the JSON-RPC endpoint
    pub path: String,
    /// Maximum request body size
    pub max_body_size: usize,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8000)),
            path: "/jsonrpc".to_string(),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Builder for [`HttpRpcServer`]
pub struct HttpRpcServerBuilder {
    config: HttpServerConfig,
    server: Server,
}

impl HttpRpcServerBuilder {
    pub fn new(server: Server) -> Self {
        Self {
            config: HttpServerConfig::default(),
            server,
        }
    }

    pub fn config(mut self, config: HttpServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = path.into();
        self
    }

    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn build(self) -> HttpRpcServer {
        HttpRpcServer {
            config: Arc::new(self.config),
            server: Arc::new(self.server),
        }
    }
}

/// Serves a [`Server`] over HTTP/1.1 POST.
#[derive(Clone)]
pub struct HttpRpcServer {
    config: Arc<HttpServerConfig>,
    server: Arc<Server>,
}

impl HttpRpcServer {
    pub fn builder(server: Server) -> HttpRpcServerBuilder {
        HttpRpcServerBuilder::new(server)
    }

    pub fn config(&self) -> &HttpServerConfig {
        &self.config
    }

    /// Bind the configured address and serve forever.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_address).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!(
            "JSON-RPC server listening on {}{}",
            listener.local_addr()?,
            self.config.path
        );

        loop {
            let (stream, peer_addr) = listener.accept().await?;
            debug!("New connection from {}", peer_addr);

            let this = self.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let this = this.clone();
                    async move { Ok::<_, Infallible>(this.handle(req, peer_addr).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    if err.is_incomplete_message() {
                        debug!("Client disconnected: {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }

    async fn handle(&self, req: Request<Incoming>, peer_addr: SocketAddr) -> Response<Full<Bytes>> {
        if req.uri().path() != self.config.path {
            return empty(StatusCode::NOT_FOUND);
        }
        if req.method() != Method::POST {
            return empty(StatusCode::METHOD_NOT_ALLOWED);
        }

        let environment = Environment::from_http(req.headers(), Some(peer_addr));
        let body = match Limited::new(req.into_body(), self.config.max_body_size)
            .collect()
            .await
        {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                debug!("Rejecting request body: {}", e);
                return empty(StatusCode::PAYLOAD_TOO_LARGE);
            }
        };

        let server = Arc::clone(&self.server);
        let outcome =
            tokio::task::spawn_blocking(move || server.execute(&body, &environment)).await;

        let reply = match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(local)) => {
                error!("Local error while processing request: {}", local);
                return empty(StatusCode::INTERNAL_SERVER_ERROR);
            }
            Err(join_error) => {
                error!("Request processing task failed: {}", join_error);
                return empty(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        let mut response = Response::new(Full::new(
            reply.body.map(Bytes::from).unwrap_or_default(),
        ));
        *response.status_mut() = reply.status;
        *response.headers_mut() = reply.headers;
        response
    }
}

fn empty(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}
