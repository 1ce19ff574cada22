//! Shared fixtures for the integration tests: a demo server and an
//! in-process transport that feeds it directly.

#![allow(dead_code)]

use async_trait::async_trait;
use http::StatusCode;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use jsonrpc_client::Transport;
use jsonrpc_protocol::{RpcError, RpcResult};
use jsonrpc_server::{
    Arguments, Environment, HttpRpcServer, MemoryRequestLogger, Server, ServerBuilder, Service,
    Signature,
};

/// Application failure that the demo server treats as local.
#[derive(Debug, Error)]
#[error("storage offline")]
pub struct StorageOffline;

pub struct Calculator;

impl Service for Calculator {
    fn signature(&self, method: &str) -> Option<Signature> {
        match method {
            "add" | "subtract" => Some(Signature::of(["a", "b"])),
            "divide" => Some(Signature::of(["a", "b"])),
            _ => None,
        }
    }

    fn call(&self, method: &str, args: Arguments) -> RpcResult<Value> {
        let a: i64 = args.get("a")?;
        let b: i64 = args.get("b")?;
        match method {
            "add" => Ok(json!(a + b)),
            "subtract" => Ok(json!(a - b)),
            "divide" if b == 0 => Err(RpcError::response(
                -32000,
                "Division by zero",
                Some(json!({"dividend": a})),
            )),
            "divide" => Ok(json!(a / b)),
            other => Err(RpcError::procedure_not_found(other)),
        }
    }
}

/// Server with `echo`, `sum`, `fail`, `store` and an attached calculator.
pub fn demo_server() -> ServerBuilder {
    Server::builder()
        .procedure("echo", Signature::of(["value"]), |args| {
            args.get::<Value>("value")
        })
        .procedure("sum", Signature::of(["a", "b"]), |args| {
            Ok(json!(args.get::<i64>("a")? + args.get::<i64>("b")?))
        })
        .procedure(
            "greet",
            Signature::new().required("name").optional("greeting", json!("Hello")),
            |args| {
                let name: String = args.get("name")?;
                let greeting: String = args.get("greeting")?;
                Ok(json!(format!("{}, {}!", greeting, name)))
            },
        )
        .procedure("store", Signature::new(), |_| Err(RpcError::other(StorageOffline)))
        .attach(Arc::new(Calculator))
}

pub fn demo_server_with_logger() -> (Server, Arc<MemoryRequestLogger>) {
    let logger = Arc::new(MemoryRequestLogger::new());
    let server = demo_server().request_logger(logger.clone()).build();
    (server, logger)
}

/// Calls [`Server::execute`] directly, mapping reply statuses the way an HTTP
/// transport would.
pub struct LocalTransport {
    server: Arc<Server>,
    environment: Environment,
}

impl LocalTransport {
    pub fn new(server: Server) -> Self {
        Self {
            server: Arc::new(server),
            environment: Environment::new().with_remote_addr("127.0.0.1"),
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, payload: String, headers: &HashMap<String, String>) -> RpcResult<String> {
        let mut environment = self.environment.clone();
        for (name, value) in headers {
            environment = environment.with_header(name, value.clone());
        }

        let reply = self
            .server
            .execute(payload.as_bytes(), &environment)
            .map_err(|local| RpcError::ServerFailure(local.to_string()))?;

        match reply.status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(RpcError::AccessDenied("Access denied".into()))
            }
            _ => Ok(reply.body.unwrap_or_default()),
        }
    }
}

/// Serve `server` over HTTP on an ephemeral loopback port.
pub async fn spawn_http(server: Server, path: &str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener");
    let addr = listener.local_addr().expect("listener address");

    let http = HttpRpcServer::builder(server).path(path).build();
    tokio::spawn(async move {
        if let Err(e) = http.serve(listener).await {
            eprintln!("test server stopped: {}", e);
        }
    });

    addr
}
