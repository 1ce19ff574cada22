//! # Calculator JSON-RPC Server
//!
//! Exposes a few arithmetic procedures over HTTP, using each registration
//! form: a bare callable, an attached service, and a class binding.
//!
//! ## Usage
//! ```bash
//! cargo run --example calculator_server -- --port 8000 --user admin:secret
//! ```
//!
//! ```bash
//! curl -u admin:secret -d '{"jsonrpc":"2.0","method":"sum","params":{"a":1,"b":2},"id":1}' \
//!     http://127.0.0.1:8000/jsonrpc
//! ```

use anyhow::Result;
use clap::Parser;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use jsonrpc_server::prelude::*;
use jsonrpc_server::{TracingDiagnosticLogger, TracingRequestLogger};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Endpoint path
    #[arg(long, default_value = "/jsonrpc")]
    path: String,

    /// Allowed `user:password` pairs; none disables authentication
    #[arg(long = "user")]
    users: Vec<String>,

    /// Allowed client addresses; none allows everyone
    #[arg(long = "allow-host")]
    allowed_hosts: Vec<String>,
}

struct Calculator;

impl Service for Calculator {
    fn signature(&self, method: &str) -> Option<Signature> {
        match method {
            "multiply" | "divide" => Some(Signature::of(["a", "b"])),
            "power" => Some(Signature::new().required("base").optional("exponent", json!(2))),
            _ => None,
        }
    }

    fn call(&self, method: &str, args: Arguments) -> RpcResult<Value> {
        match method {
            "multiply" => Ok(json!(args.get::<f64>("a")? * args.get::<f64>("b")?)),
            "divide" => {
                let b: f64 = args.get("b")?;
                if b == 0.0 {
                    return Err(RpcError::response(-32000, "Division by zero", None));
                }
                Ok(json!(args.get::<f64>("a")? / b))
            }
            "power" => Ok(json!(
                args.get::<f64>("base")?.powf(args.get::<f64>("exponent")?)
            )),
            other => Err(RpcError::procedure_not_found(other)),
        }
    }
}

struct Stats;

impl Service for Stats {
    fn signature(&self, method: &str) -> Option<Signature> {
        (method == "mean").then(|| Signature::of(["values"]))
    }

    fn call(&self, _method: &str, args: Arguments) -> RpcResult<Value> {
        let values: Vec<f64> = args.get("values")?;
        if values.is_empty() {
            return Err(RpcError::invalid_arguments("values must not be empty"));
        }
        Ok(json!(values.iter().sum::<f64>() / values.len() as f64))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut builder = Server::builder()
        .allowed_hosts(args.allowed_hosts)
        .procedure("sum", Signature::of(["a", "b"]), |args| {
            Ok(json!(args.get::<f64>("a")? + args.get::<f64>("b")?))
        })
        .attach(Arc::new(Calculator))
        .class("Stats", || Arc::new(Stats) as Arc<dyn Service>)
        .bind_class("stats.mean", "Stats", "mean")
        .middleware(|ctx: &MiddlewareContext<'_>| -> RpcResult<()> {
            info!(
                procedure = ctx.procedure(),
                user = ctx.username().unwrap_or("-"),
                "Calling procedure"
            );
            Ok(())
        })
        .request_logger(Arc::new(TracingRequestLogger))
        .diagnostic_logger(Arc::new(TracingDiagnosticLogger));

    for pair in &args.users {
        let (user, password) = pair
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("expected user:password, got '{}'", pair))?;
        builder = builder.user(user, password);
    }

    let server = builder.build();
    info!("Registered procedures: {:?}", server.registry().procedures());

    HttpRpcServer::builder(server)
        .bind_address(SocketAddr::from(([127, 0, 0, 1], args.port)))
        .path(args.path)
        .build()
        .run()
        .await?;

    Ok(())
}
