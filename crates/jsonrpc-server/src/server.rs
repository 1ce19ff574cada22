//! The server facade: gates, credentials, then single or batch processing.

use http::{HeaderMap, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, warn};

use jsonrpc_protocol::{RpcError, RpcResult, validator};

use crate::access::{self, Credentials};
use crate::config::ServerConfig;
use crate::error::{LocalError, LocalErrors};
use crate::logger::{DiagnosticLogger, NullDiagnosticLogger, NullRequestLogger, RequestLogger};
use crate::middleware::{Middleware, MiddlewareChain};
use crate::parser::{BatchRequestParser, Outgoing, ProcessingContext, RequestParser};
use crate::procedure::{Arguments, Service, Signature};
use crate::registry::ProcedureRegistry;
use crate::response_builder::ResponseBuilder;

/// Sent if a reply cannot be serialized.
const INTERNAL_ERROR_BODY: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error"},"id":null}"#;

/// Snapshot of the transport-level request: peer address and headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    remote_addr: Option<String>,
    headers: HashMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Header names are case-insensitive.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn from_http(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let headers = headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        Self {
            remote_addr: peer.map(|peer| peer.ip().to_string()),
            headers,
        }
    }

    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// What the transport should send back.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `None` means send nothing.
    pub body: Option<String>,
}

impl Reply {
    /// Parse the body back into JSON, for inspection.
    pub fn json(&self) -> Option<Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_str(body).ok())
    }
}

/// A configured JSON-RPC server. Transport-agnostic; see
/// [`HttpRpcServer`](crate::HttpRpcServer) for the HTTP binding.
pub struct Server {
    config: ServerConfig,
    registry: ProcedureRegistry,
    middleware: MiddlewareChain,
    local_errors: LocalErrors,
    response_builder: ResponseBuilder,
    request_logger: Arc<dyn RequestLogger>,
    diagnostics: Arc<dyn DiagnosticLogger>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProcedureRegistry {
        &self.registry
    }

    /// Re-register procedures between `execute` calls.
    pub fn registry_mut(&mut self) -> &mut ProcedureRegistry {
        &mut self.registry
    }

    pub fn middleware_mut(&mut self) -> &mut MiddlewareChain {
        &mut self.middleware
    }

    /// Process one raw request body.
    ///
    /// Only errors listed in [`LocalErrors`] come back as `Err`; every other
    /// failure is rendered into the reply.
    pub fn execute(&self, body: &[u8], environment: &Environment) -> Result<Reply, LocalError> {
        let payload = match validator::decode(body) {
            Ok(payload) => payload,
            Err(e) => {
                debug!("Rejecting undecodable payload: {}", e);
                return Ok(self.error_reply(&e));
            }
        };

        if let Err(e) = self.check_access(environment) {
            warn!(
                remote_addr = environment.remote_addr().unwrap_or("-"),
                "Request rejected: {}", e
            );
            return Ok(self.error_reply(&e));
        }

        let credentials = self.credentials(environment);
        if let Err(e) = access::validate_user(&self.config.users, &credentials) {
            warn!(
                username = credentials.username.as_deref().unwrap_or("-"),
                "Request rejected: {}", e
            );
            return Ok(self.error_reply(&e));
        }

        let ctx = ProcessingContext {
            registry: &self.registry,
            middleware: &self.middleware,
            credentials: &credentials,
            response_builder: &self.response_builder,
            local_errors: &self.local_errors,
            request_logger: self.request_logger.as_ref(),
            diagnostics: self.diagnostics.as_ref(),
        };

        let outgoing = match payload {
            Value::Array(items) => BatchRequestParser::new(ctx).parse(items)?,
            single => RequestParser::new(ctx)
                .parse(single)?
                .map_or(Outgoing::Nothing, Outgoing::Single),
        };

        Ok(self.reply(StatusCode::OK, &outgoing))
    }

    fn check_access(&self, environment: &Environment) -> RpcResult<()> {
        access::validate_host(&self.config.allowed_hosts, environment.remote_addr())
    }

    /// Credentials from the alternative header if configured and non-empty,
    /// otherwise from `Authorization: Basic`.
    fn credentials(&self, environment: &Environment) -> Credentials {
        if let Some(value) = self
            .config
            .authentication_header
            .as_deref()
            .and_then(|header| environment.header(header))
            .filter(|value| !value.trim().is_empty())
        {
            return Credentials::from_basic_token(value);
        }

        environment
            .header("authorization")
            .filter(|value| value.starts_with("Basic "))
            .map(Credentials::from_basic_token)
            .unwrap_or_default()
    }

    fn error_reply(&self, error: &RpcError) -> Reply {
        let status = self.response_builder.status(Some(error));
        let message = self.response_builder.error(None, error);
        self.reply(status, &Outgoing::Single(message))
    }

    fn reply(&self, status: StatusCode, outgoing: &Outgoing) -> Reply {
        let body = outgoing.to_json().unwrap_or_else(|e| {
            error!("Failed to serialize reply: {}", e);
            Some(INTERNAL_ERROR_BODY.to_string())
        });

        Reply {
            status,
            headers: self.response_builder.headers(status),
            body,
        }
    }
}

/// Builder for [`Server`].
pub struct ServerBuilder {
    config: ServerConfig,
    registry: ProcedureRegistry,
    middleware: MiddlewareChain,
    local_errors: LocalErrors,
    request_logger: Arc<dyn RequestLogger>,
    diagnostics: Arc<dyn DiagnosticLogger>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            registry: ProcedureRegistry::new(),
            middleware: MiddlewareChain::new(),
            local_errors: LocalErrors::new(),
            request_logger: Arc::new(NullRequestLogger),
            diagnostics: Arc::new(NullDiagnosticLogger),
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn allowed_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    pub fn user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.users.insert(username.into(), password.into());
        self
    }

    pub fn authentication_header(mut self, header: impl Into<String>) -> Self {
        self.config.authentication_header = Some(header.into());
        self
    }

    pub fn default_error_code(mut self, code: i64) -> Self {
        self.config.default_error_code = code;
        self
    }

    /// Start from a prepared registry
    pub fn registry(mut self, registry: ProcedureRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn procedure<F>(mut self, name: impl Into<String>, signature: Signature, func: F) -> Self
    where
        F: Fn(Arguments) -> RpcResult<Value> + Send + Sync + 'static,
    {
        self.registry.register(name, signature, func);
        self
    }

    pub fn bind(
        mut self,
        name: impl Into<String>,
        instance: Arc<dyn Service>,
        method: impl Into<String>,
    ) -> Self {
        self.registry.bind(name, instance, method);
        self
    }

    pub fn class<F>(mut self, class: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Service> + Send + Sync + 'static,
    {
        self.registry.register_class(class, factory);
        self
    }

    pub fn bind_class(
        mut self,
        name: impl Into<String>,
        class: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        self.registry.bind_class(name, class, method);
        self
    }

    pub fn attach(mut self, instance: Arc<dyn Service>) -> Self {
        self.registry.attach(instance);
        self
    }

    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.middleware.register(middleware);
        self
    }

    /// Let errors of type `E` escape [`Server::execute`].
    pub fn local_error<E>(mut self) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.local_errors.register::<E>();
        self
    }

    pub fn local_errors(mut self, local_errors: LocalErrors) -> Self {
        self.local_errors = local_errors;
        self
    }

    pub fn request_logger(mut self, logger: Arc<dyn RequestLogger>) -> Self {
        self.request_logger = logger;
        self
    }

    pub fn diagnostic_logger(mut self, logger: Arc<dyn DiagnosticLogger>) -> Self {
        self.diagnostics = logger;
        self
    }

    pub fn build(self) -> Server {
        let response_builder =
            ResponseBuilder::new().with_default_error_code(self.config.default_error_code);

        Server {
            config: self.config,
            registry: self.registry,
            middleware: self.middleware,
            local_errors: self.local_errors,
            response_builder,
            request_logger: self.request_logger,
            diagnostics: self.diagnostics,
        }
    }
}
