//! Pre-dispatch hooks sharing the caller's credentials.
//!
//! Hooks run in registration order before every procedure call. The first hook
//! returning an error stops the chain and the call never reaches the registry.
//! Siblings in a batch are processed independently.

use std::sync::Arc;

use jsonrpc_protocol::{RequestParams, RpcResult};

use crate::access::Credentials;

/// What a hook gets to inspect.
#[derive(Debug, Clone, Copy)]
pub struct MiddlewareContext<'a> {
    credentials: &'a Credentials,
    procedure: &'a str,
    params: Option<&'a RequestParams>,
}

impl<'a> MiddlewareContext<'a> {
    pub fn new(
        credentials: &'a Credentials,
        procedure: &'a str,
        params: Option<&'a RequestParams>,
    ) -> Self {
        Self {
            credentials,
            procedure,
            params,
        }
    }

    pub fn credentials(&self) -> &'a Credentials {
        self.credentials
    }

    pub fn username(&self) -> Option<&'a str> {
        self.credentials.username.as_deref()
    }

    pub fn password(&self) -> Option<&'a str> {
        self.credentials.password.as_deref()
    }

    pub fn procedure(&self) -> &'a str {
        self.procedure
    }

    pub fn params(&self) -> Option<&'a RequestParams> {
        self.params
    }
}

/// A hook run before dispatch. Returning `Err` vetoes the call.
///
/// Any `Fn(&MiddlewareContext) -> RpcResult<()>` closure is a middleware:
///
/// ```
/// use jsonrpc_protocol::RpcError;
/// use jsonrpc_server::{MiddlewareChain, MiddlewareContext};
///
/// let mut chain = MiddlewareChain::new();
/// chain.register(|ctx: &MiddlewareContext<'_>| {
///     if ctx.procedure().starts_with("admin.") && ctx.username() != Some("root") {
///         return Err(RpcError::AuthenticationFailure("admin only".into()));
///     }
///     Ok(())
/// });
/// assert_eq!(chain.len(), 1);
/// ```
pub trait Middleware: Send + Sync {
    fn before_dispatch(&self, ctx: &MiddlewareContext<'_>) -> RpcResult<()>;
}

impl<F> Middleware for F
where
    F: Fn(&MiddlewareContext<'_>) -> RpcResult<()> + Send + Sync,
{
    fn before_dispatch(&self, ctx: &MiddlewareContext<'_>) -> RpcResult<()> {
        self(ctx)
    }
}

/// Ordered list of hooks, fixed once request processing starts.
#[derive(Default, Clone)]
pub struct MiddlewareChain {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an already shared hook.
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middleware.push(middleware);
    }

    pub fn register<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Middleware + 'static,
    {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Run every hook in order; stop at the first error.
    pub fn run(&self, ctx: &MiddlewareContext<'_>) -> RpcResult<()> {
        for middleware in &self.middleware {
            middleware.before_dispatch(ctx)?;
        }
        Ok(())
    }
}
