use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

use jsonrpc_protocol::RpcError;

type Matcher = fn(&RpcError) -> bool;

/// Error kinds that must not be turned into error responses.
///
/// A procedure or middleware failing with one of these aborts
/// [`Server::execute`](crate::Server::execute) with a [`LocalError`] so the
/// hosting process sees it.
#[derive(Clone, Default)]
pub struct LocalErrors {
    matchers: Vec<(&'static str, Matcher)>,
}

impl LocalErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat application errors of type `E` (wrapped in [`RpcError::Other`]) as local.
    pub fn with<E>(mut self) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.register::<E>();
        self
    }

    pub fn register<E>(&mut self)
    where
        E: StdError + Send + Sync + 'static,
    {
        self.matchers.push((
            std::any::type_name::<E>(),
            |error| matches!(error, RpcError::Other(source) if source.is::<E>()),
        ));
    }

    /// Treat every error accepted by `matcher` as local.
    pub fn with_matcher(mut self, name: &'static str, matcher: Matcher) -> Self {
        self.matchers.push((name, matcher));
        self
    }

    pub fn matches(&self, error: &RpcError) -> bool {
        self.matchers.iter().any(|(_, matcher)| matcher(error))
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl fmt::Debug for LocalErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.matchers.iter().map(|(name, _)| name))
            .finish()
    }
}

/// A local error escaping request processing.
#[derive(Debug, Error)]
#[error("Local error in '{}': {source}", .procedure.as_deref().unwrap_or("-"))]
pub struct LocalError {
    procedure: Option<String>,
    #[source]
    source: RpcError,
}

impl LocalError {
    pub fn new(procedure: Option<String>, source: RpcError) -> Self {
        Self { procedure, source }
    }

    pub fn procedure(&self) -> Option<&str> {
        self.procedure.as_deref()
    }

    pub fn error(&self) -> &RpcError {
        &self.source
    }

    pub fn into_inner(self) -> RpcError {
        self.source
    }
}
