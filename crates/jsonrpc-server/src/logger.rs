//! Request and diagnostic logging collaborators.
//!
//! Both are injected into the [`Server`](crate::Server); neither can fail or
//! influence request processing.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{error, info};

use jsonrpc_protocol::{RequestId, RpcError};

/// One processed request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLogEntry {
    pub id: Option<RequestId>,
    /// `None` when the envelope was too malformed to carry a method.
    pub method: Option<String>,
    pub params: Option<Value>,
    /// The response envelope, or `None` when nothing was sent back.
    pub response: Option<Value>,
    pub elapsed: Duration,
    /// Extra top-level request fields.
    pub metadata: Map<String, Value>,
}

pub trait RequestLogger: Send + Sync {
    fn log(&self, entry: &RequestLogEntry);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRequestLogger;

impl RequestLogger for NullRequestLogger {
    fn log(&self, _entry: &RequestLogEntry) {}
}

/// Keeps entries in memory, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryRequestLogger {
    entries: Mutex<Vec<RequestLogEntry>>,
}

impl MemoryRequestLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<RequestLogEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl RequestLogger for MemoryRequestLogger {
    fn log(&self, entry: &RequestLogEntry) {
        self.entries.lock().push(entry.clone());
    }
}

/// Emits one `tracing` event per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRequestLogger;

impl RequestLogger for TracingRequestLogger {
    fn log(&self, entry: &RequestLogEntry) {
        let id = entry.id.as_ref().map(ToString::to_string);
        let failed = entry
            .response
            .as_ref()
            .is_some_and(|response| response.get("error").is_some());

        info!(
            id = id.as_deref().unwrap_or("-"),
            method = entry.method.as_deref().unwrap_or("-"),
            elapsed_ms = entry.elapsed.as_secs_f64() * 1000.0,
            failed,
            responded = entry.response.is_some(),
            "JSON-RPC request processed"
        );
    }
}

/// Receives application errors that had no protocol meaning of their own and
/// were turned into generic error responses.
pub trait DiagnosticLogger: Send + Sync {
    fn unhandled(&self, error: &RpcError, procedure: Option<&str>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullDiagnosticLogger;

impl DiagnosticLogger for NullDiagnosticLogger {
    fn unhandled(&self, _error: &RpcError, _procedure: Option<&str>) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnosticLogger;

impl DiagnosticLogger for TracingDiagnosticLogger {
    fn unhandled(&self, err: &RpcError, procedure: Option<&str>) {
        error!(
            procedure = procedure.unwrap_or("-"),
            "Unhandled error in procedure: {}", err
        );
    }
}
