//! Server-side request and batch processing.

use serde_json::{Map, Value};
use std::time::Instant;
use tracing::{debug, warn};

use jsonrpc_protocol::validator;
use jsonrpc_protocol::{JsonRpcMessage, JsonRpcRequest, RequestId, RpcError};

use crate::access::Credentials;
use crate::error::{LocalError, LocalErrors};
use crate::logger::{DiagnosticLogger, RequestLogEntry, RequestLogger};
use crate::middleware::{MiddlewareChain, MiddlewareContext};
use crate::registry::ProcedureRegistry;
use crate::response_builder::ResponseBuilder;

/// Everything a parser needs, borrowed for the duration of one `execute` call.
#[derive(Clone, Copy)]
pub struct ProcessingContext<'a> {
    pub registry: &'a ProcedureRegistry,
    pub middleware: &'a MiddlewareChain,
    pub credentials: &'a Credentials,
    pub response_builder: &'a ResponseBuilder,
    pub local_errors: &'a LocalErrors,
    pub request_logger: &'a dyn RequestLogger,
    pub diagnostics: &'a dyn DiagnosticLogger,
}

/// What goes back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Single(JsonRpcMessage),
    Batch(Vec<JsonRpcMessage>),
    /// Notifications only; nothing is sent.
    Nothing,
}

impl Outgoing {
    pub fn is_nothing(&self) -> bool {
        matches!(self, Outgoing::Nothing)
    }

    pub fn to_value(&self) -> serde_json::Result<Option<Value>> {
        match self {
            Outgoing::Single(message) => serde_json::to_value(message).map(Some),
            Outgoing::Batch(messages) => serde_json::to_value(messages).map(Some),
            Outgoing::Nothing => Ok(None),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Option<String>> {
        match self {
            Outgoing::Single(message) => serde_json::to_string(message).map(Some),
            Outgoing::Batch(messages) => serde_json::to_string(messages).map(Some),
            Outgoing::Nothing => Ok(None),
        }
    }
}

/// Validates, authorizes and dispatches one request envelope.
pub struct RequestParser<'a> {
    ctx: ProcessingContext<'a>,
}

impl<'a> RequestParser<'a> {
    pub fn new(ctx: ProcessingContext<'a>) -> Self {
        Self { ctx }
    }

    /// Process one envelope. `Ok(None)` means no response is owed.
    pub fn parse(&self, payload: Value) -> Result<Option<JsonRpcMessage>, LocalError> {
        let started = Instant::now();

        let request = match Self::decode(payload) {
            Ok(request) => request,
            Err((error, params)) => {
                debug!("Rejecting malformed request: {}", error);
                let response = self.ctx.response_builder.error(None, &error);
                self.log(None, None, params, Some(&response), Map::new(), started);
                return Ok(Some(response));
            }
        };

        let JsonRpcRequest {
            method,
            params,
            id,
            attributes,
            ..
        } = request;

        let outcome = self
            .ctx
            .middleware
            .run(&MiddlewareContext::new(
                self.ctx.credentials,
                &method,
                params.as_ref(),
            ))
            .and_then(|()| self.ctx.registry.dispatch(&method, params.as_ref()));

        let response = match outcome {
            Ok(result) => id.clone().map(|id| self.ctx.response_builder.success(id, result)),
            Err(error) if self.ctx.local_errors.matches(&error) => {
                warn!("Local error raised by '{}', aborting: {}", method, error);
                self.log(
                    id,
                    Some(method.clone()),
                    params.map(|p| p.to_value()),
                    None,
                    attributes,
                    started,
                );
                return Err(LocalError::new(Some(method), error));
            }
            Err(error) => {
                if error.code().is_none() {
                    self.ctx.diagnostics.unhandled(&error, Some(&method));
                }
                if id.is_none() {
                    debug!("Notification '{}' failed: {}", method, error);
                }
                id.clone()
                    .map(|id| self.ctx.response_builder.error(Some(id), &error))
            }
        };

        self.log(
            id,
            Some(method),
            params.map(|p| p.to_value()),
            response.as_ref(),
            attributes,
            started,
        );
        Ok(response)
    }

    /// Envelope checks, then typed decoding. On failure, hands back the raw
    /// params for the request log.
    fn decode(payload: Value) -> Result<JsonRpcRequest, (RpcError, Option<Value>)> {
        let raw_params = || payload.get("params").cloned();

        if let Err(error) = validator::validate_request(&payload) {
            return Err((error, raw_params()));
        }
        let params = raw_params();
        serde_json::from_value(payload)
            .map_err(|e| (RpcError::invalid_request(e.to_string()), params))
    }

    fn log(
        &self,
        id: Option<RequestId>,
        method: Option<String>,
        params: Option<Value>,
        response: Option<&JsonRpcMessage>,
        metadata: Map<String, Value>,
        started: Instant,
    ) {
        let entry = RequestLogEntry {
            id,
            method,
            params,
            response: response.and_then(|message| serde_json::to_value(message).ok()),
            elapsed: started.elapsed(),
            metadata,
        };
        self.ctx.request_logger.log(&entry);
    }
}

/// Runs every element of a batch through a [`RequestParser`], independently.
pub struct BatchRequestParser<'a> {
    ctx: ProcessingContext<'a>,
}

impl<'a> BatchRequestParser<'a> {
    pub fn new(ctx: ProcessingContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn parse(&self, items: Vec<Value>) -> Result<Outgoing, LocalError> {
        if items.is_empty() {
            debug!("Rejecting empty batch");
            return Ok(Outgoing::Single(
                self.ctx
                    .response_builder
                    .error(None, &RpcError::invalid_request("Empty batch")),
            ));
        }

        debug!("Processing batch of {} requests", items.len());
        let parser = RequestParser::new(self.ctx);
        let mut responses = Vec::with_capacity(items.len());
        for item in items {
            if let Some(response) = parser.parse(item)? {
                responses.push(response);
            }
        }

        if responses.is_empty() {
            Ok(Outgoing::Nothing)
        } else {
            Ok(Outgoing::Batch(responses))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{MemoryRequestLogger, NullDiagnosticLogger};
    use crate::procedure::Signature;
    use jsonrpc_protocol::RpcResult;
    use serde_json::{json, to_value};
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("disk full")]
    struct DiskFull;

    struct Fixture {
        registry: ProcedureRegistry,
        middleware: MiddlewareChain,
        credentials: Credentials,
        response_builder: ResponseBuilder,
        local_errors: LocalErrors,
        logger: MemoryRequestLogger,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registry = ProcedureRegistry::new();
            registry
                .register("echo", Signature::of(["value"]), |args| args.get::<Value>("value"))
                .register("explode", Signature::new(), |_| Err(RpcError::other(DiskFull)))
                .register("fail", Signature::new(), |_| {
                    Err(RpcError::response(-32050, "Nope", Some(json!("details"))))
                });

            Self {
                registry,
                middleware: MiddlewareChain::new(),
                credentials: Credentials::default(),
                response_builder: ResponseBuilder::new(),
                local_errors: LocalErrors::new(),
                logger: MemoryRequestLogger::new(),
            }
        }

        fn ctx(&self) -> ProcessingContext<'_> {
            ProcessingContext {
                registry: &self.registry,
                middleware: &self.middleware,
                credentials: &self.credentials,
                response_builder: &self.response_builder,
                local_errors: &self.local_errors,
                request_logger: &self.logger,
                diagnostics: &NullDiagnosticLogger,
            }
        }

        fn single(&self, payload: Value) -> Option<Value> {
            RequestParser::new(self.ctx())
                .parse(payload)
                .unwrap()
                .map(|message| to_value(message).unwrap())
        }

        fn batch(&self, payload: Value) -> Option<Value> {
            let items = match payload {
                Value::Array(items) => items,
                other => panic!("not a batch: {}", other),
            };
            BatchRequestParser::new(self.ctx())
                .parse(items)
                .unwrap()
                .to_value()
                .unwrap()
        }
    }

    #[test]
    fn test_echo() {
        let fixture = Fixture::new();
        let response = fixture
            .single(json!({"jsonrpc": "2.0", "method": "echo", "params": ["hi"], "id": "1"}))
            .unwrap();
        assert_eq!(response, json!({"jsonrpc": "2.0", "result": "hi", "id": "1"}));
    }

    #[test]
    fn test_missing_procedure_keeps_id() {
        let fixture = Fixture::new();
        let response = fixture
            .single(json!({"jsonrpc": "2.0", "method": "missing", "id": "1"}))
            .unwrap();
        assert_eq!(response["error"]["code"], -32601);
        assert_eq!(response["id"], "1");
    }

    #[test]
    fn test_notifications_produce_nothing() {
        let fixture = Fixture::new();
        assert!(fixture
            .single(json!({"jsonrpc": "2.0", "method": "echo", "params": ["x"]}))
            .is_none());
        assert!(fixture
            .single(json!({"jsonrpc": "2.0", "method": "missing", "id": null}))
            .is_none());
        assert_eq!(fixture.logger.len(), 2);
    }

    #[test]
    fn test_malformed_envelope_always_reported() {
        let fixture = Fixture::new();
        let response = fixture
            .single(json!({"jsonrpc": "1.0", "method": "echo"}))
            .unwrap();
        assert_eq!(response["error"]["code"], -32600);
        assert!(response["id"].is_null());

        let response = fixture
            .single(json!({"jsonrpc": "2.0", "method": "echo", "params": "x", "id": 4}))
            .unwrap();
        assert_eq!(response["error"]["code"], -32600);
        assert!(response["id"].is_null());
    }

    #[test]
    fn test_application_error_code_and_data() {
        let fixture = Fixture::new();
        let response = fixture
            .single(json!({"jsonrpc": "2.0", "method": "fail", "id": 9}))
            .unwrap();
        assert_eq!(
            response,
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32050, "message": "Nope", "data": "details"},
                "id": 9
            })
        );
    }

    #[test]
    fn test_middleware_veto_is_isolated_per_batch_item() {
        let mut fixture = Fixture::new();
        fixture.middleware.register(|ctx: &MiddlewareContext<'_>| -> RpcResult<()> {
            match ctx.params().and_then(|params| params.get_index(0)) {
                Some(Value::String(value)) if value == "forbidden" => {
                    Err(RpcError::AccessDenied("forbidden value".into()))
                }
                _ => Ok(()),
            }
        });

        let response = fixture
            .batch(json!([
                {"jsonrpc": "2.0", "method": "echo", "params": ["a"], "id": 1},
                {"jsonrpc": "2.0", "method": "echo", "params": ["forbidden"], "id": 2},
                {"jsonrpc": "2.0", "method": "echo", "params": ["c"], "id": 3}
            ]))
            .unwrap();

        assert_eq!(response[0]["result"], "a");
        assert_eq!(response[1]["error"]["code"], -32002);
        assert_eq!(response[2]["result"], "c");
    }

    #[test]
    fn test_batch_mixed_results_in_order() {
        let fixture = Fixture::new();
        let response = fixture
            .batch(json!([
                {"jsonrpc": "2.0", "method": "echo", "params": ["a"], "id": 1},
                {"jsonrpc": "2.0", "method": "echo", "params": ["n"]},
                {"jsonrpc": "2.0", "method": "missing", "id": 2},
                "garbage"
            ]))
            .unwrap();

        let items = response.as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["result"], "a");
        assert_eq!(items[1]["error"]["code"], -32601);
        assert_eq!(items[1]["id"], 2);
        assert_eq!(items[2]["error"]["code"], -32600);
        assert!(items[2]["id"].is_null());
    }

    #[test]
    fn test_empty_batch_is_invalid_request() {
        let fixture = Fixture::new();
        let response = fixture.batch(json!([])).unwrap();
        assert!(response.is_object());
        assert_eq!(response["error"]["code"], -32600);
    }

    #[test]
    fn test_batch_of_notifications_is_nothing() {
        let fixture = Fixture::new();
        assert!(fixture
            .batch(json!([
                {"jsonrpc": "2.0", "method": "echo", "params": ["a"]},
                {"jsonrpc": "2.0", "method": "echo", "params": ["b"]}
            ]))
            .is_none());
    }

    #[test]
    fn test_local_error_escapes() {
        let mut fixture = Fixture::new();
        fixture.local_errors = LocalErrors::new().with::<DiskFull>();

        let err = RequestParser::new(fixture.ctx())
            .parse(json!({"jsonrpc": "2.0", "method": "explode", "id": 1}))
            .unwrap_err();
        assert_eq!(err.procedure(), Some("explode"));

        let err = BatchRequestParser::new(fixture.ctx())
            .parse(vec![
                json!({"jsonrpc": "2.0", "method": "echo", "params": ["a"], "id": 1}),
                json!({"jsonrpc": "2.0", "method": "explode", "id": 2}),
            ])
            .unwrap_err();
        assert!(matches!(err.error(), RpcError::Other(_)));
    }

    #[test]
    fn test_middleware_local_error_escapes() {
        let mut fixture = Fixture::new();
        fixture.local_errors = LocalErrors::new().with::<DiskFull>();
        fixture.middleware.register(|_: &MiddlewareContext<'_>| -> RpcResult<()> {
            Err(RpcError::other(DiskFull))
        });

        let err = RequestParser::new(fixture.ctx())
            .parse(json!({"jsonrpc": "2.0", "method": "echo", "params": ["a"], "id": 1}))
            .unwrap_err();
        assert_eq!(err.procedure(), Some("echo"));

        let err = BatchRequestParser::new(fixture.ctx())
            .parse(vec![
                json!({"jsonrpc": "2.0", "method": "echo", "params": ["a"], "id": 1}),
                json!({"jsonrpc": "2.0", "method": "echo", "params": ["b"], "id": 2}),
            ])
            .unwrap_err();
        assert!(matches!(err.error(), RpcError::Other(_)));
    }

    #[test]
    fn test_middleware_veto_on_notification_is_silent() {
        let mut fixture = Fixture::new();
        fixture.middleware.register(|_: &MiddlewareContext<'_>| -> RpcResult<()> {
            Err(RpcError::AccessDenied("denied".into()))
        });

        assert!(fixture
            .single(json!({"jsonrpc": "2.0", "method": "echo", "params": ["a"]}))
            .is_none());

        let entries = fixture.logger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].method.as_deref(), Some("echo"));
        assert!(entries[0].response.is_none());
    }

    #[test]
    fn test_unlisted_error_becomes_generic_response() {
        let fixture = Fixture::new();
        let response = fixture
            .single(json!({"jsonrpc": "2.0", "method": "explode", "id": 1}))
            .unwrap();
        assert_eq!(response["error"]["code"], -32603);
        assert_eq!(response["error"]["message"], "disk full");
    }

    #[test]
    fn test_every_request_is_logged_once() {
        let fixture = Fixture::new();
        fixture.batch(json!([
            {"jsonrpc": "2.0", "method": "echo", "params": ["a"], "id": 1, "trace": "t-1"},
            {"jsonrpc": "2.0", "method": "missing", "id": 2}
        ]));

        let entries = fixture.logger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].method.as_deref(), Some("echo"));
        assert_eq!(entries[0].params, Some(json!(["a"])));
        assert_eq!(entries[0].metadata.get("trace"), Some(&json!("t-1")));
        assert_eq!(entries[1].response.as_ref().unwrap()["error"]["code"], -32601);
    }
}
