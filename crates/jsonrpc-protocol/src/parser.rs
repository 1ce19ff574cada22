//! Client-side interpretation of response payloads.

use serde_json::Value;
use tracing::debug;

use crate::error::{JsonRpcErrorObject, RpcError, RpcResult};
use crate::validator;

/// What a response payload resolved to.
#[derive(Debug)]
pub enum ResponseOutcome {
    /// The `result` member, or null when absent.
    Result(Value),
    /// A mapped error, only produced when errors are returned rather than raised.
    Error(RpcError),
    /// One outcome per element of a batch response, in order.
    Batch(Vec<ResponseOutcome>),
}

impl ResponseOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, ResponseOutcome::Error(_))
    }

    /// Collapse a single outcome into a `Result`. A batch is returned as an array of
    /// results and fails on its first error.
    pub fn into_result(self) -> RpcResult<Value> {
        match self {
            ResponseOutcome::Result(value) => Ok(value),
            ResponseOutcome::Error(error) => Err(error),
            ResponseOutcome::Batch(items) => items
                .into_iter()
                .map(ResponseOutcome::into_result)
                .collect::<RpcResult<Vec<_>>>()
                .map(Value::Array),
        }
    }

    pub fn into_batch(self) -> Vec<ResponseOutcome> {
        match self {
            ResponseOutcome::Batch(items) => items,
            single => vec![single],
        }
    }
}

/// Turns response payloads into values or typed errors.
///
/// With `return_errors` unset, the first error found is raised as `Err`, which
/// for a batch response aborts the whole parse. With it set, errors are handed
/// back as [`ResponseOutcome::Error`] and every batch element is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser {
    return_errors: bool,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_return_errors(mut self, return_errors: bool) -> Self {
        self.return_errors = return_errors;
        self
    }

    pub fn returns_errors(&self) -> bool {
        self.return_errors
    }

    /// Decode raw bytes, then parse.
    pub fn parse_bytes(&self, raw: &[u8]) -> RpcResult<ResponseOutcome> {
        let payload = validator::decode(raw)?;
        self.parse(payload)
    }

    pub fn parse(&self, payload: Value) -> RpcResult<ResponseOutcome> {
        validator::validate_json_format(&payload)?;

        match payload {
            Value::Array(items) => {
                debug!("Parsing batch response with {} elements", items.len());
                let outcomes = items
                    .into_iter()
                    .map(|item| self.parse(item))
                    .collect::<RpcResult<Vec<_>>>()?;
                Ok(ResponseOutcome::Batch(outcomes))
            }
            Value::Object(mut obj) => {
                let has_code = obj
                    .get("error")
                    .and_then(|error| error.get("code"))
                    .is_some_and(|code| !code.is_null());

                if has_code {
                    let error = obj.remove("error").unwrap_or(Value::Null);
                    let error = Self::map_error(error)?;
                    if self.return_errors {
                        return Ok(ResponseOutcome::Error(error));
                    }
                    return Err(error);
                }

                Ok(ResponseOutcome::Result(
                    obj.remove("result").unwrap_or(Value::Null),
                ))
            }
            _ => Err(RpcError::parse("Malformed payload")),
        }
    }

    /// The kind is chosen by `code` alone; `message` and `data` are optional.
    fn map_error(mut error: Value) -> RpcResult<RpcError> {
        let code = error
            .get("code")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                RpcError::invalid_request("Malformed error object: code is not an integer")
            })?;
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let data = error
            .get_mut("data")
            .map(Value::take)
            .filter(|data| !data.is_null());

        Ok(RpcError::from_error_object(JsonRpcErrorObject {
            code,
            message,
            data,
        }))
    }
}
