use http::header::{CONTENT_TYPE, HeaderValue, WWW_AUTHENTICATE};
use http::{HeaderMap, StatusCode};
use serde_json::Value;

use jsonrpc_protocol::{JsonRpcError, JsonRpcMessage, RequestId, RpcError, error_codes};

/// Challenge sent when credentials are rejected.
pub const AUTH_CHALLENGE: &str = "Basic realm=\"JsonRPC\"";

/// Renders success and error envelopes and the HTTP status that goes with them.
#[derive(Debug, Clone, Copy)]
pub struct ResponseBuilder {
    default_error_code: i64,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self {
            default_error_code: error_codes::INTERNAL_ERROR,
        }
    }
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Code given to errors that carry none of their own.
    pub fn with_default_error_code(mut self, code: i64) -> Self {
        self.default_error_code = code;
        self
    }

    pub fn default_error_code(&self) -> i64 {
        self.default_error_code
    }

    pub fn success(&self, id: RequestId, result: Value) -> JsonRpcMessage {
        JsonRpcMessage::success(id, result)
    }

    pub fn error(&self, id: Option<RequestId>, error: &RpcError) -> JsonRpcMessage {
        JsonRpcMessage::error(JsonRpcError::new(
            id,
            error.to_error_object(self.default_error_code),
        ))
    }

    /// HTTP status for a reply whose processing ended in `error`.
    pub fn status(&self, error: Option<&RpcError>) -> StatusCode {
        match error {
            Some(RpcError::AuthenticationFailure(_)) => StatusCode::UNAUTHORIZED,
            Some(RpcError::AccessDenied(_)) => StatusCode::FORBIDDEN,
            _ => StatusCode::OK,
        }
    }

    pub fn headers(&self, status: StatusCode) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if status == StatusCode::UNAUTHORIZED {
            headers.insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static(AUTH_CHALLENGE),
            );
        }
        headers
    }
}
