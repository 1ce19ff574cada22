use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::error_codes;
use crate::types::{JsonRpcVersion, RequestId};

/// Result alias used by procedures, middleware, builders and parsers.
pub type RpcResult<T> = Result<T, RpcError>;

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError(i64), // -32099 to -32000
    Application(i64),
}

impl JsonRpcErrorCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            error_codes::PARSE_ERROR => JsonRpcErrorCode::ParseError,
            error_codes::INVALID_REQUEST => JsonRpcErrorCode::InvalidRequest,
            error_codes::METHOD_NOT_FOUND => JsonRpcErrorCode::MethodNotFound,
            error_codes::INVALID_PARAMS => JsonRpcErrorCode::InvalidParams,
            error_codes::INTERNAL_ERROR => JsonRpcErrorCode::InternalError,
            error_codes::SERVER_ERROR_START..=error_codes::SERVER_ERROR_END => {
                JsonRpcErrorCode::ServerError(code)
            }
            other => JsonRpcErrorCode::Application(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::ServerError(code) => *code,
            JsonRpcErrorCode::Application(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::ServerError(_) => "Server error",
            JsonRpcErrorCode::Application(_) => "Application error",
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC Error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::ParseError, None, data)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, None, data)
    }

    pub fn method_not_found(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::MethodNotFound, None, data)
    }

    pub fn invalid_params(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidParams, None, data)
    }

    pub fn internal_error(message: Option<String>) -> Self {
        Self::new(JsonRpcErrorCode::InternalError, message, None)
    }

    pub fn kind(&self) -> JsonRpcErrorCode {
        JsonRpcErrorCode::from_code(self.code)
    }
}

/// JSON-RPC Error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub error: JsonRpcErrorObject,
    pub id: Option<RequestId>,
}

impl JsonRpcError {
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            error,
            id,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(None, JsonRpcErrorObject::parse_error(None))
    }

    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::new(id, JsonRpcErrorObject::invalid_request(None))
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}

/// Every failure the engine can surface, on either side of the wire.
///
/// The first five variants correspond one-to-one with error codes; the rest are
/// gate, transport and application failures that have no reserved code.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    #[error("Procedure not found: {0}")]
    ProcedureNotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Application error carrying its own code, message and optional data.
    #[error("{message}")]
    Response {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("Connection failure: {0}")]
    ConnectionFailure(String),

    #[error("Server error: {0}")]
    ServerFailure(String),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl RpcError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn procedure_not_found(message: impl Into<String>) -> Self {
        Self::ProcedureNotFound(message.into())
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    pub fn response(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self::Response {
            code,
            message: message.into(),
            data,
        }
    }

    /// Wrap an arbitrary application error.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(error))
    }

    /// The error code this kind is tied to, if it has one.
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Parse(_) => Some(error_codes::PARSE_ERROR),
            RpcError::InvalidRequest(_) => Some(error_codes::INVALID_REQUEST),
            RpcError::ProcedureNotFound(_) => Some(error_codes::METHOD_NOT_FOUND),
            RpcError::InvalidArguments(_) => Some(error_codes::INVALID_PARAMS),
            RpcError::Response { code, .. } => Some(*code),
            RpcError::AuthenticationFailure(_) => Some(error_codes::UNAUTHENTICATED),
            RpcError::AccessDenied(_) => Some(error_codes::UNAUTHORIZED),
            _ => None,
        }
    }

    /// Auxiliary data attached to an application error.
    pub fn data(&self) -> Option<&Value> {
        match self {
            RpcError::Response { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    /// Map an error object received from a server onto the taxonomy.
    ///
    /// The mapping depends on `code` only; the message is carried along verbatim.
    pub fn from_error_object(error: JsonRpcErrorObject) -> Self {
        match error.kind() {
            JsonRpcErrorCode::ParseError => RpcError::Parse(error.message),
            JsonRpcErrorCode::InvalidRequest => RpcError::InvalidRequest(error.message),
            JsonRpcErrorCode::MethodNotFound => RpcError::ProcedureNotFound(error.message),
            JsonRpcErrorCode::InvalidParams => RpcError::InvalidArguments(error.message),
            _ => RpcError::Response {
                code: error.code,
                message: error.message,
                data: error.data,
            },
        }
    }

    /// Render this error as a wire error object.
    ///
    /// Errors without a code of their own get `default_code`.
    pub fn to_error_object(&self, default_code: i64) -> JsonRpcErrorObject {
        let detail = |message: &String| {
            if message.is_empty() {
                None
            } else {
                Some(Value::String(message.clone()))
            }
        };

        match self {
            RpcError::Parse(message) => JsonRpcErrorObject::parse_error(detail(message)),
            RpcError::InvalidRequest(message) => {
                JsonRpcErrorObject::invalid_request(detail(message))
            }
            RpcError::ProcedureNotFound(message) => {
                JsonRpcErrorObject::method_not_found(detail(message))
            }
            RpcError::InvalidArguments(message) => {
                JsonRpcErrorObject::invalid_params(detail(message))
            }
            RpcError::Response {
                code,
                message,
                data,
            } => JsonRpcErrorObject {
                code: *code,
                message: message.clone(),
                data: data.clone(),
            },
            RpcError::AuthenticationFailure(message) => JsonRpcErrorObject {
                code: error_codes::UNAUTHENTICATED,
                message: message.clone(),
                data: None,
            },
            RpcError::AccessDenied(message) => JsonRpcErrorObject {
                code: error_codes::UNAUTHORIZED,
                message: message.clone(),
                data: None,
            },
            other => JsonRpcErrorObject {
                code: default_code,
                message: other.to_string(),
                data: None,
            },
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(error: serde_json::Error) -> Self {
        RpcError::InvalidArguments(error.to_string())
    }
}
