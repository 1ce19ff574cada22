use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JsonRpcError;
use crate::types::{JsonRpcVersion, RequestId};

/// A successful JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub result: Value,
    pub id: RequestId,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            result,
            id,
        }
    }
}

/// Either a success or an error envelope; exactly one of `result` or `error` is
/// present on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Successful response with result field
    Response(JsonRpcResponse),
    /// Error response with error field
    Error(JsonRpcError),
}

impl JsonRpcMessage {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Response(JsonRpcResponse::success(id, result))
    }

    pub fn error(error: JsonRpcError) -> Self {
        Self::Error(error)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    /// Get the request ID from either response or error
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcMessage::Response(resp) => Some(&resp.id),
            JsonRpcMessage::Error(err) => err.id.as_ref(),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            JsonRpcMessage::Response(resp) => Some(&resp.result),
            JsonRpcMessage::Error(_) => None,
        }
    }

    pub fn error_code(&self) -> Option<i64> {
        match self {
            JsonRpcMessage::Response(_) => None,
            JsonRpcMessage::Error(err) => Some(err.error.code),
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for JsonRpcMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JsonRpcErrorObject;
    use serde_json::{from_str, json, to_value};

    #[test]
    fn test_response_serialization() {
        let response = JsonRpcResponse::success(RequestId::from("1"), json!("hi"));
        assert_eq!(
            to_value(&response).unwrap(),
            json!({"jsonrpc": "2.0", "result": "hi", "id": "1"})
        );
    }

    #[test]
    fn test_null_result_is_kept() {
        let response = JsonRpcResponse::success(RequestId::Number(3), Value::Null);
        let value = to_value(&response).unwrap();
        assert!(value.as_object().unwrap().contains_key("result"));
        assert!(value["result"].is_null());
    }

    #[test]
    fn test_message_deserializes_both_shapes() {
        let ok: JsonRpcMessage = from_str(r#"{"jsonrpc":"2.0","result":7,"id":1}"#).unwrap();
        assert!(!ok.is_error());
        assert_eq!(ok.result(), Some(&json!(7)));

        let err: JsonRpcMessage = from_str(
            r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":"x"}"#,
        )
        .unwrap();
        assert!(err.is_error());
        assert_eq!(err.error_code(), Some(-32601));
        assert_eq!(err.id(), Some(&RequestId::from("x")));
    }

    #[test]
    fn test_error_message_never_carries_result() {
        let message = JsonRpcMessage::error(JsonRpcError::new(
            None,
            JsonRpcErrorObject::internal_error(None),
        ));
        let value = to_value(&message).unwrap();
        assert!(!value.as_object().unwrap().contains_key("result"));
    }
}
