//! Structural checks shared by the client and server paths.
//!
//! Decoding failures and non-container payloads are [`RpcError::Parse`]; a decoded
//! envelope with the wrong shape is [`RpcError::InvalidRequest`].

use serde_json::Value;

use crate::JSONRPC_VERSION;
use crate::error::{RpcError, RpcResult};
use crate::types::RequestId;

/// Decode raw bytes and check the result is an object or an array.
pub fn decode(raw: &[u8]) -> RpcResult<Value> {
    let payload: Value =
        serde_json::from_slice(raw).map_err(|e| RpcError::parse(e.to_string()))?;
    validate_json_format(&payload)?;
    Ok(payload)
}

/// A payload is usable only as a JSON object (single call) or array (batch).
pub fn validate_json_format(payload: &Value) -> RpcResult<()> {
    if payload.is_object() || payload.is_array() {
        Ok(())
    } else {
        Err(RpcError::parse("Malformed payload"))
    }
}

/// Check one request envelope.
pub fn validate_request(payload: &Value) -> RpcResult<()> {
    let obj = payload
        .as_object()
        .ok_or_else(|| RpcError::invalid_request("request must be a JSON object"))?;

    match obj.get("jsonrpc") {
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        _ => return Err(RpcError::invalid_request("jsonrpc must be \"2.0\"")),
    }

    match obj.get("method") {
        Some(Value::String(method)) if !method.is_empty() => {}
        _ => {
            return Err(RpcError::invalid_request(
                "method must be a non-empty string",
            ));
        }
    }

    match obj.get("params") {
        None | Some(Value::Null) | Some(Value::Array(_)) | Some(Value::Object(_)) => {}
        Some(_) => {
            return Err(RpcError::invalid_request(
                "params must be an array or an object",
            ));
        }
    }

    if let Some(id) = obj.get("id") {
        RequestId::from_value(id)?;
    }

    Ok(())
}
