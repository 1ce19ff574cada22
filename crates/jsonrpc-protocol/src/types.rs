use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{RpcError, RpcResult};

/// Identifier of a JSON-RPC call.
/// Can be a string or an integer. A missing or null id marks a notification,
/// which is modelled as `Option<RequestId>::None` rather than a variant here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl RequestId {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RequestId::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RequestId::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Read an id out of a raw envelope field.
    ///
    /// `Ok(None)` for null; anything that is not a string or an integer is rejected.
    pub fn from_value(value: &Value) -> RpcResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(RequestId::String(s.clone()))),
            Value::Number(n) => n
                .as_i64()
                .map(|n| Some(RequestId::Number(n)))
                .ok_or_else(|| RpcError::invalid_request("id must be an integer or a string")),
            _ => Err(RpcError::invalid_request(
                "id must be an integer or a string",
            )),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RequestId::String(s) => Value::String(s.clone()),
            RequestId::Number(n) => Value::from(*n),
        }
    }
}

/// JSON-RPC version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonRpcVersion {
    #[default]
    V2_0,
}

impl JsonRpcVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonRpcVersion::V2_0 => crate::JSONRPC_VERSION,
        }
    }
}

impl fmt::Display for JsonRpcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            crate::JSONRPC_VERSION => Ok(JsonRpcVersion::V2_0),
            _ => Err(serde::de::Error::custom(format!(
                "Invalid JSON-RPC version: {}",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_serialization() {
        let id_str = RequestId::String("test".to_string());
        let id_num = RequestId::Number(42);

        assert_eq!(serde_json::to_string(&id_str).unwrap(), r#""test""#);
        assert_eq!(serde_json::to_string(&id_num).unwrap(), "42");
    }

    #[test]
    fn test_request_id_from_value() {
        assert_eq!(RequestId::from_value(&json!(null)).unwrap(), None);
        assert_eq!(
            RequestId::from_value(&json!("1")).unwrap(),
            Some(RequestId::String("1".into()))
        );
        assert_eq!(
            RequestId::from_value(&json!(7)).unwrap(),
            Some(RequestId::Number(7))
        );
        assert!(RequestId::from_value(&json!(1.5)).is_err());
        assert!(RequestId::from_value(&json!([1])).is_err());
    }

    #[test]
    fn test_json_rpc_version() {
        let version = JsonRpcVersion::V2_0;
        assert_eq!(version.as_str(), "2.0");
        assert_eq!(serde_json::to_string(&version).unwrap(), r#""2.0""#);
        assert!(serde_json::from_str::<JsonRpcVersion>(r#""1.0""#).is_err());
    }
}
