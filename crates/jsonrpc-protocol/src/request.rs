use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

use crate::error::RpcResult;
use crate::types::{JsonRpcVersion, RequestId};

/// Top-level keys owned by the protocol; request attributes never overwrite them.
pub const RESERVED_KEYS: [&str; 4] = ["jsonrpc", "method", "params", "id"];

static NEXT_REQUEST_ID: AtomicI64 = AtomicI64::new(1);

/// Allocate a process-unique request id.
pub fn next_request_id() -> RequestId {
    RequestId::Number(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
}

/// Parameters for a JSON-RPC request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Positional parameters as an array
    Array(Vec<Value>),
    /// Named parameters as an object
    Object(Map<String, Value>),
}

impl RequestParams {
    /// Build parameters from call-site arguments.
    ///
    /// With `named_arguments` set, a single object argument is taken as the named
    /// parameter map. Every other shape is sent positionally.
    pub fn from_arguments(mut args: Vec<Value>, named_arguments: bool) -> Self {
        if named_arguments && args.len() == 1 && args[0].is_object() {
            if let Some(Value::Object(map)) = args.pop() {
                return RequestParams::Object(map);
            }
        }
        RequestParams::Array(args)
    }

    /// Get a parameter by name (for object params)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            RequestParams::Object(map) => map.get(key),
            RequestParams::Array(_) => None,
        }
    }

    /// Get a parameter by index (for array params only)
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            RequestParams::Array(vec) => vec.get(index),
            RequestParams::Object(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RequestParams::Object(map) => map.len(),
            RequestParams::Array(vec) => vec.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_named(&self) -> bool {
        matches!(self, RequestParams::Object(_))
    }

    pub fn to_value(&self) -> Value {
        match self {
            RequestParams::Object(map) => Value::Object(map.clone()),
            RequestParams::Array(arr) => Value::Array(arr.clone()),
        }
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        RequestParams::Object(map)
    }
}

impl From<Vec<Value>> for RequestParams {
    fn from(vec: Vec<Value>) -> Self {
        RequestParams::Array(vec)
    }
}

/// A JSON-RPC request. `id == None` makes it a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<RequestParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    /// Extra top-level fields carried alongside the protocol ones.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl JsonRpcRequest {
    pub fn new(id: Option<RequestId>, method: String, params: Option<RequestParams>) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            method,
            params,
            id,
            attributes: Map::new(),
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Get a parameter by name (if params are an object)
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.as_ref()?.get(name)
    }

    /// Get a parameter by index (if params are an array)
    pub fn get_param_index(&self, index: usize) -> Option<&Value> {
        self.params.as_ref()?.get_index(index)
    }
}

/// Assembles one outgoing request envelope. Pure construction, no I/O.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    procedure: String,
    params: Option<RequestParams>,
    attributes: Map<String, Value>,
    id: Option<RequestId>,
    notification: bool,
}

impl RequestBuilder {
    pub fn new(procedure: impl Into<String>) -> Self {
        Self {
            procedure: procedure.into(),
            ..Self::default()
        }
    }

    pub fn with_params(mut self, params: impl Into<RequestParams>) -> Self {
        self.params = Some(params.into());
        self
    }

    /// Merge extra top-level fields into the envelope. Reserved keys are dropped.
    pub fn with_request_attributes(mut self, attributes: Map<String, Value>) -> Self {
        for (key, value) in attributes {
            if RESERVED_KEYS.contains(&key.as_str()) {
                debug!("Ignoring reserved request attribute '{}'", key);
                continue;
            }
            self.attributes.insert(key, value);
        }
        self
    }

    pub fn with_id(mut self, id: impl Into<RequestId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_optional_id(mut self, id: Option<RequestId>) -> Self {
        self.id = id;
        self
    }

    /// Send without an id; no response will come back.
    pub fn notification(mut self) -> Self {
        self.notification = true;
        self
    }

    pub fn build_request(self) -> JsonRpcRequest {
        let id = if self.notification {
            None
        } else {
            Some(self.id.unwrap_or_else(next_request_id))
        };
        // Empty parameter lists are left out of the envelope entirely.
        let params = self.params.filter(|params| !params.is_empty());

        JsonRpcRequest {
            version: JsonRpcVersion::V2_0,
            method: self.procedure,
            params,
            id,
            attributes: self.attributes,
        }
    }

    pub fn build(self) -> RpcResult<String> {
        Ok(serde_json::to_string(&self.build_request())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_value};

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest::new(Some(RequestId::Number(1)), "test_method".into(), None);

        let json = serde_json::to_string(&request).unwrap();
        let parsed: JsonRpcRequest = from_str(&json).unwrap();

        assert_eq!(parsed.id, Some(RequestId::Number(1)));
        assert_eq!(parsed.method, "test_method");
        assert!(parsed.params.is_none());
        assert!(parsed.attributes.is_empty());
    }

    #[test]
    fn test_null_id_is_notification() {
        let parsed: JsonRpcRequest =
            from_str(r#"{"jsonrpc": "2.0", "method": "ping", "id": null}"#).unwrap();
        assert!(parsed.is_notification());
    }

    #[test]
    fn test_named_params_round_trip() {
        let payload = RequestBuilder::new("sum")
            .with_params(json!({"a": 1, "b": 2}).as_object().unwrap().clone())
            .with_id("1")
            .build()
            .unwrap();

        let value: Value = from_str(&payload).unwrap();
        assert_eq!(
            value,
            json!({"jsonrpc": "2.0", "method": "sum", "params": {"a": 1, "b": 2}, "id": "1"})
        );
    }

    #[test]
    fn test_builder_generates_distinct_ids() {
        let first = RequestBuilder::new("a").build_request();
        let second = RequestBuilder::new("a").build_request();
        assert!(first.id.is_some());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_notification_omits_id() {
        let request = RequestBuilder::new("ping")
            .with_id(5)
            .notification()
            .build_request();
        let value = to_value(&request).unwrap();
        assert!(!value.as_object().unwrap().contains_key("id"));
    }

    #[test]
    fn test_request_attributes_do_not_override_reserved_keys() {
        let attributes = json!({"method": "evil", "id": 99, "trace": "abc"})
            .as_object()
            .unwrap()
            .clone();

        let value = to_value(
            RequestBuilder::new("echo")
                .with_id(1)
                .with_request_attributes(attributes)
                .build_request(),
        )
        .unwrap();

        assert_eq!(value["method"], "echo");
        assert_eq!(value["id"], 1);
        assert_eq!(value["trace"], "abc");
    }

    #[test]
    fn test_empty_params_are_omitted() {
        let request = RequestBuilder::new("noop")
            .with_params(Vec::<Value>::new())
            .build_request();
        assert!(request.params.is_none());
    }

    #[test]
    fn test_params_from_arguments() {
        let named = RequestParams::from_arguments(vec![json!({"a": 1})], true);
        assert!(named.is_named());

        let positional = RequestParams::from_arguments(vec![json!({"a": 1})], false);
        assert_eq!(positional, RequestParams::Array(vec![json!({"a": 1})]));

        let several = RequestParams::from_arguments(vec![json!(1), json!(2)], true);
        assert_eq!(several.get_index(1), Some(&json!(2)));
    }
}
