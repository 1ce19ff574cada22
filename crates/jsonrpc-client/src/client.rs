//! JSON-RPC client

use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

use jsonrpc_protocol::{
    JsonRpcRequest, RequestBuilder, RequestId, RequestParams, ResponseOutcome, ResponseParser,
    RpcResult,
};

use crate::config::ClientConfig;
use crate::transport::Transport;

/// Sends requests through a [`Transport`] and interprets the replies.
///
/// ```no_run
/// # async fn demo() -> jsonrpc_protocol::RpcResult<()> {
/// use jsonrpc_client::{Client, HttpTransport};
/// use serde_json::json;
///
/// let client = Client::new(HttpTransport::new("http://127.0.0.1:8000/jsonrpc")?);
/// let sum = client.call("sum", vec![json!({"a": 1, "b": 2})]).await?.into_result()?;
/// assert_eq!(sum, json!(3));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client<T> {
    transport: T,
    config: ClientConfig,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: T, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    /// Always send `call` arguments positionally.
    pub fn with_positional_arguments(mut self) -> Self {
        self.config.named_arguments = false;
        self
    }

    /// Return error responses as [`ResponseOutcome::Error`] instead of `Err`.
    pub fn with_return_errors(mut self, return_errors: bool) -> Self {
        self.config.return_errors = return_errors;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn parser(&self) -> ResponseParser {
        ResponseParser::new().with_return_errors(self.config.return_errors)
    }

    fn params_from(&self, args: Vec<Value>) -> RequestParams {
        RequestParams::from_arguments(args, self.config.named_arguments)
    }

    /// Call `procedure`. A single mapping argument is sent as named parameters
    /// unless positional arguments were requested.
    pub async fn call(&self, procedure: &str, args: Vec<Value>) -> RpcResult<ResponseOutcome> {
        let request = RequestBuilder::new(procedure).with_params(self.params_from(args));
        self.execute_with(request, &HashMap::new()).await
    }

    /// Explicit form of [`call`](Self::call).
    pub async fn execute(
        &self,
        procedure: &str,
        params: Option<RequestParams>,
        request_attributes: Map<String, Value>,
        id: Option<RequestId>,
        headers: &HashMap<String, String>,
    ) -> RpcResult<ResponseOutcome> {
        let mut request = RequestBuilder::new(procedure)
            .with_request_attributes(request_attributes)
            .with_optional_id(id);
        if let Some(params) = params {
            request = request.with_params(params);
        }
        self.execute_with(request, headers).await
    }

    /// Send a prepared request.
    pub async fn execute_with(
        &self,
        request: RequestBuilder,
        headers: &HashMap<String, String>,
    ) -> RpcResult<ResponseOutcome> {
        let request = request.build_request();
        let notification = request.is_notification();
        debug!(method = %request.method, id = ?request.id, "Sending request");

        let payload = serde_json::to_string(&request)?;
        let reply = self.transport.send(payload, headers).await?;

        if notification && reply.trim().is_empty() {
            return Ok(ResponseOutcome::Result(Value::Null));
        }
        self.parser().parse_bytes(reply.as_bytes())
    }

    /// Send a notification. Whatever the server replies is ignored.
    pub async fn notify(&self, procedure: &str, args: Vec<Value>) -> RpcResult<()> {
        let request = RequestBuilder::new(procedure)
            .with_params(self.params_from(args))
            .notification()
            .build_request();
        let payload = serde_json::to_string(&request)?;
        self.transport.send(payload, &HashMap::new()).await?;
        Ok(())
    }

    /// Start collecting calls to send as one batch.
    pub fn batch(&self) -> Batch<'_, T> {
        Batch {
            client: self,
            requests: Vec::new(),
            headers: HashMap::new(),
        }
    }
}

/// Calls collected for a single batch request.
pub struct Batch<'a, T> {
    client: &'a Client<T>,
    requests: Vec<JsonRpcRequest>,
    headers: HashMap<String, String>,
}

impl<'a, T: Transport> Batch<'a, T> {
    pub fn call(mut self, procedure: &str, args: Vec<Value>) -> Self {
        let params = self.client.params_from(args);
        self.requests
            .push(RequestBuilder::new(procedure).with_params(params).build_request());
        self
    }

    pub fn notify(mut self, procedure: &str, args: Vec<Value>) -> Self {
        let params = self.client.params_from(args);
        self.requests.push(
            RequestBuilder::new(procedure)
                .with_params(params)
                .notification()
                .build_request(),
        );
        self
    }

    /// Add a prepared request.
    pub fn add(mut self, request: RequestBuilder) -> Self {
        self.requests.push(request.build_request());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Send everything as one JSON array.
    ///
    /// In raise mode the first error response fails the whole batch.
    pub async fn send(self) -> RpcResult<ResponseOutcome> {
        debug!("Sending batch of {} requests", self.requests.len());
        let payload = serde_json::to_string(&self.requests)?;
        let reply = self.client.transport.send(payload, &self.headers).await?;

        if reply.trim().is_empty() && self.requests.iter().all(JsonRpcRequest::is_notification)
        {
            return Ok(ResponseOutcome::Batch(Vec::new()));
        }
        self.client.parser().parse_bytes(reply.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jsonrpc_protocol::RpcError;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Replies with canned payloads and records what was sent.
    #[derive(Default)]
    struct MockTransport {
        replies: Mutex<Vec<String>>,
        sent: Mutex<Vec<(Value, HashMap<String, String>)>>,
    }

    impl MockTransport {
        fn replying(reply: Value) -> Self {
            let transport = Self::default();
            transport.replies.lock().push(reply.to_string());
            transport
        }

        fn silent() -> Self {
            let transport = Self::default();
            transport.replies.lock().push(String::new());
            transport
        }

        fn last_sent(&self) -> Value {
            self.sent.lock().last().unwrap().0.clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(
            &self,
            payload: String,
            headers: &HashMap<String, String>,
        ) -> RpcResult<String> {
            self.sent
                .lock()
                .push((serde_json::from_str(&payload).unwrap(), headers.clone()));
            Ok(self.replies.lock().pop().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_named_arguments_inferred_from_single_mapping() {
        let client = Client::new(MockTransport::replying(
            json!({"jsonrpc": "2.0", "result": 3, "id": 1}),
        ));

        let result = client
            .call("sum", vec![json!({"a": 1, "b": 2})])
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(result, json!(3));

        let sent = client.transport().last_sent();
        assert_eq!(sent["method"], "sum");
        assert_eq!(sent["params"], json!({"a": 1, "b": 2}));
        assert!(sent["id"].is_number());
    }

    #[tokio::test]
    async fn test_positional_mode() {
        let client = Client::new(MockTransport::replying(
            json!({"jsonrpc": "2.0", "result": null, "id": 1}),
        ))
        .with_positional_arguments();

        client.call("store", vec![json!({"k": "v"})]).await.unwrap();
        assert_eq!(client.transport().last_sent()["params"], json!([{"k": "v"}]));
    }

    #[tokio::test]
    async fn test_execute_with_attributes_id_and_headers() {
        let client = Client::new(MockTransport::replying(
            json!({"jsonrpc": "2.0", "result": "ok", "id": "abc"}),
        ));

        let attributes = json!({"trace": "t-1", "method": "ignored"})
            .as_object()
            .unwrap()
            .clone();
        let headers = HashMap::from([("X-Tenant".to_string(), "acme".to_string())]);

        client
            .execute(
                "status",
                None,
                attributes,
                Some(RequestId::from("abc")),
                &headers,
            )
            .await
            .unwrap();

        let (sent, sent_headers) = client.transport().sent.lock().last().unwrap().clone();
        assert_eq!(sent["method"], "status");
        assert_eq!(sent["id"], "abc");
        assert_eq!(sent["trace"], "t-1");
        assert!(sent.get("params").is_none());
        assert_eq!(sent_headers["X-Tenant"], "acme");
    }

    #[tokio::test]
    async fn test_error_raised_or_returned() {
        let reply = json!({
            "jsonrpc": "2.0",
            "error": {"code": -32601, "message": "Method not found"},
            "id": 1
        });

        let raising = Client::new(MockTransport::replying(reply.clone()));
        let err = raising.call("missing", vec![]).await.unwrap_err();
        assert!(matches!(err, RpcError::ProcedureNotFound(_)));

        let returning = Client::new(MockTransport::replying(reply)).with_return_errors(true);
        let outcome = returning.call("missing", vec![]).await.unwrap();
        assert!(outcome.is_error());
    }

    #[tokio::test]
    async fn test_notify_sends_no_id() {
        let client = Client::new(MockTransport::silent());
        client.notify("log", vec![json!("hello")]).await.unwrap();

        let sent = client.transport().last_sent();
        assert!(sent.get("id").is_none());
        assert_eq!(sent["params"], json!(["hello"]));
    }

    #[tokio::test]
    async fn test_batch_round_trip() {
        let client = Client::new(MockTransport::replying(json!([
            {"jsonrpc": "2.0", "result": 7, "id": 1},
            {"jsonrpc": "2.0", "result": 19, "id": 2}
        ])));

        let batch = client
            .batch()
            .call("add", vec![json!(3), json!(4)])
            .call("add", vec![json!(9), json!(10)])
            .notify("log", vec![json!("x")]);
        assert_eq!(batch.len(), 3);

        let results = batch.send().await.unwrap().into_result().unwrap();
        assert_eq!(results, json!([7, 19]));

        let sent = client.transport().last_sent();
        assert_eq!(sent.as_array().unwrap().len(), 3);
        assert!(sent[2].get("id").is_none());
    }

    #[tokio::test]
    async fn test_batch_of_notifications_accepts_empty_reply() {
        let client = Client::new(MockTransport::silent());
        let outcome = client
            .batch()
            .notify("a", vec![])
            .notify("b", vec![])
            .send()
            .await
            .unwrap();
        assert!(outcome.into_batch().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        struct Down;

        #[async_trait]
        impl Transport for Down {
            async fn send(&self, _: String, _: &HashMap<String, String>) -> RpcResult<String> {
                Err(RpcError::ConnectionFailure("refused".into()))
            }
        }

        let client = Client::new(Down);
        let err = client.call("x", vec![]).await.unwrap_err();
        assert!(matches!(err, RpcError::ConnectionFailure(_)));
    }
}
