//! Procedure model: formal parameters, argument binding and callable targets.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use jsonrpc_protocol::{RequestParams, RpcError, RpcResult};

/// One formal parameter of a procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    /// Value used when the caller omits the parameter. `None` marks it required.
    pub default: Option<Value>,
}

impl Param {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
        }
    }

    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

/// Ordered formal parameters of a procedure, used to bind incoming params.
///
/// ```
/// use jsonrpc_server::Signature;
/// use serde_json::json;
///
/// let signature = Signature::new()
///     .required("a")
///     .optional("b", json!(0));
/// assert_eq!(signature.required_count(), 1);
/// assert_eq!(signature.max_count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signature made only of required parameters.
    pub fn of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            params: names.into_iter().map(Param::required).collect(),
        }
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param::required(name));
        self
    }

    pub fn optional(mut self, name: impl Into<String>, default: Value) -> Self {
        self.params.push(Param::optional(name, default));
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Shortest positional argument list that can be bound: everything up to
    /// and including the last required parameter.
    pub fn required_count(&self) -> usize {
        self.params
            .iter()
            .rposition(|param| !param.is_optional())
            .map_or(0, |index| index + 1)
    }

    pub fn max_count(&self) -> usize {
        self.params.len()
    }

    /// Bind request params to this signature.
    pub fn bind(&self, params: Option<&RequestParams>) -> RpcResult<Arguments> {
        match params {
            None => self.bind_positional(&[]),
            Some(RequestParams::Array(values)) => self.bind_positional(values),
            Some(RequestParams::Object(map)) => self.bind_named(map),
        }
    }

    fn bind_positional(&self, values: &[Value]) -> RpcResult<Arguments> {
        if values.len() < self.required_count() {
            return Err(RpcError::invalid_arguments("Wrong number of arguments"));
        }
        if values.len() > self.max_count() {
            return Err(RpcError::invalid_arguments("Too many arguments"));
        }

        let mut bound = values.to_vec();
        for param in &self.params[values.len()..] {
            bound.push(param.default.clone().unwrap_or(Value::Null));
        }

        Ok(Arguments::new(self.names(), bound))
    }

    fn bind_named(&self, map: &Map<String, Value>) -> RpcResult<Arguments> {
        if let Some(unknown) = map
            .keys()
            .find(|key| !self.params.iter().any(|param| &param.name == *key))
        {
            return Err(RpcError::invalid_arguments(format!(
                "Unknown argument: {}",
                unknown
            )));
        }

        let values = self
            .params
            .iter()
            .map(|param| match (map.get(&param.name), &param.default) {
                (Some(value), _) => Ok(value.clone()),
                (None, Some(default)) => Ok(default.clone()),
                (None, None) => Err(RpcError::invalid_arguments(format!(
                    "Missing argument: {}",
                    param.name
                ))),
            })
            .collect::<RpcResult<Vec<_>>>()?;

        Ok(Arguments::new(self.names(), values))
    }

    fn names(&self) -> Vec<String> {
        self.params.iter().map(|param| param.name.clone()).collect()
    }
}

/// Arguments after binding, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    names: Vec<String>,
    values: Vec<Value>,
}

impl Arguments {
    pub fn new(names: Vec<String>, values: Vec<Value>) -> Self {
        Self { names, values }
    }

    /// Deserialize the argument called `name`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> RpcResult<T> {
        let value = self
            .value(name)
            .ok_or_else(|| RpcError::invalid_arguments(format!("Missing argument: {}", name)))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Deserialize the argument at `index`.
    pub fn at<T: DeserializeOwned>(&self, index: usize) -> RpcResult<T> {
        let value = self.values.get(index).ok_or_else(|| {
            RpcError::invalid_arguments(format!("Missing argument at position {}", index))
        })?;
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .and_then(|index| self.values.get(index))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// An object exposing several procedures as named methods.
///
/// Used by bound-method, class-method and attached-instance registrations.
pub trait Service: Send + Sync {
    /// Formal parameters of `method`, or `None` if the service has no such method.
    fn signature(&self, method: &str) -> Option<Signature>;

    fn call(&self, method: &str, args: Arguments) -> RpcResult<Value>;

    /// Runs right before any method of this service; an error aborts the call.
    fn before(&self, _procedure: &str) -> RpcResult<()> {
        Ok(())
    }
}

/// A bare callable procedure.
pub type ProcedureFn = Arc<dyn Fn(Arguments) -> RpcResult<Value> + Send + Sync>;

/// Creates a fresh service instance for each call of a class-method binding.
pub type ServiceFactory = Arc<dyn Fn() -> Arc<dyn Service> + Send + Sync>;

/// What a procedure name resolves to.
#[derive(Clone)]
pub enum ProcedureTarget {
    Function {
        signature: Signature,
        func: ProcedureFn,
    },
    BoundMethod {
        instance: Arc<dyn Service>,
        method: String,
    },
    ClassMethod {
        class: String,
        method: String,
    },
}

impl ProcedureTarget {
    pub fn function<F>(signature: Signature, func: F) -> Self
    where
        F: Fn(Arguments) -> RpcResult<Value> + Send + Sync + 'static,
    {
        ProcedureTarget::Function {
            signature,
            func: Arc::new(func),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProcedureTarget::Function { .. } => "function",
            ProcedureTarget::BoundMethod { .. } => "bound method",
            ProcedureTarget::ClassMethod { .. } => "class method",
        }
    }
}

impl fmt::Debug for ProcedureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcedureTarget::Function { signature, .. } => f
                .debug_struct("Function")
                .field("signature", signature)
                .finish_non_exhaustive(),
            ProcedureTarget::BoundMethod { method, .. } => f
                .debug_struct("BoundMethod")
                .field("method", method)
                .finish_non_exhaustive(),
            ProcedureTarget::ClassMethod { class, method } => f
                .debug_struct("ClassMethod")
                .field("class", class)
                .field("method", method)
                .finish(),
        }
    }
}

/// Run `method` on a service: hook, binding, then the call itself.
pub(crate) fn call_service(
    service: &dyn Service,
    procedure: &str,
    method: &str,
    params: Option<&RequestParams>,
) -> RpcResult<Value> {
    let signature = service
        .signature(method)
        .ok_or_else(|| RpcError::procedure_not_found("Unable to find the procedure"))?;
    service.before(procedure)?;
    let args = signature.bind(params)?;
    service.call(method, args)
}
