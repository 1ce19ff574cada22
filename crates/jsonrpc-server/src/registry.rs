//! Procedure registry and dispatcher.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use jsonrpc_protocol::{RequestParams, RpcError, RpcResult};

use crate::procedure::{
    Arguments, ProcedureTarget, Service, ServiceFactory, Signature, call_service,
};

/// Maps procedure names to targets.
///
/// Resolution order: bare callbacks, then explicit instance/class bindings,
/// then a scan of attached instances in attach order. The first match wins.
#[derive(Clone, Default)]
pub struct ProcedureRegistry {
    callbacks: HashMap<String, ProcedureTarget>,
    bindings: HashMap<String, ProcedureTarget>,
    classes: HashMap<String, ServiceFactory>,
    instances: Vec<Arc<dyn Service>>,
}

impl ProcedureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a bare callable, replacing any previous binding.
    pub fn register<F>(&mut self, name: impl Into<String>, signature: Signature, func: F) -> &mut Self
    where
        F: Fn(Arguments) -> RpcResult<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        self.bindings.remove(&name);
        self.callbacks
            .insert(name, ProcedureTarget::function(signature, func));
        self
    }

    /// Bind `name` to `method` on an existing instance.
    pub fn bind(
        &mut self,
        name: impl Into<String>,
        instance: Arc<dyn Service>,
        method: impl Into<String>,
    ) -> &mut Self {
        let name = name.into();
        self.callbacks.remove(&name);
        self.bindings.insert(
            name,
            ProcedureTarget::BoundMethod {
                instance,
                method: method.into(),
            },
        );
        self
    }

    /// Make a class available to [`bind_class`](Self::bind_class).
    pub fn register_class<F>(&mut self, class: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn Service> + Send + Sync + 'static,
    {
        self.classes.insert(class.into(), Arc::new(factory));
        self
    }

    /// Bind `name` to `method` on a fresh instance of `class`, created per call.
    pub fn bind_class(
        &mut self,
        name: impl Into<String>,
        class: impl Into<String>,
        method: impl Into<String>,
    ) -> &mut Self {
        let name = name.into();
        self.callbacks.remove(&name);
        self.bindings.insert(
            name,
            ProcedureTarget::ClassMethod {
                class: class.into(),
                method: method.into(),
            },
        );
        self
    }

    /// Expose every method of `instance` under its own name.
    pub fn attach(&mut self, instance: Arc<dyn Service>) -> &mut Self {
        self.instances.push(instance);
        self
    }

    /// Find the target for `name`.
    pub fn resolve(&self, name: &str) -> Option<ProcedureTarget> {
        if let Some(target) = self.callbacks.get(name) {
            return Some(target.clone());
        }
        if let Some(target) = self.bindings.get(name) {
            return Some(target.clone());
        }
        self.instances
            .iter()
            .find(|instance| instance.signature(name).is_some())
            .map(|instance| ProcedureTarget::BoundMethod {
                instance: Arc::clone(instance),
                method: name.to_string(),
            })
    }

    /// Resolve, bind and invoke.
    pub fn dispatch(&self, name: &str, params: Option<&RequestParams>) -> RpcResult<Value> {
        let target = self
            .resolve(name)
            .ok_or_else(|| RpcError::procedure_not_found("Unable to find the procedure"))?;
        debug!("Dispatching '{}' to {}", name, target.kind());

        match target {
            ProcedureTarget::Function { signature, func } => {
                let args = signature.bind(params)?;
                func(args)
            }
            ProcedureTarget::BoundMethod { instance, method } => {
                call_service(instance.as_ref(), name, &method, params)
            }
            ProcedureTarget::ClassMethod { class, method } => {
                let factory = self.classes.get(&class).ok_or_else(|| {
                    RpcError::procedure_not_found(format!("Unable to find the class {}", class))
                })?;
                let instance = factory();
                call_service(instance.as_ref(), name, &method, params)
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Explicitly registered names, sorted. Attached instances are not listed.
    pub fn procedures(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .callbacks
            .keys()
            .chain(self.bindings.keys())
            .cloned()
            .collect();
        names.sort();
        names
    }
}
