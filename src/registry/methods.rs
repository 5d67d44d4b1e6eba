//! Per-type operation registry for `method` elements
//!
//! Operations are looked up by the receiver's runtime type name and the
//! runtime types of the resolved argument values, never by declared types.

use std::collections::HashMap;
use std::fmt;

use super::types::{describe_args, Signature};
use crate::object::{ComponentError, Value};

/// Result of an invocation: `None` leaves the builder without an object
pub type MethodResult = Result<Option<Value>, ComponentError>;

type Operation = Box<dyn Fn(&Value, &[Value]) -> MethodResult>;

struct Overload {
    signature: Signature,
    invoke: Operation,
}

#[derive(Default)]
pub struct MethodTable {
    methods: HashMap<(String, String), Vec<Overload>>,
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self
            .methods
            .keys()
            .map(|(ty, name)| format!("{}.{}", ty, name))
            .collect();
        keys.sort();
        f.debug_struct("MethodTable").field("methods", &keys).finish()
    }
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation overload on `type_name`.
    ///
    /// For `method type=".."` elements the receiver is the type handle and
    /// the operation is looked up under the handle's name.
    pub fn register<F>(
        &mut self,
        type_name: &str,
        method: &str,
        signature: Signature,
        invoke: F,
    ) -> &mut Self
    where
        F: Fn(&Value, &[Value]) -> MethodResult + 'static,
    {
        self.methods
            .entry((type_name.to_string(), method.to_string()))
            .or_default()
            .push(Overload {
                signature,
                invoke: Box::new(invoke),
            });
        self
    }

    /// Find the first overload matching the runtime argument types and call it
    pub fn invoke(&self, receiver: &Value, method: &str, args: &[Value]) -> MethodResult {
        let type_name = match receiver {
            Value::Type(handle) => handle.name.clone(),
            other => other.type_name(),
        };
        let overloads = self
            .methods
            .get(&(type_name.clone(), method.to_string()))
            .ok_or_else(|| {
                ComponentError::failed(format!("type '{}' has no method '{}'", type_name, method))
            })?;
        let overload = overloads
            .iter()
            .find(|o| o.signature.matches(args))
            .ok_or_else(|| {
                ComponentError::failed(format!(
                    "no overload of '{}.{}' accepts {}",
                    type_name,
                    method,
                    describe_args(args)
                ))
            })?;
        (overload.invoke)(receiver, args)
    }
}
