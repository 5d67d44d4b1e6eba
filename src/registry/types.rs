//! Type resolution and object construction

use std::collections::HashMap;
use std::fmt;

use crate::object::{ComponentError, Record, Value};

/// A resolved type: its name plus the module that declared it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeHandle {
    pub name: String,
    pub module: Option<String>,
}

impl TypeHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: None,
        }
    }

    pub fn in_module(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: Some(module.into()),
        }
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module {
            Some(module) => write!(f, "{}, {}", self.name, module),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Resolves a type name (optionally qualified by module) to a handle
pub trait TypeResolver {
    fn resolve(&self, name: &str, module: Option<&str>) -> Option<TypeHandle>;
}

/// Creates instances of resolved types
pub trait ObjectFactory {
    fn create(&self, ty: &TypeHandle, args: &[Value]) -> Result<Value, ComponentError>;
}

/// One parameter of a constructor or method signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// Matches any runtime type
    Any,
    /// Matches values whose runtime type name is exactly this
    Named(String),
    /// Matches any number of trailing arguments; only valid last
    Rest,
}

impl ParamType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::Any | ParamType::Rest => true,
            ParamType::Named(name) => value.type_name() == *name,
        }
    }
}

impl From<&str> for ParamType {
    fn from(name: &str) -> Self {
        match name {
            "any" | "*" => ParamType::Any,
            "..." => ParamType::Rest,
            other => ParamType::Named(other.to_string()),
        }
    }
}

/// Parameter list matched against the runtime types of argument values
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature(pub Vec<ParamType>);

impl Signature {
    pub fn new<'s>(params: impl IntoIterator<Item = &'s str>) -> Self {
        Self(params.into_iter().map(ParamType::from).collect())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn matches(&self, args: &[Value]) -> bool {
        let arity_ok = match self.0.split_last() {
            Some((ParamType::Rest, head)) => args.len() >= head.len(),
            _ => self.0.len() == args.len(),
        };
        arity_ok && self.0.iter().zip(args).all(|(p, a)| p.matches(a))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<_> = self
            .0
            .iter()
            .map(|p| match p {
                ParamType::Any => "any",
                ParamType::Rest => "...",
                ParamType::Named(n) => n.as_str(),
            })
            .collect();
        write!(f, "({})", params.join(", "))
    }
}

/// Comma-separated runtime type names of an argument list
pub fn describe_args(args: &[Value]) -> String {
    let names: Vec<_> = args.iter().map(Value::type_name).collect();
    format!("({})", names.join(", "))
}

type Constructor = Box<dyn Fn(&[Value]) -> Result<Value, ComponentError>>;

struct TypeEntry {
    handle: TypeHandle,
    constructors: Vec<(Signature, Constructor)>,
}

/// Concrete resolver and factory backed by registered constructors
#[derive(Default)]
pub struct TypeRegistry {
    types: HashMap<String, Vec<TypeEntry>>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.types.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}

impl TypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor overload for a type in the default module
    pub fn register<F>(&mut self, name: &str, signature: Signature, build: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, ComponentError> + 'static,
    {
        self.register_handle(TypeHandle::new(name), signature, build)
    }

    /// Register a constructor overload for a type declared in `module`
    pub fn register_in_module<F>(
        &mut self,
        module: &str,
        name: &str,
        signature: Signature,
        build: F,
    ) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, ComponentError> + 'static,
    {
        self.register_handle(TypeHandle::in_module(name, module), signature, build)
    }

    fn register_handle<F>(&mut self, handle: TypeHandle, signature: Signature, build: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, ComponentError> + 'static,
    {
        let entries = self.types.entry(handle.name.clone()).or_default();
        match entries.iter_mut().find(|e| e.handle == handle) {
            Some(entry) => entry.constructors.push((signature, Box::new(build))),
            None => entries.push(TypeEntry {
                handle,
                constructors: vec![(signature, Box::new(build))],
            }),
        }
        self
    }

    /// Register a [`Record`]-backed type: the default constructor yields an
    /// empty record, any other argument list fills `Arg0..ArgN`
    pub fn register_record(&mut self, name: &str) -> &mut Self {
        let type_name = name.to_string();
        self.register(name, Signature::empty(), {
            let type_name = type_name.clone();
            move |_| Ok(Value::object(Record::new(type_name.clone())))
        });
        self.register(name, Signature::new(["..."]), move |args| {
            Ok(Value::object(Record::with_arguments(type_name.clone(), args)))
        })
    }
}

impl TypeResolver for TypeRegistry {
    fn resolve(&self, name: &str, module: Option<&str>) -> Option<TypeHandle> {
        let entries = self.types.get(name)?;
        let entry = match module {
            Some(module) => entries
                .iter()
                .find(|e| e.handle.module.as_deref() == Some(module))?,
            None => entries.first()?,
        };
        Some(entry.handle.clone())
    }
}

impl ObjectFactory for TypeRegistry {
    fn create(&self, ty: &TypeHandle, args: &[Value]) -> Result<Value, ComponentError> {
        let entry = self
            .types
            .get(&ty.name)
            .and_then(|entries| entries.iter().find(|e| e.handle == *ty))
            .ok_or_else(|| ComponentError::failed(format!("type '{}' is not registered", ty)))?;

        // First registered overload that accepts the runtime argument types wins
        match entry.constructors.iter().find(|(sig, _)| sig.matches(args)) {
            Some((_, build)) => build(args),
            None => Err(ComponentError::failed(format!(
                "no constructor of '{}' accepts {}",
                ty,
                describe_args(args)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register("Counter", Signature::empty(), |_| Ok(Value::Int(0)));
        registry.register("Counter", Signature::new(["int"]), |args| Ok(args[0].clone()));
        registry.register_in_module("Audio", "Clip", Signature::empty(), |_| Ok("audio".into()));
        registry.register_in_module("Video", "Clip", Signature::empty(), |_| Ok("video".into()));
        registry
    }

    #[test]
    fn test_resolve_by_module() {
        let registry = registry();
        assert_eq!(
            registry.resolve("Clip", Some("Video")),
            Some(TypeHandle::in_module("Clip", "Video"))
        );
        assert_eq!(registry.resolve("Clip", Some("Text")), None);
        assert!(registry.resolve("Clip", None).is_some());
        assert_eq!(registry.resolve("Missing", None), None);
    }

    #[test]
    fn test_constructor_overload_by_runtime_type() {
        let registry = registry();
        let ty = TypeHandle::new("Counter");
        assert_eq!(registry.create(&ty, &[]), Ok(Value::Int(0)));
        assert_eq!(registry.create(&ty, &[Value::Int(7)]), Ok(Value::Int(7)));
        assert!(registry.create(&ty, &[Value::from("7")]).is_err());
    }

    #[test]
    fn test_record_types_accept_arguments() {
        let mut registry = TypeRegistry::new();
        registry.register_record("Node");
        let ty = TypeHandle::new("Node");
        let two = registry
            .create(&ty, &["a".into(), 1.into()])
            .expect("two args");
        assert_eq!(
            two.with_object(|r: &Record| r.property("Arg1").cloned()),
            Some(Some(Value::Int(1)))
        );
        let empty = registry.create(&ty, &[]).expect("no args");
        assert_eq!(empty.type_name(), "Node");
    }

    #[test]
    fn test_signature_display() {
        assert_eq!(Signature::new(["int", "any"]).to_string(), "(int, any)");
    }

    #[test]
    fn test_rest_parameter() {
        let sig = Signature::new(["string", "..."]);
        assert!(sig.matches(&["a".into()]));
        assert!(sig.matches(&["a".into(), 1.into(), true.into()]));
        assert!(!sig.matches(&[1.into()]));
        assert!(!sig.matches(&[]));
    }
}
