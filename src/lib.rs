//! Graph Loader - builds typed, possibly cyclic object graphs from
//! declarative documents
//!
//! Each element of a document names a type or an operation. Its children
//! become constructor arguments, property values, collection members or
//! references to objects declared elsewhere in the same document.
//!
//! # Example
//!
//! ```rust
//! use graph_loader::{load, TypeRegistry, Value};
//!
//! let mut registry = TypeRegistry::new();
//! registry.register_record("Node");
//!
//! let list = load(r#"<list><int value="1"/><int value="2"/></list>"#, registry).unwrap();
//! assert_eq!(list.list_items(), Some(vec![Value::Int(1), Value::Int(2)]));
//! ```

pub mod builder;
pub mod error;
pub mod loader;
pub mod object;
pub mod parser;
pub mod registry;

pub use builder::{Diagnostic, Diagnostics, LoadError, LoadParameters, Severity};
pub use error::ParseError;
pub use loader::{
    ConfigError, DocumentAssets, LinkFailureMode, LoadReport, Loader, LoaderConfig,
};
pub use object::{Component, ComponentError, Record, Value};
pub use parser::{parse, Document, Element};
pub use registry::{MethodTable, Services, Signature, TypeHandle, TypeRegistry};

/// Load a document whose types all come from `registry`, with default
/// configuration
///
/// Any diagnostic, warnings included, fails the load.
///
/// # Example
///
/// ```rust
/// use graph_loader::{load, Record, TypeRegistry, Value};
///
/// let mut registry = TypeRegistry::new();
/// registry.register_record("Light");
///
/// let light = load(
///     r#"<Light name="key"><float value="0.5" property="Intensity"/></Light>"#,
///     registry,
/// )
/// .unwrap();
/// let intensity = light.with_object(|l: &Record| l.property("Intensity").cloned());
/// assert_eq!(intensity, Some(Some(Value::Float(0.5))));
/// ```
pub fn load(source: &str, registry: TypeRegistry) -> Result<Value, Diagnostics> {
    Loader::with_registry(registry).load_str(source).into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register_record("Node");
        registry
    }

    #[test]
    fn test_load_single_element() {
        let node = load(r#"<Node name="a"/>"#, registry()).unwrap();
        assert_eq!(node.to_string(), "Node \"a\"");
    }

    #[test]
    fn test_load_reports_unreadable_documents() {
        let diagnostics = load("<Node>", registry()).unwrap_err();
        assert!(diagnostics.has_errors());
        assert!(diagnostics
            .iter()
            .all(|d| matches!(d.error, LoadError::Grammar { .. })));
    }

    #[test]
    fn test_several_top_level_elements_make_a_list() {
        let list = load(r#"<int value="1"/><Node/>"#, registry()).unwrap();
        let items = list.list_items().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Value::Int(1));
        assert_eq!(items[1].type_name(), "Node");
    }
}
