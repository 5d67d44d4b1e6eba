//! Host object capabilities
//!
//! Builders never reflect over arbitrary fields. A host type exposes an
//! explicit accessor map (`property_access` / `get` / `set`) and opts into
//! the composition, notification, dynamic-property and prototype
//! capabilities by overriding the matching methods.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use super::value::Value;
use crate::registry::Services;

/// Errors raised by host objects and collaborators
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComponentError {
    /// Property is not part of the type's accessor map
    #[error("type '{type_name}' has no property '{property}'")]
    NoSuchProperty { type_name: String, property: String },

    /// Property exists but cannot be read
    #[error("property '{property}' of type '{type_name}' is write-only")]
    WriteOnly { type_name: String, property: String },

    /// Property exists but cannot be assigned
    #[error("property '{property}' of type '{type_name}' is read-only")]
    ReadOnly { type_name: String, property: String },

    /// Value of the wrong runtime type
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Table already holds the key
    #[error("duplicate key {key}")]
    DuplicateKey { key: String },

    /// Free-form failure raised by host code
    #[error("{0}")]
    Failed(String),
}

impl ComponentError {
    pub fn no_such_property(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self::NoSuchProperty {
            type_name: type_name.into(),
            property: property.into(),
        }
    }

    pub fn mismatch(expected: impl Into<String>, found: &Value) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.type_name(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// How a property may be used by the linker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyAccess {
    Missing,
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl PropertyAccess {
    pub fn can_read(self) -> bool {
        matches!(self, PropertyAccess::ReadOnly | PropertyAccess::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, PropertyAccess::WriteOnly | PropertyAccess::ReadWrite)
    }
}

/// String-keyed side map for `dynProperty` links
pub type DynamicProperties = HashMap<String, Value>;

/// Composition capability: the object owns an ordered set of children
pub trait ComponentParent {
    fn add_child(&mut self, child: Value) -> Result<(), ComponentError>;
}

/// Capability to produce a fresh copy of an object
pub trait Prototype {
    fn instantiate(&self, services: &Services) -> Result<Value, ComponentError>;
}

/// A host object that can take part in a built graph
pub trait Component: Any + fmt::Debug {
    /// Runtime type name, used for method dispatch and messages
    fn type_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn property_access(&self, _property: &str) -> PropertyAccess {
        PropertyAccess::Missing
    }

    fn get(&self, property: &str) -> Result<Value, ComponentError> {
        Err(ComponentError::no_such_property(self.type_name(), property))
    }

    fn set(&mut self, property: &str, _value: Value) -> Result<(), ComponentError> {
        Err(ComponentError::no_such_property(self.type_name(), property))
    }

    /// Display name, if the object carries one
    fn name(&self) -> Option<&str> {
        None
    }

    /// Apply a `name` attribute; returns false when the type is not nameable
    fn set_name(&mut self, _name: &str) -> bool {
        false
    }

    /// Apply an `id` attribute that parsed as a GUID
    fn set_id(&mut self, _id: Uuid) {}

    fn as_parent(&mut self) -> Option<&mut dyn ComponentParent> {
        None
    }

    /// Called after this object has been attached to `parent`
    fn on_attached(&mut self, _parent: &Value) {}

    fn dynamic_properties(&mut self) -> Option<&mut DynamicProperties> {
        None
    }

    fn as_prototype(&self) -> Option<&dyn Prototype> {
        None
    }

    /// Property values shown by [`Value::describe`]
    fn describe_properties(&self) -> Vec<(String, Value)> {
        Vec::new()
    }
}

/// Implements the `Any` plumbing of [`Component`] for a concrete type
#[macro_export]
macro_rules! component_any {
    () => {
        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }
    };
}

/// Property access as seen from the linker, for any value kind
pub fn property_access(target: &Value, property: &str) -> PropertyAccess {
    match target {
        Value::Object(object) => object.borrow().property_access(property),
        Value::Entry(_) if matches!(property, "Key" | "Value") => PropertyAccess::ReadWrite,
        Value::List(_) | Value::Table(_) if property == "Count" => PropertyAccess::ReadOnly,
        _ => PropertyAccess::Missing,
    }
}

/// Zero-argument property read on any value kind
pub fn get_property(target: &Value, property: &str) -> Result<Value, ComponentError> {
    match target {
        Value::Object(object) => {
            let object = object.borrow();
            if object.property_access(property) == PropertyAccess::WriteOnly {
                return Err(ComponentError::WriteOnly {
                    type_name: object.type_name().to_string(),
                    property: property.to_string(),
                });
            }
            object.get(property)
        }
        Value::Entry(entry) => {
            let entry = entry.borrow();
            let slot = match property {
                "Key" => &entry.key,
                "Value" => &entry.value,
                _ => return Err(ComponentError::no_such_property("dictionaryEntry", property)),
            };
            slot.clone()
                .ok_or_else(|| ComponentError::failed(format!("entry {} is not set", property)))
        }
        Value::List(items) if property == "Count" => Ok(Value::Int(len_as_i32(items.borrow().len()))),
        Value::Table(table) if property == "Count" => Ok(Value::Int(len_as_i32(table.borrow().len()))),
        other => Err(ComponentError::no_such_property(other.type_name(), property)),
    }
}

/// Property assignment on any value kind
pub fn set_property(target: &Value, property: &str, value: Value) -> Result<(), ComponentError> {
    match target {
        Value::Object(object) => object.borrow_mut().set(property, value),
        Value::Entry(entry) => {
            let mut entry = entry.borrow_mut();
            match property {
                "Key" => entry.key = Some(value),
                "Value" => entry.value = Some(value),
                _ => return Err(ComponentError::no_such_property("dictionaryEntry", property)),
            }
            Ok(())
        }
        Value::List(_) | Value::Table(_) if property == "Count" => Err(ComponentError::ReadOnly {
            type_name: target.type_name(),
            property: property.to_string(),
        }),
        other => Err(ComponentError::no_such_property(other.type_name(), property)),
    }
}

/// Follow a dotted accessor chain, rebinding the working value per segment
pub fn read_path(target: &Value, path: &str) -> Result<Value, ComponentError> {
    let mut current = target.clone();
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = get_property(&current, segment)?;
    }
    Ok(current)
}

fn len_as_i32(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Record;

    #[test]
    fn test_entry_properties() {
        let entry = Value::new_entry();
        assert_eq!(property_access(&entry, "Key"), PropertyAccess::ReadWrite);
        set_property(&entry, "Key", "a".into()).expect("set key");
        assert_eq!(get_property(&entry, "Key"), Ok(Value::from("a")));
        assert!(get_property(&entry, "Value").is_err());
    }

    #[test]
    fn test_list_count_is_read_only() {
        let list = Value::list_of(vec![1.into(), 2.into()]);
        assert_eq!(get_property(&list, "Count"), Ok(Value::Int(2)));
        assert!(matches!(
            set_property(&list, "Count", 3.into()),
            Err(ComponentError::ReadOnly { .. })
        ));
    }

    #[test]
    fn test_read_path_walks_segments() {
        let inner = Value::object(Record::new("Inner").with_property("Size", 4.into()));
        let outer = Value::object(Record::new("Outer").with_property("Child", inner));
        assert_eq!(read_path(&outer, "Child.Size"), Ok(Value::Int(4)));
        assert!(read_path(&outer, "Child.Missing").is_err());
        assert!(matches!(
            read_path(&outer, "Child.Size.Count"),
            Err(ComponentError::NoSuchProperty { .. })
        ));
    }

    #[derive(Debug)]
    struct Sink;

    impl Component for Sink {
        crate::component_any!();

        fn type_name(&self) -> &str {
            "Sink"
        }

        fn property_access(&self, _property: &str) -> PropertyAccess {
            PropertyAccess::WriteOnly
        }

        fn set(&mut self, _property: &str, _value: Value) -> Result<(), ComponentError> {
            Ok(())
        }
    }

    #[test]
    fn test_write_only_properties_cannot_be_read() {
        let sink = Value::object(Sink);
        assert_eq!(set_property(&sink, "Level", 1.into()), Ok(()));
        assert_eq!(
            read_path(&sink, "Level"),
            Err(ComponentError::WriteOnly {
                type_name: "Sink".into(),
                property: "Level".into(),
            })
        );
    }

    #[test]
    fn test_literals_have_no_properties() {
        assert_eq!(property_access(&Value::Int(1), "Count"), PropertyAccess::Missing);
    }
}
