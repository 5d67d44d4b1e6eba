//! Generic dynamic host object
//!
//! A [`Record`] accepts any property, keeps attached children in order and
//! supports dynamic properties. It stands in for application types when a
//! document is loaded without a domain type registry (the CLI does this).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use uuid::Uuid;

use super::component::{
    Component, ComponentError, ComponentParent, DynamicProperties, PropertyAccess, Prototype,
};
use super::value::{ListRef, Value};
use crate::registry::Services;

#[derive(Debug, Clone)]
pub struct Record {
    type_name: String,
    name: Option<String>,
    id: Option<Uuid>,
    properties: BTreeMap<String, Value>,
    children: ListRef,
    dynamic: DynamicProperties,
    /// Values seen through `on_attached`
    parents: Vec<Value>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: None,
            id: None,
            properties: BTreeMap::new(),
            children: Rc::new(RefCell::new(Vec::new())),
            dynamic: DynamicProperties::new(),
            parents: Vec::new(),
        }
    }

    /// Set a property (builder style)
    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    /// Record constructed from positional arguments, stored as `Arg0`, `Arg1`, ...
    pub fn with_arguments(type_name: impl Into<String>, args: &[Value]) -> Self {
        let mut record = Self::new(type_name);
        for (i, arg) in args.iter().enumerate() {
            record.properties.insert(format!("Arg{}", i), arg.clone());
        }
        record
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Snapshot of the attached children
    pub fn children(&self) -> Vec<Value> {
        self.children.borrow().clone()
    }

    pub fn dynamic(&self) -> &DynamicProperties {
        &self.dynamic
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    /// Objects this record has been attached to, in attachment order
    pub fn parents(&self) -> &[Value] {
        &self.parents
    }
}

impl Component for Record {
    crate::component_any!();

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn property_access(&self, _property: &str) -> PropertyAccess {
        PropertyAccess::ReadWrite
    }

    fn get(&self, property: &str) -> Result<Value, ComponentError> {
        if property == "Children" {
            return Ok(Value::List(self.children.clone()));
        }
        self.properties
            .get(property)
            .cloned()
            .ok_or_else(|| ComponentError::failed(format!("property '{}' is not set", property)))
    }

    fn set(&mut self, property: &str, value: Value) -> Result<(), ComponentError> {
        self.properties.insert(property.to_string(), value);
        Ok(())
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: &str) -> bool {
        self.name = Some(name.to_string());
        true
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = Some(id);
    }

    fn as_parent(&mut self) -> Option<&mut dyn ComponentParent> {
        Some(self)
    }

    fn on_attached(&mut self, parent: &Value) {
        self.parents.push(parent.clone());
    }

    fn dynamic_properties(&mut self) -> Option<&mut DynamicProperties> {
        Some(&mut self.dynamic)
    }

    fn as_prototype(&self) -> Option<&dyn Prototype> {
        Some(self)
    }

    fn describe_properties(&self) -> Vec<(String, Value)> {
        let mut out: Vec<_> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let mut dynamic: Vec<_> = self.dynamic.iter().collect();
        dynamic.sort_by(|a, b| a.0.cmp(b.0));
        out.extend(dynamic.into_iter().map(|(k, v)| (format!("[{}]", k), v.clone())));
        if !self.children.borrow().is_empty() {
            out.push(("Children".to_string(), Value::List(self.children.clone())));
        }
        out
    }
}

impl ComponentParent for Record {
    fn add_child(&mut self, child: Value) -> Result<(), ComponentError> {
        self.children.borrow_mut().push(child);
        Ok(())
    }
}

// A copy shares property values but not children, attachment history or identity.
impl Prototype for Record {
    fn instantiate(&self, _services: &Services) -> Result<Value, ComponentError> {
        let mut copy = self.clone();
        copy.id = None;
        copy.parents.clear();
        copy.children = Rc::new(RefCell::new(self.children.borrow().clone()));
        Ok(Value::object(copy))
    }
}
