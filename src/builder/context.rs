//! Per-load state
//!
//! A [`LoadContext`] is created for every load call, nested loads included,
//! so identifiers never leak between documents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::error::LoadError;
use crate::object::{
    Component, ComponentError, DynamicProperties, PropertyAccess, Value,
};
use crate::registry::{describe_args, Services};

/// Ambient parameters of a load, reachable through the `parameters`
/// keyword and read by `dynProperty` literals
#[derive(Debug, Clone, Default)]
pub struct LoadParameters {
    properties: DynamicProperties,
}

impl LoadParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn properties(&self) -> &DynamicProperties {
        &self.properties
    }
}

impl Component for LoadParameters {
    crate::component_any!();

    fn type_name(&self) -> &str {
        "LoadParameters"
    }

    fn property_access(&self, _property: &str) -> PropertyAccess {
        PropertyAccess::ReadWrite
    }

    fn get(&self, property: &str) -> Result<Value, ComponentError> {
        self.properties
            .get(property)
            .cloned()
            .ok_or_else(|| ComponentError::no_such_property("LoadParameters", property))
    }

    fn set(&mut self, property: &str, value: Value) -> Result<(), ComponentError> {
        self.properties.insert(property.to_string(), value);
        Ok(())
    }

    fn dynamic_properties(&mut self) -> Option<&mut DynamicProperties> {
        Some(&mut self.properties)
    }

    fn describe_properties(&self) -> Vec<(String, Value)> {
        let mut out: Vec<_> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

/// The construction strategy as an object, reachable through the `builder`
/// keyword. Supports `Create(type, args...)` as a method call.
#[derive(Debug, Clone)]
pub struct ObjectBuilder {
    services: Services,
}

impl ObjectBuilder {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Built-in operations; `None` when `method` is not one of them
    pub fn invoke(&self, method: &str, args: &[Value]) -> Option<Result<Option<Value>, ComponentError>> {
        if method != "Create" {
            return None;
        }
        Some(match args.split_first() {
            Some((Value::Type(ty), rest)) => self.services.factory.create(ty, rest).map(Some),
            _ => Err(ComponentError::failed(format!(
                "Create expects (type, ...), found {}",
                describe_args(args)
            ))),
        })
    }
}

impl Component for ObjectBuilder {
    crate::component_any!();

    fn type_name(&self) -> &str {
        "Builder"
    }
}

pub struct LoadContext {
    pub services: Services,
    ids: HashMap<String, Value>,
    /// `None` marks a name used by more than one object
    names: HashMap<String, Option<Value>>,
    parameters: Value,
    target: Option<Value>,
    include_chain: Vec<PathBuf>,
}

impl LoadContext {
    pub fn new(services: Services) -> Self {
        let mut parameters = LoadParameters::new();
        for (key, value) in &services.config.parameters {
            parameters.properties.insert(key.clone(), Value::from(value.as_str()));
        }
        Self {
            services,
            ids: HashMap::new(),
            names: HashMap::new(),
            parameters: Value::object(parameters),
            target: None,
            include_chain: Vec::new(),
        }
    }

    /// Use an existing parameters object instead of one seeded from config
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Build into an existing object instead of returning a new one
    pub fn with_target(mut self, target: Value) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_include_chain(mut self, chain: Vec<PathBuf>) -> Self {
        self.include_chain = chain;
        self
    }

    pub fn target(&self) -> Option<&Value> {
        self.target.as_ref()
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    pub fn builder(&self) -> Value {
        Value::object(ObjectBuilder::new(self.services.clone()))
    }

    pub fn include_chain(&self) -> &[PathBuf] {
        &self.include_chain
    }

    pub fn is_including(&self, path: &Path) -> bool {
        self.include_chain.iter().any(|p| p == path)
    }

    /// Record a built object under its id and name.
    ///
    /// Ids are write-once; a second object with the same id is rejected.
    /// Names may repeat but then no longer identify a single object.
    pub fn register(
        &mut self,
        id: Option<&str>,
        name: Option<&str>,
        object: &Value,
    ) -> Result<(), LoadError> {
        if let Some(id) = id {
            let key = normalize_id(id);
            if self.ids.contains_key(&key) {
                return Err(LoadError::structural(format!("duplicate id '{}'", id)));
            }
            self.ids.insert(key, object.clone());
        }
        if let Some(name) = name {
            self.names
                .entry(name.to_string())
                .and_modify(|slot| *slot = None)
                .or_insert_with(|| Some(object.clone()));
        }
        Ok(())
    }

    /// Look an object up by id, falling back to its name
    pub fn lookup(&self, id: &str) -> Result<Value, LoadError> {
        if let Some(object) = self.ids.get(&normalize_id(id)) {
            return Ok(object.clone());
        }
        match self.names.get(id) {
            Some(Some(object)) => Ok(object.clone()),
            Some(None) => Err(LoadError::not_found_because(
                id,
                "name is shared by several objects",
            )),
            None => Err(LoadError::not_found(id)),
        }
    }
}

/// GUID ids compare by value regardless of case or braces
pub(crate) fn normalize_id(id: &str) -> String {
    match Uuid::parse_str(id.trim()) {
        Ok(uuid) => uuid.hyphenated().to_string(),
        Err(_) => id.to_string(),
    }
}
