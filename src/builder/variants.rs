//! Object production for each node kind

use std::path::PathBuf;
use std::rc::Rc;

use super::context::{LoadContext, ObjectBuilder};
use super::error::LoadError;
use super::lifecycle::{Builder, Failure};
use super::literal::parse_literal;
use super::node::{NodeId, NodeKind};
use super::reference::resolve_reference;
use crate::object::{read_path, Component, ComponentError, Prototype, Value};
use crate::parser::{Document, Element};
use crate::registry::{Services, TypeHandle};

impl Builder {
    /// The node's own object, built without attaching it anywhere.
    /// References produce nothing here; they are looked up while resolving.
    pub(super) fn create_object(&mut self, id: NodeId) -> Result<Option<Value>, Failure> {
        let kind = self.tree.node(id).kind.clone();
        let object = match kind {
            NodeKind::Root { wrapped, .. } => match self.ctx.target() {
                Some(target) => target.clone(),
                None if !wrapped && self.tree.node(id).children().count() > 1 => Value::new_list(),
                None => return Ok(None),
            },
            NodeKind::TypeRef { name, module } => {
                Value::Type(self.resolve_type(&name, module.as_deref())?)
            }
            NodeKind::NewInstance {
                type_name,
                module,
                parameters,
            } => {
                let ty = self.resolve_type(&type_name, module.as_deref())?;
                let args = self.build_detached(&parameters, "constructor argument")?;
                self.ctx
                    .services
                    .factory
                    .create(&ty, &args)
                    .map_err(|e| LoadError::construction(type_name, e))?
            }
            NodeKind::Literal { tag, attributes } => {
                parse_literal(&tag, &attributes, self.ctx.parameters())?
            }
            NodeKind::Reference { .. } => return Ok(None),
            NodeKind::Asset {
                path,
                use_current_parameters,
            } => self.load_asset(&path, use_current_parameters)?,
            NodeKind::List => Value::new_list(),
            NodeKind::Table => Value::new_table(),
            NodeKind::MapEntry { key } => {
                let entry = Value::new_entry();
                if let (Some(key), Value::Entry(shell)) = (key, &entry) {
                    shell.borrow_mut().key = Some(Value::String(key));
                }
                entry
            }
            NodeKind::Method {
                call,
                object_id,
                type_name,
                module,
                parameters,
            } => {
                let receiver = match type_name {
                    Some(name) => Value::Type(self.resolve_type(&name, module.as_deref())?),
                    None => {
                        let object_id = object_id.as_deref().unwrap_or("this");
                        resolve_reference(&self.tree, &self.ctx, id, object_id, None)?
                    }
                };
                let args = self.build_detached(&parameters, "method argument")?;
                return Ok(self.invoke(&receiver, &call, &args)?);
            }
            NodeKind::Prototype {
                object_id,
                access,
                source,
            } => {
                let prototype = match object_id {
                    Some(object_id) => {
                        resolve_reference(&self.tree, &self.ctx, id, &object_id, access.as_deref())?
                    }
                    None => self.inline_prototype(&source, access.as_deref())?,
                };
                instantiate(&prototype, &self.ctx.services)?
            }
            NodeKind::Template { elements, source } => {
                Value::object(Template::new(elements, source))
            }
            NodeKind::Include { path } => self.include(&path)?,
        };
        Ok(Some(object))
    }

    fn resolve_type(&self, name: &str, module: Option<&str>) -> Result<TypeHandle, LoadError> {
        self.ctx.services.types.resolve(name, module).ok_or_else(|| {
            LoadError::type_resolution(match module {
                Some(module) => format!("{}, {}", name, module),
                None => name.to_string(),
            })
        })
    }

    fn invoke(&self, receiver: &Value, call: &str, args: &[Value]) -> Result<Option<Value>, LoadError> {
        let builtin = receiver.with_object(|b: &ObjectBuilder| b.invoke(call, args)).flatten();
        let result = match builtin {
            Some(result) => result,
            None => self.ctx.services.methods.invoke(receiver, call, args),
        };
        result.map_err(|e| {
            let owner = match receiver {
                Value::Type(ty) => ty.name.clone(),
                other => other.type_name(),
            };
            LoadError::construction(format!("{}.{}", owner, call), e)
        })
    }

    /// An `instance` without `objectId` copies its single child
    fn inline_prototype(&mut self, source: &[NodeId], access: Option<&str>) -> Result<Value, Failure> {
        if source.len() != 1 {
            return Err(LoadError::structural(format!(
                "<instance> without objectId needs exactly one child, found {}",
                source.len()
            ))
            .into());
        }
        let mut built = self.build_detached(source, "prototype")?;
        let prototype = built.remove(0);
        match access.filter(|a| !a.is_empty()) {
            Some(path) => read_path(&prototype, path)
                .map_err(|e| LoadError::construction("prototype access", e).into()),
            None => Ok(prototype),
        }
    }

    fn load_asset(&self, path: &str, use_current_parameters: bool) -> Result<Value, LoadError> {
        let what = format!("resource '{}'", path);
        let Some(assets) = self.ctx.services.assets.clone() else {
            return Err(LoadError::construction(
                what,
                ComponentError::failed("no asset loader is configured"),
            ));
        };
        let (_, chain) = self.nested_chain("resource", path)?;
        let parameters = use_current_parameters.then(|| self.ctx.parameters().clone());
        assets
            .load(path, parameters.as_ref(), &chain, &self.ctx.services)
            .map_err(|e| LoadError::construction(what, e))
    }

    /// Resolve a nested document path and extend the include chain with it.
    /// A path already on the chain is a cycle.
    fn nested_chain(&self, what: &str, path: &str) -> Result<(PathBuf, Vec<PathBuf>), LoadError> {
        let resolved = self.ctx.services.config.resolve_path(path);
        let resolved = resolved.canonicalize().unwrap_or(resolved);
        let mut chain = self.ctx.include_chain().to_vec();
        chain.push(resolved.clone());
        if self.ctx.is_including(&resolved) {
            let chain: Vec<String> = chain.iter().map(|p| p.display().to_string()).collect();
            return Err(LoadError::structural(format!(
                "circular {}: {}",
                what,
                chain.join(" -> ")
            )));
        }
        Ok((resolved, chain))
    }

    /// Load another document with its own context and use its object
    fn include(&self, path: &str) -> Result<Value, LoadError> {
        let (resolved, chain) = self.nested_chain("include", path)?;
        let what = format!("include '{}'", path);
        let text = std::fs::read_to_string(&resolved)
            .map_err(|e| LoadError::construction(&what, ComponentError::failed(e.to_string())))?;

        let ctx = LoadContext::new(self.ctx.services.clone()).with_include_chain(chain);
        let name = resolved.display().to_string();
        crate::loader::build_source(&text, Some(&name), ctx)
            .into_component_result()
            .map_err(|e| LoadError::construction(what, e))
    }
}

fn instantiate(prototype: &Value, services: &Services) -> Result<Value, LoadError> {
    let Value::Object(object) = prototype else {
        return Err(LoadError::construction(
            "instance",
            ComponentError::mismatch("prototype", prototype),
        ));
    };
    let object = object.borrow();
    let Some(capability) = object.as_prototype() else {
        return Err(LoadError::construction(
            "instance",
            ComponentError::failed(format!("type '{}' cannot be instantiated", object.type_name())),
        ));
    };
    capability
        .instantiate(services)
        .map_err(|e| LoadError::construction(format!("instance of {}", object.type_name()), e))
}

/// Captured, unbuilt element subtree. Every instantiation builds it afresh
/// in a new load context.
#[derive(Debug, Clone)]
pub struct Template {
    elements: Vec<Element>,
    source: Option<Rc<str>>,
}

impl Template {
    pub fn new(elements: Vec<Element>, source: Option<Rc<str>>) -> Self {
        Self { elements, source }
    }
}

impl Component for Template {
    crate::component_any!();

    fn type_name(&self) -> &str {
        "template"
    }

    fn as_prototype(&self) -> Option<&dyn Prototype> {
        Some(self)
    }
}

impl Prototype for Template {
    fn instantiate(&self, services: &Services) -> Result<Value, ComponentError> {
        if self.elements.is_empty() {
            return Err(ComponentError::failed("template is empty"));
        }
        let document = Document {
            elements: self.elements.clone(),
            source: self.source.clone(),
        };
        crate::loader::build_document(&document, LoadContext::new(services.clone()))
            .into_component_result()
    }
}
