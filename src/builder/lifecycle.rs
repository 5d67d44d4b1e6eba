//! The two build passes
//!
//! `create` runs over the whole tree before any `resolve`, so every
//! identified object is registered before the first reference is looked up.
//! `resolve` wires objects together: pre-link children into the node, the
//! node into its parent, then post-link children into the node.

use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::context::LoadContext;
use super::diagnostics::Diagnostics;
use super::error::LoadError;
use super::link::{link, Attachment};
use super::node::{BuildTree, NodeId, NodeKind, NodeState};
use super::reference::resolve_reference;
use crate::loader::LinkFailureMode;
use crate::object::Value;

/// Why a node produced no object
#[derive(Debug)]
pub(super) enum Failure {
    Error(LoadError),
    /// A nested node has already reported the cause
    Reported,
}

impl From<LoadError> for Failure {
    fn from(err: LoadError) -> Self {
        Failure::Error(err)
    }
}

pub struct Builder {
    pub(super) tree: BuildTree,
    pub(super) ctx: LoadContext,
    pub(super) diagnostics: Diagnostics,
}

impl Builder {
    pub fn new(tree: BuildTree, ctx: LoadContext, diagnostics: Diagnostics) -> Self {
        Self {
            tree,
            ctx,
            diagnostics,
        }
    }

    /// Run both passes over the whole tree and return the document's object
    pub fn run(mut self) -> (Option<Value>, Diagnostics) {
        let root = self.tree.root();
        debug!(nodes = self.tree.len(), "create pass");
        self.create(root);
        self.check_root();
        debug!("resolve pass");
        self.resolve(root, false);

        let root = self.tree.node(root);
        let value = match (&root.object, &root.kind) {
            (Some(object), _) => Some(object.clone()),
            (None, NodeKind::Root { result, .. }) => result.clone(),
            (None, _) => None,
        };
        debug!(diagnostics = self.diagnostics.len(), "load finished");
        (value, self.diagnostics)
    }

    /// Build the node's object, then its pre-link and post-link subtrees.
    /// A node whose own object fails leaves its subtree unbuilt.
    pub(super) fn create(&mut self, id: NodeId) {
        if self.tree.node(id).state != NodeState::Unbuilt {
            return;
        }
        let result = self.create_object(id);
        self.tree.node_mut(id).state = NodeState::Built;
        match result {
            Ok(Some(object)) => {
                trace!(node = self.tree.node(id).kind.label(), object = %object, "created");
                self.apply_identity(id, &object);
                self.tree.node_mut(id).object = Some(object);
            }
            Ok(None) => {}
            Err(Failure::Error(err)) => {
                self.report(id, err);
                return;
            }
            Err(Failure::Reported) => {
                trace!(node = self.tree.node(id).kind.label(), "abandoned after nested failure");
                return;
            }
        }
        let children: Vec<NodeId> = self.tree.node(id).children().collect();
        for child in children {
            self.create(child);
        }
    }

    pub(super) fn resolve(&mut self, id: NodeId, link_self: bool) {
        if self.tree.node(id).state != NodeState::Built {
            return;
        }
        if let NodeKind::Reference { object_id, access } = &self.tree.node(id).kind {
            let (object_id, access) = (object_id.clone(), access.clone());
            match resolve_reference(&self.tree, &self.ctx, id, &object_id, access.as_deref()) {
                Ok(object) => {
                    self.register(id, &object);
                    self.tree.node_mut(id).object = Some(object);
                }
                Err(err) => self.report(id, err),
            }
        }

        let pre_link = self.tree.node(id).pre_link.clone();
        for child in pre_link {
            self.resolve(child, true);
        }
        if link_self {
            self.link_into_parent(id);
        }
        let post_link = self.tree.node(id).post_link.clone();
        for child in post_link {
            self.resolve(child, true);
        }
        self.tree.node_mut(id).state = NodeState::Linked;
    }

    /// Fully build nodes that attach to nothing (arguments, inline
    /// prototypes) and return their objects in order. A node that failed
    /// with its own diagnostic is not reported a second time.
    pub(super) fn build_detached(&mut self, nodes: &[NodeId], what: &str) -> Result<Vec<Value>, Failure> {
        let before = self.diagnostics.len();
        for &node in nodes {
            self.create(node);
        }
        for &node in nodes {
            self.resolve(node, false);
        }
        nodes
            .iter()
            .enumerate()
            .map(|(i, &node)| {
                self.tree.node(node).object.clone().ok_or_else(|| {
                    if self.diagnostics.len() > before {
                        Failure::Reported
                    } else {
                        LoadError::structural(format!("{} {} produced no value", what, i)).into()
                    }
                })
            })
            .collect()
    }

    /// Wrapped documents need exactly one top-level element
    fn check_root(&mut self) {
        let root = self.tree.node(self.tree.root());
        if root.object.is_some() {
            return;
        }
        let count = root.children().count();
        if matches!(root.kind, NodeKind::Root { wrapped: true, .. }) && count != 1 {
            let err = LoadError::structural(format!(
                "<rb> must contain exactly one element, found {}",
                count
            ));
            self.report(self.tree.root(), err);
        }
    }

    fn link_into_parent(&mut self, id: NodeId) {
        let node = self.tree.node(id);
        let (Some(parent_id), Some(child)) = (node.parent, node.object.clone()) else {
            return;
        };
        let property = node.property.clone();
        let dyn_key = node.dyn_key.clone();

        let Some(parent) = self.tree.node(parent_id).object.clone() else {
            if matches!(self.tree.node(parent_id).kind, NodeKind::Root { .. }) {
                self.on_link(parent_id, &child);
            } else {
                trace!(node = self.tree.node(id).kind.label(), "parent has no object");
            }
            return;
        };

        match link(&child, &parent, property.as_deref(), dyn_key.as_deref()) {
            Ok(Attachment::Unattached) => self.unattached(id, &child, &parent),
            Ok(attachment) => {
                trace!(child = %child, parent = %parent, ?attachment, "linked");
                self.on_link(parent_id, &child);
            }
            Err(cause) => {
                let err = LoadError::link(child.to_string(), parent.to_string(), Some(cause));
                self.report(id, err);
            }
        }
    }

    /// Parent-side hook run once a child has been linked
    fn on_link(&mut self, parent: NodeId, child: &Value) {
        let parent = self.tree.node_mut(parent);
        if parent.object.is_some() {
            return;
        }
        if let NodeKind::Root { result, .. } = &mut parent.kind {
            if result.is_none() {
                *result = Some(child.clone());
            }
        }
    }

    fn unattached(&mut self, id: NodeId, child: &Value, parent: &Value) {
        let err = LoadError::link(child.to_string(), parent.to_string(), None);
        let location = self.tree.node(id).location.clone();
        match self.ctx.services.config.link_failures {
            LinkFailureMode::Ignore => trace!(%location, "{}", err),
            LinkFailureMode::Warn => {
                warn!(%location, "{}", err);
                self.diagnostics.warning(&location, err);
            }
            LinkFailureMode::Error => self.report(id, err),
        }
    }

    /// Apply `name` / `id` to a freshly created object and register it
    fn apply_identity(&mut self, id: NodeId, object: &Value) {
        let node = self.tree.node(id);
        if let Value::Object(component) = object {
            let mut component = component.borrow_mut();
            if let Some(name) = &node.name {
                if !component.set_name(name) {
                    trace!(name = name.as_str(), "type is not nameable");
                }
            }
            if let Some(uuid) = node.id.as_deref().and_then(|i| Uuid::parse_str(i.trim()).ok()) {
                component.set_id(uuid);
            }
        }
        self.register(id, object);
    }

    fn register(&mut self, id: NodeId, object: &Value) {
        let node = self.tree.node(id);
        if node.id.is_none() && node.name.is_none() {
            return;
        }
        if let Err(err) = self
            .ctx
            .register(node.id.as_deref(), node.name.as_deref(), object)
        {
            self.report(id, err);
        }
    }

    pub(super) fn report(&mut self, id: NodeId, err: LoadError) {
        let location = self.tree.node(id).location.clone();
        debug!(%location, error = %err, "build failure");
        self.diagnostics.error(&location, err);
    }
}
