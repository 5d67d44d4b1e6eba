//! Identifier and keyword resolution
//!
//! Keywords are resolved against the structural ancestry of the referring
//! node, not against where objects ended up attached.

use super::context::LoadContext;
use super::error::LoadError;
use super::node::{BuildTree, NodeId, NodeKind};
use crate::object::{read_path, Value};

pub fn resolve_reference(
    tree: &BuildTree,
    ctx: &LoadContext,
    node: NodeId,
    object_id: &str,
    access: Option<&str>,
) -> Result<Value, LoadError> {
    let base = match object_id {
        "this" => {
            let parent = structural_parent(tree, node, object_id)?;
            object_of(tree, parent, object_id)?
        }
        "parent" => {
            let parent = structural_parent(tree, node, object_id)?;
            if parent == tree.root() {
                return Err(LoadError::not_found_because(
                    object_id,
                    "the enclosing element is the document root",
                ));
            }
            let grandparent = structural_parent(tree, parent, object_id)?;
            object_of(tree, grandparent, object_id)?
        }
        "root" => document_object(tree)
            .ok_or_else(|| LoadError::not_found_because(object_id, "the document has no object"))?,
        "parameters" => ctx.parameters().clone(),
        "builder" => ctx.builder(),
        id => ctx.lookup(id)?,
    };

    match access.filter(|a| !a.is_empty()) {
        Some(path) => read_path(&base, path).map_err(|err| {
            LoadError::not_found_because(
                format!("{}.{}", object_id, path),
                err.to_string(),
            )
        }),
        None => Ok(base),
    }
}

fn structural_parent(tree: &BuildTree, node: NodeId, keyword: &str) -> Result<NodeId, LoadError> {
    tree.node(node)
        .parent
        .ok_or_else(|| LoadError::not_found_because(keyword, "the element has no parent"))
}

fn object_of(tree: &BuildTree, node: NodeId, keyword: &str) -> Result<Value, LoadError> {
    tree.node(node).object.clone().ok_or_else(|| {
        LoadError::not_found_because(
            keyword,
            format!("<{}> has no object", tree.node(node).kind.label()),
        )
    })
}

/// Object the document stands for: the target, the implicit top-level list,
/// or the single top-level element's object
fn document_object(tree: &BuildTree) -> Option<Value> {
    let root = tree.node(tree.root());
    if let Some(object) = &root.object {
        return Some(object.clone());
    }
    if let NodeKind::Root {
        result: Some(result),
        ..
    } = &root.kind
    {
        return Some(result.clone());
    }
    root.children()
        .next()
        .and_then(|child| tree.node(child).object.clone())
}
