//! Build tree: one node per document element
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. The parent
//! link is fixed when a node is added and child lists only grow while the
//! tree is being read from the document.

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::trace;

use super::diagnostics::Diagnostics;
use super::error::LoadError;
use super::literal::is_literal_tag;
use crate::object::Value;
use crate::parser::{Document, Element, Location};
use crate::registry::TypeResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Which child bucket a node joins in its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStep {
    PreLink,
    PostLink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Unbuilt,
    Built,
    Linked,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Root {
        /// Document used an explicit `rb` wrapper
        wrapped: bool,
        /// Object of the single top-level child when there is no target
        result: Option<Value>,
    },
    TypeRef {
        name: String,
        module: Option<String>,
    },
    NewInstance {
        type_name: String,
        module: Option<String>,
        parameters: Vec<NodeId>,
    },
    Literal {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
    Reference {
        object_id: String,
        access: Option<String>,
    },
    Asset {
        path: String,
        use_current_parameters: bool,
    },
    List,
    Table,
    MapEntry {
        key: Option<String>,
    },
    Method {
        call: String,
        object_id: Option<String>,
        type_name: Option<String>,
        module: Option<String>,
        parameters: Vec<NodeId>,
    },
    Prototype {
        object_id: Option<String>,
        access: Option<String>,
        /// Inline prototype subtree, used when there is no `objectId`
        source: Vec<NodeId>,
    },
    Template {
        elements: Vec<Element>,
        source: Option<Rc<str>>,
    },
    Include {
        path: String,
    },
}

impl NodeKind {
    /// Bucket for children not wrapped in `preLink` / `postLink`
    pub fn default_link_step(&self) -> LinkStep {
        match self {
            NodeKind::MapEntry { .. } => LinkStep::PreLink,
            _ => LinkStep::PostLink,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            NodeKind::Root { .. } => "rb",
            NodeKind::TypeRef { .. } => "type",
            NodeKind::NewInstance { type_name, .. } => type_name,
            NodeKind::Literal { tag, .. } => tag,
            NodeKind::Reference { .. } => "ref",
            NodeKind::Asset { .. } => "resource",
            NodeKind::List => "list",
            NodeKind::Table => "table",
            NodeKind::MapEntry { .. } => "dictionaryEntry",
            NodeKind::Method { .. } => "method",
            NodeKind::Prototype { .. } => "instance",
            NodeKind::Template { .. } => "template",
            NodeKind::Include { .. } => "include",
        }
    }

    fn accepts_parameters(&self) -> bool {
        matches!(self, NodeKind::NewInstance { .. } | NodeKind::Method { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub pre_link: Vec<NodeId>,
    pub post_link: Vec<NodeId>,
    pub name: Option<String>,
    pub id: Option<String>,
    pub property: Option<String>,
    pub dyn_key: Option<String>,
    pub location: Location,
    pub object: Option<Value>,
    pub state: NodeState,
}

impl Node {
    fn new(kind: NodeKind, parent: Option<NodeId>, location: Location) -> Self {
        Self {
            kind,
            parent,
            pre_link: Vec::new(),
            post_link: Vec::new(),
            name: None,
            id: None,
            property: None,
            dyn_key: None,
            location,
            object: None,
            state: NodeState::Unbuilt,
        }
    }

    /// Pre-link children followed by post-link children
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.pre_link.iter().chain(self.post_link.iter()).copied()
    }
}

#[derive(Debug, Clone)]
pub struct BuildTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl BuildTree {
    /// Read a document into a tree.
    ///
    /// Unknown tags and misplaced elements are reported and their subtrees
    /// left out; everything else is kept.
    pub fn from_document(
        document: &Document,
        types: &dyn TypeResolver,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let (wrapped, elements, location) = match document.elements.as_slice() {
            [single] if single.tag() == "rb" => (
                true,
                single.children.as_slice(),
                single.location.clone(),
            ),
            elements => (
                false,
                elements,
                elements
                    .first()
                    .map(|e| e.location.clone())
                    .unwrap_or_default(),
            ),
        };
        let root = Node::new(
            NodeKind::Root {
                wrapped,
                result: None,
            },
            None,
            location,
        );
        let mut tree = Self {
            nodes: vec![root],
            root: NodeId(0),
        };
        let mut reader = TreeReader { types, diagnostics };
        let root = tree.root;
        for element in elements {
            reader.add_child(&mut tree, root, element, LinkStep::PostLink);
        }
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }
}

struct TreeReader<'a> {
    types: &'a dyn TypeResolver,
    diagnostics: &'a mut Diagnostics,
}

impl TreeReader<'_> {
    /// Add `element` (and its subtree) under `parent`. Grouping and
    /// `parameters` elements are routed here rather than becoming nodes.
    fn add_child(&mut self, tree: &mut BuildTree, parent: NodeId, element: &Element, step: LinkStep) {
        match element.tag() {
            "preLink" => {
                for child in &element.children {
                    self.add_child(tree, parent, child, LinkStep::PreLink);
                }
            }
            "postLink" => {
                for child in &element.children {
                    self.add_child(tree, parent, child, LinkStep::PostLink);
                }
            }
            "parameters" => {
                if !tree.node(parent).kind.accepts_parameters() {
                    self.diagnostics.error(
                        &element.location,
                        LoadError::structural(format!(
                            "<parameters> is not valid inside <{}>",
                            tree.node(parent).kind.label()
                        )),
                    );
                    return;
                }
                let args: Vec<NodeId> = element
                    .children
                    .iter()
                    .filter_map(|child| self.add_node(tree, Some(parent), child))
                    .collect();
                match &mut tree.node_mut(parent).kind {
                    NodeKind::NewInstance { parameters, .. } | NodeKind::Method { parameters, .. } => {
                        parameters.extend(args)
                    }
                    _ => {}
                }
            }
            _ => {
                if let Some(child) = self.add_node(tree, Some(parent), element) {
                    let node = tree.node_mut(parent);
                    match step {
                        LinkStep::PreLink => node.pre_link.push(child),
                        LinkStep::PostLink => node.post_link.push(child),
                    }
                }
            }
        }
    }

    /// Create the node for one element and read its children
    fn add_node(&mut self, tree: &mut BuildTree, parent: Option<NodeId>, element: &Element) -> Option<NodeId> {
        let kind = match self.classify(element) {
            Ok(kind) => kind,
            Err(err) => {
                self.diagnostics.error(&element.location, err);
                return None;
            }
        };
        trace!(tag = element.tag(), line = element.location.line, "read element");

        let mut node = Node::new(kind, parent, element.location.clone());
        node.name = element.attribute("name").map(str::to_string);
        node.id = element.attribute("id").map(str::to_string);
        node.property = element.attribute("property").map(str::to_string);
        node.dyn_key = element.attribute("dynProperty").map(str::to_string);

        let takes_children = match &node.kind {
            NodeKind::Template { .. } => false,
            NodeKind::Literal { tag, .. } | NodeKind::TypeRef { name: tag, .. }
                if !element.children.is_empty() =>
            {
                self.diagnostics.error(
                    &element.location,
                    LoadError::structural(format!("<{}> does not accept children", tag)),
                );
                false
            }
            _ => true,
        };
        let inline_prototype = matches!(node.kind, NodeKind::Prototype { object_id: None, .. });
        let step = node.kind.default_link_step();
        let id = tree.push(node);

        if inline_prototype {
            // pre-link candidates come first
            let mut pre = Vec::new();
            let mut post = Vec::new();
            for child in &element.children {
                match child.tag() {
                    "preLink" => pre.extend(child.children.iter()),
                    "postLink" => post.extend(child.children.iter()),
                    _ => post.push(child),
                }
            }
            let source: Vec<NodeId> = pre
                .into_iter()
                .chain(post)
                .filter_map(|child| self.add_node(tree, Some(id), child))
                .collect();
            if let NodeKind::Prototype { source: slot, .. } = &mut tree.node_mut(id).kind {
                *slot = source;
            }
        } else if takes_children {
            for child in &element.children {
                self.add_child(tree, id, child, step);
            }
        }
        Some(id)
    }

    fn classify(&self, element: &Element) -> Result<NodeKind, LoadError> {
        let tag = element.tag();
        let required = |name: &str| {
            element
                .attribute(name)
                .map(str::to_string)
                .ok_or_else(|| LoadError::missing_attribute(tag, name))
        };
        let optional = |name: &str| element.attribute(name).map(str::to_string);

        let kind = match tag {
            "rb" => return Err(LoadError::grammar("<rb> is only valid as the document root")),
            "parameters" | "preLink" | "postLink" => {
                return Err(LoadError::grammar(format!("<{}> must be a child of an element", tag)))
            }
            "object" => NodeKind::NewInstance {
                type_name: required("type")?,
                module: optional("assembly"),
                parameters: Vec::new(),
            },
            "type" => NodeKind::TypeRef {
                name: required("value")?,
                module: optional("assembly"),
            },
            "ref" => NodeKind::Reference {
                object_id: required("objectId")?,
                access: optional("access"),
            },
            "instance" => NodeKind::Prototype {
                object_id: optional("objectId").filter(|id| !id.is_empty()),
                access: optional("access"),
                source: Vec::new(),
            },
            "method" => NodeKind::Method {
                call: required("call")?,
                object_id: optional("objectId"),
                type_name: optional("type"),
                module: optional("assembly"),
                parameters: Vec::new(),
            },
            "resource" => NodeKind::Asset {
                path: required("path")?,
                use_current_parameters: optional("useCurrentParameters")
                    .map(|v| v.eq_ignore_ascii_case("true"))
                    .unwrap_or(false),
            },
            "list" => NodeKind::List,
            "table" => NodeKind::Table,
            "dictionaryEntry" => NodeKind::MapEntry {
                key: optional("key"),
            },
            "template" => NodeKind::Template {
                elements: element.children.clone(),
                source: element.location.source.clone(),
            },
            "include" => NodeKind::Include {
                path: required("path")?,
            },
            tag if is_literal_tag(tag) => NodeKind::Literal {
                tag: tag.to_string(),
                attributes: element
                    .attributes
                    .iter()
                    .map(|a| (a.name.node.clone(), a.value.node.clone()))
                    .collect(),
            },
            tag => {
                let module = optional("assembly");
                if self.types.resolve(tag, module.as_deref()).is_none() {
                    return Err(LoadError::grammar(format!("unknown element <{}>", tag)));
                }
                NodeKind::NewInstance {
                    type_name: tag.to_string(),
                    module,
                    parameters: Vec::new(),
                }
            }
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::registry::TypeRegistry;

    fn read(source: &str) -> (BuildTree, Diagnostics) {
        let mut registry = TypeRegistry::new();
        registry.register_record("Node");
        let mut diagnostics = Diagnostics::new();
        let doc = parse(source).expect("document parses");
        let tree = BuildTree::from_document(&doc, &registry, &mut diagnostics);
        (tree, diagnostics)
    }

    fn tags(tree: &BuildTree, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| tree.node(*id).kind.label().to_string())
            .collect()
    }

    #[test]
    fn test_link_step_buckets() {
        let (tree, diagnostics) = read(
            r#"<rb><Node>
                <int value="1"/>
                <preLink><string value="a"/><bool value="true"/></preLink>
                <postLink><double value="2"/></postLink>
            </Node></rb>"#,
        );
        assert!(diagnostics.is_empty());
        let root = tree.node(tree.root());
        let node = tree.node(root.post_link[0]);
        assert_eq!(tags(&tree, &node.pre_link), vec!["string", "bool"]);
        assert_eq!(tags(&tree, &node.post_link), vec!["int", "double"]);
    }

    #[test]
    fn test_entries_default_to_pre_link() {
        let (tree, _) = read(
            r#"<table><dictionaryEntry><string value="a"/><int value="1"/></dictionaryEntry></table>"#,
        );
        let table = tree.node(tree.node(tree.root()).post_link[0]);
        let entry = tree.node(table.post_link[0]);
        assert_eq!(entry.pre_link.len(), 2);
        assert!(entry.post_link.is_empty());
    }

    #[test]
    fn test_parameters_are_kept_apart() {
        let (tree, diagnostics) = read(
            r#"<Node><parameters><int value="1"/></parameters><int value="2"/></Node>"#,
        );
        assert!(diagnostics.is_empty());
        let node = tree.node(tree.node(tree.root()).post_link[0]);
        match &node.kind {
            NodeKind::NewInstance { parameters, .. } => assert_eq!(parameters.len(), 1),
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(node.post_link.len(), 1);
    }

    #[test]
    fn test_unknown_tag_skips_subtree() {
        let (tree, diagnostics) = read(r#"<rb><bogus><Node/></bogus><Node/></rb>"#);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.of_kind("grammar error").count(), 1);
        // root plus the valid sibling
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_missing_attribute() {
        let (_, diagnostics) = read(r#"<rb><ref/></rb>"#);
        let first = diagnostics.iter().next().expect("one diagnostic");
        assert!(matches!(first.error, LoadError::Structural { .. }));
    }

    #[test]
    fn test_literals_reject_children() {
        let (tree, diagnostics) = read(r#"<rb><int value="1"><int value="2"/></int></rb>"#);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_inline_prototype_reads_link_groups() {
        let (tree, diagnostics) = read(
            r#"<instance><postLink><int value="2"/></postLink><preLink><string value="a"/></preLink></instance>"#,
        );
        assert!(diagnostics.is_empty());
        let instance = tree.node(tree.node(tree.root()).post_link[0]);
        match &instance.kind {
            NodeKind::Prototype { source, .. } => {
                assert_eq!(tags(&tree, source), vec!["string", "int"])
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_common_attributes() {
        let (tree, _) = read(r#"<Node name="a" id="x" property="Left.Items" dynProperty="k"/>"#);
        let node = tree.node(tree.node(tree.root()).post_link[0]);
        assert_eq!(node.name.as_deref(), Some("a"));
        assert_eq!(node.id.as_deref(), Some("x"));
        assert_eq!(node.property.as_deref(), Some("Left.Items"));
        assert_eq!(node.dyn_key.as_deref(), Some("k"));
        assert_eq!(node.parent, Some(tree.root()));
    }
}
