//! Graph construction from an element tree
//!
//! Every element becomes a [`Node`] in a [`BuildTree`]. A [`Builder`] runs
//! the create pass over the whole tree, then the resolve pass, recording
//! failures in [`Diagnostics`] as it goes.

mod context;
mod diagnostics;
mod error;
mod lifecycle;
mod link;
mod literal;
mod node;
mod reference;
mod variants;

pub use context::{LoadContext, LoadParameters, ObjectBuilder};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::LoadError;
pub use lifecycle::Builder;
pub use link::{link, Attachment};
pub use literal::{is_literal_tag, parse_literal};
pub use node::{BuildTree, LinkStep, Node, NodeId, NodeKind, NodeState};
pub use variants::Template;
