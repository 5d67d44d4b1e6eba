//! Error types for the build passes

use thiserror::Error;

use crate::object::ComponentError;

/// A failure recorded against one node
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LoadError {
    /// Type name (and optional module) did not resolve
    #[error("cannot resolve type '{name}'")]
    TypeResolution { name: String },

    /// Factory, method, prototype or asset failure
    #[error("cannot construct {what}")]
    Construction {
        what: String,
        #[source]
        cause: Option<ComponentError>,
    },

    /// Identifier or keyword that names no object
    #[error("reference '{id}' not found{}", reason.as_ref().map(|r| format!(": {}", r)).unwrap_or_default())]
    ReferenceNotFound { id: String, reason: Option<String> },

    /// No compatible attachment point, or a failing property path
    #[error("cannot link {child} into {parent}")]
    LinkTarget {
        child: String,
        parent: String,
        #[source]
        cause: Option<ComponentError>,
    },

    /// Unreadable document, unknown tag or malformed literal
    #[error("{message}")]
    Grammar { message: String },

    /// Wrong child count, missing attribute, duplicate id
    #[error("{message}")]
    Structural { message: String },
}

impl LoadError {
    pub fn type_resolution(name: impl Into<String>) -> Self {
        Self::TypeResolution { name: name.into() }
    }

    pub fn construction(what: impl Into<String>, cause: ComponentError) -> Self {
        Self::Construction {
            what: what.into(),
            cause: Some(cause),
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::ReferenceNotFound {
            id: id.into(),
            reason: None,
        }
    }

    pub fn not_found_because(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ReferenceNotFound {
            id: id.into(),
            reason: Some(reason.into()),
        }
    }

    pub fn link(child: impl Into<String>, parent: impl Into<String>, cause: Option<ComponentError>) -> Self {
        Self::LinkTarget {
            child: child.into(),
            parent: parent.into(),
            cause,
        }
    }

    pub fn grammar(message: impl Into<String>) -> Self {
        Self::Grammar {
            message: message.into(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural {
            message: message.into(),
        }
    }

    pub fn missing_attribute(tag: &str, attribute: &str) -> Self {
        Self::structural(format!("<{}> requires attribute '{}'", tag, attribute))
    }

    /// Short category name used in rendered reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TypeResolution { .. } => "type resolution error",
            Self::Construction { .. } => "construction error",
            Self::ReferenceNotFound { .. } => "reference not found",
            Self::LinkTarget { .. } => "link error",
            Self::Grammar { .. } => "grammar error",
            Self::Structural { .. } => "structural error",
        }
    }
}
