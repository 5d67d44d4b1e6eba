//! Load driver
//!
//! Reads a document, builds its tree and runs both build passes with a
//! fresh [`LoadContext`] per call.

mod config;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

pub use config::{ConfigError, LinkFailureMode, LoaderConfig};

use crate::builder::{BuildTree, Builder, Diagnostics, LoadContext, LoadError, LoadParameters};
use crate::object::{ComponentError, Value};
use crate::parser::{parse_named, Document, Location};
use crate::registry::{AssetLoader, Services, TypeRegistry};

/// Outcome of one load: the object (possibly partial) and every diagnostic
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub value: Option<Value>,
    pub diagnostics: Diagnostics,
}

impl LoadReport {
    /// A load succeeds only when nothing at all was reported
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_result(self) -> Result<Value, Diagnostics> {
        match (self.value, self.diagnostics.is_empty()) {
            (Some(value), true) => Ok(value),
            (None, true) => {
                let mut diagnostics = self.diagnostics;
                diagnostics.error(
                    &Location::default(),
                    LoadError::structural("document produced no object"),
                );
                Err(diagnostics)
            }
            (_, false) => Err(self.diagnostics),
        }
    }

    /// Collapse a nested load into a single host-level error
    pub fn into_component_result(self) -> Result<Value, ComponentError> {
        self.into_result().map_err(|diagnostics| {
            let first = diagnostics
                .iter()
                .next()
                .map(|d| d.to_string())
                .unwrap_or_default();
            ComponentError::failed(format!(
                "{} problem(s) in nested document, first: {}",
                diagnostics.len(),
                first
            ))
        })
    }
}

/// Entry point for loading documents
#[derive(Debug, Clone, Default)]
pub struct Loader {
    services: Services,
}

impl Loader {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Loader whose types all come from `registry`
    pub fn with_registry(registry: TypeRegistry) -> Self {
        Self::new(Services::new(registry))
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn load_str(&self, source: &str) -> LoadReport {
        build_source(source, None, self.context())
    }

    /// Load source text, naming it in diagnostic locations
    pub fn load_named(&self, source: &str, name: &str) -> LoadReport {
        build_source(source, Some(name), self.context())
    }

    pub fn load_file(&self, path: &Path) -> std::io::Result<LoadReport> {
        let text = std::fs::read_to_string(path)?;
        let canonical = path.canonicalize()?;
        info!(path = %path.display(), "loading document");
        let ctx = self.context().with_include_chain(vec![canonical]);
        Ok(build_source(&text, Some(&path.display().to_string()), ctx))
    }

    /// Build into an existing object: top-level elements attach to `target`
    /// and the report's value is the target itself
    pub fn load_into(&self, source: &str, target: Value) -> LoadReport {
        build_source(source, None, self.context().with_target(target))
    }

    /// Load with an explicit parameters object (see [`LoadParameters`])
    pub fn load_with_parameters(&self, source: &str, parameters: LoadParameters) -> LoadReport {
        let ctx = self.context().with_parameters(Value::object(parameters));
        build_source(source, None, ctx)
    }

    /// Build an already-read document
    pub fn load_document(&self, document: &Document) -> LoadReport {
        build_document(document, self.context())
    }

    fn context(&self) -> LoadContext {
        LoadContext::new(self.services.clone())
    }
}

pub(crate) fn build_source(text: &str, name: Option<&str>, ctx: LoadContext) -> LoadReport {
    match parse_named(text, name) {
        Ok(document) => build_document(&document, ctx),
        Err(errors) => {
            debug!(errors = errors.len(), "document could not be read");
            let mut diagnostics = Diagnostics::new();
            diagnostics.extend_parse_errors(errors, text, name);
            LoadReport {
                value: None,
                diagnostics,
            }
        }
    }
}

pub(crate) fn build_document(document: &Document, ctx: LoadContext) -> LoadReport {
    let mut diagnostics = Diagnostics::new();
    let tree = BuildTree::from_document(document, &*ctx.services.types, &mut diagnostics);
    let (value, diagnostics) = Builder::new(tree, ctx, diagnostics).run();
    LoadReport { value, diagnostics }
}

/// Asset loader that treats every resource path as another document,
/// resolved against the configured base path
#[derive(Debug, Clone, Default)]
pub struct DocumentAssets;

impl AssetLoader for DocumentAssets {
    fn load(
        &self,
        path: &str,
        parameters: Option<&Value>,
        include_chain: &[PathBuf],
        services: &Services,
    ) -> Result<Value, ComponentError> {
        let resolved = services.config.resolve_path(path);
        let text = std::fs::read_to_string(&resolved)
            .map_err(|e| ComponentError::failed(format!("{}: {}", resolved.display(), e)))?;
        let mut ctx =
            LoadContext::new(services.clone()).with_include_chain(include_chain.to_vec());
        if let Some(parameters) = parameters {
            ctx = ctx.with_parameters(parameters.clone());
        }
        build_source(&text, Some(&resolved.display().to_string()), ctx).into_component_result()
    }
}
