//! Collaborators consulted while building: type resolution, object
//! construction, method dispatch and asset loading

mod assets;
mod methods;
mod types;

use std::fmt;
use std::rc::Rc;

pub use assets::AssetLoader;
pub use methods::{MethodResult, MethodTable};
pub use types::{
    describe_args, ObjectFactory, ParamType, Signature, TypeHandle, TypeRegistry, TypeResolver,
};

use crate::loader::LoaderConfig;

/// Shared bundle of collaborators plus loader configuration.
///
/// Cloning is cheap; nested loads (includes, templates, document assets)
/// receive a clone and build with their own fresh context.
#[derive(Clone)]
pub struct Services {
    pub types: Rc<dyn TypeResolver>,
    pub factory: Rc<dyn ObjectFactory>,
    pub methods: Rc<MethodTable>,
    pub assets: Option<Rc<dyn AssetLoader>>,
    pub config: LoaderConfig,
}

impl Default for Services {
    fn default() -> Self {
        Self::new(TypeRegistry::new())
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("methods", &self.methods)
            .field("assets", &self.assets.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl Services {
    /// Use one registry as both resolver and factory
    pub fn new(registry: TypeRegistry) -> Self {
        let registry = Rc::new(registry);
        Self {
            types: registry.clone(),
            factory: registry,
            methods: Rc::new(MethodTable::new()),
            assets: None,
            config: LoaderConfig::default(),
        }
    }

    pub fn with_resolver(mut self, types: Rc<dyn TypeResolver>) -> Self {
        self.types = types;
        self
    }

    pub fn with_factory(mut self, factory: Rc<dyn ObjectFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_methods(mut self, methods: MethodTable) -> Self {
        self.methods = Rc::new(methods);
        self
    }

    pub fn with_assets(mut self, assets: Rc<dyn AssetLoader>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }
}
