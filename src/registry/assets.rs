//! External asset loading

use std::path::PathBuf;

use crate::object::{ComponentError, Value};

use super::Services;

/// Loads the object behind a `resource path=".."` element.
///
/// `parameters` is the current load's parameter object when the element sets
/// `useCurrentParameters="true"`. Implementations may re-enter the loader
/// (a document asset is loaded with its own fresh context); such nested
/// loads must carry `include_chain`, which already ends with this asset's
/// resolved path, so that cycles are caught.
pub trait AssetLoader {
    fn load(
        &self,
        path: &str,
        parameters: Option<&Value>,
        include_chain: &[PathBuf],
        services: &Services,
    ) -> Result<Value, ComponentError>;
}
