//! Loader configuration

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading or parsing a loader configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// What happens when a built object finds no attachment point in its parent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkFailureMode {
    /// Drop the object silently
    #[default]
    Ignore,
    /// Record a warning diagnostic
    Warn,
    /// Record an error diagnostic
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    pub link_failures: LinkFailureMode,
    /// Directory that `include` and document asset paths are relative to
    pub base_path: Option<PathBuf>,
    /// Seed values for the load parameters' property table
    pub parameters: BTreeMap<String, String>,
    /// Type names registered as generic records by the CLI
    pub types: Vec<String>,
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_link_failures(mut self, mode: LinkFailureMode) -> Self {
        self.link_failures = mode;
        self
    }

    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_type(mut self, name: impl Into<String>) -> Self {
        self.types.push(name.into());
        self
    }

    /// Resolve a document-relative path against the base path
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full_config() {
        let config = LoaderConfig::from_str(
            r#"
            link_failures = "warn"
            base_path = "scenes"
            types = ["Node", "Light"]

            [parameters]
            quality = "high"
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            LoaderConfig::new()
                .with_link_failures(LinkFailureMode::Warn)
                .with_base_path("scenes")
                .with_type("Node")
                .with_type("Light")
                .with_parameter("quality", "high")
        );
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = LoaderConfig::from_str("").unwrap();
        assert_eq!(config.link_failures, LinkFailureMode::Ignore);
        assert!(config.base_path.is_none());
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let result = LoaderConfig::from_str(r#"link_failures = "sometimes""#);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_resolve_path() {
        let config = LoaderConfig::new().with_base_path("/data");
        assert_eq!(config.resolve_path("a.xml"), PathBuf::from("/data/a.xml"));
        assert_eq!(config.resolve_path("/abs.xml"), PathBuf::from("/abs.xml"));
        assert_eq!(LoaderConfig::new().resolve_path("a.xml"), PathBuf::from("a.xml"));
    }
}
