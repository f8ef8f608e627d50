//! Pluggable parsers turning resources into configuration layers.
//!
//! Properties, YAML and TOML loaders ship by default; other formats plug in
//! through [`LayerLoader`].

mod properties;
mod toml_file;
mod yaml;

use std::fmt;
use std::sync::Arc;

pub use properties::{PropertiesError, PropertiesLayerLoader};
pub use toml_file::TomlLayerLoader;
pub use yaml::{YamlError, YamlLayerLoader};

use crate::{ConfigurationLayer, LoaderError, Resource};

/// Parses one file format into a [`ConfigurationLayer`].
pub trait LayerLoader: Send + Sync {
    /// File extensions (without the dot) handled by this loader.
    fn file_extensions(&self) -> &[&'static str];

    /// Parses `resource` into a layer named `name`.
    ///
    /// `profile` restricts loading to content that applies to that profile.
    /// Formats without per-document profiles return `Ok(None)` whenever a
    /// profile is requested, as they do for resources without entries.
    ///
    /// # Errors
    ///
    /// Returns an error when the resource cannot be parsed.
    fn load(
        &self,
        name: &str,
        resource: &Resource,
        profile: Option<&str>,
    ) -> Result<Option<ConfigurationLayer>, LoaderError>;
}

/// Ordered registry of layer loaders.
///
/// When two loaders claim the same extension the earlier one wins.
#[derive(Clone)]
pub struct LayerLoaders {
    loaders: Vec<Arc<dyn LayerLoader>>,
}

impl LayerLoaders {
    /// Creates an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            loaders: Vec::new(),
        }
    }

    /// Appends a loader.
    #[must_use]
    pub fn with(mut self, loader: impl LayerLoader + 'static) -> Self {
        self.loaders.push(Arc::new(loader));
        self
    }

    /// Every supported extension, in registration order without duplicates.
    #[must_use]
    pub fn file_extensions(&self) -> Vec<&'static str> {
        let mut extensions: Vec<&'static str> = Vec::new();
        for extension in self
            .loaders
            .iter()
            .flat_map(|loader| loader.file_extensions().iter().copied())
        {
            if !extensions.contains(&extension) {
                extensions.push(extension);
            }
        }
        extensions
    }

    /// Loader responsible for `extension`, compared case-insensitively.
    #[must_use]
    pub fn loader_for(&self, extension: &str) -> Option<&dyn LayerLoader> {
        self.loaders
            .iter()
            .find(|loader| {
                loader
                    .file_extensions()
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(extension))
            })
            .map(|loader| &**loader)
    }
}

impl Default for LayerLoaders {
    /// Properties, YAML and TOML, in that order.
    fn default() -> Self {
        Self::empty()
            .with(PropertiesLayerLoader)
            .with(YamlLayerLoader)
            .with(TomlLayerLoader)
    }
}

impl fmt::Debug for LayerLoaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerLoaders")
            .field("extensions", &self.file_extensions())
            .finish()
    }
}

/// Joins a key prefix and a child segment with `.`.
fn join_key(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_owned()
    } else {
        format!("{prefix}.{segment}")
    }
}
