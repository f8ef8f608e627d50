//! Discovers configuration files across search locations, names, formats and
//! profiles and merges them into a [`ConfigurationEnvironment`].
//!
//! Resolution starts from a base environment that already carries the process
//! environment and command-line layers. Profiles are processed from a LIFO
//! work queue: the profile-less pass runs first, followed by already-active
//! profiles in declaration order and any profile activated by a loaded file.
//! Every layer loaded later outranks those loaded before it, so
//! profile-specific files beat the base files and the last profile wins.

mod pass;

use crate::defaults::{
    CONFIG_LOCATION_KEY, CONFIG_NAME_KEY, DEFAULT_PROPERTIES_LAYER, default_search_locations,
    default_search_names,
};
use crate::loader::LayerLoaders;
use crate::profile::split_list;
use crate::{ConfigError, ConfigurationEnvironment, ConfigurationLayer, ResourceLoader};

use pass::ResolutionPass;

pub(crate) const RESOLVER_TARGET: &str = "liftoff_config::resolver";

const CLASSPATH_PREFIX: &str = "classpath:";
const FILE_PREFIX: &str = "file:";

/// Configuration Resolution Engine.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    loaders: LayerLoaders,
    search_locations: Vec<String>,
    search_names: Vec<String>,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver {
    /// Creates a resolver with the default loaders, locations and names.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loaders: LayerLoaders::default(),
            search_locations: default_search_locations(),
            search_names: default_search_names(),
        }
    }

    /// Replaces the layer loaders.
    #[must_use]
    pub fn with_loaders(mut self, loaders: LayerLoaders) -> Self {
        self.loaders = loaders;
        self
    }

    /// Replaces the search locations, lowest precedence first. Directory
    /// locations end with `/`; anything else names a single file.
    #[must_use]
    pub fn with_search_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_locations = locations.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the search names.
    #[must_use]
    pub fn with_search_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Registered layer loaders.
    #[must_use]
    pub const fn loaders(&self) -> &LayerLoaders {
        &self.loaders
    }

    /// Resolves configuration files into `environment`.
    ///
    /// On success the loaded layers sit ahead of `defaultProperties` (which is
    /// moved to the lowest precedence) and the environment's active profiles
    /// hold every profile activated during the run.
    ///
    /// # Errors
    ///
    /// Returns an error when an existing file cannot be parsed, when a profile
    /// list is malformed, or when a placeholder in a search setting cannot be
    /// resolved. Missing or unreadable candidates are skipped.
    pub fn resolve(
        &self,
        environment: &mut ConfigurationEnvironment,
        resources: &dyn ResourceLoader,
    ) -> Result<ResolutionSummary, ConfigError> {
        let locations = self.search_locations_for(environment)?;
        let names = self.search_names_for(environment)?;
        let extensions = self.loaders.file_extensions();

        let mut pass = ResolutionPass::new(&self.loaders, resources, &locations, &names, &extensions);
        pass.run(environment)?;
        let (loaded, processed) = pass.finish();

        let summary = ResolutionSummary {
            loaded_layers: loaded.iter().map(|layer| layer.name().to_owned()).collect(),
            processed_profiles: processed,
        };
        insert_loaded(environment, loaded);
        relocate_default_properties(environment);
        Ok(summary)
    }

    /// Configured locations followed by `liftoff.config.location` entries.
    fn search_locations_for(
        &self,
        environment: &ConfigurationEnvironment,
    ) -> Result<Vec<String>, ConfigError> {
        let mut locations = self.search_locations.clone();
        for location in configured_list(environment, CONFIG_LOCATION_KEY)? {
            let location = normalise_location(&location);
            if !locations.contains(&location) {
                locations.push(location);
            }
        }
        Ok(locations)
    }

    fn search_names_for(
        &self,
        environment: &ConfigurationEnvironment,
    ) -> Result<Vec<String>, ConfigError> {
        let configured = configured_list(environment, CONFIG_NAME_KEY)?;
        if configured.is_empty() {
            Ok(self.search_names.clone())
        } else {
            Ok(configured)
        }
    }
}

/// Outcome of one resolution run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionSummary {
    loaded_layers: Vec<String>,
    processed_profiles: Vec<String>,
}

impl ResolutionSummary {
    /// Names of the loaded layers in discovery order.
    #[must_use]
    pub fn loaded_layers(&self) -> &[String] {
        &self.loaded_layers
    }

    /// Profiles whose pass ran, in processing order, excluding the
    /// profile-less pass.
    #[must_use]
    pub fn processed_profiles(&self) -> &[String] {
        &self.processed_profiles
    }
}

fn configured_list(
    environment: &ConfigurationEnvironment,
    key: &str,
) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = environment.get_property(key) else {
        return Ok(Vec::new());
    };
    let resolved = environment.resolve_placeholders(&raw)?;
    Ok(split_list(&resolved).map(str::to_owned).collect())
}

fn normalise_location(location: &str) -> String {
    if location.starts_with(CLASSPATH_PREFIX) || location.starts_with(FILE_PREFIX) {
        location.to_owned()
    } else {
        format!("{FILE_PREFIX}{location}")
    }
}

/// Inserts layers ahead of `defaultProperties`, or at the end, so the last
/// discovered layer has the highest precedence among them.
fn insert_loaded(
    environment: &mut ConfigurationEnvironment,
    loaded: Vec<ConfigurationLayer>,
) {
    let has_defaults = environment.contains_layer(DEFAULT_PROPERTIES_LAYER);
    for layer in loaded.into_iter().rev() {
        if has_defaults {
            environment.add_before(DEFAULT_PROPERTIES_LAYER, layer);
        } else {
            environment.add_last(layer);
        }
    }
}

fn relocate_default_properties(environment: &mut ConfigurationEnvironment) {
    if let Some(defaults) = environment.remove(DEFAULT_PROPERTIES_LAYER) {
        environment.add_last(defaults);
    }
}

