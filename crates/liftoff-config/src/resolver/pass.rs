//! Work-queue state for one resolution run.

use std::borrow::Cow;

use tracing::{debug, trace};

use super::RESOLVER_TARGET;
use crate::defaults::{ACTIVE_PROFILES_KEY, INCLUDE_PROFILES_KEY};
use crate::loader::LayerLoaders;
use crate::profile::parse_profiles;
use crate::{
    ConfigError, ConfigurationEnvironment, ConfigurationLayer, Profile, ProfileSet,
    Resource, ResourceError, ResourceLoader,
};

const LAYER_PREFIX: &str = "applicationConfig";

pub(super) struct ResolutionPass<'a> {
    loaders: &'a LayerLoaders,
    resources: &'a dyn ResourceLoader,
    locations: &'a [String],
    names: &'a [String],
    extensions: &'a [&'static str],
    /// LIFO: the next profile to process is at the end. `None` is the
    /// profile-less pass.
    queue: Vec<Option<Profile>>,
    processed: ProfileSet,
    activated: bool,
    loaded: Vec<ConfigurationLayer>,
}

impl<'a> ResolutionPass<'a> {
    pub(super) fn new(
        loaders: &'a LayerLoaders,
        resources: &'a dyn ResourceLoader,
        locations: &'a [String],
        names: &'a [String],
        extensions: &'a [&'static str],
    ) -> Self {
        Self {
            loaders,
            resources,
            locations,
            names,
            extensions,
            queue: Vec::new(),
            processed: ProfileSet::new(),
            activated: false,
            loaded: Vec::new(),
        }
    }

    pub(super) fn run(&mut self, environment: &mut ConfigurationEnvironment) -> Result<(), ConfigError> {
        self.seed(environment)?;
        while let Some(next) = self.queue.pop() {
            match next {
                None => self.load_pass(environment, None)?,
                Some(profile) => {
                    if self.processed.contains(profile.name()) {
                        continue;
                    }
                    debug!(
                        target: RESOLVER_TARGET,
                        profile = profile.name(),
                        default = profile.is_implicit_default(),
                        "processing profile"
                    );
                    self.load_pass(environment, Some(profile.name()))?;
                    self.processed.insert(profile);
                }
            }
        }
        Ok(())
    }

    /// Loaded layers in discovery order and processed profile names.
    pub(super) fn finish(self) -> (Vec<ConfigurationLayer>, Vec<String>) {
        let processed = self
            .processed
            .iter()
            .map(|profile| profile.name().to_owned())
            .collect();
        (self.loaded, processed)
    }

    fn seed(&mut self, environment: &mut ConfigurationEnvironment) -> Result<(), ConfigError> {
        let base: &ConfigurationEnvironment = environment;
        let mut initial = profiles_from(base, base, INCLUDE_PROFILES_KEY)?;
        let declared = profiles_from(base, base, ACTIVE_PROFILES_KEY)?;
        initial.extend(declared.clone());
        // Declared profiles keep their declaration order; only includes are
        // prepended by the activation below.
        for profile in &declared {
            environment.add_active_profile(profile.name());
        }
        self.maybe_activate(environment, initial.clone());

        let unprocessed: Vec<Profile> = environment
            .active_profiles()
            .iter()
            .filter(|name| !initial.contains(name))
            .map(Profile::new)
            .collect();
        self.push_all(unprocessed);

        if self.queue.is_empty() {
            let defaults: Vec<Profile> = environment
                .default_profiles()
                .iter()
                .map(Profile::implicit_default)
                .collect();
            self.push_all(defaults);
        }
        self.queue.push(None);
        Ok(())
    }

    /// Pushes profiles so that they pop in iteration order.
    fn push_all(&mut self, profiles: impl IntoIterator<Item = Profile>) {
        let fresh: Vec<Profile> = profiles
            .into_iter()
            .filter(|profile| !self.is_known(profile.name()))
            .collect();
        self.queue.extend(fresh.into_iter().rev().map(Some));
    }

    fn is_known(&self, name: &str) -> bool {
        self.processed.contains(name)
            || self
                .queue
                .iter()
                .flatten()
                .any(|queued| queued.name() == name)
    }

    /// Applies an activation request unless an earlier one already won.
    /// Pending implicit default profiles no longer apply once it does.
    fn maybe_activate(&mut self, environment: &mut ConfigurationEnvironment, profiles: ProfileSet) {
        if profiles.is_empty() {
            return;
        }
        if self.activated {
            debug!(
                target: RESOLVER_TARGET,
                profiles = %profiles,
                "profiles already activated, ignoring later activation"
            );
            return;
        }
        self.activated = true;
        self.add_profiles(environment, profiles);
        self.queue
            .retain(|entry| !entry.as_ref().is_some_and(Profile::is_implicit_default));
    }

    /// Queues profiles not yet seen and moves newly active ones to the front
    /// of the environment's active profiles.
    fn add_profiles(&mut self, environment: &mut ConfigurationEnvironment, profiles: ProfileSet) {
        for profile in &profiles {
            environment.prepend_active_profile(profile.name());
        }
        self.push_all(profiles);
    }

    /// Loads every candidate for one pass. Per extension, in ascending
    /// precedence: the plain file, the profile file's profile-less documents,
    /// files of already processed profiles filtered for this profile, and
    /// the profile file's documents for this profile.
    fn load_pass(
        &mut self,
        environment: &mut ConfigurationEnvironment,
        profile: Option<&str>,
    ) -> Result<(), ConfigError> {
        let (locations, names, extensions) = (self.locations, self.names, self.extensions);
        let earlier: Vec<String> = self
            .processed
            .iter()
            .map(|processed| processed.name().to_owned())
            .collect();
        for location in locations {
            if !location.ends_with('/') {
                self.load_file(environment, location, profile)?;
                continue;
            }
            for name in names {
                for extension in extensions {
                    let plain = format!("{location}{name}.{extension}");
                    self.load_candidate(environment, &plain, extension, profile)?;
                    let Some(profile_name) = profile else {
                        continue;
                    };
                    let specific = format!("{location}{name}-{profile_name}.{extension}");
                    let resource = self.probe(&specific, extension, profile)?;
                    if let Some(found) = &resource {
                        self.apply(environment, found, &specific, extension, None)?;
                    }
                    for processed in &earlier {
                        let file = format!("{location}{name}-{processed}.{extension}");
                        self.load_candidate(environment, &file, extension, profile)?;
                    }
                    if let Some(found) = &resource {
                        self.apply(environment, found, &specific, extension, profile)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Direct file reference: the extension comes from the location itself.
    fn load_file(
        &mut self,
        environment: &mut ConfigurationEnvironment,
        location: &str,
        profile: Option<&str>,
    ) -> Result<(), ConfigError> {
        let extension = location
            .rsplit_once('.')
            .map(|(_, extension)| extension)
            .filter(|extension| !extension.contains('/'));
        match extension {
            Some(extension) if self.loaders.loader_for(extension).is_some() => {
                self.load_candidate(environment, location, extension, profile)
            }
            _ => {
                trace!(
                    target: RESOLVER_TARGET,
                    location,
                    "skipping location without a supported extension"
                );
                Ok(())
            }
        }
    }

    /// Probes one candidate and loads it for `filter`.
    fn load_candidate(
        &mut self,
        environment: &mut ConfigurationEnvironment,
        location: &str,
        extension: &str,
        filter: Option<&str>,
    ) -> Result<(), ConfigError> {
        match self.probe(location, extension, filter)? {
            Some(resource) => self.apply(environment, &resource, location, extension, filter),
            None => Ok(()),
        }
    }

    /// Fetches a candidate. Missing resources and unsupported locations are
    /// skipped; a resource that exists but cannot be read is fatal.
    fn probe(
        &self,
        location: &str,
        extension: &str,
        filter: Option<&str>,
    ) -> Result<Option<Resource>, ConfigError> {
        if self.loaders.loader_for(extension).is_none() {
            return Ok(None);
        }
        match self.resources.load(location) {
            Ok(Some(resource)) => Ok(Some(resource)),
            Ok(None) => {
                trace!(target: RESOLVER_TARGET, location, profile = ?filter, "no resource found");
                Ok(None)
            }
            Err(error @ ResourceError::UnsupportedLocation { .. }) => {
                trace!(
                    target: RESOLVER_TARGET,
                    location,
                    error = %error,
                    "skipping unsupported location"
                );
                Ok(None)
            }
            Err(source) => Err(ConfigError::Read {
                location: location.to_owned(),
                source,
            }),
        }
    }

    /// Parses a fetched resource. `filter` is the profile passed to the
    /// loader; the loaded layer is tagged with it.
    fn apply(
        &mut self,
        environment: &mut ConfigurationEnvironment,
        resource: &Resource,
        location: &str,
        extension: &str,
        filter: Option<&str>,
    ) -> Result<(), ConfigError> {
        let loaders = self.loaders;
        let Some(loader) = loaders.loader_for(extension) else {
            return Ok(());
        };
        let name = layer_name(location, filter);
        let layer = loader
            .load(&name, resource, filter)
            .map_err(|source| ConfigError::Load {
                location: location.to_owned(),
                source,
            })?;
        let Some(layer) = layer else {
            trace!(target: RESOLVER_TARGET, location, profile = ?filter, "resource has no applicable entries");
            return Ok(());
        };
        debug!(
            target: RESOLVER_TARGET,
            location,
            resource = resource.description(),
            profile = ?filter,
            "loaded configuration file"
        );
        let layer = layer.with_profile(filter);
        self.handle_profile_properties(environment, &layer)?;
        self.loaded.push(layer);
        Ok(())
    }

    /// Honours `liftoff.profiles.active` and `liftoff.profiles.include`
    /// declared inside a loaded layer.
    fn handle_profile_properties(
        &mut self,
        environment: &mut ConfigurationEnvironment,
        layer: &ConfigurationLayer,
    ) -> Result<(), ConfigError> {
        let mut scope = environment.clone();
        scope.add_first(layer.clone());
        let active = profiles_from(&scope, layer, ACTIVE_PROFILES_KEY)?;
        let include = profiles_from(&scope, layer, INCLUDE_PROFILES_KEY)?;
        self.maybe_activate(environment, active);
        self.add_profiles(environment, include);
        Ok(())
    }
}

/// Something answering property lookups.
trait PropertySource {
    fn property(&self, key: &str) -> Option<String>;
}

impl PropertySource for ConfigurationEnvironment {
    fn property(&self, key: &str) -> Option<String> {
        self.get_property(key).map(Cow::into_owned)
    }
}

impl PropertySource for ConfigurationLayer {
    fn property(&self, key: &str) -> Option<String> {
        self.get(key).map(Cow::into_owned)
    }
}

/// Reads a profile list from `source`, resolving placeholders in `scope`.
fn profiles_from(
    scope: &ConfigurationEnvironment,
    source: &impl PropertySource,
    key: &str,
) -> Result<ProfileSet, ConfigError> {
    match source.property(key) {
        Some(raw) => parse_profiles(key, &scope.resolve_placeholders(&raw)?),
        None => Ok(ProfileSet::new()),
    }
}

fn layer_name(location: &str, filter: Option<&str>) -> String {
    match filter {
        Some(profile) => format!("{LAYER_PREFIX}: [{location}] (profile={profile})"),
        None => format!("{LAYER_PREFIX}: [{location}]"),
    }
}
