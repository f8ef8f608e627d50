//! Shared helpers for resolution tests.

use std::cell::RefCell;

use crate::defaults::ACTIVE_PROFILES_KEY;
use crate::{
    ConfigError, ConfigResolver, ConfigurationEnvironment, ConfigurationLayer,
    MemoryResourceLoader, Resource, ResourceError, ResourceLoader, ResolutionSummary,
};

/// Name of the base layer tests seed properties into.
pub(super) const BASE_LAYER: &str = "base";

/// Memory resources that remember every probed location.
#[derive(Debug, Default)]
pub(super) struct RecordingResources {
    inner: MemoryResourceLoader,
    probes: RefCell<Vec<String>>,
}

impl RecordingResources {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn with(mut self, location: &str, contents: &str) -> Self {
        self.inner.insert(location, contents);
        self
    }

    pub(super) fn insert(&mut self, location: &str, contents: &str) {
        self.inner.insert(location, contents);
    }

    pub(super) fn probes(&self) -> Vec<String> {
        self.probes.borrow().clone()
    }
}

impl ResourceLoader for RecordingResources {
    fn load(&self, location: &str) -> Result<Option<Resource>, ResourceError> {
        self.probes.borrow_mut().push(location.to_owned());
        self.inner.load(location)
    }
}

/// Resolver searching only `classpath:/` for `application`.
pub(super) fn classpath_resolver() -> ConfigResolver {
    ConfigResolver::new().with_search_locations(["classpath:/"])
}

/// Environment holding a single base layer with `entries`.
pub(super) fn base_environment(entries: &[(&str, &str)]) -> ConfigurationEnvironment {
    let mut environment = ConfigurationEnvironment::new();
    environment.add_last(ConfigurationLayer::new(
        BASE_LAYER,
        entries.iter().copied(),
    ));
    environment
}

/// Environment activating `profiles` through the base layer.
pub(super) fn active(profiles: &str) -> ConfigurationEnvironment {
    base_environment(&[(ACTIVE_PROFILES_KEY, profiles)])
}

/// Runs `resolver` over `resources` and returns the environment.
pub(super) fn resolve_with(
    resolver: &ConfigResolver,
    mut environment: ConfigurationEnvironment,
    resources: &dyn ResourceLoader,
) -> Result<(ConfigurationEnvironment, ResolutionSummary), ConfigError> {
    let summary = resolver.resolve(&mut environment, resources)?;
    Ok((environment, summary))
}

/// Value of `key`, or a panic naming the missing key.
pub(super) fn property(environment: &ConfigurationEnvironment, key: &str) -> String {
    environment
        .get_property(key)
        .unwrap_or_else(|| panic!("property {key} missing"))
        .into_owned()
}

/// Layer name used for a file loaded without a profile filter.
pub(super) fn file_layer(location: &str) -> String {
    format!("applicationConfig: [{location}]")
}
