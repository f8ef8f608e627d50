//! Ordered key/value layers and their origins.

use std::borrow::Cow;
use std::fmt;

use crate::defaults::{RANDOM_LAYER, SYSTEM_ENVIRONMENT_LAYER};
use crate::random;

/// Backing store of a [`ConfigurationLayer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerSource {
    /// Explicit entries in insertion order.
    Entries(Vec<(String, String)>),
    /// Process environment variables, matched with relaxed key names.
    SystemEnvironment(Vec<(String, String)>),
    /// Generates a fresh value for every `random.*` lookup.
    Random,
}

/// One ordered mapping of keys to values with a known origin.
///
/// Layers are immutable once built; the builder-style `with_*` methods
/// consume the layer and return an updated copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationLayer {
    name: String,
    origin: Option<String>,
    profile: Option<String>,
    source: LayerSource,
}

impl ConfigurationLayer {
    /// Builds a layer from key/value pairs. A repeated key keeps its first
    /// position and its last value.
    pub fn new<I, K, V>(name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::with_source(name, LayerSource::Entries(dedupe(entries)))
    }

    /// Builds a layer that answers lookups from a snapshot of environment
    /// variables.
    pub fn system_environment<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::with_source(
            SYSTEM_ENVIRONMENT_LAYER,
            LayerSource::SystemEnvironment(dedupe(entries)),
        )
    }

    /// Builds the non-enumerable `random` layer.
    #[must_use]
    pub fn random() -> Self {
        Self::with_source(RANDOM_LAYER, LayerSource::Random)
    }

    fn with_source(name: impl Into<String>, source: LayerSource) -> Self {
        Self {
            name: name.into(),
            origin: None,
            profile: None,
            source,
        }
    }

    /// Records the resource location the layer was read from.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Tags the layer with the profile it was loaded for.
    #[must_use]
    pub fn with_profile(mut self, profile: Option<&str>) -> Self {
        self.profile = profile.map(str::to_owned);
        self
    }

    /// Logical name, unique within an environment.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resource location the layer was read from.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Profile the layer was loaded for, if any.
    #[must_use]
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Backing store.
    #[must_use]
    pub const fn source(&self) -> &LayerSource {
        &self.source
    }

    /// Looks up a key in this layer only.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        match &self.source {
            LayerSource::Entries(entries) => lookup(entries, key).map(Cow::Borrowed),
            LayerSource::SystemEnvironment(entries) => relaxed_names(key)
                .iter()
                .find_map(|candidate| lookup(entries, candidate))
                .map(Cow::Borrowed),
            LayerSource::Random => random::value(key).map(Cow::Owned),
        }
    }

    /// Returns whether the layer answers the key.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Enumerates the keys in insertion order. The random layer is not
    /// enumerable and yields nothing.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries().iter().map(|(key, _)| key.as_str())
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        match &self.source {
            LayerSource::Entries(entries) | LayerSource::SystemEnvironment(entries) => entries,
            LayerSource::Random => &[],
        }
    }

    /// Number of enumerable entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns whether the layer has no enumerable entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Returns a copy whose entries are overlaid by `overrides`; keys present
    /// in both take the value from `overrides`.
    #[must_use]
    pub fn overlaid_by(&self, overrides: &Self) -> Self {
        let merged = self
            .entries()
            .iter()
            .chain(overrides.entries())
            .map(|(key, value)| (key.clone(), value.clone()));
        let mut layer = Self::new(self.name.clone(), merged);
        layer.origin.clone_from(&self.origin);
        layer.profile.clone_from(&self.profile);
        layer
    }
}

impl fmt::Display for ConfigurationLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn lookup<'a>(entries: &'a [(String, String)], key: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|(candidate, _)| candidate == key)
        .map(|(_, value)| value.as_str())
}

fn dedupe<I, K, V>(entries: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut deduped: Vec<(String, String)> = Vec::new();
    for (key, value) in entries {
        let key = key.into();
        let value = value.into();
        match deduped.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => deduped.push((key, value)),
        }
    }
    deduped
}

/// Candidate spellings of a key inside the process environment:
/// `a.b-c`, `a_b-c`, `a.b_c`, `a_b_c`, then the upper-case variants.
fn relaxed_names(key: &str) -> Vec<String> {
    let dots = key.replace('.', "_");
    let dashes = key.replace('-', "_");
    let both = dots.replace('-', "_");
    let mut names = vec![key.to_owned(), dots, dashes, both];
    let upper: Vec<String> = names.iter().map(|name| name.to_uppercase()).collect();
    names.extend(upper);
    names.dedup();
    names
}
