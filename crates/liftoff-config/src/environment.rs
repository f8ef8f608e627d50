//! The ordered layer stack and resolved profile state for one run.

use std::borrow::Cow;

use crate::defaults::{DEFAULT_PROFILE, SYSTEM_ENVIRONMENT_LAYER};
use crate::{ConfigError, ConfigurationLayer};

const PLACEHOLDER_PREFIX: &str = "${";
const PLACEHOLDER_SUFFIX: char = '}';
const VALUE_SEPARATOR: char = ':';

/// Ordered stack of configuration layers plus profile state.
///
/// The front of the stack has the highest precedence: for a key present in
/// several layers, [`ConfigurationEnvironment::get_property`] returns the
/// value from the earliest layer. Layer names are unique; adding a layer
/// whose name is already present replaces the old position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationEnvironment {
    layers: Vec<ConfigurationLayer>,
    active_profiles: Vec<String>,
    default_profiles: Vec<String>,
}

impl Default for ConfigurationEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationEnvironment {
    /// Creates an environment with no layers and the `default` default
    /// profile.
    #[must_use]
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            active_profiles: Vec::new(),
            default_profiles: vec![DEFAULT_PROFILE.to_owned()],
        }
    }

    /// Creates an environment holding a snapshot of the process environment
    /// followed by the `random` layer.
    #[must_use]
    pub fn standard() -> Self {
        let mut environment = Self::new();
        environment.add_last(ConfigurationLayer::system_environment(std::env::vars()));
        environment.add_last(ConfigurationLayer::random());
        environment
    }

    /// Layers in precedence order.
    #[must_use]
    pub fn layers(&self) -> &[ConfigurationLayer] {
        &self.layers
    }

    /// Layer names in precedence order.
    #[must_use]
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(ConfigurationLayer::name).collect()
    }

    /// Finds a layer by name.
    #[must_use]
    pub fn layer(&self, name: &str) -> Option<&ConfigurationLayer> {
        self.layers.iter().find(|layer| layer.name() == name)
    }

    /// Returns whether a layer with this name is present.
    #[must_use]
    pub fn contains_layer(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|layer| layer.name() == name)
    }

    /// Adds a layer with the highest precedence.
    pub fn add_first(&mut self, layer: ConfigurationLayer) {
        self.remove(layer.name());
        self.layers.insert(0, layer);
    }

    /// Adds a layer with the lowest precedence.
    pub fn add_last(&mut self, layer: ConfigurationLayer) {
        self.remove(layer.name());
        self.layers.push(layer);
    }

    /// Inserts a layer immediately ahead of `relative`. Returns `false` and
    /// leaves the stack unchanged when `relative` is absent.
    pub fn add_before(&mut self, relative: &str, layer: ConfigurationLayer) -> bool {
        self.insert_relative(relative, layer, 0)
    }

    /// Inserts a layer immediately behind `relative`. Returns `false` and
    /// leaves the stack unchanged when `relative` is absent.
    pub fn add_after(&mut self, relative: &str, layer: ConfigurationLayer) -> bool {
        self.insert_relative(relative, layer, 1)
    }

    fn insert_relative(&mut self, relative: &str, layer: ConfigurationLayer, offset: usize) -> bool {
        if relative == layer.name() || !self.contains_layer(relative) {
            return false;
        }
        self.remove(layer.name());
        match self.position(relative) {
            Some(index) => {
                self.layers.insert(index + offset, layer);
                true
            }
            None => false,
        }
    }

    /// Replaces a layer in place, returning the previous layer.
    pub fn replace(&mut self, name: &str, layer: ConfigurationLayer) -> Option<ConfigurationLayer> {
        let index = self.position(name)?;
        if layer.name() != name {
            self.remove(layer.name());
        }
        let index = self.position(name).unwrap_or(index);
        self.layers
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, layer))
    }

    /// Removes a layer by name.
    pub fn remove(&mut self, name: &str) -> Option<ConfigurationLayer> {
        let index = self.position(name)?;
        Some(self.layers.remove(index))
    }

    /// Effective value of a key: the value from the earliest layer holding it.
    #[must_use]
    pub fn get_property(&self, key: &str) -> Option<Cow<'_, str>> {
        self.layers.iter().find_map(|layer| layer.get(key))
    }

    /// Returns whether any layer holds the key.
    #[must_use]
    pub fn contains_property(&self, key: &str) -> bool {
        self.layers.iter().any(|layer| layer.contains(key))
    }

    /// Active profiles in activation order.
    #[must_use]
    pub fn active_profiles(&self) -> &[String] {
        &self.active_profiles
    }

    /// Replaces the active profiles, dropping duplicate names.
    pub fn set_active_profiles<I, S>(&mut self, profiles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_profiles.clear();
        for profile in profiles {
            self.add_active_profile(profile);
        }
    }

    /// Appends an active profile unless it is already active.
    pub fn add_active_profile(&mut self, profile: impl Into<String>) {
        let name = profile.into();
        if !self.active_profiles.contains(&name) {
            self.active_profiles.push(name);
        }
    }

    /// Puts a profile first unless it is already active, in which case its
    /// position is kept.
    pub fn prepend_active_profile(&mut self, profile: impl Into<String>) {
        let name = profile.into();
        if !self.active_profiles.contains(&name) {
            self.active_profiles.insert(0, name);
        }
    }

    /// Profiles applied when no profile is active.
    #[must_use]
    pub fn default_profiles(&self) -> &[String] {
        &self.default_profiles
    }

    /// Replaces the default profiles, dropping duplicate names.
    pub fn set_default_profiles<I, S>(&mut self, profiles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_profiles.clear();
        for profile in profiles {
            let profile = profile.into();
            if !self.default_profiles.contains(&profile) {
                self.default_profiles.push(profile);
            }
        }
    }

    /// Returns whether the process environment layer is present.
    #[must_use]
    pub fn has_system_environment(&self) -> bool {
        self.contains_layer(SYSTEM_ENVIRONMENT_LAYER)
    }

    /// Replaces `${key}` and `${key:default}` placeholders with values from
    /// this environment. Placeholders may nest, and resolved values are
    /// themselves resolved.
    pub fn resolve_placeholders(&self, value: &str) -> Result<String, ConfigError> {
        let mut visiting = Vec::new();
        self.resolve_nested(value, value, &mut visiting)
    }

    fn resolve_nested(
        &self,
        value: &str,
        original: &str,
        visiting: &mut Vec<String>,
    ) -> Result<String, ConfigError> {
        let mut output = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find(PLACEHOLDER_PREFIX) {
            let (head, tail) = rest.split_at(start);
            output.push_str(head);
            let body_and_rest = tail.get(PLACEHOLDER_PREFIX.len()..).unwrap_or_default();
            let Some(end) = placeholder_end(body_and_rest) else {
                output.push_str(tail);
                rest = "";
                break;
            };
            let (raw_body, after) = body_and_rest.split_at(end);
            rest = after.get(PLACEHOLDER_SUFFIX.len_utf8()..).unwrap_or_default();

            let body = self.resolve_nested(raw_body, original, visiting)?;
            let (key, fallback) = match body.split_once(VALUE_SEPARATOR) {
                Some((key, fallback)) => (key, Some(fallback)),
                None => (body.as_str(), None),
            };
            if visiting.iter().any(|seen| seen == key) {
                return Err(ConfigError::CircularPlaceholder {
                    placeholder: key.to_owned(),
                    value: original.to_owned(),
                });
            }
            match (self.get_property(key), fallback) {
                (Some(found), _) => {
                    visiting.push(key.to_owned());
                    let resolved = self.resolve_nested(&found, original, visiting)?;
                    visiting.pop();
                    output.push_str(&resolved);
                }
                (None, Some(fallback)) => {
                    let resolved = self.resolve_nested(fallback, original, visiting)?;
                    output.push_str(&resolved);
                }
                (None, None) => {
                    return Err(ConfigError::UnresolvablePlaceholder {
                        placeholder: key.to_owned(),
                        value: original.to_owned(),
                    });
                }
            }
        }
        output.push_str(rest);
        Ok(output)
    }
}

/// Byte offset of the `}` closing a placeholder body, honouring nesting.
fn placeholder_end(body: &str) -> Option<usize> {
    let mut depth = 0_usize;
    for (index, character) in body.char_indices() {
        if character == PLACEHOLDER_SUFFIX {
            if depth == 0 {
                return Some(index);
            }
            depth -= 1;
        } else if body
            .get(index..)
            .is_some_and(|remaining| remaining.starts_with(PLACEHOLDER_PREFIX))
        {
            depth += 1;
        }
    }
    None
}
