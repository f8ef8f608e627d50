//! Profiles and comma-separated profile lists.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::ConfigError;

/// A named configuration activation mode.
///
/// Equality and hashing consider the name only, so a default profile and an
/// explicitly activated profile with the same name are the same profile.
#[derive(Debug, Clone, Eq)]
pub struct Profile {
    name: String,
    implicit_default: bool,
}

impl Profile {
    /// Creates an explicitly activated profile.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            implicit_default: false,
        }
    }

    /// Creates an implicit default profile.
    pub fn implicit_default(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            implicit_default: true,
        }
    }

    /// Profile name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether the profile was applied only because nothing else was
    /// active.
    #[must_use]
    pub const fn is_implicit_default(&self) -> bool {
        self.implicit_default
    }
}

impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Hash for Profile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Insertion-ordered set of profiles keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSet {
    profiles: Vec<Profile>,
}

impl ProfileSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            profiles: Vec::new(),
        }
    }

    /// Adds a profile; returns `false` when a profile with the same name is
    /// already present.
    pub fn insert(&mut self, profile: Profile) -> bool {
        if self.contains(profile.name()) {
            return false;
        }
        self.profiles.push(profile);
        true
    }

    /// Adds every profile in order, skipping names already present.
    pub fn extend(&mut self, profiles: impl IntoIterator<Item = Profile>) {
        for profile in profiles {
            self.insert(profile);
        }
    }

    /// Returns whether a profile with this name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.profiles.iter().any(|profile| profile.name() == name)
    }

    /// Returns whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Number of profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Profiles in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[Profile] {
        &self.profiles
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Profile> {
        self.profiles.iter()
    }
}

impl fmt::Display for ProfileSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.profiles.iter().map(Profile::name).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

impl IntoIterator for ProfileSet {
    type Item = Profile;
    type IntoIter = std::vec::IntoIter<Profile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.into_iter()
    }
}

impl<'a> IntoIterator for &'a ProfileSet {
    type Item = &'a Profile;
    type IntoIter = std::slice::Iter<'a, Profile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.iter()
    }
}

impl FromIterator<Profile> for ProfileSet {
    fn from_iter<T: IntoIterator<Item = Profile>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

/// Splits a comma-separated value into trimmed, non-empty entries.
pub(crate) fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|entry| !entry.is_empty())
}

/// Binds a comma-separated profile list read from `key`.
///
/// Empty entries are ignored; entries containing whitespace are rejected.
pub fn parse_profiles(key: &str, raw: &str) -> Result<ProfileSet, ConfigError> {
    let mut profiles = ProfileSet::new();
    for entry in split_list(raw) {
        if entry.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidProfile {
                key: key.to_owned(),
                profile: entry.to_owned(),
                reason: "profile names must not contain whitespace",
            });
        }
        profiles.insert(Profile::new(entry));
    }
    Ok(profiles)
}
