//! `.yml`/`.yaml` files, including multi-document files with
//! profile-specific documents.

use serde::Deserialize;
use serde_yaml::Value;
use thiserror::Error;

use super::{LayerLoader, join_key};
use crate::defaults::DOCUMENT_PROFILES_KEY;
use crate::profile::split_list;
use crate::{ConfigurationLayer, LoaderError, Resource};

/// Loads YAML files, flattening nested keys with `.` and sequence indices
/// with `[i]`.
///
/// Each `---` separated document is considered separately. A document that
/// declares `liftoff.profiles` applies only when loading for one of the listed
/// profiles (`!name` negates); documents without it apply to the profile-less
/// load. Matching documents are merged in file order.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlLayerLoader;

/// Errors raised while parsing a YAML file.
#[derive(Debug, Error)]
pub enum YamlError {
    /// The text is not valid YAML.
    #[error(transparent)]
    Parse(#[from] serde_yaml::Error),
    /// A document root was a scalar or sequence.
    #[error("document {document} must be a mapping")]
    NonMappingRoot {
        /// Zero-based document index.
        document: usize,
    },
}

impl LayerLoader for YamlLayerLoader {
    fn file_extensions(&self) -> &[&'static str] {
        &["yml", "yaml"]
    }

    fn load(
        &self,
        name: &str,
        resource: &Resource,
        profile: Option<&str>,
    ) -> Result<Option<ConfigurationLayer>, LoaderError> {
        let mut merged = Vec::new();
        for document in documents(resource.contents())? {
            if document_applies(&document, profile) {
                merged.extend(document);
            }
        }
        if merged.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            ConfigurationLayer::new(name, merged).with_origin(resource.location()),
        ))
    }
}

/// Parses every document into flattened entries. Empty documents are skipped.
pub(crate) fn documents(text: &str) -> Result<Vec<Vec<(String, String)>>, YamlError> {
    let mut parsed = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = Value::deserialize(document)?;
        match value {
            Value::Null => {}
            Value::Mapping(_) | Value::Tagged(_) => {
                let mut entries = Vec::new();
                flatten("", &value, &mut entries);
                if !entries.is_empty() {
                    parsed.push(entries);
                }
            }
            _ => return Err(YamlError::NonMappingRoot { document: index }),
        }
    }
    Ok(parsed)
}

fn flatten(prefix: &str, value: &Value, entries: &mut Vec<(String, String)>) {
    match value {
        Value::Mapping(mapping) => {
            for (key, child) in mapping {
                if let Some(segment) = scalar_text(key) {
                    flatten(&join_key(prefix, &segment), child, entries);
                }
            }
        }
        Value::Sequence(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten(&format!("{prefix}[{index}]"), child, entries);
            }
        }
        Value::Tagged(tagged) => flatten(prefix, &tagged.value, entries),
        scalar => {
            if !prefix.is_empty() {
                entries.push((prefix.to_owned(), scalar_text(scalar).unwrap_or_default()));
            }
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) => Some(text.clone()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Profile names a document is restricted to, from either a scalar list or a
/// sequence.
fn document_profiles(document: &[(String, String)]) -> Vec<&str> {
    document
        .iter()
        .filter(|(key, _)| {
            key == DOCUMENT_PROFILES_KEY
                || key
                    .strip_prefix(DOCUMENT_PROFILES_KEY)
                    .is_some_and(|rest| rest.starts_with('['))
        })
        .flat_map(|(_, value)| split_list(value))
        .collect()
}

fn document_applies(document: &[(String, String)], profile: Option<&str>) -> bool {
    let expressions = document_profiles(document);
    match profile {
        None => expressions.is_empty(),
        Some(profile) => expressions.iter().any(|expression| {
            expression
                .strip_prefix('!')
                .map_or(*expression == profile, |negated| negated != profile)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const MULTI_DOCUMENT: &str = "\
server:
  port: 8080
  hosts:
    - alpha
    - beta
---
liftoff:
  profiles: dev
server:
  port: 9000
---
liftoff:
  profiles: '!dev'
server:
  port: 9100
";

    #[fixture]
    fn resource() -> Resource {
        Resource::new("classpath:/application.yml", "", MULTI_DOCUMENT)
    }

    fn load(resource: &Resource, profile: Option<&str>) -> Option<ConfigurationLayer> {
        YamlLayerLoader
            .load("applicationConfig", resource, profile)
            .expect("yaml parses")
    }

    #[rstest]
    fn base_load_flattens_profile_less_documents(resource: Resource) {
        let layer = load(&resource, None).expect("layer");
        assert_eq!(layer.get("server.port").as_deref(), Some("8080"));
        assert_eq!(layer.get("server.hosts[1]").as_deref(), Some("beta"));
        assert!(!layer.contains("liftoff.profiles"));
    }

    #[rstest]
    #[case("dev", "9000")]
    #[case("prod", "9100")]
    fn profile_documents_match_by_name_or_negation(
        resource: Resource,
        #[case] profile: &str,
        #[case] port: &str,
    ) {
        let layer = load(&resource, Some(profile)).expect("layer");
        assert_eq!(layer.get("server.port").as_deref(), Some(port));
        assert!(!layer.contains("server.hosts[0]"));
    }

    #[rstest]
    fn profile_without_matching_document_yields_nothing() {
        let resource = Resource::new("classpath:/application.yml", "", "a: 1");
        assert!(load(&resource, Some("dev")).is_none());
    }

    #[rstest]
    fn profile_lists_may_be_sequences() {
        let resource = Resource::new(
            "classpath:/application.yml",
            "",
            "liftoff:\n  profiles: [qa, uat]\na: 1\n",
        );
        assert!(load(&resource, Some("uat")).is_some());
        assert!(load(&resource, None).is_none());
    }

    #[rstest]
    fn scalar_roots_are_rejected() {
        let resource = Resource::new("classpath:/application.yml", "", "just text");
        assert!(YamlLayerLoader.load("applicationConfig", &resource, None).is_err());
    }

    #[rstest]
    fn malformed_yaml_is_an_error() {
        let resource = Resource::new("classpath:/application.yml", "", "a: [1, 2");
        assert!(YamlLayerLoader.load("applicationConfig", &resource, None).is_err());
    }
}
