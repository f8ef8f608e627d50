//! `.toml` files, flattened the same way as YAML.

use toml::{Table, Value};

use super::{LayerLoader, join_key};
use crate::{ConfigurationLayer, LoaderError, Resource};

/// Loads TOML files. Tables nest with `.`, arrays with `[i]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlLayerLoader;

impl LayerLoader for TomlLayerLoader {
    fn file_extensions(&self) -> &[&'static str] {
        &["toml"]
    }

    fn load(
        &self,
        name: &str,
        resource: &Resource,
        profile: Option<&str>,
    ) -> Result<Option<ConfigurationLayer>, LoaderError> {
        if profile.is_some() {
            return Ok(None);
        }
        let table: Table = resource.contents().parse()?;
        let mut entries = Vec::new();
        flatten_table("", &table, &mut entries);
        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            ConfigurationLayer::new(name, entries).with_origin(resource.location()),
        ))
    }
}

fn flatten_table(prefix: &str, table: &Table, entries: &mut Vec<(String, String)>) {
    for (key, value) in table {
        flatten(&join_key(prefix, key), value, entries);
    }
}

fn flatten(key: &str, value: &Value, entries: &mut Vec<(String, String)>) {
    match value {
        Value::Table(table) => flatten_table(key, table, entries),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(&format!("{key}[{index}]"), item, entries);
            }
        }
        Value::String(text) => entries.push((key.to_owned(), text.clone())),
        Value::Integer(number) => entries.push((key.to_owned(), number.to_string())),
        Value::Float(number) => entries.push((key.to_owned(), number.to_string())),
        Value::Boolean(flag) => entries.push((key.to_owned(), flag.to_string())),
        Value::Datetime(datetime) => entries.push((key.to_owned(), datetime.to_string())),
    }
}
