//! Process arguments as the highest-precedence configuration layer.

use crate::defaults::{COMMAND_LINE_LAYER, NON_OPTION_ARGS_KEY};
use crate::{ConfigError, ConfigurationEnvironment, ConfigurationLayer};

const OPTION_PREFIX: &str = "--";

/// Parsed `--name=value` options and positional arguments.
///
/// `--name` without a value binds the empty string. Repeating an option
/// collects its values, which the layer exposes comma-separated. Arguments
/// not starting with `--` are collected under `nonOptionArgs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLineArgs {
    options: Vec<(String, Vec<String>)>,
    non_option_args: Vec<String>,
}

impl CommandLineArgs {
    /// Parses process arguments, excluding the program name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidArgument`] for `--` or `--=value`.
    pub fn parse<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Self::default();
        for raw in args {
            let arg = raw.as_ref();
            let Some(option) = arg.strip_prefix(OPTION_PREFIX) else {
                parsed.non_option_args.push(arg.to_owned());
                continue;
            };
            let (name, value) = match option.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (option, None),
            };
            if name.is_empty() {
                return Err(ConfigError::InvalidArgument {
                    argument: arg.to_owned(),
                });
            }
            parsed.push_option(name, value);
        }
        Ok(parsed)
    }

    fn push_option(&mut self, name: &str, value: Option<&str>) {
        let index = match self.options.iter().position(|(known, _)| known == name) {
            Some(index) => index,
            None => {
                self.options.push((name.to_owned(), Vec::new()));
                self.options.len() - 1
            }
        };
        if let (Some(text), Some((_, values))) = (value, self.options.get_mut(index)) {
            values.push(text.to_owned());
        }
    }

    /// Returns whether no arguments were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty() && self.non_option_args.is_empty()
    }

    /// Option names in first-seen order.
    pub fn option_names(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|(name, _)| name.as_str())
    }

    /// Values given for an option; empty for a bare `--name`.
    #[must_use]
    pub fn option_values(&self, name: &str) -> Option<&[String]> {
        self.options
            .iter()
            .find(|(known, _)| known == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Arguments not starting with `--`.
    #[must_use]
    pub fn non_option_args(&self) -> &[String] {
        &self.non_option_args
    }

    /// Builds the `commandLineArgs` layer.
    #[must_use]
    pub fn to_layer(&self) -> ConfigurationLayer {
        let mut entries: Vec<(String, String)> = self
            .options
            .iter()
            .map(|(name, values)| (name.clone(), values.join(",")))
            .collect();
        if !self.non_option_args.is_empty() {
            entries.push((NON_OPTION_ARGS_KEY.to_owned(), self.non_option_args.join(",")));
        }
        ConfigurationLayer::new(COMMAND_LINE_LAYER, entries)
    }

    /// Installs the arguments as the first layer of `environment`.
    ///
    /// An existing `commandLineArgs` layer keeps its position and is overlaid
    /// with these arguments. Nothing happens when there are no arguments.
    pub fn apply_to(&self, environment: &mut ConfigurationEnvironment) {
        if self.is_empty() {
            return;
        }
        let layer = self.to_layer();
        match environment.layer(COMMAND_LINE_LAYER) {
            Some(existing) => {
                let merged = existing.overlaid_by(&layer);
                environment.replace(COMMAND_LINE_LAYER, merged);
            }
            None => environment.add_first(layer),
        }
    }
}
