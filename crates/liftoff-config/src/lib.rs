//! Layered, profile-aware configuration for the liftoff bootstrap runtime.
//!
//! A [`ConfigurationEnvironment`] is an ordered stack of
//! [`ConfigurationLayer`]s in which the front layer wins. The
//! [`ConfigResolver`] discovers configuration files across search locations,
//! names, file formats and profiles and inserts them into a base environment
//! that already holds the process environment and command-line layers.
//!
//! # Layers
//!
//! - `commandLineArgs`: `--name=value` process arguments ([`CommandLineArgs`])
//! - `systemEnvironment`: environment variables with relaxed key matching
//! - `random`: `random.int`, `random.uuid` and friends
//! - `applicationConfig: [...]`: one layer per loaded file, the last
//!   discovered first
//! - `defaultProperties`: programmatic defaults, always last
//!
//! # Formats
//!
//! [`LayerLoaders`] maps file extensions to [`LayerLoader`] implementations.
//! The default registry understands `.properties`, `.yml`/`.yaml` (with
//! profile-specific documents) and `.toml`.
//!
//! # Example
//!
//! ```ignore
//! use liftoff_config::{
//!     CommandLineArgs, ConfigResolver, ConfigurationEnvironment, FileSystemResourceLoader,
//! };
//!
//! let mut environment = ConfigurationEnvironment::standard();
//! CommandLineArgs::parse(std::env::args().skip(1))?.apply_to(&mut environment);
//! ConfigResolver::new().resolve(&mut environment, &FileSystemResourceLoader::current_dir())?;
//! let port = environment.get_property("server.port");
//! ```

mod command_line;
pub mod defaults;
mod environment;
mod error;
mod layer;
mod loader;
mod logging;
mod profile;
mod random;
mod resolver;
mod resource;

pub use command_line::CommandLineArgs;
pub use environment::ConfigurationEnvironment;
pub use error::{ConfigError, LoaderError, ResourceError};
pub use layer::{ConfigurationLayer, LayerSource};
pub use loader::{
    LayerLoader, LayerLoaders, PropertiesError, PropertiesLayerLoader, TomlLayerLoader,
    YamlError, YamlLayerLoader,
};
pub use logging::{LogFormat, LogFormatParseError, LogSettings};
pub use profile::{Profile, ProfileSet, parse_profiles};
pub use resolver::{ConfigResolver, ResolutionSummary};
pub use resource::{FileSystemResourceLoader, MemoryResourceLoader, Resource, ResourceLoader};

#[cfg(test)]
mod tests;
