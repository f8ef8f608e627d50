//! Access to candidate configuration resources.
//!
//! Locations use the `classpath:` and `file:` prefixes of the search list.
//! `classpath:` resolves against an ordered list of resource roots, `file:`
//! (and an unprefixed path) against the working directory.

use std::collections::BTreeMap;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};

use crate::ResourceError;

const CLASSPATH_PREFIX: &str = "classpath:";
const FILE_PREFIX: &str = "file:";

/// Contents of a readable configuration resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    location: String,
    description: String,
    contents: String,
}

impl Resource {
    /// Wraps the text read from `location`.
    pub fn new(
        location: impl Into<String>,
        description: impl Into<String>,
        contents: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            description: description.into(),
            contents: contents.into(),
        }
    }

    /// Location the resource was requested under.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Human readable description, typically the resolved path.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Text contents.
    #[must_use]
    pub fn contents(&self) -> &str {
        &self.contents
    }
}

/// Resolves resource locations to readable resources.
///
/// `Ok(None)` means the resource does not exist, which is the common case
/// while probing. Errors are reserved for resources that exist but cannot be
/// read, or locations the loader cannot interpret.
#[cfg_attr(test, mockall::automock)]
pub trait ResourceLoader {
    /// Loads the resource at `location`, if present.
    fn load(&self, location: &str) -> Result<Option<Resource>, ResourceError>;
}

impl<T: ResourceLoader + ?Sized> ResourceLoader for &T {
    fn load(&self, location: &str) -> Result<Option<Resource>, ResourceError> {
        (**self).load(location)
    }
}

impl<T: ResourceLoader + ?Sized> ResourceLoader for Box<T> {
    fn load(&self, location: &str) -> Result<Option<Resource>, ResourceError> {
        (**self).load(location)
    }
}

/// Loads resources from the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSystemResourceLoader {
    classpath_roots: Vec<Utf8PathBuf>,
    working_dir: Utf8PathBuf,
}

impl FileSystemResourceLoader {
    /// Creates a loader resolving `file:` locations against `working_dir` and
    /// with no `classpath:` roots.
    pub fn new(working_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            classpath_roots: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    /// Creates a loader for the process working directory.
    ///
    /// Falls back to `.` when the working directory is not valid UTF-8 or
    /// cannot be read.
    #[must_use]
    pub fn current_dir() -> Self {
        let working_dir = std::env::current_dir()
            .ok()
            .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
            .unwrap_or_else(|| Utf8PathBuf::from("."));
        Self::new(working_dir)
    }

    /// Adds a root searched for `classpath:` locations. Roots are consulted
    /// in the order they were added.
    #[must_use]
    pub fn with_classpath_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.classpath_roots.push(root.into());
        self
    }

    /// Roots searched for `classpath:` locations.
    #[must_use]
    pub fn classpath_roots(&self) -> &[Utf8PathBuf] {
        &self.classpath_roots
    }

    /// Directory `file:` locations are resolved against.
    #[must_use]
    pub fn working_dir(&self) -> &Utf8Path {
        &self.working_dir
    }

    fn candidates(&self, location: &str) -> Result<Vec<Utf8PathBuf>, ResourceError> {
        if let Some(path) = location.strip_prefix(CLASSPATH_PREFIX) {
            let relative = path.trim_start_matches('/');
            return Ok(self
                .classpath_roots
                .iter()
                .map(|root| root.join(relative))
                .collect());
        }
        let path = location.strip_prefix(FILE_PREFIX).unwrap_or(location);
        if has_unknown_scheme(path) {
            return Err(ResourceError::UnsupportedLocation {
                location: location.to_owned(),
            });
        }
        let path = Utf8Path::new(path);
        if path.is_absolute() {
            Ok(vec![path.to_path_buf()])
        } else {
            Ok(vec![self.working_dir.join(path)])
        }
    }
}

impl Default for FileSystemResourceLoader {
    fn default() -> Self {
        Self::current_dir()
    }
}

impl ResourceLoader for FileSystemResourceLoader {
    fn load(&self, location: &str) -> Result<Option<Resource>, ResourceError> {
        for path in self.candidates(location)? {
            if !path.is_file() {
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(contents) => {
                    return Ok(Some(Resource::new(location, path.as_str(), contents)));
                }
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(ResourceError::Read {
                        location: location.to_owned(),
                        source,
                    });
                }
            }
        }
        Ok(None)
    }
}

/// Detects `scheme:` prefixes other than a single drive letter.
fn has_unknown_scheme(path: &str) -> bool {
    path.split_once(':').is_some_and(|(scheme, _)| {
        scheme.len() > 1 && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+')
    })
}

/// In-memory resources keyed by location.
#[derive(Debug, Clone, Default)]
pub struct MemoryResourceLoader {
    resources: BTreeMap<String, String>,
}

impl MemoryResourceLoader {
    /// Creates an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `contents` under `location`.
    #[must_use]
    pub fn with(mut self, location: impl Into<String>, contents: impl Into<String>) -> Self {
        self.insert(location, contents);
        self
    }

    /// Registers `contents` under `location`, replacing earlier contents.
    pub fn insert(&mut self, location: impl Into<String>, contents: impl Into<String>) {
        self.resources.insert(location.into(), contents.into());
    }
}

impl ResourceLoader for MemoryResourceLoader {
    fn load(&self, location: &str) -> Result<Option<Resource>, ResourceError> {
        Ok(self
            .resources
            .get(location)
            .map(|contents| Resource::new(location, location, contents.as_str())))
    }
}
