//! Filesystem-backed precedence scenarios.

use std::cell::RefCell;
use std::fs;

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use liftoff_config::{
    CommandLineArgs, ConfigError, ConfigResolver, ConfigurationEnvironment, ConfigurationLayer,
    FileSystemResourceLoader,
};

struct Harness {
    temp_dir: TempDir,
    variables: RefCell<Vec<(String, String)>>,
    arguments: RefCell<Vec<String>>,
    resolved: RefCell<Option<Result<ConfigurationEnvironment, ConfigError>>>,
}

impl Harness {
    fn new() -> Self {
        let temp_dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(error) => panic!("failed to create temporary directory: {error}"),
        };
        Self {
            temp_dir,
            variables: RefCell::new(Vec::new()),
            arguments: RefCell::new(Vec::new()),
            resolved: RefCell::new(None),
        }
    }

    fn root(&self) -> Utf8PathBuf {
        match Utf8PathBuf::from_path_buf(self.temp_dir.path().to_path_buf()) {
            Ok(path) => path,
            Err(path) => panic!("temporary directory is not UTF-8: {}", path.display()),
        }
    }

    fn write(&self, relative: &str, contents: &str) {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent()
            && let Err(error) = fs::create_dir_all(parent)
        {
            panic!("failed to create {parent}: {error}");
        }
        if let Err(error) = fs::write(&path, contents) {
            panic!("failed to write {path}: {error}");
        }
    }

    fn resolve(&self) {
        let mut environment = ConfigurationEnvironment::new();
        environment.add_last(ConfigurationLayer::system_environment(
            self.variables.borrow().iter().cloned(),
        ));
        let outcome = CommandLineArgs::parse(self.arguments.borrow().iter()).and_then(|args| {
            args.apply_to(&mut environment);
            let resources = FileSystemResourceLoader::new(self.root());
            ConfigResolver::new()
                .resolve(&mut environment, &resources)
                .map(|_| environment)
        });
        *self.resolved.borrow_mut() = Some(outcome);
    }

    fn property(&self, key: &str) -> Option<String> {
        let resolved = self.resolved.borrow();
        match resolved.as_ref() {
            Some(Ok(environment)) => environment.get_property(key).map(|value| value.into_owned()),
            Some(Err(error)) => panic!("configuration failed to resolve: {error}"),
            None => panic!("configuration was not resolved"),
        }
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

#[given("a file \"{path}\" containing \"{contents}\"")]
fn given_file(harness: &Harness, path: String, contents: String) {
    harness.write(&path, &contents);
}

#[given("the environment variable \"{name}\" is \"{value}\"")]
fn given_variable(harness: &Harness, name: String, value: String) {
    harness.variables.borrow_mut().push((name, value));
}

#[given("the argument \"{argument}\"")]
fn given_argument(harness: &Harness, argument: String) {
    harness.arguments.borrow_mut().push(argument);
}

#[when("the configuration is resolved from the working directory")]
fn when_resolved(harness: &Harness) {
    harness.resolve();
}

#[then("\"{key}\" is \"{value}\"")]
fn then_property(harness: &Harness, key: String, value: String) {
    assert_eq!(harness.property(&key), Some(value));
}

#[then("the resolved profiles are \"{profiles}\"")]
fn then_profiles(harness: &Harness, profiles: String) {
    let resolved = harness.resolved.borrow();
    let Some(Ok(environment)) = resolved.as_ref() else {
        panic!("configuration was not resolved");
    };
    assert_eq!(environment.active_profiles().join(","), profiles);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Configuration directory files override root files"
)]
fn config_directory_precedence(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Profile files override base files on disk"
)]
fn profile_file_precedence(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Command-line arguments override files and the environment"
)]
fn command_line_precedence(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Environment variables override files"
)]
fn environment_precedence(#[from(harness)] harness: Harness) {
    drop(harness);
}
