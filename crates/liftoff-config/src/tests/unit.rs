//! Resolution engine unit tests over in-memory resources.

use rstest::{fixture, rstest};

use super::support::{
    BASE_LAYER, RecordingResources, active, base_environment, classpath_resolver, file_layer,
    property, resolve_with,
};
use crate::defaults::{
    COMMAND_LINE_LAYER, CONFIG_LOCATION_KEY, CONFIG_NAME_KEY, DEFAULT_PROPERTIES_LAYER,
};
use crate::resource::MockResourceLoader;
use crate::{
    CommandLineArgs, ConfigError, ConfigResolver, ConfigurationEnvironment, ConfigurationLayer,
    ResourceError,
};

#[fixture]
fn prod_files() -> RecordingResources {
    RecordingResources::new()
        .with("classpath:/application.properties", "server.port=8080\nname=base")
        .with("classpath:/application-prod.properties", "server.port=9090")
}

#[rstest]
fn profile_specific_file_beats_the_base_file(prod_files: RecordingResources) {
    let (environment, summary) =
        resolve_with(&classpath_resolver(), active("prod"), &prod_files).expect("resolves");

    assert_eq!(property(&environment, "server.port"), "9090");
    assert_eq!(property(&environment, "name"), "base");
    assert_eq!(environment.active_profiles(), ["prod"]);
    assert_eq!(summary.processed_profiles(), ["prod"]);
    assert_eq!(
        environment.layer_names(),
        vec![
            BASE_LAYER.to_owned(),
            file_layer("classpath:/application-prod.properties"),
            file_layer("classpath:/application.properties"),
        ]
    );
}

#[rstest]
fn default_profile_applies_when_nothing_is_active() {
    let resources = RecordingResources::new()
        .with("classpath:/application.properties", "server.port=8080")
        .with("classpath:/application-default.properties", "server.port=8081");
    let (environment, summary) =
        resolve_with(&classpath_resolver(), ConfigurationEnvironment::new(), &resources)
            .expect("resolves");

    assert_eq!(property(&environment, "server.port"), "8081");
    assert!(environment.active_profiles().is_empty());
    assert_eq!(summary.processed_profiles(), ["default"]);
    for probe in resources.probes() {
        let file = probe.trim_start_matches("classpath:/");
        assert!(
            file.starts_with("application.") || file.starts_with("application-default."),
            "unexpected probe {probe}"
        );
    }
}

#[rstest]
fn included_profiles_cascade_without_reprocessing() {
    let resources = RecordingResources::new()
        .with(
            "classpath:/application.properties",
            "liftoff.profiles.include=extra",
        )
        .with(
            "classpath:/application-extra.properties",
            "extra.loaded=true\nliftoff.profiles.include=extra",
        );
    let (environment, summary) =
        resolve_with(&classpath_resolver(), ConfigurationEnvironment::new(), &resources)
            .expect("resolves");

    assert_eq!(property(&environment, "extra.loaded"), "true");
    assert_eq!(summary.processed_profiles(), ["extra", "default"]);
    assert_eq!(environment.active_profiles(), ["extra"]);
    let extra_layers = summary
        .loaded_layers()
        .iter()
        .filter(|layer| **layer == file_layer("classpath:/application-extra.properties"))
        .count();
    assert_eq!(extra_layers, 1);
}

#[rstest]
fn first_activation_wins() {
    let resources = RecordingResources::new()
        .with("classpath:/application.properties", "liftoff.profiles.active=dev")
        .with(
            "classpath:/application-dev.properties",
            "liftoff.profiles.active=prod\nsource=dev",
        )
        .with("classpath:/application-prod.properties", "source=prod");
    let (environment, summary) =
        resolve_with(&classpath_resolver(), ConfigurationEnvironment::new(), &resources)
            .expect("resolves");

    assert_eq!(property(&environment, "source"), "dev");
    assert_eq!(environment.active_profiles(), ["dev"]);
    assert_eq!(summary.processed_profiles(), ["dev"]);
}

#[rstest]
fn base_environment_activation_is_authoritative() {
    let resources = RecordingResources::new()
        .with("classpath:/application.properties", "liftoff.profiles.active=dev")
        .with("classpath:/application-dev.properties", "source=dev")
        .with("classpath:/application-qa.properties", "source=qa");
    let (environment, _) =
        resolve_with(&classpath_resolver(), active("qa"), &resources).expect("resolves");

    assert_eq!(property(&environment, "source"), "qa");
    assert_eq!(environment.active_profiles(), ["qa"]);
}

#[rstest]
fn last_declared_profile_wins() {
    let resources = RecordingResources::new()
        .with("classpath:/application-a.properties", "source=a\nonly.a=yes")
        .with("classpath:/application-b.properties", "source=b");
    let (environment, summary) =
        resolve_with(&classpath_resolver(), active("a, b"), &resources).expect("resolves");

    assert_eq!(property(&environment, "source"), "b");
    assert_eq!(property(&environment, "only.a"), "yes");
    assert_eq!(summary.processed_profiles(), ["a", "b"]);
}

#[rstest]
fn programmatic_profiles_are_processed() {
    let mut environment = ConfigurationEnvironment::new();
    environment.set_active_profiles(["ops"]);
    let resources = RecordingResources::new()
        .with("classpath:/application-ops.properties", "source=ops")
        .with("classpath:/application-default.properties", "source=default");
    let (environment, summary) =
        resolve_with(&classpath_resolver(), environment, &resources).expect("resolves");

    assert_eq!(property(&environment, "source"), "ops");
    assert_eq!(summary.processed_profiles(), ["ops"]);
}

#[rstest]
fn later_locations_outrank_earlier_ones() {
    let resources = RecordingResources::new()
        .with("classpath:/application.properties", "source=classpath")
        .with("file:./config/application.properties", "source=file-config");
    let (environment, _) =
        resolve_with(&ConfigResolver::new(), ConfigurationEnvironment::new(), &resources)
            .expect("resolves");

    assert_eq!(property(&environment, "source"), "file-config");
}

#[rstest]
fn explicit_locations_are_searched_last_and_win() {
    let resources = RecordingResources::new()
        .with("classpath:/application.properties", "source=classpath")
        .with("file:./custom/application.properties", "source=custom")
        .with("file:./extra.toml", "source = \"toml\"\nextra = true");
    let environment = base_environment(&[
        ("custom.dir", "./custom/"),
        (CONFIG_LOCATION_KEY, "${custom.dir}, file:./extra.toml"),
    ]);
    let (environment, summary) =
        resolve_with(&ConfigResolver::new(), environment, &resources).expect("resolves");

    assert_eq!(property(&environment, "source"), "toml");
    assert_eq!(property(&environment, "extra"), "true");
    assert_eq!(
        summary.loaded_layers(),
        [
            file_layer("classpath:/application.properties"),
            file_layer("file:./custom/application.properties"),
            file_layer("file:./extra.toml"),
        ]
    );
}

#[rstest]
fn configured_names_replace_the_default_name() {
    let resources = RecordingResources::new()
        .with("classpath:/application.properties", "source=application")
        .with("classpath:/service.properties", "source=service");
    let environment = base_environment(&[(CONFIG_NAME_KEY, "service")]);
    let (environment, _) =
        resolve_with(&classpath_resolver(), environment, &resources).expect("resolves");

    assert_eq!(property(&environment, "source"), "service");
    assert!(
        resources
            .probes()
            .iter()
            .all(|probe| !probe.contains("application"))
    );
}

#[rstest]
fn yaml_profile_documents_load_for_their_profile() {
    let resources = RecordingResources::new().with(
        "classpath:/application.yml",
        "server:\n  port: 8080\n---\nliftoff:\n  profiles: dev\nserver:\n  port: 9000\n",
    );
    let (environment, summary) =
        resolve_with(&classpath_resolver(), active("dev"), &resources).expect("resolves");

    assert_eq!(property(&environment, "server.port"), "9000");
    assert_eq!(
        summary.loaded_layers(),
        [
            file_layer("classpath:/application.yml"),
            format!("{} (profile=dev)", file_layer("classpath:/application.yml")),
        ]
    );
    let tagged = environment
        .layer(&format!("{} (profile=dev)", file_layer("classpath:/application.yml")))
        .expect("profile layer present");
    assert_eq!(tagged.profile(), Some("dev"));
}

#[rstest]
fn profile_documents_inside_a_profile_file_apply() {
    let resources = RecordingResources::new()
        .with("classpath:/application.yml", "a: plain\n")
        .with(
            "classpath:/application-dev.yml",
            "a: dev-base\nb: dev-base\n---\nliftoff:\n  profiles: dev\nb: dev-only\n---\nliftoff:\n  profiles: qa\nb: qa-only\n",
        );
    let (environment, summary) =
        resolve_with(&classpath_resolver(), active("dev"), &resources).expect("resolves");

    assert_eq!(property(&environment, "a"), "dev-base");
    assert_eq!(property(&environment, "b"), "dev-only");
    assert_eq!(
        summary.loaded_layers(),
        [
            file_layer("classpath:/application.yml"),
            file_layer("classpath:/application-dev.yml"),
            format!("{} (profile=dev)", file_layer("classpath:/application-dev.yml")),
        ]
    );
}

#[rstest]
fn processed_profile_files_are_revisited_for_later_profiles() {
    let resources = RecordingResources::new()
        .with(
            "classpath:/application-dev.yml",
            "source: dev\n---\nliftoff:\n  profiles: prod\nshared: from-dev-for-prod\n",
        )
        .with("classpath:/application-prod.yml", "source: prod\n");
    let (environment, summary) =
        resolve_with(&classpath_resolver(), active("dev, prod"), &resources).expect("resolves");

    assert_eq!(summary.processed_profiles(), ["dev", "prod"]);
    assert_eq!(property(&environment, "source"), "prod");
    assert_eq!(property(&environment, "shared"), "from-dev-for-prod");
    let revisited = format!("{} (profile=prod)", file_layer("classpath:/application-dev.yml"));
    assert!(summary.loaded_layers().contains(&revisited));
}

#[rstest]
fn included_profiles_keep_the_default_profile() {
    let resources = RecordingResources::new()
        .with("classpath:/application.properties", "liftoff.profiles.include=extra")
        .with("classpath:/application-extra.properties", "b=extra")
        .with("classpath:/application-default.properties", "c=default");
    let (environment, summary) =
        resolve_with(&classpath_resolver(), ConfigurationEnvironment::new(), &resources)
            .expect("resolves");

    assert_eq!(summary.processed_profiles(), ["extra", "default"]);
    assert_eq!(property(&environment, "b"), "extra");
    assert_eq!(property(&environment, "c"), "default");
    assert_eq!(environment.active_profiles(), ["extra"]);
}

#[rstest]
fn activation_drops_the_pending_default_profile() {
    let resources = RecordingResources::new()
        .with("classpath:/application.properties", "liftoff.profiles.active=dev")
        .with("classpath:/application-default.properties", "c=default");
    let (environment, summary) =
        resolve_with(&classpath_resolver(), ConfigurationEnvironment::new(), &resources)
            .expect("resolves");

    assert_eq!(summary.processed_profiles(), ["dev"]);
    assert!(environment.get_property("c").is_none());
}

#[rstest]
fn discovered_profiles_are_listed_first() {
    let resources = RecordingResources::new()
        .with("classpath:/application-prod.properties", "liftoff.profiles.include=metrics, audit");
    let (environment, _) =
        resolve_with(&classpath_resolver(), active("dev, prod"), &resources).expect("resolves");

    assert_eq!(environment.active_profiles(), ["audit", "metrics", "dev", "prod"]);
}

#[rstest]
fn files_sit_ahead_of_default_properties() {
    let mut environment = ConfigurationEnvironment::new();
    environment.add_last(ConfigurationLayer::new(
        DEFAULT_PROPERTIES_LAYER,
        [("source", "defaults"), ("fallback", "yes")],
    ));
    environment.add_last(ConfigurationLayer::new("late", [("late", "yes")]));
    let resources =
        RecordingResources::new().with("classpath:/application.properties", "source=file");
    let (environment, _) =
        resolve_with(&classpath_resolver(), environment, &resources).expect("resolves");

    assert_eq!(
        environment.layer_names(),
        vec![
            file_layer("classpath:/application.properties").as_str(),
            "late",
            DEFAULT_PROPERTIES_LAYER,
        ]
    );
    assert_eq!(property(&environment, "source"), "file");
    assert_eq!(property(&environment, "fallback"), "yes");
}

#[rstest]
fn command_line_arguments_outrank_every_file(prod_files: RecordingResources) {
    let mut environment = active("prod");
    CommandLineArgs::parse(["--server.port=7000"])
        .expect("arguments parse")
        .apply_to(&mut environment);
    let (environment, _) =
        resolve_with(&classpath_resolver(), environment, &prod_files).expect("resolves");

    assert_eq!(property(&environment, "server.port"), "7000");
    assert_eq!(environment.layer_names().first().copied(), Some(COMMAND_LINE_LAYER));
}

#[rstest]
fn resolution_is_idempotent(prod_files: RecordingResources) {
    let resolver = classpath_resolver();
    let (first, first_summary) =
        resolve_with(&resolver, active("prod"), &prod_files).expect("resolves");
    let (second, second_summary) =
        resolve_with(&resolver, active("prod"), &prod_files).expect("resolves");

    assert_eq!(first, second);
    assert_eq!(first_summary, second_summary);
}

#[rstest]
fn parse_failures_abort_with_the_location() {
    let resources = RecordingResources::new().with("classpath:/application.yml", "a: [1");
    let error = resolve_with(&classpath_resolver(), ConfigurationEnvironment::new(), &resources)
        .expect_err("malformed yaml aborts");

    assert!(matches!(error, ConfigError::Load { .. }));
    assert_eq!(error.location(), Some("classpath:/application.yml"));
}

#[rstest]
fn malformed_profile_lists_abort() {
    let resources = RecordingResources::new();
    let error = resolve_with(&classpath_resolver(), active("dev, not valid"), &resources)
        .expect_err("invalid profile aborts");

    assert!(matches!(error, ConfigError::InvalidProfile { .. }));
}

#[rstest]
fn unreadable_candidates_abort_with_the_location() {
    let mut resources = MockResourceLoader::new();
    resources.expect_load().returning(|location| {
        Err(ResourceError::Read {
            location: location.to_owned(),
            source: std::io::Error::other("permission denied"),
        })
    });
    let error = resolve_with(&classpath_resolver(), ConfigurationEnvironment::new(), &resources)
        .expect_err("read failures are fatal");

    assert!(matches!(error, ConfigError::Read { .. }));
    assert_eq!(error.location(), Some("classpath:/application.properties"));
}

#[rstest]
fn unsupported_locations_are_skipped() {
    let mut resources = MockResourceLoader::new();
    resources.expect_load().returning(|location| {
        Err(ResourceError::UnsupportedLocation {
            location: location.to_owned(),
        })
    });
    let (environment, summary) =
        resolve_with(&classpath_resolver(), ConfigurationEnvironment::new(), &resources)
            .expect("unsupported locations are not fatal");

    assert!(summary.loaded_layers().is_empty());
    assert!(environment.layers().is_empty());
}

#[rstest]
fn profile_list_placeholders_resolve_against_the_loaded_file() {
    let mut resources = RecordingResources::new();
    resources.insert(
        "classpath:/application.properties",
        "stage=blue\nliftoff.profiles.active=${stage}",
    );
    resources.insert("classpath:/application-blue.properties", "colour=blue");
    let (environment, _) =
        resolve_with(&classpath_resolver(), ConfigurationEnvironment::new(), &resources)
            .expect("resolves");

    assert_eq!(property(&environment, "colour"), "blue");
}
