//! Environment override cascade tests

use buildconf::cascade::DEFAULT_SNAPSHOT;
use buildconf::{resolve_config, AssetType, ConfigValue, ResolveOptions};
use serde_json::json;

fn with_envs(list: &[&str]) -> ResolveOptions {
    ResolveOptions {
        env: list.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

fn project() -> serde_json::Value {
    json!({
        "files": {
            "javascripts": {
                "joinTo": {"js/app.js": "/^app/", "js/vendor.js": "/^vendor/"},
                "entryPoints": {"app/init.js": "js/init.js"}
            },
            "stylesheets": {"joinTo": "css/app.css"}
        },
        "plugins": {"on": ["minify"], "off": ["lint"]},
        "overrides": {
            "staging": {
                "paths": {"public": "staging-build"},
                "files": {"javascripts": {"joinTo": "js/all.js"}},
                "plugins": {"off": ["minify"]}
            },
            "qa": {
                "optimize": false,
                "plugins": {"on": ["lint"]}
            }
        }
    })
}

#[test]
fn test_empty_environment_list_is_noop() {
    let resolution = resolve_config(ConfigValue::from(project()), &ResolveOptions::default()).unwrap();
    let config = &resolution.config;

    assert!(config.env().is_empty());
    assert!(!config.optimize());
    assert!(config.source_maps());
    assert_eq!(config.paths().public, "public");
    assert!(config.overrides().get(DEFAULT_SNAPSHOT).is_none());
    assert!(config.join().entry_bundles(AssetType::Javascripts, "app/init.js").is_some());
}

#[test]
fn test_production_without_explicit_overrides() {
    let resolution = resolve_config(
        ConfigValue::from(json!({"files": {"javascripts": {"joinTo": "app.js"}}})),
        &with_envs(&["production"]),
    )
    .unwrap();
    let config = &resolution.config;

    assert!(config.is_production());
    assert!(config.optimize());
    assert!(!config.source_maps());
    assert_eq!(
        config.plugins().settings_for("autoReload").and_then(|s| s.get("enabled")),
        Some(&ConfigValue::Bool(false))
    );
}

#[test]
fn test_production_flag_behaves_like_env() {
    let options = ResolveOptions {
        production: true,
        ..Default::default()
    };
    let resolution = resolve_config(ConfigValue::from(json!({"files": {}})), &options).unwrap();
    assert_eq!(resolution.config.env(), ["production"]);
    assert!(resolution.config.optimize());
}

#[test]
fn test_files_override_replaces_and_drops_entry_points() {
    let resolution = resolve_config(ConfigValue::from(project()), &with_envs(&["staging"])).unwrap();
    let join = resolution.config.join();

    let defaults = join.default_bundles(AssetType::Javascripts).unwrap();
    assert_eq!(defaults.keys().collect::<Vec<_>>(), ["js/all.js"]);
    assert!(defaults["js/all.js"].is_everything());
    // joinTo given without entryPoints: the base entry points are gone
    assert!(join.entry_bundles(AssetType::Javascripts, "app/init.js").is_none());
    // untouched types keep their joins
    assert!(join.default_bundles(AssetType::Stylesheets).is_some());
}

#[test]
fn test_entry_points_override_drops_default_joins() {
    let mut config = project();
    config["overrides"]["bundled"] = json!({
        "files": {"javascripts": {"entryPoints": {"app/main.js": "js/main.js"}}}
    });
    let resolution = resolve_config(ConfigValue::from(config), &with_envs(&["bundled"])).unwrap();
    let join = resolution.config.join();

    assert!(join.default_bundles(AssetType::Javascripts).is_none());
    assert!(join.entry_bundles(AssetType::Javascripts, "app/init.js").is_none());
    assert!(join.entry_bundles(AssetType::Javascripts, "app/main.js").is_some());
    assert_eq!(join.output_paths(), ["css/app.css", "js/main.js"]);
}

#[test]
fn test_public_path_follows_override() {
    let resolution = resolve_config(ConfigValue::from(project()), &with_envs(&["staging"])).unwrap();
    assert_eq!(resolution.config.paths().public, "staging-build");
    assert_eq!(resolution.config.server().public_path, "staging-build");
}

#[test]
fn test_default_snapshot_keeps_base_values() {
    let resolution = resolve_config(ConfigValue::from(project()), &with_envs(&["staging"])).unwrap();
    let snapshot = resolution.config.overrides().get(DEFAULT_SNAPSHOT).unwrap();

    assert_eq!(snapshot.get_path("paths.public").and_then(ConfigValue::as_str), Some("public"));
    assert!(snapshot.get_path("files.javascripts.entryPoints").is_some());
    assert!(snapshot.get("overrides").is_none());
}

#[test]
fn test_turning_plugin_off_keeps_others_on() {
    let resolution = resolve_config(ConfigValue::from(project()), &with_envs(&["staging"])).unwrap();
    let plugins = resolution.config.plugins();

    assert_eq!(plugins.off, ["minify", "lint"]);
    assert!(plugins.on.is_empty());
    assert!(!plugins.is_enabled("minify"));
    assert!(!plugins.is_enabled("lint"));
}

#[test]
fn test_turning_plugin_on_keeps_others_off() {
    let resolution = resolve_config(ConfigValue::from(project()), &with_envs(&["qa"])).unwrap();
    let plugins = resolution.config.plugins();

    assert_eq!(plugins.on, ["lint", "minify"]);
    assert!(plugins.off.is_empty());
}

#[test]
fn test_two_environments_later_wins() {
    let resolution = resolve_config(ConfigValue::from(project()), &with_envs(&["staging", "qa"])).unwrap();
    let config = &resolution.config;

    assert_eq!(config.env(), ["staging", "qa"]);
    assert_eq!(config.paths().public, "staging-build");
    let plugins = config.plugins();
    assert_eq!(plugins.on, ["lint"]);
    assert_eq!(plugins.off, ["minify"]);
}

#[test]
fn test_command_line_beats_overrides() {
    let options = ResolveOptions {
        env: vec!["staging".to_string()],
        public_path: Some("cli-out".to_string()),
        ..Default::default()
    };
    let resolution = resolve_config(ConfigValue::from(project()), &options).unwrap();
    assert_eq!(resolution.config.paths().public, "cli-out");
    assert_eq!(resolution.config.server().public_path, "cli-out");
}

#[test]
fn test_process_environment_applied_last() {
    let options = ResolveOptions {
        env: vec!["qa".to_string()],
        process_env: Some("staging".to_string()),
        ..Default::default()
    };
    let resolution = resolve_config(ConfigValue::from(project()), &options).unwrap();
    assert_eq!(resolution.config.env(), ["qa", "staging"]);
    assert_eq!(resolution.config.paths().public, "staging-build");
}
