//! Override cascade
//!
//! Applies per-environment override blocks, then the command-line delta, onto
//! the defaulted base configuration. Later layers win. `files.<type>` nodes
//! are replaced rather than merged (see [`MergePolicy::cascade`]).

use crate::config::{deep_merge_with, section, MergePolicy};
use crate::error::ConfigError;
use crate::value::{string_or_list, ConfigMap, ConfigMapExt, ConfigValue};

/// Key under `overrides` holding the pre-override snapshot.
pub const DEFAULT_SNAPSHOT: &str = "_default";

/// Plugin toggle lists and their opposites.
const TOGGLES: [(&str, &str); 2] = [("on", "off"), ("off", "on")];

/// Apply `environments` in order, then `cli_delta`.
pub fn apply_overrides(
    config: ConfigMap,
    environments: &[String],
    cli_delta: ConfigMap,
) -> Result<ConfigMap, ConfigError> {
    let policy = MergePolicy::cascade();
    let mut config = config;

    if !environments.is_empty() {
        snapshot_defaults(&mut config)?;
    }

    for env in environments {
        let mut delta = match config.get("overrides").and_then(|o| o.get(env)) {
            Some(ConfigValue::Map(delta)) => delta.clone(),
            None | Some(ConfigValue::Null) => {
                log::debug!("no overrides declared for environment '{}'", env);
                continue;
            }
            Some(other) => {
                return Err(ConfigError::structural(
                    format!("overrides.{}", env),
                    format!("expected a mapping, got {}", other.kind()),
                ))
            }
        };

        log::debug!("applying overrides for environment '{}'", env);
        reconcile_plugin_toggles(&config, &mut delta);
        config = merge_into(config, delta, &policy);
    }

    config = merge_into(config, cli_delta, &policy);

    // Paths may have moved during the cascade; the server follows them.
    if let Some(public) = config.get("paths").and_then(|p| p.get("public")).cloned() {
        section(&mut config, "server")?.insert("publicPath".to_string(), public);
    }
    if !config.get("persistent").and_then(ConfigValue::as_bool).unwrap_or(false) {
        section(&mut config, "server")?.insert("run".to_string(), false.into());
    }

    Ok(config)
}

fn merge_into(config: ConfigMap, delta: ConfigMap, policy: &MergePolicy) -> ConfigMap {
    match deep_merge_with(ConfigValue::Map(config), ConfigValue::Map(delta), policy) {
        ConfigValue::Map(merged) => merged,
        _ => unreachable!("merging two mappings yields a mapping"),
    }
}

/// Copy every top-level mapping (except `overrides` itself) into
/// `overrides._default`.
fn snapshot_defaults(config: &mut ConfigMap) -> Result<(), ConfigError> {
    if !config.has("overrides") {
        return Ok(());
    }
    let snapshot: ConfigMap = config
        .iter()
        .filter(|(key, value)| key.as_str() != "overrides" && value.is_map())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    section(config, "overrides")?.insert(DEFAULT_SNAPSHOT.to_string(), ConfigValue::Map(snapshot));
    Ok(())
}

/// Carry the current `plugins.on`/`plugins.off` lists into an environment
/// delta so that replacing one list does not silently undo the other.
///
/// Each toggle list that is non-empty in the current config is rewritten in
/// the delta as the delta's own entries followed by every current entry the
/// delta does not mention under either toggle.
pub fn reconcile_plugin_toggles(current: &ConfigMap, delta: &mut ConfigMap) {
    let current_plugins = current.get("plugins");
    if !matches!(delta.get("plugins"), None | Some(ConfigValue::Null | ConfigValue::Map(_))) {
        return;
    }

    let list = |plugins: Option<&ConfigValue>, key: &str| -> Vec<String> {
        plugins
            .and_then(|p| p.get(key))
            .and_then(string_or_list)
            .unwrap_or_default()
    };

    for (dir, opposite) in TOGGLES {
        let current_dir = list(current_plugins, dir);
        if current_dir.is_empty() {
            continue;
        }

        let delta_plugins = delta.get("plugins");
        let own = list(delta_plugins, dir);
        let turned_opposite = list(delta_plugins, opposite);

        let mut result = own.clone();
        result.extend(
            current_dir
                .into_iter()
                .filter(|name| !turned_opposite.contains(name) && !own.contains(name)),
        );

        delta.map_entry("plugins").insert(
            dir.to_string(),
            ConfigValue::List(result.into_iter().map(ConfigValue::String).collect()),
        );
    }
}
