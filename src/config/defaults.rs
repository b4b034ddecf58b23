//! Built-in defaults and structural validation
//!
//! Fills every structural default in dependency order (paths first, since
//! later defaults are derived from them) and rejects path fields of the
//! wrong shape.

use crate::error::ConfigError;
use crate::value::{ConfigMap, ConfigMapExt, ConfigValue};

/// Built-in default configuration values
#[derive(Debug, Clone)]
pub struct BuiltinDefaults {
    /// Project root (default: ".")
    pub root: String,

    /// Output directory under the root (default: "public")
    pub public_dir: String,

    /// Watched source directories under the root
    pub watched_dirs: Vec<String>,

    /// Config file base name under the root, without extension
    pub config_basename: String,

    /// Module wrapper and definition format (default: "commonjs")
    pub module_format: String,

    /// Module name prefix stripped by the default name cleaner
    pub name_cleaner: String,

    /// Development server port (default: 3333)
    pub server_port: u16,

    /// Development server hostname (default: "localhost")
    pub server_hostname: String,

    /// File list polling interval in milliseconds (default: 65)
    pub file_list_interval: u16,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            public_dir: "public".to_string(),
            watched_dirs: vec!["app".to_string(), "test".to_string(), "vendor".to_string()],
            config_basename: "buildconf".to_string(),
            module_format: "commonjs".to_string(),
            name_cleaner: "^app/".to_string(),
            server_port: 3333,
            server_hostname: "localhost".to_string(),
            file_list_interval: 65,
        }
    }
}

/// Inputs to defaulting that come from the invocation, not the file.
#[derive(Debug, Clone, Default)]
pub struct DefaultsContext {
    /// Path the loader read the config from, if any.
    pub config_path: Option<String>,
    /// Whether the build keeps watching after the first compile.
    pub persistent: bool,
}

const ASSETS_CONVENTION: &str = r"assets[\\/]";
const IGNORED_CONVENTIONS: &[&str] = &[r"[\\/]_", r"vendor[\\/](node|j?ruby-.+|bundle)[\\/]"];
const VENDOR_CONVENTION: &str = r"(^bower_components|node_modules|vendor)[\\/]";

/// Join two POSIX path segments, treating "." as the current directory.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() || parent == "." {
        name.to_string()
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), name)
    }
}

impl BuiltinDefaults {
    /// Fill defaults into `config` and validate path fields.
    pub fn apply(&self, config: &mut ConfigMap, ctx: &DefaultsContext) -> Result<(), ConfigError> {
        let public = self.apply_paths(config, ctx)?;
        self.apply_conventions(config)?;

        config.set_default("notifications", true);
        config.set_default("sourceMaps", true);
        config.set_default("optimize", false);
        config.set_default("fileListInterval", self.file_list_interval);
        section(config, "plugins")?;
        section(config, "watcher")?.set_default("usePolling", false);

        let modules = section(config, "modules")?;
        modules.set_default("wrapper", self.module_format.as_str());
        modules.set_default("definition", self.module_format.as_str());
        modules.set_default("nameCleaner", ConfigValue::regex("modules.nameCleaner", &self.name_cleaner)?);
        section(modules, "autoRequire")?;

        let server = section(config, "server")?;
        server.insert("publicPath".to_string(), public.into());
        server.set_default("base", "");
        server.set_default("port", self.server_port);
        server.set_default("hostname", self.server_hostname.as_str());
        server.set_default("run", false);
        if !ctx.persistent {
            server.insert("run".to_string(), false.into());
        }

        section(config, "hooks")?;

        let overrides = section(config, "overrides")?;
        let production = section(overrides, "production")?;
        production.set_default("optimize", true);
        production.set_default("sourceMaps", false);
        let auto_reload = section(section(production, "plugins")?, "autoReload")?;
        auto_reload.set_default("enabled", false);

        let npm = section(config, "npm")?;
        npm.set_default("enabled", true);
        npm.set_default("static", ConfigValue::List(Vec::new()));

        Ok(())
    }

    /// Fills and validates `paths`, returning the public path.
    fn apply_paths(&self, config: &mut ConfigMap, ctx: &DefaultsContext) -> Result<String, ConfigError> {
        let paths = section(config, "paths")?;

        paths.set_default("root", self.root.as_str());
        let root = require_string(paths, "root")?;

        paths.set_default("public", join_path(&root, &self.public_dir));
        let public = require_string(paths, "public")?;

        if !paths.has("watched") {
            let watched = self
                .watched_dirs
                .iter()
                .map(|dir| ConfigValue::String(join_path(&root, dir)))
                .collect::<Vec<_>>();
            paths.insert("watched".to_string(), ConfigValue::List(watched));
        }
        let watched = normalize_watched(&paths["watched"])?;
        paths.insert(
            "watched".to_string(),
            ConfigValue::List(watched.into_iter().map(ConfigValue::String).collect()),
        );

        match &ctx.config_path {
            Some(loaded) => {
                paths.insert("config".to_string(), loaded.as_str().into());
            }
            None => paths.set_default("config", join_path(&root, &self.config_basename)),
        }
        paths.set_default("packageConfig", join_path(&root, "package.json"));
        paths.set_default("bowerConfig", join_path(&root, "bower.json"));
        for key in ["config", "packageConfig", "bowerConfig"] {
            require_string(paths, key)?;
        }

        Ok(public)
    }

    fn apply_conventions(&self, config: &mut ConfigMap) -> Result<(), ConfigError> {
        let legacy_ignored = config
            .get("paths")
            .and_then(|paths| paths.get("ignored"))
            .filter(|v| !v.is_null())
            .cloned();

        let conventions = section(config, "conventions")?;
        conventions.set_default("assets", ConfigValue::regex("conventions.assets", ASSETS_CONVENTION)?);
        if !conventions.has("ignored") {
            let ignored = match legacy_ignored {
                Some(ignored) => ignored,
                None => ConfigValue::List(
                    IGNORED_CONVENTIONS
                        .iter()
                        .map(|re| ConfigValue::regex("conventions.ignored", re))
                        .collect::<Result<_, _>>()?,
                ),
            };
            conventions.insert("ignored".to_string(), ignored);
        }
        conventions.set_default("vendor", ConfigValue::regex("conventions.vendor", VENDOR_CONVENTION)?);
        Ok(())
    }
}

/// Mapping section under `key`, created when missing or null.
///
/// Any other shape is a structural error.
pub(crate) fn section<'a>(map: &'a mut ConfigMap, key: &str) -> Result<&'a mut ConfigMap, ConfigError> {
    match map.get(key).map(ConfigValue::kind) {
        None | Some("null") | Some("mapping") => Ok(map.map_entry(key)),
        Some(kind) => Err(ConfigError::structural(
            key,
            format!("expected a mapping, got {}", kind),
        )),
    }
}

fn require_string(paths: &ConfigMap, key: &str) -> Result<String, ConfigError> {
    match paths.get(key) {
        Some(ConfigValue::String(s)) => Ok(s.clone()),
        Some(other) => Err(ConfigError::structural(
            format!("paths.{}", key),
            format!("expected a string, got {}", other.kind()),
        )),
        None => Err(ConfigError::structural(format!("paths.{}", key), "missing")),
    }
}

/// Coerce `paths.watched` to a non-empty list of strings.
///
/// A bare string becomes a one-element list.
pub fn normalize_watched(value: &ConfigValue) -> Result<Vec<String>, ConfigError> {
    let watched = match value {
        ConfigValue::String(s) => vec![s.clone()],
        ConfigValue::List(items) => items
            .iter()
            .map(|item| match item {
                ConfigValue::String(s) => Ok(s.clone()),
                other => Err(ConfigError::structural(
                    "paths.watched",
                    format!("expected a list of strings, found {} entry", other.kind()),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?,
        other => {
            return Err(ConfigError::structural(
                "paths.watched",
                format!("expected a list of strings, got {}", other.kind()),
            ))
        }
    };
    if watched.is_empty() {
        return Err(ConfigError::structural("paths.watched", "must not be empty"));
    }
    Ok(watched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults_for(value: serde_json::Value) -> Result<ConfigMap, ConfigError> {
        let mut config = match ConfigValue::from(value) {
            ConfigValue::Map(map) => map,
            _ => panic!("test config must be a mapping"),
        };
        BuiltinDefaults::default().apply(&mut config, &DefaultsContext::default())?;
        Ok(config)
    }

    fn get<'a>(config: &'a ConfigMap, path: &str) -> &'a ConfigValue {
        let (head, rest) = path.split_once('.').unwrap_or((path, ""));
        let value = &config[head];
        if rest.is_empty() {
            value
        } else {
            value.get_path(rest).unwrap_or_else(|| panic!("missing {}", path))
        }
    }

    #[test]
    fn test_path_defaults() {
        let config = defaults_for(json!({"files": {}})).unwrap();
        assert_eq!(get(&config, "paths.root").as_str(), Some("."));
        assert_eq!(get(&config, "paths.public").as_str(), Some("public"));
        assert_eq!(get(&config, "paths.watched"), &ConfigValue::from(json!(["app", "test", "vendor"])));
        assert_eq!(get(&config, "paths.config").as_str(), Some("buildconf"));
        assert_eq!(get(&config, "paths.packageConfig").as_str(), Some("package.json"));
        assert_eq!(get(&config, "paths.bowerConfig").as_str(), Some("bower.json"));
    }

    #[test]
    fn test_paths_derived_from_root() {
        let config = defaults_for(json!({"paths": {"root": "site"}})).unwrap();
        assert_eq!(get(&config, "paths.public").as_str(), Some("site/public"));
        assert_eq!(
            get(&config, "paths.watched"),
            &ConfigValue::from(json!(["site/app", "site/test", "site/vendor"]))
        );
        assert_eq!(get(&config, "server.publicPath").as_str(), Some("site/public"));
    }

    #[test]
    fn test_config_path_from_loader() {
        let mut config = ConfigMap::new();
        let ctx = DefaultsContext {
            config_path: Some("conf/build.toml".to_string()),
            persistent: false,
        };
        BuiltinDefaults::default().apply(&mut config, &ctx).unwrap();
        assert_eq!(get(&config, "paths.config").as_str(), Some("conf/build.toml"));
    }

    #[test]
    fn test_explicit_config_path_kept() {
        let config = defaults_for(json!({"paths": {"config": "conf/site"}})).unwrap();
        assert_eq!(get(&config, "paths.config").as_str(), Some("conf/site"));
    }

    #[test]
    fn test_watched_string_coerced() {
        let config = defaults_for(json!({"paths": {"watched": "src"}})).unwrap();
        assert_eq!(get(&config, "paths.watched"), &ConfigValue::from(json!(["src"])));
    }

    #[test]
    fn test_watched_wrong_type_errors() {
        let err = defaults_for(json!({"paths": {"watched": 42}})).unwrap_err();
        assert!(matches!(err, ConfigError::Structural { ref key, .. } if key == "paths.watched"));
    }

    #[test]
    fn test_watched_empty_errors() {
        let err = defaults_for(json!({"paths": {"watched": []}})).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_root_must_be_string() {
        let err = defaults_for(json!({"paths": {"root": ["a"]}})).unwrap_err();
        assert!(matches!(err, ConfigError::Structural { ref key, .. } if key == "paths.root"));
    }

    #[test]
    fn test_public_must_be_string() {
        let err = defaults_for(json!({"paths": {"public": false}})).unwrap_err();
        assert!(matches!(err, ConfigError::Structural { ref key, .. } if key == "paths.public"));
    }

    #[test]
    fn test_paths_must_be_mapping() {
        let err = defaults_for(json!({"paths": "app"})).unwrap_err();
        assert!(matches!(err, ConfigError::Structural { ref key, .. } if key == "paths"));
    }

    #[test]
    fn test_convention_defaults() {
        let config = defaults_for(json!({})).unwrap();
        assert_eq!(
            get(&config, "conventions.assets"),
            &ConfigValue::regex("conventions.assets", ASSETS_CONVENTION).unwrap()
        );
        assert_eq!(get(&config, "conventions.ignored").as_list().map(<[_]>::len), Some(2));
        assert_eq!(
            get(&config, "conventions.vendor"),
            &ConfigValue::regex("conventions.vendor", VENDOR_CONVENTION).unwrap()
        );
    }

    #[test]
    fn test_invalid_name_cleaner_is_pattern_error() {
        let defaults = BuiltinDefaults {
            name_cleaner: "(".to_string(),
            ..Default::default()
        };
        let mut config = ConfigMap::new();
        let err = defaults.apply(&mut config, &DefaultsContext::default()).unwrap_err();

        assert!(matches!(err, ConfigError::Pattern { ref key, .. } if key == "modules.nameCleaner"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_legacy_ignored_seeds_convention() {
        let config = defaults_for(json!({"paths": {"ignored": "/^tmp/"}})).unwrap();
        assert_eq!(get(&config, "conventions.ignored").as_str(), Some("/^tmp/"));
    }

    #[test]
    fn test_flag_and_module_defaults() {
        let config = defaults_for(json!({"sourceMaps": false})).unwrap();
        assert_eq!(config["sourceMaps"], ConfigValue::Bool(false));
        assert_eq!(config["optimize"], ConfigValue::Bool(false));
        assert_eq!(config["notifications"], ConfigValue::Bool(true));
        assert_eq!(get(&config, "modules.wrapper").as_str(), Some("commonjs"));
        assert_eq!(get(&config, "modules.definition").as_str(), Some("commonjs"));
        assert!(get(&config, "modules.autoRequire").is_map());
    }

    #[test]
    fn test_server_never_runs_when_not_persistent() {
        let config = defaults_for(json!({"server": {"run": true, "port": 8080}})).unwrap();
        assert_eq!(get(&config, "server.run"), &ConfigValue::Bool(false));
        assert_eq!(get(&config, "server.port").as_u64(), Some(8080));
        assert_eq!(get(&config, "server.hostname").as_str(), Some("localhost"));
    }

    #[test]
    fn test_server_run_kept_when_persistent() {
        let mut config = match ConfigValue::from(json!({"server": {"run": true}})) {
            ConfigValue::Map(map) => map,
            _ => unreachable!(),
        };
        let ctx = DefaultsContext {
            config_path: None,
            persistent: true,
        };
        BuiltinDefaults::default().apply(&mut config, &ctx).unwrap();
        assert_eq!(get(&config, "server.run"), &ConfigValue::Bool(true));
    }

    #[test]
    fn test_production_override_skeleton() {
        let config = defaults_for(json!({"overrides": {"production": {"optimize": false}}})).unwrap();
        assert_eq!(get(&config, "overrides.production.optimize"), &ConfigValue::Bool(false));
        assert_eq!(get(&config, "overrides.production.sourceMaps"), &ConfigValue::Bool(false));
        assert_eq!(
            get(&config, "overrides.production.plugins.autoReload.enabled"),
            &ConfigValue::Bool(false)
        );
    }

    #[test]
    fn test_npm_defaults() {
        let config = defaults_for(json!({})).unwrap();
        assert_eq!(get(&config, "npm.enabled"), &ConfigValue::Bool(true));
        assert_eq!(get(&config, "npm.static"), &ConfigValue::List(vec![]));
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path(".", "public"), "public");
        assert_eq!(join_path("site/", "public"), "site/public");
        assert_eq!(join_path("/srv", "app"), "/srv/app");
    }
}
