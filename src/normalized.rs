//! Finalized configuration
//!
//! [`finalize`] turns the merged raw tree into a [`NormalizedConfig`]: typed
//! sections, compiled conventions and the join table. The result has no
//! mutating API and is handed out behind an `Arc`, so every later build
//! stage sees the same configuration.

use buildconf_matcher::{compile, Matcher};
use indexmap::IndexMap;
use regex_lite::Regex;
use serde::Serialize;
use std::sync::Arc;

use crate::config::{normalize_watched, CONFIG_EXTENSIONS};
use crate::diagnostics::Diagnostics;
use crate::error::ConfigError;
use crate::join::{compile_join_config, JoinConfig};
use crate::value::{string_or_list, ConfigMap, ConfigValue};

/// Directory holding externally managed dependency modules.
const NPM_MODULES_DIR: &str = "node_modules";

/// Module wrapping / definition style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    CommonJs,
    Amd,
    /// `false` in the config: no wrapping.
    #[serde(rename = "false")]
    Disabled,
}

impl ModuleFormat {
    fn from_value(key: &str, value: &ConfigValue) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::String(s) if s == "commonjs" => Ok(ModuleFormat::CommonJs),
            ConfigValue::String(s) if s == "amd" => Ok(ModuleFormat::Amd),
            ConfigValue::Bool(false) => Ok(ModuleFormat::Disabled),
            other => Err(ConfigError::structural(
                key,
                format!("expected \"commonjs\", \"amd\" or false, got {}", describe(other)),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleFormat::CommonJs => "commonjs",
            ModuleFormat::Amd => "amd",
            ModuleFormat::Disabled => "false",
        }
    }
}

/// Plugin names given as one name or a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSelector {
    Name(String),
    Names(Vec<String>),
}

impl PluginSelector {
    pub fn from_value(key: &str, value: &ConfigValue) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::String(name) => Ok(PluginSelector::Name(name.clone())),
            ConfigValue::List(_) => string_or_list(value).map(PluginSelector::Names).ok_or_else(|| {
                ConfigError::structural(key, "expected a list of plugin names")
            }),
            other => Err(ConfigError::structural(
                key,
                format!("expected a plugin name or list of names, got {}", other.kind()),
            )),
        }
    }

    pub fn into_list(self) -> Vec<String> {
        match self {
            PluginSelector::Name(name) => vec![name],
            PluginSelector::Names(names) => names,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paths {
    pub root: String,
    pub public: String,
    pub watched: Vec<String>,
    pub config: String,
    pub package_config: String,
    pub bower_config: String,
    /// `<config>.<ext>` for every recognized config extension.
    pub possible_config_files: Vec<String>,
    /// Package manifests followed by the possible config files.
    pub all_config_files: Vec<String>,
}

impl Paths {
    fn from_config(paths: &ConfigMap) -> Result<Self, ConfigError> {
        let field = |key: &str| -> Result<String, ConfigError> {
            match paths.get(key) {
                Some(ConfigValue::String(s)) => Ok(s.clone()),
                Some(other) => Err(ConfigError::structural(
                    format!("paths.{}", key),
                    format!("expected a string, got {}", other.kind()),
                )),
                None => Err(ConfigError::structural(format!("paths.{}", key), "missing")),
            }
        };

        let root = field("root")?;
        let public = field("public")?;
        let watched = match paths.get("watched") {
            Some(value) => normalize_watched(value)?,
            None => return Err(ConfigError::structural("paths.watched", "missing")),
        };
        let config = field("config")?;
        let package_config = field("packageConfig")?;
        let bower_config = field("bowerConfig")?;

        let stem = CONFIG_EXTENSIONS
            .iter()
            .find_map(|ext| config.strip_suffix(&format!(".{}", ext)))
            .unwrap_or(&config);
        let possible_config_files: Vec<String> = CONFIG_EXTENSIONS
            .iter()
            .map(|ext| format!("{}.{}", stem, ext))
            .collect();
        let all_config_files = [package_config.clone(), bower_config.clone()]
            .into_iter()
            .chain(possible_config_files.iter().cloned())
            .collect();

        Ok(Self {
            root,
            public,
            watched,
            config,
            package_config,
            bower_config,
            possible_config_files,
            all_config_files,
        })
    }
}

/// Named path classifiers (`assets`, `ignored`, `vendor`, ...).
#[derive(Debug, Clone, Default)]
pub struct Conventions {
    matchers: IndexMap<String, Matcher>,
}

impl Conventions {
    fn from_config(conventions: &ConfigMap) -> Result<Self, ConfigError> {
        let mut matchers = IndexMap::new();
        for (name, value) in conventions {
            if value.is_null() {
                continue;
            }
            let matcher = compile(&value.to_pattern(&format!("conventions.{}", name))?);
            let matcher = if name == "assets" {
                matcher.excluding(is_npm_module)
            } else {
                matcher
            };
            matchers.insert(name.clone(), matcher);
        }
        Ok(Self { matchers })
    }

    pub fn get(&self, name: &str) -> Option<&Matcher> {
        self.matchers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.matchers.keys().map(String::as_str)
    }

    /// Whether convention `name` exists and accepts `path`.
    pub fn matches(&self, name: &str, path: &str) -> bool {
        self.get(name).is_some_and(|m| m.matches(path))
    }

    pub fn is_asset(&self, path: &str) -> bool {
        self.matches("assets", path)
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.matches("ignored", path)
    }

    pub fn is_vendor(&self, path: &str) -> bool {
        self.matches("vendor", path)
    }
}

fn is_npm_module(path: &str) -> bool {
    path.split(['/', '\\']).any(|part| part == NPM_MODULES_DIR)
}

#[derive(Debug, Clone)]
pub struct Modules {
    pub wrapper: ModuleFormat,
    pub definition: ModuleFormat,
    name_cleaner: Option<Regex>,
    /// Bundle to modules required when it loads.
    pub auto_require: IndexMap<String, Vec<String>>,
}

impl Modules {
    fn from_config(modules: &ConfigMap) -> Result<Self, ConfigError> {
        let format = |key: &str| match modules.get(key) {
            Some(value) => ModuleFormat::from_value(&format!("modules.{}", key), value),
            None => Err(ConfigError::structural(format!("modules.{}", key), "missing")),
        };
        let wrapper = format("wrapper")?;
        let definition = format("definition")?;

        let name_cleaner = match modules.get("nameCleaner") {
            None | Some(ConfigValue::Null) => None,
            Some(ConfigValue::Regex(re)) => Some(re.clone()),
            Some(ConfigValue::String(source)) => {
                let source = source
                    .strip_prefix('/')
                    .and_then(|s| s.strip_suffix('/'))
                    .unwrap_or(source);
                Some(Regex::new(source).map_err(|e| {
                    ConfigError::structural("modules.nameCleaner", format!("invalid regular expression: {}", e))
                })?)
            }
            Some(other) => {
                return Err(ConfigError::structural(
                    "modules.nameCleaner",
                    format!("expected a regex, got {}", other.kind()),
                ))
            }
        };

        let mut auto_require = IndexMap::new();
        if let Some(value) = modules.get("autoRequire").filter(|v| !v.is_null()) {
            let map = value.as_map().ok_or_else(|| {
                ConfigError::structural("modules.autoRequire", format!("expected a mapping, got {}", value.kind()))
            })?;
            for (bundle, names) in map {
                let names = string_or_list(names).ok_or_else(|| {
                    ConfigError::structural(
                        format!("modules.autoRequire.{}", bundle),
                        "expected a module name or list of module names",
                    )
                })?;
                auto_require.insert(bundle.clone(), names);
            }
        }

        Ok(Self {
            wrapper,
            definition,
            name_cleaner,
            auto_require,
        })
    }

    /// Module name for a source path.
    pub fn clean_name(&self, path: &str) -> String {
        let path = path.replace('\\', "/");
        match &self.name_cleaner {
            Some(re) => re.replace(&path, "").into_owned(),
            None => path,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Plugins {
    pub on: Vec<String>,
    pub off: Vec<String>,
    pub only: Vec<String>,
    /// Everything else under `plugins`, keyed by plugin name.
    pub settings: ConfigMap,
}

impl Plugins {
    fn from_config(plugins: &ConfigMap) -> Result<Self, ConfigError> {
        let mut result = Plugins::default();
        for (key, value) in plugins {
            let slot = match key.as_str() {
                "on" => &mut result.on,
                "off" => &mut result.off,
                "only" => &mut result.only,
                _ => {
                    result.settings.insert(key.clone(), value.clone());
                    continue;
                }
            };
            if !value.is_null() {
                *slot = PluginSelector::from_value(&format!("plugins.{}", key), value)?.into_list();
            }
        }
        Ok(result)
    }

    /// Whether a plugin should run. `only` takes precedence, then `off`.
    pub fn is_enabled(&self, name: &str) -> bool {
        if !self.only.is_empty() {
            return self.only.iter().any(|p| p == name);
        }
        !self.off.iter().any(|p| p == name)
    }

    pub fn settings_for(&self, name: &str) -> Option<&ConfigValue> {
        self.settings.get(name)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub public_path: String,
    pub base: String,
    pub port: u16,
    pub hostname: String,
    pub run: bool,
}

impl Server {
    fn from_config(server: &ConfigMap) -> Result<Self, ConfigError> {
        let string = |key: &str| match server.get(key) {
            Some(ConfigValue::String(s)) => Ok(s.clone()),
            other => Err(ConfigError::structural(
                format!("server.{}", key),
                format!("expected a string, got {}", other.map_or("nothing", ConfigValue::kind)),
            )),
        };
        let port = server
            .get("port")
            .and_then(ConfigValue::as_u64)
            .and_then(|p| u16::try_from(p).ok())
            .ok_or_else(|| ConfigError::structural("server.port", "expected a port number"))?;
        Ok(Self {
            public_path: string("publicPath")?,
            base: string("base")?,
            port,
            hostname: string("hostname")?,
            run: bool_field(server, "server.run", "run", false)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Npm {
    pub enabled: bool,
    /// Modules bundled as-is without wrapping.
    #[serde(rename = "static")]
    pub static_modules: Vec<String>,
}

impl Npm {
    fn from_config(npm: &ConfigMap) -> Result<Self, ConfigError> {
        let static_modules = match npm.get("static") {
            None | Some(ConfigValue::Null) => Vec::new(),
            Some(value) => string_or_list(value)
                .ok_or_else(|| ConfigError::structural("npm.static", "expected a list of module names"))?,
        };
        Ok(Self {
            enabled: bool_field(npm, "npm.enabled", "enabled", true)?,
            static_modules,
        })
    }
}

/// Component lists filled in later by package manifest readers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PackageInfo {
    pub npm: Components,
    pub bower: Components,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Components {
    pub components: Vec<String>,
}

/// Invocation facts recorded in the finalized config.
#[derive(Debug, Clone, Default)]
pub struct FinalizeContext {
    /// Environments applied by the cascade, in order.
    pub environments: Vec<String>,
    pub is_production: bool,
}

/// Read-only configuration handed to the build.
#[derive(Debug)]
pub struct NormalizedConfig {
    env: Vec<String>,
    is_production: bool,
    persistent: bool,
    optimize: bool,
    source_maps: bool,
    notifications: bool,
    file_list_interval: u64,
    use_polling: bool,
    paths: Paths,
    conventions: Conventions,
    modules: Modules,
    join: JoinConfig,
    plugins: Plugins,
    server: Server,
    hooks: ConfigMap,
    npm: Npm,
    package_info: PackageInfo,
    overrides: ConfigMap,
    raw: ConfigValue,
}

impl NormalizedConfig {
    pub fn env(&self) -> &[String] {
        &self.env
    }

    pub fn is_production(&self) -> bool {
        self.is_production
    }

    pub fn persistent(&self) -> bool {
        self.persistent
    }

    pub fn optimize(&self) -> bool {
        self.optimize
    }

    pub fn source_maps(&self) -> bool {
        self.source_maps
    }

    pub fn notifications(&self) -> bool {
        self.notifications
    }

    /// Polling interval for the file list, in milliseconds.
    pub fn file_list_interval(&self) -> u64 {
        self.file_list_interval
    }

    pub fn use_polling(&self) -> bool {
        self.use_polling
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn conventions(&self) -> &Conventions {
        &self.conventions
    }

    pub fn modules(&self) -> &Modules {
        &self.modules
    }

    pub fn join(&self) -> &JoinConfig {
        &self.join
    }

    pub fn plugins(&self) -> &Plugins {
        &self.plugins
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn hooks(&self) -> &ConfigMap {
        &self.hooks
    }

    pub fn npm(&self) -> &Npm {
        &self.npm
    }

    pub fn package_info(&self) -> &PackageInfo {
        &self.package_info
    }

    /// Override deltas, including the `_default` snapshot when one was taken.
    pub fn overrides(&self) -> &ConfigMap {
        &self.overrides
    }

    /// The merged tree the config was built from, for plugin-specific
    /// lookups of keys this type does not model.
    pub fn raw(&self) -> &ConfigValue {
        &self.raw
    }
}

/// Build the read-only config from the merged tree.
///
/// Path fields are validated again here since an override may have
/// replaced them after defaulting.
pub fn finalize(
    config: ConfigMap,
    ctx: &FinalizeContext,
    diags: &mut Diagnostics,
) -> Result<Arc<NormalizedConfig>, ConfigError> {
    let paths = Paths::from_config(mapping(&config, "paths")?)?;
    let join = compile_join_config(mapping(&config, "files")?, &paths.watched, diags)?;
    let conventions = Conventions::from_config(mapping(&config, "conventions")?)?;
    let modules = Modules::from_config(mapping(&config, "modules")?)?;
    let plugins = Plugins::from_config(mapping(&config, "plugins")?)?;
    let server = Server::from_config(mapping(&config, "server")?)?;
    let npm = Npm::from_config(mapping(&config, "npm")?)?;
    let hooks = mapping(&config, "hooks")?.clone();
    let overrides = mapping(&config, "overrides")?.clone();

    let file_list_interval = match config.get("fileListInterval") {
        Some(value) => value
            .as_u64()
            .ok_or_else(|| ConfigError::structural("fileListInterval", "expected a number of milliseconds"))?,
        None => 0,
    };
    let use_polling = bool_field(mapping(&config, "watcher")?, "watcher.usePolling", "usePolling", false)?;

    let normalized = NormalizedConfig {
        env: ctx.environments.clone(),
        is_production: ctx.is_production,
        persistent: bool_field(&config, "persistent", "persistent", false)?,
        optimize: bool_field(&config, "optimize", "optimize", false)?,
        source_maps: bool_field(&config, "sourceMaps", "sourceMaps", true)?,
        notifications: bool_field(&config, "notifications", "notifications", true)?,
        file_list_interval,
        use_polling,
        paths,
        conventions,
        modules,
        join,
        plugins,
        server,
        hooks,
        npm,
        package_info: PackageInfo::default(),
        overrides,
        raw: ConfigValue::Map(config),
    };
    log::debug!(
        "finalized config: env={:?} production={} outputs={}",
        normalized.env,
        normalized.is_production,
        normalized.join.output_paths().len()
    );
    Ok(Arc::new(normalized))
}

fn mapping<'a>(config: &'a ConfigMap, key: &str) -> Result<&'a ConfigMap, ConfigError> {
    match config.get(key) {
        Some(ConfigValue::Map(map)) => Ok(map),
        Some(other) => Err(ConfigError::structural(key, format!("expected a mapping, got {}", other.kind()))),
        None => Err(ConfigError::structural(key, "missing")),
    }
}

fn bool_field(map: &ConfigMap, name: &str, key: &str, default: bool) -> Result<bool, ConfigError> {
    match map.get(key) {
        None | Some(ConfigValue::Null) => Ok(default),
        Some(ConfigValue::Bool(b)) => Ok(*b),
        Some(other) => Err(ConfigError::structural(name, format!("expected a boolean, got {}", other.kind()))),
    }
}

fn describe(value: &ConfigValue) -> String {
    match value {
        ConfigValue::String(s) => format!("\"{}\"", s),
        ConfigValue::Bool(b) => b.to_string(),
        other => other.kind().to_string(),
    }
}
