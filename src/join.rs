//! Join config compiler
//!
//! Turns `files.<type>.joinTo` and `files.<type>.entryPoints` declarations
//! into a routing table:
//!
//! ```text
//! asset type -> entry key -> output path -> matcher
//! ```
//!
//! The entry key is [`DEFAULT_ENTRY`] for plain `joinTo` routing and the
//! entry source path otherwise. Output paths are unique across the whole
//! table: the first declaration wins and later ones are dropped with a
//! conflict diagnostic. Default joins are claimed before entry points, and
//! asset types in declaration order.

use buildconf_matcher::{compile, Matcher};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;

use crate::diagnostics::Diagnostics;
use crate::error::ConfigError;
use crate::value::{string_or_list, ConfigMap, ConfigValue};

/// Entry key for routing that is not tied to an entry point.
pub const DEFAULT_ENTRY: &str = "*";

/// Path probed to find the bundle that should receive plugin helpers.
const VENDOR_PROBE: &str = "vendor/.";

/// Output path to matcher, in declaration order.
pub type Bundles = IndexMap<String, Matcher>;

/// Asset categories that can be routed into bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetType {
    Javascripts,
    Stylesheets,
    Templates,
}

impl AssetType {
    pub const ALL: [AssetType; 3] = [
        AssetType::Javascripts,
        AssetType::Stylesheets,
        AssetType::Templates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Javascripts => "javascripts",
            AssetType::Stylesheets => "stylesheets",
            AssetType::Templates => "templates",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Only scripts can declare entry points.
    pub fn supports_entry_points(&self) -> bool {
        matches!(self, AssetType::Javascripts)
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
struct TypeRoutes {
    entries: IndexMap<String, Bundles>,
    plugin_helpers: Vec<String>,
}

/// Compiled routing table. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct JoinConfig {
    types: IndexMap<AssetType, TypeRoutes>,
    claimed: Vec<String>,
}

impl JoinConfig {
    /// Asset types present in the table, in declaration order.
    pub fn types(&self) -> impl Iterator<Item = AssetType> + '_ {
        self.types.keys().copied()
    }

    /// Entry key to bundles for one asset type.
    pub fn entries(&self, asset_type: AssetType) -> Option<&IndexMap<String, Bundles>> {
        self.types.get(&asset_type).map(|routes| &routes.entries)
    }

    pub fn entry_bundles(&self, asset_type: AssetType, entry: &str) -> Option<&Bundles> {
        self.entries(asset_type)?.get(entry)
    }

    /// Bundles under [`DEFAULT_ENTRY`].
    pub fn default_bundles(&self, asset_type: AssetType) -> Option<&Bundles> {
        self.entry_bundles(asset_type, DEFAULT_ENTRY)
    }

    /// Bundles that receive plugin helper code.
    pub fn plugin_helpers(&self, asset_type: AssetType) -> &[String] {
        self.types
            .get(&asset_type)
            .map(|routes| routes.plugin_helpers.as_slice())
            .unwrap_or_default()
    }

    /// Every output path in the order it was claimed.
    pub fn output_paths(&self) -> &[String] {
        &self.claimed
    }

    /// `(entry key, output path)` pairs whose matcher accepts `path`.
    pub fn bundles_for<'a>(&'a self, asset_type: AssetType, path: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.entries(asset_type)
            .into_iter()
            .flat_map(|entries| entries.iter())
            .flat_map(move |(entry, bundles)| {
                bundles
                    .iter()
                    .filter(move |(_, matcher)| matcher.matches(path))
                    .map(move |(output, _)| (entry.as_str(), output.as_str()))
            })
    }
}

/// Compile the `files` section.
///
/// `watched` is used only to warn about entry points that look like output
/// paths.
pub fn compile_join_config(
    files: &ConfigMap,
    watched: &[String],
    diags: &mut Diagnostics,
) -> Result<JoinConfig, ConfigError> {
    let mut compiler = JoinCompiler {
        join: JoinConfig::default(),
        claimed: HashSet::new(),
        diags,
    };

    let mut declared = Vec::new();
    for (type_name, type_section) in files {
        let Some(asset_type) = AssetType::parse(type_name) else {
            compiler.diags.conflict(format!(
                "config.files.{} is not a known asset type (expected one of: javascripts, stylesheets, templates), ignoring",
                type_name
            ));
            continue;
        };
        let type_section = type_section.as_map().ok_or_else(|| {
            ConfigError::structural(
                format!("files.{}", type_name),
                format!("expected a mapping, got {}", type_section.kind()),
            )
        })?;
        compiler.compile_default_joins(asset_type, type_section)?;
        declared.push((asset_type, type_section));
    }

    for (asset_type, type_section) in declared {
        let Some(entry_points) = type_section.get("entryPoints").filter(|v| !v.is_null()) else {
            continue;
        };
        if !asset_type.supports_entry_points() {
            compiler.diags.conflict(format!(
                "config.files.{}.entryPoints is not supported, only javascripts can declare entry points; ignoring",
                asset_type
            ));
            continue;
        }
        compiler.compile_entry_points(asset_type, entry_points, watched)?;
    }

    Ok(compiler.join)
}

struct JoinCompiler<'d> {
    join: JoinConfig,
    claimed: HashSet<String>,
    diags: &'d mut Diagnostics,
}

impl JoinCompiler<'_> {
    fn claim(&mut self, output: &str) -> bool {
        if self.claimed.insert(output.to_string()) {
            self.join.claimed.push(output.to_string());
            true
        } else {
            false
        }
    }

    fn compile_default_joins(&mut self, asset_type: AssetType, type_section: &ConfigMap) -> Result<(), ConfigError> {
        let key = format!("files.{}.joinTo", asset_type);
        let declared = match type_section.get("joinTo") {
            None | Some(ConfigValue::Null) => Bundles::new(),
            Some(value) => compile_bundles(&key, value)?,
        };

        let mut bundles = Bundles::new();
        for (output, matcher) in declared {
            if self.claim(&output) {
                bundles.insert(output, matcher);
            } else {
                self.diags.conflict(format!(
                    "'{}' is already claimed by another join, dropping it from config.files.{}.joinTo",
                    output, asset_type
                ));
            }
        }

        let plugin_helpers = match type_section.get("pluginHelpers").filter(|v| !v.is_null()) {
            Some(value) => string_or_list(value).ok_or_else(|| {
                ConfigError::structural(
                    format!("files.{}.pluginHelpers", asset_type),
                    format!("expected a string or list of strings, got {}", value.kind()),
                )
            })?,
            None => infer_plugin_helpers(&bundles),
        };

        let routes = self.join.types.entry(asset_type).or_default();
        routes.plugin_helpers = plugin_helpers;
        if !bundles.is_empty() {
            routes.entries.insert(DEFAULT_ENTRY.to_string(), bundles);
        }
        Ok(())
    }

    fn compile_entry_points(
        &mut self,
        asset_type: AssetType,
        entry_points: &ConfigValue,
        watched: &[String],
    ) -> Result<(), ConfigError> {
        let entry_points = entry_points.as_map().ok_or_else(|| {
            ConfigError::structural(
                format!("files.{}.entryPoints", asset_type),
                format!("expected a mapping, got {}", entry_points.kind()),
            )
        })?;

        for (entry, outputs) in entry_points {
            if entry == DEFAULT_ENTRY {
                self.diags.conflict(format!(
                    "'{}' is reserved for config.files.{}.joinTo routing, can't use it as an entry point; ignoring",
                    DEFAULT_ENTRY, asset_type
                ));
                continue;
            }

            let in_watched = watched
                .iter()
                .any(|dir| entry.starts_with(&format!("{}/", dir.trim_end_matches('/'))));
            if !in_watched {
                self.diags.conflict(format!(
                    "entry points map an entry file to an output file ('entry.js': 'output.js'); '{}' is not under a watched directory and is probably an output file",
                    entry
                ));
            }

            let key = format!("files.{}.entryPoints.{}", asset_type, entry);
            let declared = compile_bundles(&key, outputs)?;
            let defaults = self.join.default_bundles(asset_type);
            let taken_by_default: HashSet<String> = defaults
                .map(|bundles| bundles.keys().cloned().collect())
                .unwrap_or_default();

            let mut bundles = Bundles::new();
            for (output, matcher) in declared {
                if taken_by_default.contains(&output) {
                    self.diags.conflict(format!(
                        "config.files.{}.joinTo already defines '{}', can't add it as an output of entry point '{}'",
                        asset_type, output, entry
                    ));
                } else if !self.claim(&output) {
                    self.diags.conflict(format!(
                        "'{}' is already used by another join or entry point, can't add it to config.files.{}.entryPoints for '{}'",
                        output, asset_type, entry
                    ));
                } else {
                    bundles.insert(output, matcher);
                }
            }

            if !bundles.is_empty() {
                self.join
                    .types
                    .entry(asset_type)
                    .or_default()
                    .entries
                    .insert(entry.clone(), bundles);
            }
        }
        Ok(())
    }
}

/// Compile a `joinTo`-shaped value: a single output path (catch-all) or a
/// mapping of output path to pattern.
fn compile_bundles(key: &str, value: &ConfigValue) -> Result<Bundles, ConfigError> {
    match value {
        ConfigValue::String(output) => {
            let mut bundles = Bundles::new();
            bundles.insert(output.clone(), Matcher::everything());
            Ok(bundles)
        }
        ConfigValue::Map(map) => map
            .iter()
            .map(|(output, pattern)| -> Result<(String, Matcher), ConfigError> {
                let pattern = pattern.to_pattern(&format!("{}.{}", key, output))?;
                Ok((output.clone(), compile(&pattern)))
            })
            .collect(),
        other => Err(ConfigError::structural(
            key,
            format!("expected an output path or a mapping of output paths to patterns, got {}", other.kind()),
        )),
    }
}

/// Pick the bundle(s) that receive plugin helper code: the bundle accepting
/// vendor files, else one named like a vendor bundle, else the first.
fn infer_plugin_helpers(bundles: &Bundles) -> Vec<String> {
    bundles
        .iter()
        .find(|(_, matcher)| matcher.matches(VENDOR_PROBE))
        .map(|(output, _)| output)
        .or_else(|| {
            bundles
                .keys()
                .find(|output| output.to_lowercase().contains("vendor"))
        })
        .or_else(|| bundles.keys().next())
        .map(|output| vec![output.clone()])
        .unwrap_or_default()
}
