//! Resolution report (JSON)

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::join::JoinConfig;
use crate::normalized::{ModuleFormat, NormalizedConfig, Npm, Paths, Server};
use crate::resolve::Resolution;

/// Schema identifier for the report
pub const REPORT_SCHEMA_ID: &str = "buildconf/resolution@1";

/// Entry key -> output path -> matcher description
pub type JoinReport = IndexMap<String, IndexMap<String, IndexMap<String, String>>>;

#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    pub schema_id: String,

    /// When the report was produced
    pub resolved_at: DateTime<Utc>,

    /// Config file the tree was loaded from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceReport>,

    pub environments: Vec<String>,
    pub production: bool,
    pub persistent: bool,
    pub optimize: bool,
    pub source_maps: bool,

    pub paths: Paths,
    pub server: Server,
    pub modules: ModulesReport,
    pub npm: Npm,

    /// Convention name -> matcher description
    pub conventions: IndexMap<String, String>,

    /// Asset type -> routing table
    pub join: JoinReport,

    /// Asset type -> bundles receiving plugin helpers
    pub plugin_helpers: IndexMap<String, Vec<String>>,

    pub plugins: PluginsReport,

    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModulesReport {
    pub wrapper: ModuleFormat,
    pub definition: ModuleFormat,
    pub auto_require: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PluginsReport {
    pub on: Vec<String>,
    pub off: Vec<String>,
    pub only: Vec<String>,
}

impl ResolutionReport {
    pub fn from_resolution(resolution: &Resolution) -> Self {
        let config: &NormalizedConfig = &resolution.config;
        let plugins = config.plugins();
        let conventions = config
            .conventions()
            .names()
            .filter_map(|name| {
                let matcher = config.conventions().get(name)?;
                Some((name.to_string(), matcher.describe()))
            })
            .collect();

        Self {
            schema_id: REPORT_SCHEMA_ID.to_string(),
            resolved_at: Utc::now(),
            source: resolution.source.as_ref().map(|source| SourceReport {
                path: source.path.display().to_string(),
                sha256: source.digest.clone(),
            }),
            environments: config.env().to_vec(),
            production: config.is_production(),
            persistent: config.persistent(),
            optimize: config.optimize(),
            source_maps: config.source_maps(),
            paths: config.paths().clone(),
            server: config.server().clone(),
            modules: ModulesReport {
                wrapper: config.modules().wrapper,
                definition: config.modules().definition,
                auto_require: config.modules().auto_require.clone(),
            },
            npm: config.npm().clone(),
            conventions,
            join: join_report(config.join()),
            plugin_helpers: config
                .join()
                .types()
                .map(|t| (t.to_string(), config.join().plugin_helpers(t).to_vec()))
                .collect(),
            plugins: PluginsReport {
                on: plugins.on.clone(),
                off: plugins.off.clone(),
                only: plugins.only.clone(),
            },
            diagnostics: resolution.diagnostics.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Short human summary for `check`.
    pub fn human_summary(&self) -> String {
        let envs = if self.environments.is_empty() {
            "none".to_string()
        } else {
            self.environments.join(", ")
        };
        let outputs: usize = self
            .join
            .values()
            .flat_map(|entries| entries.values())
            .map(IndexMap::len)
            .sum();
        let mut out = format!(
            "config OK: environments [{}], {} output bundle(s), public path '{}'",
            envs, outputs, self.paths.public
        );
        if !self.diagnostics.is_empty() {
            out.push_str(&format!(", {} warning(s)", self.diagnostics.len()));
        }
        out
    }
}

fn join_report(join: &JoinConfig) -> JoinReport {
    join.types()
        .filter_map(|asset_type| {
            let entries = join.entries(asset_type)?;
            let table = entries
                .iter()
                .map(|(entry, bundles)| {
                    let bundles = bundles
                        .iter()
                        .map(|(output, matcher)| (output.clone(), matcher.describe()))
                        .collect();
                    (entry.clone(), bundles)
                })
                .collect();
            Some((asset_type.to_string(), table))
        })
        .collect()
}
