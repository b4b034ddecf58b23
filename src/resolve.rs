//! Resolution pipeline
//!
//! raw tree -> legacy checks -> defaults -> override cascade -> finalize
//!
//! Structural and load errors abort the whole pipeline. Conflicts and
//! deprecations are collected and returned alongside the config.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cascade::apply_overrides;
use crate::config::{check_deprecations, load_config_file, locate_config, BuiltinDefaults, DefaultsContext};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ConfigError;
use crate::normalized::{finalize, FinalizeContext, NormalizedConfig};
use crate::options::ResolveOptions;
use crate::value::{ConfigMapExt, ConfigValue};

/// Where the raw tree came from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// SHA-256 of the file bytes
    pub digest: String,
}

/// Finalized config plus everything reported along the way.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub config: Arc<NormalizedConfig>,
    pub diagnostics: Vec<Diagnostic>,
    pub source: Option<ConfigSource>,
}

/// Resolve an in-memory raw tree.
pub fn resolve_config(raw: ConfigValue, options: &ResolveOptions) -> Result<Resolution, ConfigError> {
    resolve_with_defaults(raw, options, &BuiltinDefaults::default())
}

/// Resolve with a custom set of built-in defaults.
pub fn resolve_with_defaults(
    raw: ConfigValue,
    options: &ResolveOptions,
    defaults: &BuiltinDefaults,
) -> Result<Resolution, ConfigError> {
    let mut config = match raw {
        ConfigValue::Map(map) => map,
        other => return Err(ConfigError::NotAnObject(other.kind())),
    };
    if !config.has("files") {
        return Err(ConfigError::NotAProject);
    }

    let mut diags = Diagnostics::new();
    check_deprecations(&mut config, &mut diags);

    let ctx = DefaultsContext {
        config_path: options.config_path.clone(),
        persistent: options.persistent,
    };
    defaults.apply(&mut config, &ctx)?;

    let environments = options.environments();
    log::debug!("resolving config for environments {:?}", environments);
    let config = apply_overrides(config, &environments, options.cli_delta())?;

    let ctx = FinalizeContext {
        environments,
        is_production: options.is_production(),
    };
    let config = finalize(config, &ctx, &mut diags)?;

    Ok(Resolution {
        config,
        diagnostics: diags.into_vec(),
        source: None,
    })
}

/// Load `path` and resolve it.
///
/// `options.config_path` defaults to `path`.
pub fn resolve_file(path: &Path, options: &ResolveOptions) -> Result<Resolution, ConfigError> {
    let loaded = load_config_file(path)?;
    log::debug!("loaded {} (sha256 {})", loaded.path.display(), loaded.digest);

    let mut options = options.clone();
    if options.config_path.is_none() {
        options.config_path = Some(loaded.path.display().to_string());
    }

    let mut resolution = resolve_config(loaded.value, &options)?;
    resolution.source = Some(ConfigSource {
        path: loaded.path,
        digest: loaded.digest,
    });
    Ok(resolution)
}

/// Find `<base>.toml` or `<base>.json` and resolve it.
pub fn resolve_project(base: &Path, options: &ResolveOptions) -> Result<Resolution, ConfigError> {
    let path = locate_config(base)?;
    resolve_file(&path, options)
}
