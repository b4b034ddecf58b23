//! buildconf - configuration resolution for an asset build pipeline
//!
//! Turns a user-authored build configuration into a validated, read-only
//! [`NormalizedConfig`]: defaults are filled, per-environment overrides are
//! cascaded, `joinTo`/`entryPoints` declarations are compiled into a routing
//! table and conventions become path matchers.

pub mod cascade;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod join;
pub mod normalized;
pub mod options;
pub mod report;
pub mod resolve;
pub mod value;

pub use buildconf_matcher::{compile, Matcher, MatcherError, Pattern, Predicate};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::ConfigError;
pub use join::{AssetType, JoinConfig, DEFAULT_ENTRY};
pub use normalized::{ModuleFormat, NormalizedConfig, PluginSelector};
pub use options::ResolveOptions;
pub use report::ResolutionReport;
pub use resolve::{resolve_config, resolve_file, resolve_project, Resolution};
pub use value::{ConfigMap, ConfigValue};
