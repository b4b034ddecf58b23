//! Raw configuration handling
//!
//! Everything that happens to the raw tree before it is compiled:
//! 1. Loading from a TOML or JSON file
//! 2. Legacy field detection
//! 3. Built-in defaults and structural validation
//! 4. Layered deep merge used by the override cascade

mod defaults;
mod deprecations;
mod loader;
mod merge;

pub use defaults::{join_path, normalize_watched, BuiltinDefaults, DefaultsContext};
pub(crate) use defaults::section;
pub use deprecations::check_deprecations;
pub use loader::{
    load_config_file, locate_config, parse_config_str, ConfigFormat, LoadedConfig,
    CONFIG_EXTENSIONS,
};
pub use merge::{deep_merge_with, MergePolicy};
