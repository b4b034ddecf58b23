//! Configuration errors
//!
//! Every variant here is fatal: resolution stops and no partial
//! configuration is handed to later stages. Advisory problems are reported
//! through [`crate::diagnostics::Diagnostics`] instead.

use buildconf_matcher::MatcherError;
use std::io;
use std::path::PathBuf;

/// Exit code for failures to locate or parse the configuration file.
pub const EXIT_LOAD_ERROR: i32 = 2;

/// Exit code for a configuration that loaded but is structurally invalid.
pub const EXIT_INVALID_CONFIG: i32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("no configuration file found (tried {})", .0.join(", "))]
    NotFound(Vec<String>),

    #[error("configuration must be a mapping, got {0}")]
    NotAnObject(&'static str),

    #[error("not a valid project: configuration has no 'files' section")]
    NotAProject,

    #[error("invalid config.{key}: {reason}")]
    Structural { key: String, reason: String },

    #[error("invalid pattern in config.{key}: {source}")]
    Pattern {
        key: String,
        #[source]
        source: MatcherError,
    },
}

impl ConfigError {
    pub fn structural(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Structural {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Whether the configuration file itself could not be loaded.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            ConfigError::Io { .. } | ConfigError::Parse { .. } | ConfigError::NotFound(_)
        )
    }

    /// Process exit code distinguishing load failures from invalid content.
    pub fn exit_code(&self) -> i32 {
        if self.is_load_error() {
            EXIT_LOAD_ERROR
        } else {
            EXIT_INVALID_CONFIG
        }
    }
}
