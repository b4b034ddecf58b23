//! Path matcher compiler for build configuration patterns.
//!
//! User configuration names source files in several shapes: literal paths,
//! globs, regular expressions, predicate functions, or lists of any of those.
//! This crate turns each shape into a uniform [`Matcher`] answering one
//! question: does this path belong?

mod matcher;
mod pattern;

pub use matcher::{compile, Matcher};
pub use pattern::{Pattern, Predicate};

/// Errors raised while turning user input into a [`Pattern`].
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("invalid regular expression '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },
}
