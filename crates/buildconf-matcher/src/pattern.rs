//! Pattern shapes accepted from user configuration.

use regex_lite::{Regex, RegexBuilder};
use std::fmt;
use std::sync::Arc;

use crate::MatcherError;

type PredicateFn = dyn Fn(&str) -> bool + Send + Sync;

/// A user-supplied path predicate.
///
/// Cheap to clone; two predicates are equal only if they share the same
/// underlying function.
#[derive(Clone)]
pub struct Predicate {
    func: Arc<PredicateFn>,
}

impl Predicate {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// Evaluate the predicate against a path.
    pub fn call(&self, path: &str) -> bool {
        (self.func)(path)
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// An uncompiled pattern.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Literal path or glob (`app/**/*.js`).
    Glob(String),
    /// Regular expression searched anywhere in the path.
    Regex(Regex),
    /// Arbitrary predicate.
    Predicate(Predicate),
    /// Union: matches when any member matches.
    Any(Vec<Pattern>),
}

impl Pattern {
    /// Parse a string pattern.
    ///
    /// `/source/` and `/source/i` are regular expression literals, anything
    /// else is a glob.
    pub fn parse(input: &str) -> Result<Self, MatcherError> {
        match split_regex_literal(input) {
            Some((source, flags)) => Ok(Pattern::Regex(build_regex(source, flags)?)),
            None => Ok(Pattern::Glob(input.to_string())),
        }
    }

    /// Build a regex pattern from its source text.
    pub fn regex(source: &str) -> Result<Self, MatcherError> {
        Ok(Pattern::Regex(build_regex(source, "")?))
    }
}

/// Flags accepted after a regex literal's closing slash.
const REGEX_FLAGS: &str = "igy";

/// Split `/source/flags` into its parts. Returns `None` for anything that is
/// not shaped like a regex literal.
fn split_regex_literal(input: &str) -> Option<(&str, &str)> {
    let rest = input.strip_prefix('/')?;
    let end = rest.rfind('/')?;
    let (source, flags) = (&rest[..end], &rest[end + 1..]);
    if source.is_empty() || !flags.chars().all(|c| REGEX_FLAGS.contains(c)) {
        return None;
    }
    Some((source, flags))
}

fn build_regex(source: &str, flags: &str) -> Result<Regex, MatcherError> {
    let mut builder = RegexBuilder::new(source);
    // Global and sticky have no meaning for a single membership test.
    if flags.contains('i') {
        builder.case_insensitive(true);
    }
    builder.build().map_err(|e| MatcherError::InvalidRegex {
        pattern: source.to_string(),
        reason: e.to_string(),
    })
}
