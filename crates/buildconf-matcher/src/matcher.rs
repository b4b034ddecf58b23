//! Compiled matchers.

use globset::{GlobBuilder, GlobMatcher};
use regex_lite::Regex;
use std::fmt;
use std::sync::Arc;

use crate::pattern::{Pattern, Predicate};

#[derive(Debug)]
enum Kind {
    Everything,
    Glob {
        source: String,
        glob: Option<GlobMatcher>,
    },
    Regex(Regex),
    Predicate(Predicate),
    Any(Vec<Matcher>),
    Excluding {
        inner: Matcher,
        exclude: Predicate,
    },
}

/// A compiled `(path) -> bool` membership test.
///
/// Matching is side-effect free and total: any path string gets an answer.
#[derive(Clone)]
pub struct Matcher {
    kind: Arc<Kind>,
}

/// Compile a pattern into a matcher.
///
/// Globs that fail to parse degrade to exact path equality.
pub fn compile(pattern: &Pattern) -> Matcher {
    let kind = match pattern {
        Pattern::Glob(source) => Kind::Glob {
            source: source.clone(),
            glob: GlobBuilder::new(source)
                .literal_separator(true)
                .build()
                .ok()
                .map(|g| g.compile_matcher()),
        },
        Pattern::Regex(re) => Kind::Regex(re.clone()),
        Pattern::Predicate(p) => Kind::Predicate(p.clone()),
        Pattern::Any(items) => Kind::Any(items.iter().map(compile).collect()),
    };
    Matcher {
        kind: Arc::new(kind),
    }
}

impl Matcher {
    /// Matcher accepting every path.
    pub fn everything() -> Self {
        Self {
            kind: Arc::new(Kind::Everything),
        }
    }

    /// Narrow this matcher: paths accepted by `exclude` never match.
    ///
    /// The description stays the inner matcher's.
    pub fn excluding<F>(self, exclude: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            kind: Arc::new(Kind::Excluding {
                inner: self,
                exclude: Predicate::new(exclude),
            }),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self.kind.as_ref() {
            Kind::Everything => true,
            Kind::Glob { source, glob } => {
                let normalized = path.replace('\\', "/");
                normalized == *source
                    || glob.as_ref().is_some_and(|g| g.is_match(&normalized))
            }
            Kind::Regex(re) => re.is_match(path),
            Kind::Predicate(p) => p.call(path),
            Kind::Any(items) => items.iter().any(|m| m.matches(path)),
            Kind::Excluding { inner, exclude } => !exclude.call(path) && inner.matches(path),
        }
    }

    /// Whether this is the catch-all matcher.
    pub fn is_everything(&self) -> bool {
        matches!(self.kind.as_ref(), Kind::Everything)
    }

    /// Short human-readable description, used in reports.
    pub fn describe(&self) -> String {
        match self.kind.as_ref() {
            Kind::Everything => "*".to_string(),
            Kind::Glob { source, .. } => format!("glob:{}", source),
            Kind::Regex(re) => format!("regex:/{}/", re.as_str()),
            Kind::Predicate(_) => "predicate".to_string(),
            Kind::Any(items) => {
                let parts: Vec<String> = items.iter().map(Matcher::describe).collect();
                format!("any[{}]", parts.join(", "))
            }
            Kind::Excluding { inner, .. } => inner.describe(),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher({})", self.describe())
    }
}
