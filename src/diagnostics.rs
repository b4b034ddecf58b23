//! Advisory diagnostics
//!
//! Conflicts and deprecations never stop resolution. Each one is logged as a
//! single warning line and kept so callers can inspect what was dropped or
//! migrated.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// A declaration was dropped (first writer wins) or ignored.
    Conflict,
    /// A legacy field was used; it is inert or has been migrated.
    Deprecation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Collects diagnostics in emission order.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conflict(&mut self, message: impl Into<String>) {
        self.push(DiagnosticKind::Conflict, message.into());
    }

    pub fn deprecation(&mut self, message: impl Into<String>) {
        self.push(DiagnosticKind::Deprecation, message.into());
    }

    fn push(&mut self, kind: DiagnosticKind, message: String) {
        log::warn!("{}", message);
        self.items.push(Diagnostic { kind, message });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Diagnostics of one kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.kind == kind)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
