//! Non-fatal findings shared by every pass.
//!
//! Ingestion, validation and matching never stop at the first defect. Each
//! one appends a [`Diagnostic`] to the collection it returns, and the caller
//! decides what to print and whether anything is fatal.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticKind {
    Lex,
    Parse,
    Shape,
    Ingestion,
    SchemaConsistency,
    Match,
}

impl DiagnosticKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Lex => "lex",
            Self::Parse => "parse",
            Self::Shape => "shape",
            Self::Ingestion => "ingestion",
            Self::SchemaConsistency => "schema-consistency",
            Self::Match => "match",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

/// Where a finding points: a schema cell or a document path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Location {
    pub object: Option<String>,
    pub key: Option<String>,
    pub column: Option<String>,
    /// Document path such as `trailer/Root/Pages/Kids/0`.
    pub path: Option<String>,
}

impl Location {
    pub fn object(object: impl Into<String>) -> Self {
        Self { object: Some(object.into()), ..Self::default() }
    }

    pub fn key(object: impl Into<String>, key: impl Into<String>) -> Self {
        Self { object: Some(object.into()), key: Some(key.into()), ..Self::default() }
    }

    pub fn cell(object: impl Into<String>, key: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            object: Some(object.into()),
            key: Some(key.into()),
            column: Some(column.into()),
            path: None,
        }
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self { path: Some(path.into()), ..Self::default() }
    }

    pub fn with_object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{path}")?;
            if let Some(obj) = &self.object {
                write!(f, " ({obj})")?;
            }
            return Ok(());
        }
        let parts: Vec<&str> = [&self.object, &self.key, &self.column]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        write!(f, "{}", parts.join("::"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Stable identifier, e.g. `unsorted-types` or `cycle`.
    pub code: &'static str,
    pub location: Location,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, code: &'static str, location: Location, message: impl Into<String>) -> Self {
        Self { kind, severity: Severity::Error, code, location, message: message.into() }
    }

    pub fn warning(kind: DiagnosticKind, code: &'static str, location: Location, message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, ..Self::new(kind, code, location, message) }
    }

    pub fn note(kind: DiagnosticKind, code: &'static str, location: Location, message: impl Into<String>) -> Self {
        Self { severity: Severity::Note, ..Self::new(kind, code, location, message) }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}: {}", self.kind.label(), self.code, self.location, self.message)
    }
}

/// Count per code, handy for summaries and tests.
pub fn count_by_code<'a>(diags: impl IntoIterator<Item = &'a Diagnostic>) -> indexmap::IndexMap<&'static str, usize> {
    let mut out = indexmap::IndexMap::new();
    for d in diags {
        *out.entry(d.code).or_insert(0) += 1;
    }
    out.sort_keys();
    out
}
