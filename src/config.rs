//! Policy tables and runtime settings.

use std::path::PathBuf;

// ———————————————————————————————————————————————————————————————————————————
// POLICY
// ———————————————————————————————————————————————————————————————————————————

/// Every concrete type name a `Type` column may use, sorted.
pub const KNOWN_TYPES: &[&str] = &[
    "array",
    "bitmask",
    "boolean",
    "date",
    "dictionary",
    "integer",
    "matrix",
    "name",
    "name-tree",
    "null",
    "number",
    "number-tree",
    "rectangle",
    "stream",
    "string",
    "string-ascii",
    "string-byte",
    "string-text",
];

/// Types whose alternative must carry a `Link`; every other type must not.
pub const LINK_REQUIRED_TYPES: &[&str] = &["array", "dictionary", "name-tree", "number-tree", "stream"];

pub const PDF_VERSIONS: &[&str] = &["1.0", "1.1", "1.2", "1.3", "1.4", "1.5", "1.6", "1.7", "2.0"];

pub const DEFAULT_ROOTS: &[&str] = &["FileTrailer", "XRefStream"];

pub const TYPE_WRAPPERS: &[&str] = &["SinceVersion", "Deprecated"];
pub const LINK_WRAPPERS: &[&str] = &["SinceVersion", "BeforeVersion", "IsPDFVersion", "Deprecated"];
pub const SINCE_VERSION_FUNCTIONS: &[&str] = &["SinceVersion", "Extension"];
pub const REQUIRED_FUNCTIONS: &[&str] = &["IsRequired"];
pub const INDIRECT_FUNCTIONS: &[&str] = &["MustBeDirect", "MustBeIndirect"];

/// Column order of every schema file.
pub const COLUMNS: [&str; 12] = [
    "Key",
    "Type",
    "SinceVersion",
    "DeprecatedIn",
    "Required",
    "IndirectReference",
    "Inheritable",
    "DefaultValue",
    "PossibleValues",
    "SpecialCase",
    "Link",
    "Note",
];

pub const DEFAULT_MAX_DEPTH: usize = 512;

pub fn is_known_type(name: &str) -> bool {
    KNOWN_TYPES.contains(&name)
}

pub fn requires_link(name: &str) -> bool {
    LINK_REQUIRED_TYPES.contains(&name)
}

pub fn is_pdf_version(text: &str) -> bool {
    PDF_VERSIONS.contains(&text)
}

// ———————————————————————————————————————————————————————————————————————————
// RUNTIME SETTINGS
// ———————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Object names reachability starts from. They are never reported as orphans.
    pub roots: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self { roots: DEFAULT_ROOTS.iter().map(|s| s.to_string()).collect() }
    }
}

#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Forces the schema object used for the trailer. Detected when `None`.
    pub root_object: Option<String>,
    pub max_depth: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self { root_object: None, max_depth: DEFAULT_MAX_DEPTH }
    }
}

/// Where per-document reports go.
#[derive(Debug, Clone, Default)]
pub enum ReportSink {
    #[default]
    Stdout,
    Directory(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_are_sorted_and_complete() {
        assert_eq!(KNOWN_TYPES.len(), 18);
        assert!(KNOWN_TYPES.windows(2).all(|w| w[0] < w[1]));
        assert!(LINK_REQUIRED_TYPES.iter().all(|t| is_known_type(t)));
    }

    #[test]
    fn versions() {
        assert!(is_pdf_version("1.7"));
        assert!(is_pdf_version("2.0"));
        assert!(!is_pdf_version("1.8"));
        assert!(!is_pdf_version("2"));
    }
}
