//! Walks a document object graph against the schema and classifies every
//! node it reaches.
//!
//! The walk is depth first over an explicit stack, so long reference
//! chains cannot overflow the call stack. Indirect containers are entered
//! at most once per walk. Reaching one again from inside its own subtree is
//! a `cycle` note, reaching it again along another path is a
//! `shared-object` note, and either way its subtree is skipped. Nothing the
//! document contains
//! stops the walk; every surprise becomes a [`Diagnostic`].

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::MatcherConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Location};
use crate::document::{Document, NodeKind, PdfObject, RefId};
use crate::schema::{PdfType, SchemaDom, SchemaObject, SchemaRow};

// ———————————————————————————————————————————————————————————————————————————
// TYPES
// ———————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Key declared by the schema object.
    MatchedSchema,
    /// Accepted through a wildcard key.
    MatchedButExtra,
    Unmatched,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MatchedSchema => "matched-schema",
            Self::MatchedButExtra => "matched-but-extra",
            Self::Unmatched => "unmatched",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the walk learned about one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub path: String,
    pub key: String,
    /// Schema object the key was looked up in.
    pub object: Option<String>,
    pub class: Classification,
    pub kind: NodeKind,
    pub ref_id: Option<RefId>,
    /// Type alternative chosen for the node.
    pub schema_type: Option<PdfType>,
    /// Schema object used for the node's own children.
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MatchReport {
    pub root_object: Option<String>,
    pub annotations: Vec<Annotation>,
    pub diagnostics: Vec<Diagnostic>,
}

impl MatchReport {
    pub fn class_counts(&self) -> IndexMap<Classification, usize> {
        let mut out = IndexMap::new();
        for class in [Classification::MatchedSchema, Classification::MatchedButExtra, Classification::Unmatched] {
            out.insert(class, 0);
        }
        for a in &self.annotations {
            *out.entry(a.class).or_insert(0) += 1;
        }
        out
    }

    pub fn find(&self, path: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.path == path)
    }
}

/// A node waiting on the stack together with what its parent knew about it.
struct Frame<'a> {
    node: &'a PdfObject,
    path: String,
    key: String,
    parent: Option<&'a str>,
    row: Option<&'a SchemaRow>,
    class: Classification,
    /// Schema object for the node's children, when already decided.
    forced: Option<&'a str>,
    depth: usize,
    /// Indirect containers entered on the way down to this node.
    ancestors: Rc<Vec<RefId>>,
}

static DANGLING: PdfObject = PdfObject::Null;

// ———————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ———————————————————————————————————————————————————————————————————————————

pub fn match_document(dom: &SchemaDom, doc: &Document, config: &MatcherConfig) -> MatchReport {
    let mut walk = Walk {
        dom,
        doc,
        max_depth: config.max_depth,
        visited: HashSet::new(),
        report: MatchReport::default(),
    };

    let root = root_object(doc, config);
    let forced = match dom.objects.get_key_value(root.as_str()) {
        Some((name, _)) => Some(name.as_str()),
        None => {
            walk.report.diagnostics.push(Diagnostic::new(
                DiagnosticKind::Match,
                "missing-root",
                Location::path("trailer"),
                format!("root object `{root}` is not in the schema; walking unmatched"),
            ));
            None
        }
    };
    walk.report.root_object = forced.map(str::to_string);

    walk.run(Frame {
        node: &doc.trailer,
        path: "trailer".to_string(),
        key: "trailer".to_string(),
        parent: None,
        row: None,
        class: if forced.is_some() { Classification::MatchedSchema } else { Classification::Unmatched },
        forced,
        depth: 0,
        ancestors: Rc::default(),
    });

    let report = walk.report;
    info!(
        root = report.root_object.as_deref().unwrap_or("-"),
        nodes = report.annotations.len(),
        diagnostics = report.diagnostics.len(),
        "document matched"
    );
    report
}

/// Configured root, else `XRefStream` for cross-reference stream trailers,
/// else `FileTrailer`.
pub fn root_object(doc: &Document, config: &MatcherConfig) -> String {
    if let Some(name) = &config.root_object {
        return name.clone();
    }
    if doc.is_xref_stream() { "XRefStream" } else { "FileTrailer" }.to_string()
}

struct Walk<'a> {
    dom: &'a SchemaDom,
    doc: &'a Document,
    max_depth: usize,
    visited: HashSet<RefId>,
    report: MatchReport,
}

impl<'a> Walk<'a> {
    fn run(&mut self, root: Frame<'a>) {
        let mut stack = vec![root];
        while let Some(frame) = stack.pop() {
            if frame.depth > self.max_depth {
                self.diag(Diagnostic::warning(
                    DiagnosticKind::Match,
                    "depth-limit",
                    self.location(&frame),
                    format!("nesting deeper than {}; subtree skipped", self.max_depth),
                ));
                continue;
            }
            let children = self.visit(frame);
            stack.extend(children.into_iter().rev());
        }
    }

    /// Annotate one node and return the frames of its children.
    fn visit(&mut self, frame: Frame<'a>) -> Vec<Frame<'a>> {
        let (object, ref_id) = match self.doc.resolve(frame.node) {
            Ok(node) => (node.object, node.ref_id),
            Err(id) => {
                self.diag(Diagnostic::new(
                    DiagnosticKind::Match,
                    "dangling-reference",
                    self.location(&frame),
                    format!("reference `{id} R` points to no object; treated as null"),
                ));
                (&DANGLING, None)
            }
        };
        let kind = object.kind();

        let mut class = frame.class;
        let mut alternative = None;
        if let Some(row) = frame.row {
            alternative = pick_alternative(row, kind);
            if alternative.is_none() {
                let declared: Vec<_> = row.types.iter().filter_map(|t| t.reduce()).collect();
                self.diag(Diagnostic::warning(
                    DiagnosticKind::Match,
                    "unexpected-kind",
                    self.location(&frame),
                    format!("found {kind}, schema allows {}", declared.join(";")),
                ));
                class = Classification::Unmatched;
            }
        }

        let link = match (frame.forced, frame.row, alternative) {
            (Some(name), ..) => Some(name),
            (None, Some(row), Some((i, _))) => choose_link(self.dom, row, i, object),
            _ => None,
        };
        let schema_type = alternative.map(|(_, t)| t);

        self.report.annotations.push(Annotation {
            path: frame.path.clone(),
            key: frame.key.clone(),
            object: frame.parent.map(str::to_string),
            class,
            kind,
            ref_id,
            schema_type,
            link: link.map(str::to_string),
        });

        if !kind.is_container() {
            return Vec::new();
        }
        if let Some(id) = ref_id {
            if !self.visited.insert(id) {
                let (code, how) = if frame.ancestors.contains(&id) {
                    ("cycle", "inside its own subtree")
                } else {
                    ("shared-object", "through another path")
                };
                self.diag(Diagnostic::note(
                    DiagnosticKind::Match,
                    code,
                    self.location(&frame),
                    format!("object {id} already visited {how}; not entered again"),
                ));
                return Vec::new();
            }
        }

        match schema_type {
            Some(PdfType::Matrix) => {
                self.check_special_array(&frame, object, 6, "matrix");
                return Vec::new();
            }
            Some(PdfType::Rectangle) => {
                self.check_special_array(&frame, object, 4, "rectangle");
                return Vec::new();
            }
            Some(PdfType::NameTree | PdfType::NumberTree) => return Vec::new(),
            _ => {}
        }

        let dom = self.dom;
        let schema = link.and_then(|name| dom.objects.get_key_value(name));
        let ancestors = match ref_id {
            Some(id) => Rc::new(frame.ancestors.iter().copied().chain([id]).collect()),
            None => Rc::clone(&frame.ancestors),
        };
        let child = |node, key: String, row, class| Frame {
            node,
            path: format!("{}/{key}", frame.path),
            key,
            parent: schema.map(|(name, _)| name.as_str()),
            row,
            class,
            forced: None,
            depth: frame.depth + 1,
            ancestors: Rc::clone(&ancestors),
        };

        let mut children = Vec::new();
        match object {
            PdfObject::Dictionary(dict) | PdfObject::Stream { dict, .. } => {
                for (key, value) in dict {
                    let (row, class) = lookup_key(schema.map(|(_, o)| o), key);
                    if class == Classification::Unmatched {
                        self.unmatched(&frame, schema, key);
                    }
                    children.push(child(value, key.clone(), row, class));
                }
                if let Some((name, obj)) = schema {
                    self.missing_required(&frame, name, obj, |k| dict.contains_key(k));
                }
            }
            PdfObject::Array(items) => {
                for (i, value) in items.iter().enumerate() {
                    let (row, class) = lookup_index(schema.map(|(_, o)| o), i);
                    if class == Classification::Unmatched {
                        self.unmatched(&frame, schema, &i.to_string());
                    }
                    children.push(child(value, i.to_string(), row, class));
                }
                if let Some((name, obj)) = schema {
                    self.missing_required(&frame, name, obj, |k| k.parse::<usize>().is_ok_and(|i| i < items.len()));
                }
            }
            _ => {}
        }
        children
    }

    fn unmatched(&mut self, frame: &Frame<'a>, schema: Option<(&String, &SchemaObject)>, key: &str) {
        // Without a schema context nothing can be expected, so stay quiet.
        let Some((name, _)) = schema else {
            return;
        };
        self.diag(Diagnostic::warning(
            DiagnosticKind::Match,
            "unmatched-key",
            Location::path(format!("{}/{key}", frame.path)).with_object(name.as_str()),
            format!("`{key}` is not declared by `{name}`"),
        ));
    }

    fn missing_required(
        &mut self,
        frame: &Frame<'a>,
        name: &str,
        object: &SchemaObject,
        present: impl Fn(&str) -> bool,
    ) {
        for (key, row) in &object.keys {
            if key.contains('*') || !row.is_required() || row.inheritable.is_true() || present(key) {
                continue;
            }
            self.diag(Diagnostic::warning(
                DiagnosticKind::Match,
                "missing-required",
                Location::path(frame.path.clone()).with_object(name),
                format!("required key `{key}` of `{name}` is absent"),
            ));
        }
    }

    fn check_special_array(&mut self, frame: &Frame<'a>, object: &PdfObject, len: usize, what: &str) {
        let items = object.items().unwrap_or(&[]);
        let numeric = items
            .iter()
            .all(|item| self.doc.resolve(item).is_ok_and(|n| n.object.is_numeric()));
        if items.len() != len || !numeric {
            self.diag(Diagnostic::warning(
                DiagnosticKind::Match,
                "malformed-special-array",
                self.location(frame),
                format!("a {what} needs {len} numbers, found {} entries", items.len()),
            ));
        }
    }

    fn location(&self, frame: &Frame<'a>) -> Location {
        let loc = Location::path(frame.path.clone());
        match frame.parent {
            Some(obj) => loc.with_object(obj),
            None => loc,
        }
    }

    fn diag(&mut self, diagnostic: Diagnostic) {
        debug!("{diagnostic}");
        self.report.diagnostics.push(diagnostic);
    }
}

// ———————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ———————————————————————————————————————————————————————————————————————————

fn lookup_key<'a>(schema: Option<&'a SchemaObject>, key: &str) -> (Option<&'a SchemaRow>, Classification) {
    let Some(object) = schema else {
        return (None, Classification::Unmatched);
    };
    if let Some(row) = object.keys.get(key) {
        return (Some(row), Classification::MatchedSchema);
    }
    match object.wildcard() {
        Some(row) => (Some(row), Classification::MatchedButExtra),
        None => (None, Classification::Unmatched),
    }
}

/// Exact index, then the repeating `0*`, `1*`, ... pattern, then `*`.
fn lookup_index(schema: Option<&SchemaObject>, index: usize) -> (Option<&SchemaRow>, Classification) {
    let Some(object) = schema else {
        return (None, Classification::Unmatched);
    };
    if let Some(row) = object.keys.get(&index.to_string()) {
        return (Some(row), Classification::MatchedSchema);
    }
    let repeating: Vec<&SchemaRow> = object
        .keys
        .iter()
        .filter(|(k, _)| k.len() > 1 && k.ends_with('*') && k[..k.len() - 1].bytes().all(|b| b.is_ascii_digit()))
        .map(|(_, row)| row)
        .collect();
    if !repeating.is_empty() {
        return (Some(repeating[index % repeating.len()]), Classification::MatchedSchema);
    }
    match object.wildcard() {
        Some(row) => (Some(row), Classification::MatchedButExtra),
        None => (None, Classification::Unmatched),
    }
}

/// Whether a node of `kind` can stand for a value of schema type `ty`.
pub fn accepts(ty: PdfType, kind: NodeKind) -> bool {
    match ty {
        PdfType::Dictionary | PdfType::NameTree | PdfType::NumberTree => kind == NodeKind::Dictionary,
        PdfType::Stream => kind == NodeKind::Stream,
        PdfType::Array | PdfType::Matrix | PdfType::Rectangle => kind == NodeKind::Array,
        PdfType::Name => kind == NodeKind::Name,
        PdfType::String | PdfType::StringAscii | PdfType::StringByte | PdfType::StringText | PdfType::Date => {
            kind == NodeKind::String
        }
        PdfType::Boolean => kind == NodeKind::Boolean,
        PdfType::Integer | PdfType::Bitmask => kind == NodeKind::Integer,
        PdfType::Number => matches!(kind, NodeKind::Integer | NodeKind::Number),
        PdfType::Null => kind == NodeKind::Null,
    }
}

/// Earliest type alternative accepting `kind`.
fn pick_alternative(row: &SchemaRow, kind: NodeKind) -> Option<(usize, PdfType)> {
    row.types
        .iter()
        .enumerate()
        .find_map(|(i, t)| t.pdf_type().filter(|ty| accepts(*ty, kind)).map(|ty| (i, ty)))
}

/// Link target for the node's children. With several candidates the one
/// declaring the most of the node's keys wins, the first on ties.
fn choose_link<'a>(dom: &'a SchemaDom, row: &SchemaRow, alternative: usize, node: &PdfObject) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for target in row.links_for(alternative) {
        for name in target.object_names() {
            let Some((name, object)) = dom.objects.get_key_value(name) else {
                continue;
            };
            let score = node.dict().map_or(0, |d| d.keys().filter(|k| object.keys.contains_key(*k)).count());
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((name.as_str(), score));
            }
        }
    }
    best.map(|(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::count_by_code;
    use crate::schema::ingest::ingest;
    use crate::tsv::{RawObject, read_str};
    use pretty_assertions::assert_eq;

    const HEADER: &str = "Key\tType\tSinceVersion\tDeprecatedIn\tRequired\tIndirectReference\tInheritable\tDefaultValue\tPossibleValues\tSpecialCase\tLink\tNote";

    fn object(name: &str, rows: &[&str]) -> RawObject {
        let mut text = format!("{HEADER}\n");
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        read_str(name, &text).unwrap()
    }

    fn schema() -> SchemaDom {
        ingest(&[
            object(
                "FileTrailer",
                &["Root\tdictionary\t1.0\t\tTRUE\tTRUE\tFALSE\t\t\t\t[Catalog]\t", "Size\tinteger\t1.0\t\tTRUE\tFALSE\tFALSE\t\t\t\t\t"],
            ),
            object(
                "Catalog",
                &["Type\tname\t1.0\t\tTRUE\tFALSE\tFALSE\t\t[Catalog]\t\t\t", "Pages\tdictionary\t1.0\t\tTRUE\tTRUE\tFALSE\t\t\t\t[PageTreeNode]\t"],
            ),
            object(
                "PageTreeNode",
                &[
                    "Type\tname\t1.0\t\tTRUE\tFALSE\tFALSE\t\t[Pages]\t\t\t",
                    "Kids\tarray\t1.0\t\tTRUE\tFALSE\tFALSE\t\t\t\t[ArrayOfPageTreeNodes]\t",
                    "Count\tinteger\t1.0\t\tTRUE\tFALSE\tFALSE\t\t\t\t\t",
                    "MediaBox\trectangle\t1.0\t\tFALSE\tFALSE\tTRUE\t\t\t\t\t",
                ],
            ),
            object("ArrayOfPageTreeNodes", &["*\tdictionary\t1.0\t\tFALSE\tTRUE\tFALSE\t\t\t\t[PageTreeNode,Page]\t"]),
            object(
                "Page",
                &["Type\tname\t1.0\t\tTRUE\tFALSE\tFALSE\t\t[Page]\t\t\t", "Contents\tstream\t1.0\t\tFALSE\tTRUE\tFALSE\t\t\t\t[Stream]\t"],
            ),
            object("Stream", &["Length\tinteger\t1.0\t\tTRUE\tFALSE\tFALSE\t\t\t\t\t"]),
        ])
        .dom
    }

    fn walk(json: &str) -> MatchReport {
        let doc = Document::from_json_str(json).unwrap();
        match_document(&schema(), &doc, &MatcherConfig::default())
    }

    #[test]
    fn cyclic_page_tree_reports_one_cycle() {
        let report = walk(
            r#"{
                "trailer": { "Root": { "$ref": "1 0" }, "Size": 3 },
                "objects": {
                    "1 0": { "Type": "/Catalog", "Pages": { "$ref": "2 0" } },
                    "2 0": { "Type": "/Pages", "Kids": [{ "$ref": "2 0" }], "Count": 1 }
                }
            }"#,
        );
        let counts = count_by_code(&report.diagnostics);
        assert_eq!(counts.get("cycle"), Some(&1));
        let cycle = report.diagnostics.iter().find(|d| d.code == "cycle").unwrap();
        assert_eq!(cycle.location.path.as_deref(), Some("trailer/Root/Pages/Kids/0"));
        assert_eq!(report.root_object.as_deref(), Some("FileTrailer"));
    }

    #[test]
    fn self_reference_stops_at_second_visit() {
        let report = walk(
            r#"{
                "trailer": { "Root": { "$ref": "1 0" }, "Size": 2 },
                "objects": { "1 0": { "Type": "/Catalog", "Pages": { "$ref": "1 0" } } }
            }"#,
        );
        assert_eq!(count_by_code(&report.diagnostics).get("cycle"), Some(&1));
    }

    #[test]
    fn shared_object_is_not_a_cycle() {
        let report = walk(
            r#"{
                "trailer": { "Root": { "$ref": "1 0" }, "Size": 4 },
                "objects": {
                    "1 0": { "Type": "/Catalog", "Pages": { "$ref": "2 0" } },
                    "2 0": { "Type": "/Pages", "Kids": [{ "$ref": "3 0" }, { "$ref": "3 0" }], "Count": 2 },
                    "3 0": { "Type": "/Page" }
                }
            }"#,
        );
        let counts = count_by_code(&report.diagnostics);
        assert_eq!(counts.get("cycle"), None);
        assert_eq!(counts.get("shared-object"), Some(&1));
        let shared = report.diagnostics.iter().find(|d| d.code == "shared-object").unwrap();
        assert_eq!(shared.location.path.as_deref(), Some("trailer/Root/Pages/Kids/1"));
        assert!(shared.message.contains("through another path"));
    }

    #[test]
    fn wildcard_array_elements_are_extra() {
        let dom = schema();
        let array = dom.get("ArrayOfPageTreeNodes");
        let (row, class) = lookup_index(array, 5);
        assert_eq!(row, Some(&array.unwrap().keys["*"]));
        assert_eq!(class, Classification::MatchedButExtra);

        let (row, class) = lookup_index(dom.get("Stream"), 0);
        assert_eq!(row, None);
        assert_eq!(class, Classification::Unmatched);
    }

    #[test]
    fn classifies_exact_wildcard_and_unmatched_keys() {
        let report = walk(
            r#"{
                "trailer": { "Root": { "$ref": "1 0" }, "Size": 3, "Extra": 1 },
                "objects": {
                    "1 0": { "Type": "/Catalog", "Pages": { "$ref": "2 0" } },
                    "2 0": { "Type": "/Pages", "Kids": [{ "$ref": "3 0" }], "Count": 1 },
                    "3 0": { "Type": "/Page", "Contents": { "$stream": { "Length": 4 }, "$length": 4 } }
                }
            }"#,
        );
        assert_eq!(report.find("trailer/Root").unwrap().class, Classification::MatchedSchema);
        assert_eq!(report.find("trailer/Extra").unwrap().class, Classification::Unmatched);

        let kid = report.find("trailer/Root/Pages/Kids/0").unwrap();
        assert_eq!(kid.class, Classification::MatchedButExtra);
        // `Page` shares more keys with the node than `PageTreeNode`
        assert_eq!(kid.link.as_deref(), Some("Page"));
        assert_eq!(report.find("trailer/Root/Pages/Kids/0/Contents/Length").unwrap().object.as_deref(), Some("Stream"));

        let codes: Vec<_> = report.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec!["unmatched-key"]);
    }

    #[test]
    fn unexpected_kind_is_reported_and_walk_continues() {
        let report = walk(
            r#"{
                "trailer": { "Root": { "$ref": "1 0" }, "Size": "many" },
                "objects": {
                    "1 0": { "Type": "/Catalog", "Pages": { "$ref": "9 0" } }
                }
            }"#,
        );
        let counts = count_by_code(&report.diagnostics);
        assert_eq!(counts.get("unexpected-kind"), Some(&2));
        assert_eq!(counts.get("dangling-reference"), Some(&1));
        assert_eq!(report.find("trailer/Size").unwrap().class, Classification::Unmatched);
        assert!(report.find("trailer/Root/Pages").is_some());
    }

    #[test]
    fn missing_required_and_special_arrays() {
        let report = walk(
            r#"{
                "trailer": { "Root": { "$ref": "1 0" }, "Size": 3 },
                "objects": {
                    "1 0": { "Type": "/Catalog", "Pages": { "$ref": "2 0" } },
                    "2 0": { "Type": "/Pages", "Kids": [], "MediaBox": [0, 0, 612] }
                }
            }"#,
        );
        let counts = count_by_code(&report.diagnostics);
        assert_eq!(counts.get("missing-required"), Some(&1));
        assert_eq!(counts.get("malformed-special-array"), Some(&1));
        assert_eq!(
            report.find("trailer/Root/Pages/MediaBox").unwrap().schema_type,
            Some(PdfType::Rectangle)
        );
        assert!(report.find("trailer/Root/Pages/MediaBox/0").is_none());
    }

    #[test]
    fn depth_limit_skips_subtree() {
        let doc = Document::from_json_str(r#"{"trailer": {"A": {"B": {"C": {"D": 1}}}}}"#).unwrap();
        let config = MatcherConfig { max_depth: 2, ..MatcherConfig::default() };
        let report = match_document(&schema(), &doc, &config);
        assert_eq!(count_by_code(&report.diagnostics).get("depth-limit"), Some(&1));
        assert!(report.find("trailer/A/B").is_some());
        assert!(report.find("trailer/A/B/C").is_none());
    }

    #[test]
    fn xref_trailer_selects_xref_root() {
        let doc = Document::from_json_str(r#"{"trailer": {"Type": "/XRef", "Size": 1}}"#).unwrap();
        let report = match_document(&schema(), &doc, &MatcherConfig::default());
        assert_eq!(report.root_object, None);
        assert_eq!(report.diagnostics[0].code, "missing-root");
        assert_eq!(root_object(&doc, &MatcherConfig::default()), "XRefStream");
    }

    #[test]
    fn repeating_index_keys_wrap_around() {
        let dom = ingest(&[object(
            "Pairs",
            &["0*\tinteger\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t\t", "1*\tname\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t\t"],
        )])
        .dom;
        let obj = dom.get("Pairs");
        let name_row = &obj.unwrap().keys["1*"];
        assert_eq!(lookup_index(obj, 3).0, Some(name_row));
        assert_eq!(lookup_index(obj, 3).1, Classification::MatchedSchema);
    }
}
