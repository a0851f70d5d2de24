//! Raw TSV rows to [`SchemaDom`].
//!
//! Each object file is normalised on its own (in parallel), then all objects
//! are merged into one Dom. A lexer/parser failure or an empty key aborts
//! the current object only; everything else becomes a diagnostic.

use indexmap::IndexMap;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::types::*;
use crate::ast::{self, AstNode, GroupKind, PredicateError};
use crate::config::COLUMNS;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Location};
use crate::functions::{self, ShapeError};
use crate::lexer::{self, Literal, Token, TokenKind};
use crate::tsv::{RawObject, RawRow};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("{object}: line {line} has an empty key name")]
    EmptyKey { object: String, line: u64 },
    #[error("{object}::{key} {column}: cannot parse `{raw}`: {source}")]
    Predicate {
        object: String,
        key: String,
        column: &'static str,
        raw: String,
        #[source]
        source: PredicateError,
    },
}

impl IngestError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::EmptyKey { object, .. } => Diagnostic::new(
                DiagnosticKind::Ingestion,
                "empty-key",
                Location::object(object),
                format!("{self}; object dropped"),
            ),
            Self::Predicate { object, key, column, source, .. } => {
                let (kind, code) = match source {
                    PredicateError::Lex(_) => (DiagnosticKind::Lex, "lex-error"),
                    PredicateError::Parse(_) => (DiagnosticKind::Parse, "parse-error"),
                };
                Diagnostic::new(kind, code, Location::cell(object, key, *column), format!("{self}; object dropped"))
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Ingested {
    pub dom: SchemaDom,
    pub diagnostics: Vec<Diagnostic>,
}

// ———————————————————————————————————————————————————————————————————————————
// ENTRY POINTS
// ———————————————————————————————————————————————————————————————————————————

pub fn ingest(objects: &[RawObject]) -> Ingested {
    let outcomes: Vec<_> = objects.par_iter().map(ingest_object).collect();

    let mut out = Ingested::default();
    for (result, diags) in outcomes {
        out.diagnostics.extend(diags);
        match result {
            Ok(object) => {
                out.dom.objects.insert(object.name.clone(), object);
            }
            Err(err) => {
                warn!("{err}");
                out.diagnostics.push(err.to_diagnostic());
            }
        }
    }
    info!(objects = out.dom.len(), diagnostics = out.diagnostics.len(), "schema ingested");
    out
}

pub fn ingest_object(raw: &RawObject) -> (Result<SchemaObject, IngestError>, Vec<Diagnostic>) {
    let mut diags = Vec::new();
    let mut keys = IndexMap::new();
    debug!(object = %raw.name, "ingesting");

    for row in &raw.rows {
        let key = row.get("Key").trim().to_string();
        if key.is_empty() {
            return (Err(IngestError::EmptyKey { object: raw.name.clone(), line: row.line }), diags);
        }
        let mut cx = RowContext { object: &raw.name, key: &key, diags: &mut diags };
        if row.cell_count != COLUMNS.len() {
            cx.push(
                DiagnosticKind::Ingestion,
                "column-count",
                None,
                format!("line {} has {} columns, expected {}", row.line, row.cell_count, COLUMNS.len()),
            );
        }
        let parsed = match cx.row(row) {
            Ok(r) => r,
            Err(e) => return (Err(e), diags),
        };
        if keys.contains_key(&key) {
            cx.push(DiagnosticKind::Ingestion, "duplicate-key", None, format!("duplicate key `{key}`, first row kept"));
            continue;
        }
        keys.insert(key, parsed);
    }

    (Ok(SchemaObject { name: raw.name.clone(), keys }), diags)
}

// ———————————————————————————————————————————————————————————————————————————
// ROW NORMALISATION
// ———————————————————————————————————————————————————————————————————————————

struct RowContext<'a> {
    object: &'a str,
    key: &'a str,
    diags: &'a mut Vec<Diagnostic>,
}

impl RowContext<'_> {
    fn push(&mut self, kind: DiagnosticKind, code: &'static str, column: Option<&str>, message: String) {
        let location = match column {
            Some(c) => Location::cell(self.object, self.key, c),
            None => Location::key(self.object, self.key),
        };
        self.diags.push(Diagnostic::new(kind, code, location, message));
    }

    fn parse(&self, column: &'static str, text: &str) -> Result<AstNode, IngestError> {
        ast::parse(text).map(unwrap_root).map_err(|source| IngestError::Predicate {
            object: self.object.to_string(),
            key: self.key.to_string(),
            column,
            raw: text.to_string(),
            source,
        })
    }

    fn tokenize(&self, column: &'static str, text: &str) -> Result<Vec<Token>, IngestError> {
        lexer::tokenize(text).map_err(|e| IngestError::Predicate {
            object: self.object.to_string(),
            key: self.key.to_string(),
            column,
            raw: text.to_string(),
            source: e.into(),
        })
    }

    fn row(&mut self, row: &RawRow) -> Result<SchemaRow, IngestError> {
        let types = split_alternatives(row.get("Type"))
            .into_iter()
            .map(|t| {
                if t.contains("fn:") {
                    Ok(TypeAlternative::Predicate(self.parse("Type", t)?))
                } else {
                    Ok(TypeAlternative::Named(t.to_string()))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let since = row.get("SinceVersion").trim();
        let since_version = if since.contains("fn:") {
            VersionSpec::Predicate(self.parse("SinceVersion", since)?)
        } else {
            VersionSpec::Version(since.to_string())
        };
        let deprecated_in = non_empty(row.get("DeprecatedIn"));

        let required = split_alternatives(row.get("Required"))
            .into_iter()
            .map(|r| self.flag("Required", r))
            .collect::<Result<Vec<_>, _>>()?;

        let mut indirect_reference = split_alternatives(row.get("IndirectReference"))
            .into_iter()
            .map(|r| self.flag("IndirectReference", strip_brackets(r).unwrap_or(r)))
            .collect::<Result<Vec<_>, _>>()?;
        if indirect_reference.len() == 1 && types.len() > 1 {
            indirect_reference = vec![indirect_reference[0].clone(); types.len()];
        } else if indirect_reference.len() != types.len() {
            self.push(
                DiagnosticKind::Ingestion,
                "alternative-count",
                Some("IndirectReference"),
                format!("{} IndirectReference entries for {} types", indirect_reference.len(), types.len()),
            );
        }

        let inheritable = self.flag("Inheritable", row.get("Inheritable").trim())?;

        let default_value = self.default_values(row.get("DefaultValue"), &types)?;
        let possible_values = self.possible_values(row.get("PossibleValues"), &types)?;

        let special_case = match per_alternative(row.get("SpecialCase"), false) {
            None => None,
            Some(cells) => {
                let parsed = cells
                    .into_iter()
                    .map(|c| c.map(|c| self.parse("SpecialCase", c)).transpose())
                    .collect::<Result<Vec<_>, _>>()?;
                if parsed.len() != types.len() {
                    self.push(
                        DiagnosticKind::Ingestion,
                        "alternative-count",
                        Some("SpecialCase"),
                        format!("{} SpecialCase entries for {} types", parsed.len(), types.len()),
                    );
                }
                Some(parsed)
            }
        };

        let link = match per_alternative(row.get("Link"), false) {
            None => None,
            Some(cells) => Some(
                cells
                    .into_iter()
                    .map(|c| c.map(|c| self.links(c)).transpose())
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        let parsed = SchemaRow {
            types,
            since_version,
            deprecated_in,
            required,
            indirect_reference,
            inheritable,
            default_value,
            possible_values,
            special_case,
            link,
            note: non_empty(row.get("Note")),
        };
        self.check_shapes(&parsed);
        Ok(parsed)
    }

    fn flag(&self, column: &'static str, text: &str) -> Result<Flag, IngestError> {
        Ok(match text.trim() {
            "TRUE" | "[TRUE]" => Flag::Literal(true),
            "FALSE" | "[FALSE]" => Flag::Literal(false),
            t if t.contains("fn:") => Flag::Predicate(self.parse(column, t)?),
            t => Flag::Invalid(t.to_string()),
        })
    }

    fn default_values(&mut self, cell: &str, types: &[TypeAlternative]) -> Result<Option<Vec<Option<Value>>>, IngestError> {
        let keep_array = types.iter().any(|t| t.reduce() == Some("array"));
        let Some(cells) = per_alternative(cell, keep_array) else {
            return Ok(None);
        };
        let mut out = Vec::with_capacity(cells.len());
        for (i, c) in cells.into_iter().enumerate() {
            let value = match c {
                None => None,
                Some(c) => Some(name_hack(types.get(i), self.value("DefaultValue", c)?)),
            };
            out.push(value);
        }
        Ok(Some(out))
    }

    fn possible_values(
        &mut self,
        cell: &str,
        types: &[TypeAlternative],
    ) -> Result<Option<Vec<Option<Vec<Value>>>>, IngestError> {
        let Some(cells) = per_alternative(cell, false) else {
            return Ok(None);
        };
        let mut out = Vec::with_capacity(cells.len());
        for (i, c) in cells.into_iter().enumerate() {
            let Some(c) = c else {
                out.push(None);
                continue;
            };
            let values = if c.contains("fn:") {
                match self.parse("PossibleValues", c)? {
                    AstNode::Group(g) if g.kind == GroupKind::Root => g.children.into_iter().map(Value::from_node).collect(),
                    node => vec![Value::from_node(node)],
                }
            } else {
                split_top_level(c)
                    .into_iter()
                    .map(|piece| self.value("PossibleValues", piece))
                    .collect::<Result<Vec<_>, _>>()?
            };
            out.push(Some(values.into_iter().map(|v| name_hack(types.get(i), v)).collect()));
        }
        Ok(Some(out))
    }

    /// A single literal or function value.
    fn value(&self, column: &'static str, text: &str) -> Result<Value, IngestError> {
        let text = text.trim();
        if text.starts_with('(') && text.ends_with(')') && !text.contains("fn:") {
            return Ok(Value::Text(text.to_string()));
        }
        if text.contains("fn:") || text.starts_with('[') {
            return Ok(Value::from_node(self.parse(column, text)?));
        }
        let mut tokens = self.tokenize(column, text)?;
        if tokens.len() == 1 {
            return Ok(Value::Scalar(tokens.remove(0)));
        }
        Ok(Value::from_node(self.parse(column, text)?))
    }

    fn links(&self, text: &str) -> Result<Vec<LinkTarget>, IngestError> {
        let children = match self.parse("Link", text)? {
            AstNode::Group(g) if g.kind == GroupKind::Root => g.children,
            node => vec![node],
        };
        Ok(children
            .into_iter()
            .map(|n| match n.leaf() {
                Some(t) if t.kind == TokenKind::KeyName => LinkTarget::Object(t.raw.clone()),
                _ => LinkTarget::Predicate(n),
            })
            .collect())
    }

    fn check_shapes(&mut self, row: &SchemaRow) {
        let mut found = Vec::new();
        for (column, node) in row.predicates() {
            for err in functions::check_tree(node) {
                let code = match err {
                    ShapeError::UnknownFunction(_) => "unknown-function",
                    ShapeError::BadArguments { .. } => "bad-arguments",
                };
                found.push((code, column, err.to_string()));
            }
        }
        for (code, column, message) in found {
            self.push(DiagnosticKind::Shape, code, Some(column), message);
        }
    }
}

// ———————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ———————————————————————————————————————————————————————————————————————————

/// A root group holding exactly one node is that node.
fn unwrap_root(root: AstNode) -> AstNode {
    match root {
        AstNode::Group(mut g) if g.kind == GroupKind::Root && g.children.len() == 1 => {
            g.children.pop().unwrap_or(AstNode::Group(g))
        }
        other => other,
    }
}

fn non_empty(text: &str) -> Option<String> {
    let t = text.trim();
    (!t.is_empty()).then(|| t.to_string())
}

fn split_alternatives(text: &str) -> Vec<&str> {
    text.split(';').map(str::trim).collect()
}

fn strip_brackets(text: &str) -> Option<&str> {
    text.strip_prefix('[').and_then(|t| t.strip_suffix(']'))
}

/// Split an optional per-alternative column. Empty cell is `None`, `[]` is a
/// `None` alternative, one layer of `[...]` is removed from each element.
/// A single (unsplit) value keeps its brackets when `keep_single` is set.
fn per_alternative(cell: &str, keep_single: bool) -> Option<Vec<Option<&str>>> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    if !cell.contains(';') {
        if keep_single {
            return Some(vec![Some(cell)]);
        }
        return Some(vec![match strip_brackets(cell) {
            Some("") => None,
            Some(inner) => Some(inner),
            None => Some(cell),
        }]);
    }
    Some(
        split_alternatives(cell)
            .into_iter()
            .map(|c| match strip_brackets(c) {
                Some("") => None,
                Some(inner) => Some(inner),
                None if c.is_empty() => None,
                None => Some(c),
            })
            .collect(),
    )
}

/// Split on commas that are not inside brackets or parentheses.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth -= 1,
            ',' if depth == 0 => {
                out.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(text[start..].trim());
    out.retain(|s| !s.is_empty());
    out
}

/// Numeric-looking PDF names (e.g. `/1`) lex as numbers. For a `name`
/// alternative they are turned back into names.
fn name_hack(alternative: Option<&TypeAlternative>, value: Value) -> Value {
    if alternative.and_then(TypeAlternative::reduce) != Some("name") {
        return value;
    }
    match value {
        Value::Scalar(t) if matches!(t.kind, TokenKind::Integer | TokenKind::Real) => Value::Scalar(Token {
            kind: TokenKind::KeyName,
            literal: Some(Literal::KeyName(t.raw.clone())),
            raw: t.raw,
        }),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tsv::read_str;
    use pretty_assertions::assert_eq;

    const HEADER: &str = "Key\tType\tSinceVersion\tDeprecatedIn\tRequired\tIndirectReference\tInheritable\tDefaultValue\tPossibleValues\tSpecialCase\tLink\tNote";

    fn object(name: &str, rows: &[&str]) -> RawObject {
        read_str(name, &format!("{HEADER}\n{}\n", rows.join("\n"))).unwrap()
    }

    fn one(rows: &[&str]) -> (SchemaObject, Vec<Diagnostic>) {
        let (res, diags) = ingest_object(&object("Obj", rows));
        (res.unwrap(), diags)
    }

    #[test]
    fn plain_integer_row() {
        let (obj, diags) = one(&["Count\tinteger\t1.0\t\tTRUE\tFALSE\tFALSE\t\t\t\t\t"]);
        assert_eq!(diags, vec![]);
        let row = &obj.keys["Count"];
        assert_eq!(row.types, vec![TypeAlternative::Named("integer".into())]);
        assert_eq!(row.required, vec![Flag::Literal(true)]);
        assert_eq!(row.indirect_reference, vec![Flag::Literal(false)]);
        assert_eq!(row.link, None);
        assert_eq!(row.default_value, None);
        assert_eq!(row.note, None);
    }

    #[test]
    fn multi_type_with_links() {
        let (obj, _) = one(&["Kids\tarray;dictionary\t1.0\t\tFALSE\tTRUE\tFALSE\t\t\t\t[ObjA];[ObjB]\t"]);
        let row = &obj.keys["Kids"];
        assert_eq!(row.types.len(), 2);
        assert_eq!(row.indirect_reference, vec![Flag::Literal(true); 2]);
        assert_eq!(row.links_for(0), &[LinkTarget::Object("ObjA".into())]);
        assert_eq!(row.links_for(1), &[LinkTarget::Object("ObjB".into())]);
    }

    #[test]
    fn link_list_and_wrapper() {
        let (obj, diags) = one(&[
            "Filter\tarray;name\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t[FilterLZWDecode,fn:SinceVersion(1.2,FilterFlateDecode)];[]\t",
        ]);
        assert_eq!(diags, vec![]);
        let row = &obj.keys["Filter"];
        let links = row.links_for(0);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0], LinkTarget::Object("FilterLZWDecode".into()));
        assert_eq!(links[1].object_names(), vec!["FilterFlateDecode"]);
        assert_eq!(row.link.as_ref().unwrap()[1], None);
    }

    #[test]
    fn booleans_and_predicates() {
        let (obj, diags) = one(&[
            "A\tinteger\t1.0\t\tfn:IsRequired(@Subtype==Link)\t[FALSE]\tFALSE\t\t\t\t\t",
            "B\tinteger\t1.0\t\tmaybe\tFALSE\tFALSE\t\t\t\t\t",
        ]);
        assert_eq!(diags, vec![]);
        assert!(obj.keys["A"].required[0].predicate().is_some());
        assert_eq!(obj.keys["A"].indirect_reference, vec![Flag::Literal(false)]);
        assert_eq!(obj.keys["B"].required, vec![Flag::Invalid("maybe".into())]);
    }

    #[test]
    fn default_array_keeps_brackets_for_array_type() {
        let (obj, _) = one(&["Domain\tarray\t1.0\t\tFALSE\tFALSE\tFALSE\t[0 1]\t\t\t[ArrayOfNumbers]\t"]);
        let dv = obj.keys["Domain"].default_value.as_ref().unwrap();
        assert!(matches!(&dv[0], Some(Value::Array(items)) if items.len() == 2));
    }

    #[test]
    fn possible_values_split_and_name_hack() {
        let (obj, _) = one(&["BM\tname\t1.4\t\tFALSE\tFALSE\tFALSE\tNormal\t[Normal,Multiply,1]\t\t\t"]);
        let row = &obj.keys["BM"];
        let pv = row.possible_values.as_ref().unwrap()[0].as_ref().unwrap();
        let raws: Vec<_> = pv.iter().map(Value::render).collect();
        assert_eq!(raws, vec!["Normal", "Multiply", "1"]);
        assert!(matches!(&pv[2], Value::Scalar(t) if t.kind == TokenKind::KeyName));
    }

    #[test]
    fn possible_values_with_functions() {
        let (obj, diags) = one(&[
            "Type\tname\t1.0\t\tTRUE\tFALSE\tFALSE\t\t[Sig,fn:SinceVersion(1.5,DocTimeStamp)]\t\t\t",
        ]);
        assert_eq!(diags, vec![]);
        let pv = obj.keys["Type"].possible_values.as_ref().unwrap()[0].as_ref().unwrap();
        assert_eq!(pv.len(), 2);
        assert!(matches!(pv[1], Value::Expr(_)));
    }

    #[test]
    fn shape_errors_are_collected() {
        let (_, diags) = one(&["F\tbitmask\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\tfn:Eval(fn:BitsSet(1,33))\t\t"]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::Shape);
        assert_eq!(diags[0].code, "bad-arguments");
        assert_eq!(diags[0].location.column.as_deref(), Some("SpecialCase"));
    }

    #[test]
    fn lex_error_drops_object() {
        let (res, _) = ingest_object(&object("Bad", &["A\tinteger\t1.0\t\tfn:IsRequired(@a # 1)\tFALSE\tFALSE\t\t\t\t\t"]));
        let err = res.unwrap_err();
        assert_eq!(err.to_diagnostic().code, "lex-error");

        let out = ingest(&[object("Bad", &["A\tinteger\t1.0\t\tfn:IsRequired((\tFALSE\tFALSE\t\t\t\t\t"])]);
        assert!(out.dom.is_empty());
        assert_eq!(out.diagnostics[0].code, "parse-error");
    }

    #[test]
    fn empty_key_drops_object() {
        let (res, _) = ingest_object(&object("Bad", &["\tinteger\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t\t"]));
        assert!(matches!(res, Err(IngestError::EmptyKey { line: 2, .. })));
    }

    #[test]
    fn duplicate_keys_and_column_count() {
        let (obj, diags) = one(&[
            "A\tinteger\t1.0\t\tTRUE\tFALSE\tFALSE\t\t\t\t\t",
            "A\tname\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t\t",
            "B\tinteger\t1.0",
        ]);
        let codes: Vec<_> = diags.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec!["duplicate-key", "column-count"]);
        assert_eq!(obj.keys["A"].types, vec![TypeAlternative::Named("integer".into())]);
    }

    #[test]
    fn indirect_reference_count_mismatch() {
        let (_, diags) = one(&["K\tarray;dictionary;stream\t1.0\t\tFALSE\t[FALSE];[TRUE]\tFALSE\t\t\t\t[A];[B];[C]\t"]);
        assert_eq!(diags.iter().map(|d| d.code).collect::<Vec<_>>(), vec!["alternative-count"]);
    }

    #[test]
    fn ingestion_is_idempotent() {
        let rows = [
            "Type\tname\t1.0\t\tTRUE\tFALSE\tFALSE\t\t[Pages]\t\t\t",
            "Kids\tarray\t1.0\t\tTRUE\tFALSE\tFALSE\t\t\t\t[ArrayOfPageTreeNodes]\t",
        ];
        let a = ingest(&[object("Pages", &rows)]);
        let b = ingest(&[object("Pages", &rows)]);
        assert_eq!(a.dom, b.dom);
    }
}
