//! Self-consistency checks over a complete [`SchemaDom`].
//!
//! Every row is checked independently, then reachability runs over the whole
//! Dom. Nothing here stops early: the full list of findings is returned.

pub mod reachability;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::ast::AstNode;
use crate::config::{self, ValidatorConfig};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Location};
use crate::lexer::TokenKind;
use crate::schema::{Flag, LinkTarget, PdfType, SchemaDom, SchemaObject, SchemaRow, TypeAlternative, Value, VersionSpec};

static KEY_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_\-.]*\*?$").unwrap());

pub fn validate(dom: &SchemaDom, config: &ValidatorConfig) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for object in dom.objects.values() {
        debug!(object = %object.name, "validating");
        ObjectCheck { dom, object, diags: &mut diags }.run();
    }
    diags.extend(reachability::check(dom, config));
    info!(objects = dom.len(), findings = diags.len(), "schema validated");
    diags
}

struct ObjectCheck<'a> {
    dom: &'a SchemaDom,
    object: &'a SchemaObject,
    diags: &'a mut Vec<Diagnostic>,
}

impl ObjectCheck<'_> {
    fn report(&mut self, key: Option<&str>, column: Option<&str>, code: &'static str, message: String) {
        let location = match (key, column) {
            (Some(k), Some(c)) => Location::cell(&self.object.name, k, c),
            (Some(k), None) => Location::key(&self.object.name, k),
            _ => Location::object(&self.object.name),
        };
        self.diags
            .push(Diagnostic::new(DiagnosticKind::SchemaConsistency, code, location, message));
    }

    fn run(mut self) {
        let object = self.object;
        let keys = &object.keys;
        if keys.is_empty() {
            self.report(None, None, "empty-object", "object has no keys".into());
            return;
        }
        if let Some(pos) = keys.get_index_of("*") {
            if pos + 1 != keys.len() {
                self.report(Some("*"), None, "wildcard-not-last", "wildcard key `*` is not the last key".into());
            }
        }
        for (key, row) in keys {
            self.key_name(key, row);
            self.types(key, row);
            self.versions(key, row);
            self.flags(key, row);
            self.values(key, row);
            self.links(key, row);
            self.variables(key, row);
        }
        self.parent_for_inheritance();
    }

    // ---- Per row ---- //

    fn key_name(&mut self, key: &str, row: &SchemaRow) {
        if !KEY_NAME.is_match(key) {
            self.report(Some(key), Some("Key"), "bad-key-name", format!("key `{key}` has unexpected characters"));
        }
        if key.contains('*') && !row.required.iter().all(Flag::is_false) {
            self.report(Some(key), Some("Required"), "wildcard-required", "Required must be FALSE for a wildcard key".into());
        }
    }

    fn types(&mut self, key: &str, row: &SchemaRow) {
        let mut reduced = Vec::with_capacity(row.types.len());
        for alt in &row.types {
            if let TypeAlternative::Predicate(node) = alt {
                self.wrapper(key, "Type", node, config::TYPE_WRAPPERS, "bad-type-function");
            }
            match alt.reduce() {
                Some(name) if config::is_known_type(name) => reduced.push(name),
                Some(name) => {
                    self.report(Some(key), Some("Type"), "unknown-type", format!("unknown type `{name}`"));
                    reduced.push(name);
                }
                None => self.report(Some(key), Some("Type"), "unknown-type", "no type inside wrapper".into()),
            }
        }
        if reduced.windows(2).any(|w| w[0] > w[1]) {
            self.report(
                Some(key),
                Some("Type"),
                "unsorted-types",
                format!("types {} are not alphabetically sorted", reduced.join(";")),
            );
        }
    }

    /// A function in a column that only allows `allowed` wrappers, whose
    /// first argument, when a number, must be a PDF version.
    fn wrapper(&mut self, key: &str, column: &str, node: &AstNode, allowed: &[&str], code: &'static str) {
        let Some((name, args)) = node.as_call() else {
            self.report(Some(key), Some(column), code, format!("expected a function, found `{}`", node.render()));
            return;
        };
        if !allowed.contains(&name) {
            self.report(
                Some(key),
                Some(column),
                code,
                format!("`fn:{name}` is not allowed here (expected one of {})", allowed.join(", ")),
            );
        }
        if let Some(first) = args.first().and_then(AstNode::leaf) {
            if first.kind == TokenKind::Real && !config::is_pdf_version(&first.raw) {
                self.report(Some(key), Some(column), "bad-version", format!("`{}` is not a PDF version", first.raw));
            }
        }
    }

    fn versions(&mut self, key: &str, row: &SchemaRow) {
        match &row.since_version {
            VersionSpec::Version(v) if !config::is_pdf_version(v) => {
                self.report(Some(key), Some("SinceVersion"), "bad-version", format!("`{v}` is not a PDF version"));
            }
            VersionSpec::Version(_) => {}
            VersionSpec::Predicate(node) => {
                self.wrapper(key, "SinceVersion", node, config::SINCE_VERSION_FUNCTIONS, "bad-version-function")
            }
        }
        if let Some(v) = &row.deprecated_in {
            if !config::is_pdf_version(v) {
                self.report(Some(key), Some("DeprecatedIn"), "bad-version", format!("`{v}` is not a PDF version"));
            }
        }
    }

    fn flags(&mut self, key: &str, row: &SchemaRow) {
        for f in &row.required {
            self.flag(key, "Required", f, config::REQUIRED_FUNCTIONS, "bad-required");
        }
        for f in &row.indirect_reference {
            self.flag(key, "IndirectReference", f, config::INDIRECT_FUNCTIONS, "bad-indirect");
        }
        match &row.inheritable {
            Flag::Literal(_) => {}
            other => self.report(
                Some(key),
                Some("Inheritable"),
                "bad-inheritable",
                format!("Inheritable must be TRUE or FALSE, found `{}`", flag_text(other)),
            ),
        }

        for (i, alt) in row.types.iter().enumerate() {
            if alt.pdf_type() != Some(PdfType::Stream) {
                continue;
            }
            let indirect = row.indirect_reference.get(i).or(row.indirect_reference.first());
            if !indirect.is_some_and(Flag::is_true) {
                self.report(
                    Some(key),
                    Some("IndirectReference"),
                    "stream-not-indirect",
                    "type stream requires IndirectReference TRUE".into(),
                );
            }
        }
    }

    fn flag(&mut self, key: &str, column: &str, f: &Flag, allowed: &[&str], code: &'static str) {
        match f {
            Flag::Literal(_) => {}
            Flag::Predicate(node) => {
                let name = node.as_call().map(|(n, _)| n);
                if !name.is_some_and(|n| allowed.contains(&n)) {
                    self.report(
                        Some(key),
                        Some(column),
                        code,
                        format!("`{}` is not FALSE, TRUE or one of fn:{}", node.render(), allowed.join(", fn:")),
                    );
                }
            }
            Flag::Invalid(text) => self.report(
                Some(key),
                Some(column),
                code,
                format!("`{text}` is not FALSE, TRUE or one of fn:{}", allowed.join(", fn:")),
            ),
        }
    }

    fn values(&mut self, key: &str, row: &SchemaRow) {
        let n = row.types.len();
        if let Some(dv) = &row.default_value {
            if dv.len() != n {
                self.report(
                    Some(key),
                    Some("DefaultValue"),
                    "alternative-count",
                    format!("{} DefaultValue entries for {n} types", dv.len()),
                );
            }
        }
        if let Some(pv) = &row.possible_values {
            if pv.len() != n {
                self.report(
                    Some(key),
                    Some("PossibleValues"),
                    "alternative-count",
                    format!("{} PossibleValues entries for {n} types", pv.len()),
                );
            }
        }

        for (i, alt) in row.types.iter().enumerate() {
            let ty = alt.pdf_type();
            let dv = row.default_value.as_ref().and_then(|d| d.get(i)).and_then(Option::as_ref);
            let pv = row.possible_values.as_ref().and_then(|p| p.get(i)).and_then(Option::as_ref);

            if let (Some(ty), Some(v)) = (ty, dv) {
                if let Some(problem) = literal_problem(ty, v) {
                    self.report(Some(key), Some("DefaultValue"), "bad-default-value", problem);
                }
            }
            if let (Some(ty), Some(values)) = (ty, pv) {
                for v in values {
                    if let Some(problem) = literal_problem(ty, v) {
                        self.report(Some(key), Some("PossibleValues"), "bad-possible-value", problem);
                    }
                }
            }
            if let (Some(dv), Some(values)) = (dv, pv) {
                let all_literal = dv.is_literal() && values.iter().all(Value::is_literal);
                if all_literal && !values.iter().any(|p| p.render() == dv.render()) {
                    self.report(
                        Some(key),
                        Some("DefaultValue"),
                        "default-not-possible",
                        format!("DefaultValue `{}` is not one of the PossibleValues", dv.render()),
                    );
                }
            }
        }
    }

    fn links(&mut self, key: &str, row: &SchemaRow) {
        let n = row.types.len();
        if let Some(links) = &row.link {
            if links.len() != n {
                self.report(
                    Some(key),
                    Some("Link"),
                    "alternative-count",
                    format!("{} Link entries for {n} types", links.len()),
                );
            }
        }
        for (i, alt) in row.types.iter().enumerate() {
            let Some(name) = alt.reduce() else { continue };
            let targets = row.links_for(i);
            if config::requires_link(name) {
                if targets.is_empty() {
                    self.report(Some(key), Some("Link"), "missing-link", format!("complex type {name} is unlinked"));
                }
            } else if !targets.is_empty() {
                let rendered: Vec<_> = targets.iter().map(LinkTarget::render).collect();
                self.report(
                    Some(key),
                    Some("Link"),
                    "unexpected-link",
                    format!("basic type {name} should not be linked: {}", rendered.join(",")),
                );
            }
            for target in targets {
                if let LinkTarget::Predicate(node) = target {
                    self.wrapper(key, "Link", node, config::LINK_WRAPPERS, "bad-link-function");
                }
                for object in target.object_names() {
                    if !self.dom.contains(object) {
                        self.report(Some(key), Some("Link"), "broken-link", format!("broken link to `{object}`"));
                    }
                }
            }
        }
    }

    /// `@Key` references without a path must name a key of the same object.
    fn variables(&mut self, key: &str, row: &SchemaRow) {
        let mut unknown = Vec::new();
        for (column, node) in row.predicates() {
            let leaves = node.leaves();
            for (i, leaf) in leaves.iter().enumerate() {
                if leaf.kind != TokenKind::KeyValue {
                    continue;
                }
                if i > 0 && leaves[i - 1].kind == TokenKind::KeyPath {
                    continue;
                }
                let var = &leaf.raw[1..];
                if !self.object.keys.contains_key(var) && !unknown.contains(&(column, var)) {
                    unknown.push((column, var));
                }
            }
        }
        for (column, var) in unknown {
            let var = var.to_string();
            self.diags.push(Diagnostic::warning(
                DiagnosticKind::SchemaConsistency,
                "unknown-variable",
                Location::cell(&self.object.name, key, column),
                format!("referenced variable @{var} is not a key of {}", self.object.name),
            ));
        }
    }

    // ---- Per object ---- //

    fn parent_for_inheritance(&mut self) {
        let object = self.object;
        let needs_parent = object
            .keys
            .values()
            .any(|r| r.inheritable.is_true() && r.may_be_required());
        if !needs_parent {
            return;
        }
        match object.keys.get("Parent") {
            None => self.report(
                None,
                None,
                "missing-parent",
                "at least one required inheritable key but no Parent key".into(),
            ),
            Some(parent) if !parent.types.iter().any(|t| t.pdf_type() == Some(PdfType::Dictionary)) => self.report(
                Some("Parent"),
                Some("Type"),
                "missing-parent",
                "at least one required inheritable key but Parent is not a dictionary".into(),
            ),
            Some(_) => {}
        }
    }
}

fn flag_text(f: &Flag) -> String {
    match f {
        Flag::Literal(true) => "TRUE".into(),
        Flag::Literal(false) => "FALSE".into(),
        Flag::Predicate(n) => n.render(),
        Flag::Invalid(s) => s.clone(),
    }
}

/// Why a literal value cannot belong to `ty`, if it cannot.
fn literal_problem(ty: PdfType, v: &Value) -> Option<String> {
    let rendered = v.render();
    match v {
        Value::Expr(_) => None,
        Value::Scalar(t) if matches!(t.raw.as_str(), "TRUE" | "FALSE") => {
            Some(format!("`{rendered}` uses the schema's TRUE/FALSE instead of a PDF boolean"))
        }
        _ => {
            let fits = match ty {
                PdfType::Array | PdfType::Matrix | PdfType::Rectangle => matches!(v, Value::Array(_)),
                t if t.is_string_like() => matches!(v, Value::Text(_)),
                PdfType::Boolean => {
                    matches!(v, Value::Scalar(t) if matches!(t.kind, TokenKind::PdfTrue | TokenKind::PdfFalse))
                }
                PdfType::Integer | PdfType::Bitmask => {
                    matches!(v, Value::Scalar(t) if t.kind == TokenKind::Integer)
                }
                PdfType::Number => {
                    matches!(v, Value::Scalar(t) if matches!(t.kind, TokenKind::Integer | TokenKind::Real))
                }
                PdfType::Name => matches!(v, Value::Scalar(t) if t.kind == TokenKind::KeyName),
                _ => true,
            };
            (!fits).then(|| format!("`{rendered}` does not look like a {} value", ty.as_str()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ingest::ingest;
    use crate::tsv::{RawObject, read_str};
    use pretty_assertions::assert_eq;

    const HEADER: &str = "Key\tType\tSinceVersion\tDeprecatedIn\tRequired\tIndirectReference\tInheritable\tDefaultValue\tPossibleValues\tSpecialCase\tLink\tNote";

    fn object(name: &str, rows: &[&str]) -> RawObject {
        read_str(name, &format!("{HEADER}\n{}\n", rows.join("\n"))).unwrap()
    }

    fn trailer_to(targets: &[&str]) -> RawObject {
        let rows: Vec<String> = targets
            .iter()
            .enumerate()
            .map(|(i, t)| format!("K{i}\tdictionary\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t[{t}]\t"))
            .collect();
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        object("FileTrailer", &rows)
    }

    /// Codes found in `name`, with the trailer linking to it so it is no orphan.
    fn codes_for(name: &str, rows: &[&str], extra: &[&str]) -> Vec<&'static str> {
        let mut raws = vec![trailer_to(&[name]), object(name, rows)];
        let mut targets = vec![name];
        for e in extra {
            raws.push(object(e, &["X\tinteger\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t\t"]));
            targets.push(*e);
        }
        raws[0] = trailer_to(&targets);
        let out = ingest(&raws);
        assert_eq!(out.diagnostics, vec![]);
        validate(&out.dom, &ValidatorConfig::default()).iter().map(|d| d.code).collect()
    }

    #[test]
    fn clean_schema_has_no_findings() {
        let codes = codes_for(
            "Catalog",
            &[
                "Type\tname\t1.0\t\tTRUE\tFALSE\tFALSE\t\t[Catalog]\t\t\t",
                "Pages\tdictionary\t1.0\t\tTRUE\tTRUE\tFALSE\t\t\t\t[Pages]\t",
                "Version\tname\t1.4\t\tFALSE\tFALSE\tFALSE\t\t\t\t\t",
            ],
            &["Pages"],
        );
        assert_eq!(codes, Vec::<&str>::new());
    }

    #[test]
    fn both_link_alternatives_must_exist() {
        let rows = ["Kids\tarray;dictionary\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t[ObjA];[ObjB]\t"];
        assert_eq!(codes_for("Node", &rows, &["ObjA", "ObjB"]), Vec::<&str>::new());
        assert_eq!(codes_for("Node", &rows, &["ObjA"]), vec!["broken-link"]);
    }

    #[test]
    fn extension_name_in_link_is_not_an_object() {
        let rows = ["Meta\tdictionary\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t[Foo,fn:SinceVersion(2.0,fn:Extension(ISO_19005_3,Foo))]\t"];
        assert_eq!(codes_for("Node", &rows, &["Foo"]), Vec::<&str>::new());
        assert_eq!(codes_for("Node", &rows, &[]), vec!["broken-link", "broken-link"]);
    }

    #[test]
    fn wildcard_cannot_be_required() {
        let codes = codes_for("Dict", &["*\tinteger\t1.0\t\tTRUE\tFALSE\tFALSE\t\t\t\t\t"], &[]);
        assert_eq!(codes, vec!["wildcard-required"]);
    }

    #[test]
    fn wildcard_must_be_last() {
        let codes = codes_for(
            "Dict",
            &[
                "*\tinteger\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t\t",
                "A\tinteger\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t\t",
            ],
            &[],
        );
        assert_eq!(codes, vec!["wildcard-not-last"]);
    }

    #[test]
    fn unsorted_and_unknown_types() {
        let codes = codes_for(
            "Dict",
            &[
                "A\tinteger;boolean\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t\t",
                "B\tinteger;fn:SinceVersion(1.5,boolean)\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t\t",
                "C\tfloat\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t\t",
                "D\tfn:IsPDFVersion(1.5,integer)\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t\t",
            ],
            &[],
        );
        assert_eq!(codes, vec!["unsorted-types", "unsorted-types", "unknown-type", "bad-type-function"]);
    }

    #[test]
    fn versions_and_flags() {
        let codes = codes_for(
            "Dict",
            &[
                "A\tinteger\t1.8\t3.0\tmaybe\tfn:Eval(@A==1)\tFALSE\t\t\t\t\t",
                "B\tinteger\tfn:Extension(ADBE)\t\tFALSE\tFALSE\tfn:IsRequired(@A==1)\t\t\t\t\t",
            ],
            &[],
        );
        assert_eq!(codes, vec!["bad-version", "bad-version", "bad-required", "bad-indirect", "bad-inheritable"]);
    }

    #[test]
    fn stream_needs_indirect_reference() {
        let codes = codes_for("Dict", &["S\tstream\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t[Stm]\t"], &["Stm"]);
        assert_eq!(codes, vec!["stream-not-indirect"]);
    }

    #[test]
    fn link_presence_follows_type() {
        let codes = codes_for(
            "Dict",
            &[
                "A\tdictionary\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t\t",
                "B\tinteger\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t[Other]\t",
                "C\tdictionary\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t[fn:Eval(Other)]\t",
            ],
            &["Other"],
        );
        assert_eq!(codes, vec!["missing-link", "unexpected-link", "bad-link-function"]);
    }

    #[test]
    fn default_and_possible_values() {
        let codes = codes_for(
            "Dict",
            &[
                "A\tinteger\t1.0\t\tFALSE\tFALSE\tFALSE\t4\t[1,2,3]\t\t\t",
                "B\tboolean\t1.0\t\tFALSE\tFALSE\tFALSE\tTRUE\t\t\t\t",
                "C\tstring\t1.0\t\tFALSE\tFALSE\tFALSE\t(x)\t\t\t\t",
                "D\tinteger;name\t1.0\t\tFALSE\tFALSE\tFALSE\t1\t\t\t\t",
                "E\tname\t1.0\t\tFALSE\tFALSE\tFALSE\tNone\t[None,fn:SinceVersion(1.5,Some)]\t\t\t",
            ],
            &[],
        );
        assert_eq!(codes, vec!["default-not-possible", "bad-default-value", "alternative-count"]);
    }

    #[test]
    fn inheritable_needs_parent_dictionary() {
        let rows = ["Resources\tdictionary\t1.0\t\tTRUE\tFALSE\tTRUE\t\t\t\t[Res]\t"];
        assert_eq!(codes_for("Page", &rows, &["Res"]), vec!["missing-parent"]);

        let with_parent = [
            "Parent\tdictionary\t1.0\t\tTRUE\tTRUE\tFALSE\t\t\t\t[Res]\t",
            "Resources\tdictionary\t1.0\t\tTRUE\tFALSE\tTRUE\t\t\t\t[Res]\t",
        ];
        assert_eq!(codes_for("Page", &with_parent, &["Res"]), Vec::<&str>::new());
    }

    #[test]
    fn unknown_variables_are_warned() {
        let codes = codes_for(
            "Annot",
            &[
                "Subtype\tname\t1.0\t\tTRUE\tFALSE\tFALSE\t\t\t\t\t",
                "A\tinteger\t1.0\t\tfn:IsRequired(@Subtype==Link && @Missing==1 && Parent::@X==2)\tFALSE\tFALSE\t\t\t\t\t",
            ],
            &[],
        );
        assert_eq!(codes, vec!["unknown-variable"]);
    }

    #[test]
    fn empty_object_and_orphans() {
        let out = ingest(&[object("Empty", &[]), trailer_to(&["Pages"]), object("Pages", &["N\tinteger\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t\t"])]);
        let codes: Vec<_> = validate(&out.dom, &ValidatorConfig::default()).iter().map(|d| d.code).collect();
        assert_eq!(codes, vec!["empty-object", "orphan-object"]);
    }
}
