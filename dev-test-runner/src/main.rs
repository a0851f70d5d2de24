//! Runs the bundled fixtures end to end: ingest the schema directory,
//! validate it, match every listed document, and compare the findings with
//! `expected.json`.
//!
//! Usage: `dev-test-runner [FIXTURES_DIR]`
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use arlington_check::config::{MatcherConfig, ValidatorConfig};
use arlington_check::diagnostics::{Diagnostic, count_by_code};
use arlington_check::document::Document;
use arlington_check::path_de::from_str_with_path;
use arlington_check::{matcher, schema, tsv, validate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static DEFAULT_FIXTURES: Lazy<PathBuf> = Lazy::new(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures"));

// ————————————————————————————————————————————————————————————————————————————
// EXPECTATIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Deserialize)]
struct Expected {
    schema: SchemaExpectation,
    #[serde(default)]
    documents: Vec<DocumentExpectation>,
}

#[derive(Debug, Deserialize)]
struct SchemaExpectation {
    objects: usize,
    #[serde(default)]
    ingest: Findings,
    #[serde(default)]
    validate: Findings,
}

/// Exact per-code counts, plus regexes that must each match at least one
/// rendered diagnostic.
#[derive(Debug, Default, Deserialize)]
struct Findings {
    #[serde(default)]
    codes: BTreeMap<String, usize>,
    #[serde(default)]
    patterns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentExpectation {
    file: String,
    root: Option<String>,
    #[serde(default)]
    classes: BTreeMap<String, usize>,
    #[serde(flatten)]
    findings: Findings,
}

// ————————————————————————————————————————————————————————————————————————————
// RUN
// ————————————————————————————————————————————————————————————————————————————

#[derive(Default)]
struct Failures(Vec<String>);

impl Failures {
    fn check(&mut self, scope: &str, expected: &Findings, actual: &[Diagnostic]) {
        let before = self.0.len();
        let counts: BTreeMap<String, usize> = count_by_code(actual)
            .into_iter()
            .map(|(code, n)| (code.to_string(), n))
            .collect();
        if counts != expected.codes {
            self.0.push(format!("{scope}: codes {counts:?}, expected {:?}", expected.codes));
        }
        let rendered: Vec<String> = actual.iter().map(Diagnostic::to_string).collect();
        for pattern in &expected.patterns {
            match Regex::new(pattern) {
                Ok(re) if rendered.iter().any(|line| re.is_match(line)) => {}
                Ok(_) => self.0.push(format!("{scope}: no diagnostic matches /{pattern}/")),
                Err(e) => self.0.push(format!("{scope}: bad pattern /{pattern}/: {e}")),
            }
        }
        if self.0.len() > before {
            for line in &rendered {
                eprintln!("    {line}");
            }
        }
    }

    fn document(&mut self, dir: &Path, dom: &schema::SchemaDom, expected: &DocumentExpectation) {
        let scope = format!("document {}", expected.file);
        let doc = match Document::load(&dir.join("documents").join(&expected.file), None) {
            Ok(doc) => doc,
            Err(e) => {
                self.0.push(format!("{scope}: {e}"));
                return;
            }
        };
        let report = matcher::match_document(dom, &doc, &MatcherConfig::default());
        if expected.root.is_some() && report.root_object != expected.root {
            self.0.push(format!("{scope}: root {:?}, expected {:?}", report.root_object, expected.root));
        }
        if !expected.classes.is_empty() {
            let classes: BTreeMap<String, usize> = report
                .class_counts()
                .into_iter()
                .map(|(class, n)| (class.to_string(), n))
                .collect();
            if classes != expected.classes {
                self.0.push(format!("{scope}: classes {classes:?}, expected {:?}", expected.classes));
            }
        }
        self.check(&scope, &expected.findings, &report.diagnostics);
    }
}

fn run(dir: &Path) -> Result<Failures, String> {
    let text = std::fs::read_to_string(dir.join("expected.json")).map_err(|e| format!("expected.json: {e}"))?;
    let expected: Expected = from_str_with_path(&text).map_err(|e| format!("expected.json: {e}"))?;

    let raw = tsv::read_dir(&dir.join("schema")).map_err(|e| e.to_string())?;
    let ingested = schema::ingest(&raw);

    let mut failures = Failures::default();
    if ingested.dom.len() != expected.schema.objects {
        failures.0.push(format!("schema: {} objects, expected {}", ingested.dom.len(), expected.schema.objects));
    }
    failures.check("ingest", &expected.schema.ingest, &ingested.diagnostics);

    let findings = validate::validate(&ingested.dom, &ValidatorConfig::default());
    failures.check("validate", &expected.schema.validate, &findings);

    for doc in &expected.documents {
        failures.document(dir, &ingested.dom, doc);
    }
    Ok(failures)
}

fn main() -> ExitCode {
    let dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| DEFAULT_FIXTURES.clone());
    match run(&dir) {
        Ok(failures) if failures.0.is_empty() => {
            println!("✅ fixtures in {} passed", dir.display());
            ExitCode::SUCCESS
        }
        Ok(failures) => {
            for f in &failures.0 {
                eprintln!("❌ {f}");
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}
