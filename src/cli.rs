//! CLI: load schema → (validate | export | match documents)
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::Local;
use clap::Parser;
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{DEFAULT_MAX_DEPTH, MatcherConfig, ReportSink, ValidatorConfig};
use crate::document::{Document, DocumentError};
use crate::schema::SchemaDom;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// check an Arlington TSV schema for consistency and match parsed documents against it
#[derive(Parser, Debug)]
#[command(name = "arlington-check", version)]
pub struct CommandLineInterface {
    /// directory holding one `<Object>.tsv` file per schema object
    #[arg(long, short = 't')]
    tsvdir: PathBuf,

    /// run the static consistency checks over the loaded schema
    #[arg(long, default_value_t = false)]
    validate: bool,

    /// export the ingested schema as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// JSON-encoded documents to match. Literal paths or quoted glob patterns
    #[arg(long, num_args = 1..)]
    pdf: Vec<String>,

    /// write one report per document into this directory (stdout if omitted)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// deepest document nesting the matcher will enter
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// schema object used for the trailer (detected when omitted)
    #[arg(long)]
    root_object: Option<String>,

    /// debug logging (overridden by RUST_LOG)
    #[arg(long, conflicts_with = "info")]
    debug: bool,

    /// info logging (overridden by RUST_LOG)
    #[arg(long)]
    info: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        self.init_tracing();

        // 1) schema
        let raw = crate::tsv::read_dir(&self.tsvdir)?;
        let ingested = crate::schema::ingest(&raw);
        if ingested.dom.is_empty() {
            eprint!("{}", crate::report::render_schema_diagnostics(&ingested.diagnostics));
            bail!("no schema object could be ingested from {}", self.tsvdir.display());
        }
        let dom = ingested.dom;
        let mut diagnostics = ingested.diagnostics;

        // 2) optional export
        if let Some(out) = self.json.as_ref() {
            crate::schema::export::save_json(&dom, out)?;
            info!(path = %out.display(), "schema exported");
        }

        // 3) optional static checks
        if self.validate {
            diagnostics.extend(crate::validate::validate(&dom, &ValidatorConfig::default()));
        }
        if self.validate || !diagnostics.is_empty() {
            print!("{}", crate::report::render_schema_diagnostics(&diagnostics));
        }

        // 4) documents
        if !self.pdf.is_empty() {
            self.match_documents(&dom)?;
        }
        Ok(())
    }

    fn init_tracing(&self) {
        let fallback = match (self.debug, self.info) {
            (true, _) => "debug",
            (_, true) => "info",
            _ => "warn",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
        // a second init (tests, embedding) keeps the first subscriber
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    fn matcher_config(&self) -> MatcherConfig {
        MatcherConfig { root_object: self.root_object.clone(), max_depth: self.max_depth }
    }

    fn sink(&self) -> ReportSink {
        match &self.out_dir {
            Some(dir) => ReportSink::Directory(dir.clone()),
            None => ReportSink::Stdout,
        }
    }

    fn match_documents(&self, dom: &SchemaDom) -> anyhow::Result<()> {
        let paths = resolve_file_path_patterns(&self.pdf)?;
        let config = self.matcher_config();
        let jq_expr = self.jq_expr.as_deref();

        // one walk per document, each with its own visited set
        let rendered: Vec<(&PathBuf, Result<String, DocumentError>)> = paths
            .par_iter()
            .map(|path| {
                let text = Document::load(path, jq_expr).map(|doc| {
                    let report = crate::matcher::match_document(dom, &doc, &config);
                    crate::report::render_document_report(path, &report, Local::now())
                });
                (path, text)
            })
            .collect();

        // output stays in input order; a failed document never hides the rest
        let sink = self.sink();
        let mut failed = 0usize;
        for (path, text) in &rendered {
            let text = match text {
                Ok(text) => text,
                Err(e) => {
                    failed += 1;
                    warn!(source = %path.display(), "{e}");
                    eprintln!("skipped {}: {e}", path.display());
                    continue;
                }
            };
            match &sink {
                ReportSink::Stdout => println!("{text}"),
                ReportSink::Directory(dir) => {
                    let written = crate::report::write_unique(dir, &report_stem(path), text)
                        .with_context(|| format!("writing report into {}", dir.display()))?;
                    info!(source = %path.display(), report = %written.display(), "report written");
                }
            }
        }
        if failed > 0 {
            bail!("{failed} of {} document(s) could not be matched", rendered.len());
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn report_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "report".to_string())
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                matched_any = true;
                out.push(entry?);
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else if Path::new(pattern).is_dir() {
            // Directory mode: every JSON document inside, sorted
            let before = out.len();
            for entry in glob::glob(&format!("{}/*.json", glob::Pattern::escape(pattern)))? {
                out.push(entry?);
            }
            out[before..].sort();
            if out.len() == before {
                warn!(dir = pattern, "no .json documents in directory");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flags_parse() {
        let cli = CommandLineInterface::try_parse_from([
            "arlington-check",
            "--tsvdir",
            "tsv/latest",
            "--validate",
            "--pdf",
            "a.json",
            "b.json",
            "--max-depth",
            "64",
        ])
        .unwrap();
        assert!(cli.validate);
        assert_eq!(cli.pdf, vec!["a.json", "b.json"]);
        assert_eq!(cli.matcher_config().max_depth, 64);
        assert!(matches!(cli.sink(), ReportSink::Stdout));
    }

    #[test]
    fn directories_expand_to_sorted_json_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.json", "notes.txt"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        let paths = resolve_file_path_patterns([dir.path().to_string_lossy()]).unwrap();
        let names: Vec<_> = paths.iter().map(|p| p.file_name().unwrap().to_string_lossy().to_string()).collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn end_to_end_writes_reports() {
        let root = tempfile::tempdir().unwrap();
        let tsv = root.path().join("tsv");
        std::fs::create_dir(&tsv).unwrap();
        let header = crate::config::COLUMNS.join("\t");
        std::fs::write(
            tsv.join("FileTrailer.tsv"),
            format!("{header}\nSize\tinteger\t1.0\t\tTRUE\tFALSE\tFALSE\t\t\t\t\t\n"),
        )
        .unwrap();
        let doc = root.path().join("doc.json");
        std::fs::write(&doc, r#"{"trailer": {"Size": 1}}"#).unwrap();
        let out = root.path().join("out");

        let args = [
            "arlington-check".to_string(),
            "--tsvdir".into(),
            tsv.to_string_lossy().into(),
            "--pdf".into(),
            doc.to_string_lossy().into(),
            "--out-dir".into(),
            out.to_string_lossy().into(),
        ];
        let cli = CommandLineInterface::try_parse_from(&args).unwrap();
        cli.run().unwrap();
        cli.run().unwrap();
        assert!(out.join("doc.txt").exists());
        assert!(out.join("doc-1.txt").exists());
    }

    #[test]
    fn malformed_document_does_not_block_the_others() {
        let root = tempfile::tempdir().unwrap();
        let tsv = root.path().join("tsv");
        std::fs::create_dir(&tsv).unwrap();
        let header = crate::config::COLUMNS.join("\t");
        std::fs::write(
            tsv.join("FileTrailer.tsv"),
            format!("{header}\nSize\tinteger\t1.0\t\tTRUE\tFALSE\tFALSE\t\t\t\t\t\n"),
        )
        .unwrap();
        let good = root.path().join("a_good.json");
        std::fs::write(&good, r#"{"trailer": {"Size": 1}}"#).unwrap();
        let bad = root.path().join("b_bad.json");
        std::fs::write(&bad, r#"{"trailer": {"Size": "#).unwrap();
        let out = root.path().join("out");

        let args = [
            "arlington-check".to_string(),
            "--tsvdir".into(),
            tsv.to_string_lossy().into(),
            "--pdf".into(),
            good.to_string_lossy().into(),
            bad.to_string_lossy().into(),
            "--out-dir".into(),
            out.to_string_lossy().into(),
        ];
        let cli = CommandLineInterface::try_parse_from(&args).unwrap();
        let err = cli.run().unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 document(s) could not be matched");
        assert!(out.join("a_good.txt").exists());
        assert!(!out.join("b_bad.txt").exists());
    }
}
