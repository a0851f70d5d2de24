//! Human-readable output: the schema diagnostics summary and one report per
//! matched document.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use colored::Colorize;
use indexmap::IndexMap;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Severity, count_by_code};
use crate::matcher::MatchReport;

// ———————————————————————————————————————————————————————————————————————————
// SCHEMA DIAGNOSTICS
// ———————————————————————————————————————————————————————————————————————————

/// Diagnostics grouped by kind, in kind order, then a per-code tally.
pub fn render_schema_diagnostics(diags: &[Diagnostic]) -> String {
    let mut groups: IndexMap<DiagnosticKind, Vec<&Diagnostic>> = IndexMap::new();
    for d in diags {
        groups.entry(d.kind).or_default().push(d);
    }
    groups.sort_keys();

    let mut out = String::new();
    for (kind, items) in &groups {
        let _ = writeln!(out, "{} ({})", kind.label().bold(), items.len());
        for d in items {
            let _ = writeln!(out, "  {} {}: {}", severity_tag(d.severity), d.location, d.message);
        }
    }
    if diags.is_empty() {
        let _ = writeln!(out, "{}", "schema is consistent".green());
    } else {
        let _ = writeln!(out, "{}", summary_line(diags));
    }
    out
}

fn severity_tag(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow(),
        Severity::Note => "note".cyan(),
    }
}

fn summary_line(diags: &[Diagnostic]) -> String {
    let counts = count_by_code(diags)
        .into_iter()
        .map(|(code, n)| format!("{code}={n}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} finding(s): {counts}", diags.len())
}

// ———————————————————————————————————————————————————————————————————————————
// DOCUMENT REPORTS
// ———————————————————————————————————————————————————————————————————————————

/// Plain text report for one document. No colour, since it may go to a file.
pub fn render_document_report(source: &Path, report: &MatchReport, generated: DateTime<Local>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", source.display());
    let _ = writeln!(out, "# generated {}", generated.format("%Y-%m-%d %H:%M:%S %z"));
    let _ = writeln!(out, "# root object: {}", report.root_object.as_deref().unwrap_or("(none)"));
    out.push('\n');

    for a in &report.annotations {
        let _ = write!(out, "{:<18} {} : {}", a.class.as_str(), a.path, a.kind);
        if let Some(ty) = a.schema_type {
            let _ = write!(out, " as {}", ty.as_str());
        }
        if let Some(id) = a.ref_id {
            let _ = write!(out, " [{id} R]");
        }
        if let Some(link) = &a.link {
            let _ = write!(out, " -> {link}");
        }
        out.push('\n');
    }

    out.push('\n');
    for d in &report.diagnostics {
        let _ = writeln!(out, "{d}");
    }
    let classes = report
        .class_counts()
        .into_iter()
        .map(|(class, n)| format!("{class}={n}"))
        .collect::<Vec<_>>()
        .join(" ");
    let _ = writeln!(out, "nodes: {classes}");
    if !report.diagnostics.is_empty() {
        let _ = writeln!(out, "{}", summary_line(&report.diagnostics));
    }
    out
}

/// Write `text` to `<dir>/<stem>.txt`, or the first free `<stem>-N.txt`.
/// Existing files are never touched.
pub fn write_unique(dir: &Path, stem: &str, text: &str) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let mut n = 0usize;
    loop {
        let name = match n {
            0 => format!("{stem}.txt"),
            n => format!("{stem}-{n}.txt"),
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(text.as_bytes())?;
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}
