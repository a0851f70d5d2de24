//! Reading a directory of Arlington TSV files into raw rows.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TsvError {
    #[error("bad glob pattern `{pattern}`: {source}")]
    Pattern { pattern: String, #[source] source: glob::PatternError },
    #[error("cannot read `{path}`: {source}")]
    Read { path: PathBuf, #[source] source: csv::Error },
    #[error("cannot list `{0}`: {1}")]
    Glob(PathBuf, #[source] glob::GlobError),
    #[error("no *.tsv files in `{0}`")]
    NoSchemaFiles(PathBuf),
}

/// One data row, cells keyed by header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based physical line in the file.
    pub line: u64,
    pub cells: IndexMap<String, String>,
    /// Number of cells actually present, which may differ from the header.
    pub cell_count: usize,
}

impl RawRow {
    pub fn get(&self, column: &str) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }
}

/// All rows of one schema file. The object name is the file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    pub name: String,
    pub path: PathBuf,
    pub rows: Vec<RawRow>,
}

pub fn read_dir(dir: &Path) -> Result<Vec<RawObject>, TsvError> {
    let pattern = dir.join("*.tsv").to_string_lossy().into_owned();
    let paths = glob::glob(&pattern).map_err(|source| TsvError::Pattern { pattern: pattern.clone(), source })?;

    let mut files = Vec::new();
    for entry in paths {
        files.push(entry.map_err(|e| TsvError::Glob(dir.to_path_buf(), e))?);
    }
    files.sort();
    if files.is_empty() {
        return Err(TsvError::NoSchemaFiles(dir.to_path_buf()));
    }

    files.iter().map(|p| read_file(p)).collect()
}

pub fn read_file(path: &Path) -> Result<RawObject, TsvError> {
    let read_err = |source| TsvError::Read { path: path.to_path_buf(), source };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .has_headers(true)
        .from_path(path)
        .map_err(read_err)?;

    let headers: Vec<String> = reader.headers().map_err(read_err)?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(read_err)?;
        rows.push(row_from_record(&headers, &record));
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    debug!(object = %name, rows = rows.len(), "read schema file");
    Ok(RawObject { name, path: path.to_path_buf(), rows })
}

/// Parse TSV text held in memory. Used by tests and tools that build
/// schemas on the fly.
pub fn read_str(name: &str, text: &str) -> Result<RawObject, TsvError> {
    let read_err = |source| TsvError::Read { path: PathBuf::from(name), source };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader.headers().map_err(read_err)?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(row_from_record(&headers, &record.map_err(read_err)?));
    }
    Ok(RawObject { name: name.to_string(), path: PathBuf::from(name), rows })
}

fn row_from_record(headers: &[String], record: &csv::StringRecord) -> RawRow {
    let cells = headers
        .iter()
        .zip(record.iter())
        .map(|(h, c)| (h.clone(), c.to_string()))
        .collect();
    RawRow {
        line: record.position().map(|p| p.line()).unwrap_or(0),
        cells,
        cell_count: record.len(),
    }
}
