//! Arlington schema toolchain: predicate lexer and parser, schema ingestion,
//! static consistency checks and document matching.
pub mod ast;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod functions;
pub mod jq_exec;
pub mod lexer;
pub mod matcher;
pub mod path_de;
pub mod report;
pub mod schema;
pub mod tsv;
pub mod validate;
