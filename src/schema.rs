//! The Arlington schema model and how it is built and exported.

pub mod export;
pub mod ingest;
pub mod types;

pub use ingest::{IngestError, Ingested, ingest, ingest_object};
pub use types::*;
