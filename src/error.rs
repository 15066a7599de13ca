//! Error types surfaced at the crate's boundary.

use thiserror::Error;

/// Failures reading or parsing a configuration file. Malformed individual
/// records inside an otherwise-readable file are not an error: they're
/// silently skipped, leaving a partial `ConfigSpace` (see `config::ConfigSpace`).
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
