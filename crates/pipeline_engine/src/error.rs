//! Error types for the engine and the orchestrator.

use arrow_schema::ArrowError;
use datafusion::error::DataFusionError;
use pipeline_core::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the query engine or of writing output files.
///
/// Always fatal for the current entity run, never retried.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Query planning or execution failed
    #[error("Query engine error: {0}")]
    DataFusion(#[from] DataFusionError),

    /// Record batch construction or rendering failed
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// CSV encoding failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File system operation failed
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Wraps an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Fatal outcome of one entity run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration problem detected before any row was processed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Engine or output failure
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A custom rule failed in `stop` mode
    #[error("Custom validation '{rule}' failed at row {row} of entity '{entity}' (mode: stop)")]
    Halted {
        /// Entity name
        entity: String,
        /// 1-based source row
        row: usize,
        /// First failing rule on that row
        rule: String,
    },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
