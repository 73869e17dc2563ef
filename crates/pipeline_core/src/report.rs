//! Error records and run summaries.
//!
//! The pipeline never throws row-level problems away: each becomes an
//! [`ErrorRecord`] in an [`ErrorLog`], grouped by [`ErrorCategory`] when it
//! is flushed to disk. A [`RunSummary`] carries the counters an external
//! reporter prints once the run reaches a terminal [`RunState`].

use crate::ProjectionKind;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Category an error record is routed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing, mistyped, out-of-range or pattern-failing field
    Schema,
    /// Named custom rule failure
    Custom(String),
    /// Row removed by deduplication
    Duplicate,
}

impl ErrorCategory {
    /// Stem of the error file name, without entity prefix and suffix.
    pub fn file_stem(&self) -> String {
        match self {
            ErrorCategory::Schema => "schema_validation".to_string(),
            ErrorCategory::Custom(rule) => format!("custom_{rule}"),
            ErrorCategory::Duplicate => "duplicates".to_string(),
        }
    }

    /// Error file name for an entity, e.g. `employees_duplicates_errors.csv`.
    pub fn file_name(&self, entity: &str) -> String {
        format!("{entity}_{}_errors.csv", self.file_stem())
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Schema => f.write_str("schema"),
            ErrorCategory::Custom(rule) => write!(f, "custom:{rule}"),
            ErrorCategory::Duplicate => f.write_str("duplicate"),
        }
    }
}

/// One row-level problem.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    /// 1-based data row number in the source file
    pub row: usize,

    /// Entity the row belongs to
    pub entity: String,

    /// Routing category
    pub category: ErrorCategory,

    /// Offending field, if one applies
    pub field: Option<String>,

    /// Human-readable detail
    pub detail: String,
}

/// Append-only error accumulator for one run.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    records: Vec<ErrorRecord>,
}

impl ErrorLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record.
    pub fn push(&mut self, record: ErrorRecord) {
        self.records.push(record);
    }

    /// Appends several records.
    pub fn extend(&mut self, records: impl IntoIterator<Item = ErrorRecord>) {
        self.records.extend(records);
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records of one category, in append order.
    pub fn of(&self, category: &ErrorCategory) -> Vec<&ErrorRecord> {
        self.records
            .iter()
            .filter(|r| &r.category == category)
            .collect()
    }
}

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Reading the source file and checking projections
    Loading,
    /// Applying field specs
    SchemaValidating,
    /// Applying custom rules
    CustomValidating,
    /// Valid rows registered with the engine
    Loaded,
    /// Resolving composite key collisions
    Deduplicating,
    /// Materializing projections
    Projecting,
    /// Completed
    Done,
    /// Aborted on a fatal condition
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Loading => "loading",
            RunState::SchemaValidating => "schema_validating",
            RunState::CustomValidating => "custom_validating",
            RunState::Loaded => "loaded",
            RunState::Deduplicating => "deduplicating",
            RunState::Projecting => "projecting",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Row count of one materialized projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionSummary {
    /// Projection name
    pub name: String,

    /// Table or view
    pub kind: ProjectionKind,

    /// Rows in the relation
    pub rows: usize,

    /// Export file, for tables
    pub export_path: Option<PathBuf>,
}

/// Counters for one entity run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Entity name
    pub entity: String,

    /// Terminal state once the run returns
    pub state: RunState,

    /// Source rows handed to validation
    pub rows_processed: usize,

    /// Rows that passed schema and custom validation
    pub rows_valid: usize,

    /// Rows rejected by schema validation
    pub schema_errors: usize,

    /// Rows rejected by custom rules
    pub custom_errors: usize,

    /// Rows removed by deduplication
    pub duplicates_removed: usize,

    /// Rows in the deduplicated relation
    pub rows_deduplicated: usize,

    /// Per-projection row counts, in declaration order
    pub projections: Vec<ProjectionSummary>,

    /// Error files written for this run
    pub error_files: Vec<PathBuf>,

    /// Reason the run failed
    pub failure: Option<String>,
}

impl RunSummary {
    /// Creates an empty summary in the `Loading` state.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            state: RunState::Loading,
            rows_processed: 0,
            rows_valid: 0,
            schema_errors: 0,
            custom_errors: 0,
            duplicates_removed: 0,
            rows_deduplicated: 0,
            projections: Vec::new(),
            error_files: Vec::new(),
            failure: None,
        }
    }

    /// Returns true if the run completed.
    pub fn passed(&self) -> bool {
        self.state == RunState::Done
    }

    /// Row count of a projection by name.
    pub fn projection_rows(&self, name: &str) -> Option<usize> {
        self.projections
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.rows)
    }
}
