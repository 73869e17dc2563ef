//! Row-level validation errors.
//!
//! These are recovered locally: each one becomes an [`ErrorRecord`] and the
//! offending row leaves the valid stream, but the run goes on.

use pipeline_core::{ErrorCategory, ErrorRecord, FieldType};
use thiserror::Error;

/// A schema check that failed for one field of one row.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    /// Required field is absent or empty
    #[error("missing_required: field '{field}' is required")]
    MissingRequired { field: String },

    /// Raw value does not parse as the declared type
    #[error("type_mismatch: expected {expected}, got '{value}'")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        value: String,
    },

    /// Raw value does not match the declared pattern
    #[error("pattern_mismatch: '{value}' does not match '{pattern}'")]
    PatternMismatch {
        field: String,
        value: String,
        pattern: String,
    },

    /// Numeric value outside the declared bounds
    #[error("out_of_range: {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: String,
        max: String,
    },
}

impl FieldError {
    /// Creates a missing required field error.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(field: impl Into<String>, expected: FieldType, value: &str) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected,
            value: value.to_string(),
        }
    }

    /// Creates a pattern mismatch error.
    pub fn pattern(field: impl Into<String>, value: &str, pattern: &str) -> Self {
        Self::PatternMismatch {
            field: field.into(),
            value: value.to_string(),
            pattern: pattern.to_string(),
        }
    }

    /// Creates an out of range error; open bounds render as `-inf` / `inf`.
    pub fn out_of_range(
        field: impl Into<String>,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Self {
        Self::OutOfRange {
            field: field.into(),
            value,
            min: min.map_or_else(|| "-inf".to_string(), |m| m.to_string()),
            max: max.map_or_else(|| "inf".to_string(), |m| m.to_string()),
        }
    }

    /// Field the error concerns.
    pub fn field(&self) -> &str {
        match self {
            FieldError::MissingRequired { field }
            | FieldError::TypeMismatch { field, .. }
            | FieldError::PatternMismatch { field, .. }
            | FieldError::OutOfRange { field, .. } => field,
        }
    }

    /// Short error kind, e.g. `missing_required`.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldError::MissingRequired { .. } => "missing_required",
            FieldError::TypeMismatch { .. } => "type_mismatch",
            FieldError::PatternMismatch { .. } => "pattern_mismatch",
            FieldError::OutOfRange { .. } => "out_of_range",
        }
    }

    /// Converts into a `schema` error record.
    pub fn into_record(self, row: usize, entity: &str) -> ErrorRecord {
        ErrorRecord {
            row,
            entity: entity.to_string(),
            category: ErrorCategory::Schema,
            field: Some(self.field().to_string()),
            detail: self.to_string(),
        }
    }
}

/// A custom rule that failed for one row.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{rule} failed on '{field}': {message}")]
pub struct RuleViolation {
    /// Rule name
    pub rule: String,
    /// Checked field
    pub field: String,
    /// Why the value was rejected
    pub message: String,
}

impl RuleViolation {
    /// Converts into a `custom:<rule>` error record.
    pub fn into_record(self, row: usize, entity: &str) -> ErrorRecord {
        ErrorRecord {
            row,
            entity: entity.to_string(),
            category: ErrorCategory::Custom(self.rule.clone()),
            field: Some(self.field.clone()),
            detail: self.message,
        }
    }
}
