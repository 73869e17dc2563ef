//! Schema validation logic.
//!
//! Checks each declared field of each record for presence, type, pattern
//! and numeric bounds, and produces a coerced copy of records that pass.
//! The schema is additive: columns that are not declared pass through
//! untouched so projections can still select them.

use crate::{DataRow, FieldError, SourceRecord};
use pipeline_core::{DataValue, ErrorRecord, FieldSpec};
use tracing::debug;

/// Result of running the schema stage over a record stream.
#[derive(Debug, Default)]
pub struct SchemaOutcome {
    /// Coerced records that passed every field check, in source order
    pub valid: Vec<SourceRecord>,

    /// One `schema` record per failed field check
    pub errors: Vec<ErrorRecord>,

    /// Number of rows excluded from the valid stream
    pub rejected: usize,
}

/// Validates records against declared field specs.
pub struct SchemaValidator<'a> {
    fields: &'a [FieldSpec],
}

impl<'a> SchemaValidator<'a> {
    /// Creates a new schema validator.
    pub fn new(fields: &'a [FieldSpec]) -> Self {
        Self { fields }
    }

    /// Validates every record. No early abort: every row is checked.
    pub fn validate(&self, records: Vec<SourceRecord>, entity: &str) -> SchemaOutcome {
        let mut outcome = SchemaOutcome::default();

        for record in records {
            match self.validate_record(&record.row) {
                Ok(row) => outcome.valid.push(SourceRecord::new(record.index, row)),
                Err(errors) => {
                    debug!(
                        row = record.index,
                        errors = errors.len(),
                        "row rejected by schema validation"
                    );
                    outcome.rejected += 1;
                    outcome.errors.extend(
                        errors
                            .into_iter()
                            .map(|e| e.into_record(record.index, entity)),
                    );
                }
            }
        }

        outcome
    }

    /// Validates a single row.
    ///
    /// Returns the coerced row, or every field error found in it.
    pub fn validate_record(&self, row: &DataRow) -> Result<DataRow, Vec<FieldError>> {
        let mut coerced = row.clone();
        let mut errors = Vec::new();

        for field in self.fields {
            match self.validate_field(field, row) {
                Ok(Some(value)) => {
                    coerced.insert(field.name.clone(), value);
                }
                Ok(None) => {
                    coerced.insert(field.name.clone(), DataValue::Null);
                }
                Err(field_errors) => errors.extend(field_errors),
            }
        }

        if errors.is_empty() {
            Ok(coerced)
        } else {
            Err(errors)
        }
    }

    /// Validates a single field, returning its coerced value.
    ///
    /// `Ok(None)` means an optional field is absent and has no default.
    fn validate_field(
        &self,
        field: &FieldSpec,
        row: &DataRow,
    ) -> Result<Option<DataValue>, Vec<FieldError>> {
        let raw = match row.get(&field.name) {
            Some(DataValue::Null) | None => {
                if field.required {
                    return Err(vec![FieldError::missing(&field.name)]);
                }
                return Ok(field.default.clone());
            }
            Some(DataValue::String(raw)) => raw.clone(),
            // Already typed, e.g. a record built in code
            Some(other) => other.to_string(),
        };

        let mut errors = Vec::new();

        if let Some(pattern) = &field.pattern {
            if !pattern.is_match(&raw) {
                errors.push(FieldError::pattern(&field.name, &raw, pattern.as_str()));
            }
        }

        let value = match field.field_type.coerce(&raw) {
            Some(value) => value,
            None => {
                errors.insert(
                    0,
                    FieldError::type_mismatch(&field.name, field.field_type, &raw),
                );
                return Err(errors);
            }
        };

        if let Some(number) = value.as_float() {
            let below = field.min.is_some_and(|min| number < min);
            let above = field.max.is_some_and(|max| number > max);
            if below || above {
                errors.push(FieldError::out_of_range(
                    &field.name,
                    number,
                    field.min,
                    field.max,
                ));
            }
        }

        if errors.is_empty() {
            Ok(Some(value))
        } else {
            Err(errors)
        }
    }
}
