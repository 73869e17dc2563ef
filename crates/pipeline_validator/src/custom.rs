//! Custom rule evaluation.
//!
//! Rules are resolved into [`RuleKind`] variants when the configuration is
//! loaded; this module only evaluates them. Date-based rules measure age
//! against an explicit processing date so runs are reproducible.

use crate::{DataRow, RuleViolation, SourceRecord};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use pipeline_core::{CustomRuleSpec, CustomValidationMode, DataValue, ErrorRecord, RuleKind};
use tracing::{debug, warn};

/// Result of running the custom stage over a record stream.
#[derive(Debug, Default)]
pub struct CustomOutcome {
    /// Records that passed every rule, in source order
    pub passed: Vec<SourceRecord>,

    /// One `custom:<rule>` record per failing (row, rule) pair
    pub errors: Vec<ErrorRecord>,

    /// Number of rows excluded from the valid stream
    pub rejected: usize,

    /// Index of the row that aborted the run in `stop` mode
    pub halted_at: Option<usize>,
}

/// Applies custom rules to records.
pub struct RuleEngine<'a> {
    rules: &'a [CustomRuleSpec],
    today: NaiveDate,
}

impl<'a> RuleEngine<'a> {
    /// Creates a rule engine measuring ages at `today`.
    pub fn new(rules: &'a [CustomRuleSpec], today: NaiveDate) -> Self {
        Self { rules, today }
    }

    /// Runs every rule over every record.
    ///
    /// In `skip` mode failing rows are dropped and recorded. In `stop` mode
    /// the first failing row is recorded and nothing after it is examined.
    pub fn run(
        &self,
        records: Vec<SourceRecord>,
        entity: &str,
        mode: CustomValidationMode,
    ) -> CustomOutcome {
        let mut outcome = CustomOutcome::default();

        for record in records {
            let violations = self.apply(&record.row);
            if violations.is_empty() {
                outcome.passed.push(record);
                continue;
            }

            outcome.rejected += 1;
            outcome.errors.extend(
                violations
                    .into_iter()
                    .map(|v| v.into_record(record.index, entity)),
            );

            match mode {
                CustomValidationMode::Skip => {
                    debug!(row = record.index, "row skipped by custom validation");
                }
                CustomValidationMode::Stop => {
                    warn!(
                        row = record.index,
                        "custom validation failed in stop mode, aborting"
                    );
                    outcome.halted_at = Some(record.index);
                    break;
                }
            }
        }

        outcome
    }

    /// Applies every rule to one row; an empty result means the row passes.
    pub fn apply(&self, row: &DataRow) -> Vec<RuleViolation> {
        self.rules
            .iter()
            .filter_map(|spec| {
                let value = row.get(&spec.field).unwrap_or(&DataValue::Null);
                check(&spec.rule, value, self.today)
                    .err()
                    .map(|message| RuleViolation {
                        rule: spec.name.clone(),
                        field: spec.field.clone(),
                        message,
                    })
            })
            .collect()
    }
}

/// Evaluates one rule against one value.
pub fn check(rule: &RuleKind, value: &DataValue, today: NaiveDate) -> Result<(), String> {
    match rule {
        RuleKind::AgeGte { min_age } => {
            let age = age_of(value, today)?;
            if age < i64::from(*min_age) {
                return Err(format!("age {age} is below {min_age}"));
            }
            Ok(())
        }
        RuleKind::AgeLte { max_age } => {
            let age = age_of(value, today)?;
            if age > i64::from(*max_age) {
                return Err(format!("age {age} is above {max_age}"));
            }
            Ok(())
        }
        RuleKind::OneOf { values } => {
            let text = value.to_string();
            if values.iter().any(|v| *v == text) {
                Ok(())
            } else {
                Err(format!(
                    "'{text}' not in allowed values: [{}]",
                    values.join(", ")
                ))
            }
        }
        RuleKind::NotInFuture => {
            let date = date_of(value)?;
            if date > today {
                return Err(format!("{date} is after {today}"));
            }
            Ok(())
        }
    }
}

fn date_of(value: &DataValue) -> Result<NaiveDate, String> {
    if value.is_null() {
        return Err("value is missing".to_string());
    }
    let text = value.to_string();
    parse_date(&text).ok_or_else(|| format!("'{text}' is not a valid date"))
}

fn age_of(value: &DataValue, today: NaiveDate) -> Result<i64, String> {
    date_of(value).map(|born| age_in_years(born, today))
}

/// Whole years between `born` and `today`; negative for future dates.
pub fn age_in_years(born: NaiveDate, today: NaiveDate) -> i64 {
    let mut years = i64::from(today.year() - born.year());
    if (today.month(), today.day()) < (born.month(), born.day()) {
        years -= 1;
    }
    years
}

/// Parses a calendar date in several formats.
///
/// Supports:
/// - Date only (e.g., "2024-01-15", "2024/01/15")
/// - ISO 8601 / RFC 3339 (e.g., "2024-01-15T10:30:00Z")
/// - Common datetime format (e.g., "2024-01-15 10:30:00")
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.date())
}
