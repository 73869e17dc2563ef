//! Composite key deduplication.
//!
//! Each composite key is an independent grouping pass, applied in the order
//! the keys are declared. A row removed by an earlier pass never reaches a
//! later one. Survivors keep their relative source order.

use crate::SourceRecord;
use indexmap::IndexMap;
use pipeline_core::{DuplicateResolution, ErrorCategory, ErrorRecord};
use std::collections::HashSet;
use tracing::debug;

/// Result of deduplicating a record set.
#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// Surviving records, in source order
    pub kept: Vec<SourceRecord>,

    /// Removed records, in the order they were removed
    pub removed: Vec<SourceRecord>,

    /// One `duplicate` record per removed row
    pub errors: Vec<ErrorRecord>,
}

/// Partitions records into kept and removed sets.
#[derive(Debug, Clone)]
pub struct Deduplicator<'a> {
    keys: &'a [Vec<String>],
    policy: DuplicateResolution,
}

impl<'a> Deduplicator<'a> {
    /// Creates a deduplicator for the given composite keys.
    pub fn new(keys: &'a [Vec<String>], policy: DuplicateResolution) -> Self {
        Self { keys, policy }
    }

    /// Runs every grouping pass.
    pub fn deduplicate(&self, records: Vec<SourceRecord>, entity: &str) -> DedupOutcome {
        let mut outcome = DedupOutcome {
            kept: records,
            ..Default::default()
        };

        for key in self.keys {
            let (kept, removed) = self.pass(std::mem::take(&mut outcome.kept), key);
            debug!(
                key = %key.join(","),
                removed = removed.len(),
                "deduplication pass complete"
            );

            outcome.errors.extend(removed.iter().map(|record| ErrorRecord {
                row: record.index,
                entity: entity.to_string(),
                category: ErrorCategory::Duplicate,
                field: Some(key.join(",")),
                detail: self.detail(record, key),
            }));
            outcome.removed.extend(removed);
            outcome.kept = kept;
        }

        outcome
    }

    /// One grouping pass over a single composite key.
    fn pass(
        &self,
        records: Vec<SourceRecord>,
        key: &[String],
    ) -> (Vec<SourceRecord>, Vec<SourceRecord>) {
        // Group positions by key value; rows with a null component are never grouped
        let mut groups: IndexMap<Vec<String>, Vec<usize>> = IndexMap::new();
        for (position, record) in records.iter().enumerate() {
            if let Some(value) = key_of(record, key) {
                groups.entry(value).or_default().push(position);
            }
        }

        let mut dropped = HashSet::new();
        for positions in groups.values().filter(|p| p.len() > 1) {
            let survivor = match self.policy {
                DuplicateResolution::First => positions.iter().min_by_key(|&&p| records[p].index),
                DuplicateResolution::Last => positions.iter().max_by_key(|&&p| records[p].index),
                DuplicateResolution::ExcludeAll => None,
            };
            dropped.extend(positions.iter().filter(|&p| Some(p) != survivor).copied());
        }

        let mut kept = Vec::with_capacity(records.len() - dropped.len());
        let mut removed = Vec::with_capacity(dropped.len());
        for (position, record) in records.into_iter().enumerate() {
            if dropped.contains(&position) {
                removed.push(record);
            } else {
                kept.push(record);
            }
        }

        (kept, removed)
    }

    fn detail(&self, record: &SourceRecord, key: &[String]) -> String {
        let values: Vec<String> = key
            .iter()
            .map(|field| {
                let value = record.get(field).map(ToString::to_string).unwrap_or_default();
                format!("{field}={value}")
            })
            .collect();
        format!(
            "duplicate key ({}) resolved by {}",
            values.join(", "),
            self.policy
        )
    }
}

/// Key tuple of a record, or `None` if any component is missing.
fn key_of(record: &SourceRecord, key: &[String]) -> Option<Vec<String>> {
    key.iter()
        .map(|field| record.get(field).map(ToString::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn records(rows: &[(&str, &str)]) -> Vec<SourceRecord> {
        let columns = vec!["id".to_string(), "email".to_string()];
        rows.iter()
            .enumerate()
            .map(|(i, (id, email))| SourceRecord::from_cells(i + 1, &columns, [*id, *email]))
            .collect()
    }

    fn indexes(records: &[SourceRecord]) -> Vec<usize> {
        records.iter().map(|r| r.index).collect()
    }

    fn id_key() -> Vec<Vec<String>> {
        vec![vec!["id".to_string()]]
    }

    #[test]
    fn test_first_keeps_earliest() {
        let keys = id_key();
        let outcome = Deduplicator::new(&keys, DuplicateResolution::First).deduplicate(
            records(&[("1", "a"), ("2", "b"), ("1", "c"), ("1", "d")]),
            "employees",
        );

        assert_eq!(indexes(&outcome.kept), vec![1, 2]);
        assert_eq!(indexes(&outcome.removed), vec![3, 4]);
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.errors[0].category, ErrorCategory::Duplicate);
        assert_eq!(outcome.errors[0].field.as_deref(), Some("id"));
        assert_eq!(
            outcome.errors[0].detail,
            "duplicate key (id=1) resolved by first"
        );
    }

    #[test]
    fn test_last_keeps_latest() {
        let keys = id_key();
        let outcome = Deduplicator::new(&keys, DuplicateResolution::Last).deduplicate(
            records(&[("1", "a"), ("2", "b"), ("1", "c")]),
            "employees",
        );

        assert_eq!(indexes(&outcome.kept), vec![2, 3]);
        assert_eq!(indexes(&outcome.removed), vec![1]);
    }

    #[test]
    fn test_exclude_all_removes_whole_group() {
        let keys = id_key();
        let outcome = Deduplicator::new(&keys, DuplicateResolution::ExcludeAll).deduplicate(
            records(&[("1", "a"), ("2", "b"), ("1", "c")]),
            "employees",
        );

        assert_eq!(indexes(&outcome.kept), vec![2]);
        assert_eq!(indexes(&outcome.removed), vec![1, 3]);
    }

    #[test]
    fn test_null_components_never_collide() {
        let keys = id_key();
        let outcome = Deduplicator::new(&keys, DuplicateResolution::First)
            .deduplicate(records(&[("", "a"), ("", "b")]), "employees");

        assert_eq!(indexes(&outcome.kept), vec![1, 2]);
        assert!(outcome.removed.is_empty());
    }

    #[test]
    fn test_passes_run_in_declared_order() {
        let keys = vec![vec!["id".to_string()], vec!["email".to_string()]];
        // Row 2 is removed by the id pass and cannot collide on email with row 3
        let outcome = Deduplicator::new(&keys, DuplicateResolution::First).deduplicate(
            records(&[("1", "a"), ("1", "x"), ("3", "x")]),
            "employees",
        );

        assert_eq!(indexes(&outcome.kept), vec![1, 3]);
        assert_eq!(indexes(&outcome.removed), vec![2]);
        assert_eq!(outcome.errors.len(), 1);
    }

    #[test]
    fn test_composite_key_uses_every_component() {
        let keys = vec![vec!["id".to_string(), "email".to_string()]];
        let outcome = Deduplicator::new(&keys, DuplicateResolution::First).deduplicate(
            records(&[("1", "a"), ("1", "b"), ("1", "a")]),
            "employees",
        );

        assert_eq!(indexes(&outcome.kept), vec![1, 2]);
        assert_eq!(outcome.errors[0].field.as_deref(), Some("id,email"));
    }

    #[test]
    fn test_no_keys_keeps_everything() {
        let keys: Vec<Vec<String>> = Vec::new();
        let outcome = Deduplicator::new(&keys, DuplicateResolution::ExcludeAll)
            .deduplicate(records(&[("1", "a"), ("1", "a")]), "employees");

        assert_eq!(outcome.kept.len(), 2);
    }
}
