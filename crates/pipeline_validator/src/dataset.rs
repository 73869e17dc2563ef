//! Record representation for validation.
//!
//! Source rows keep their 1-based position in the file for their whole
//! life: every error record and every `first`/`last` decision is made on
//! that index, never on a position in an intermediate vector.

use pipeline_core::DataValue;
use std::collections::HashMap;

/// A single row of data, column name to value.
pub type DataRow = HashMap<String, DataValue>;

/// A row tagged with its position in the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    /// 1-based data row number (header excluded)
    pub index: usize,

    /// Cell values
    pub row: DataRow,
}

impl SourceRecord {
    /// Creates a record.
    pub fn new(index: usize, row: DataRow) -> Self {
        Self { index, row }
    }

    /// Builds a record from raw string cells; empty cells become null.
    pub fn from_cells<'a>(
        index: usize,
        columns: &[String],
        cells: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let row = columns
            .iter()
            .zip(cells)
            .map(|(column, cell)| {
                let value = if cell.is_empty() {
                    DataValue::Null
                } else {
                    DataValue::String(cell.to_string())
                };
                (column.clone(), value)
            })
            .collect();

        Self { index, row }
    }

    /// Returns a field value, treating null as absent.
    pub fn get(&self, field: &str) -> Option<&DataValue> {
        self.row.get(field).filter(|v| !v.is_null())
    }
}

/// A dataset: ordered column names plus records in source order.
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    columns: Vec<String>,
    records: Vec<SourceRecord>,
}

impl DataSet {
    /// Creates a dataset from columns and records.
    pub fn new(columns: Vec<String>, records: Vec<SourceRecord>) -> Self {
        Self { columns, records }
    }

    /// Column names in header order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the dataset has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns an iterator over the records.
    pub fn records(&self) -> impl Iterator<Item = &SourceRecord> {
        self.records.iter()
    }

    /// Splits the dataset into its columns and records.
    pub fn into_parts(self) -> (Vec<String>, Vec<SourceRecord>) {
        (self.columns, self.records)
    }
}
