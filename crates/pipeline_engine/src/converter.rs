//! Conversion between pipeline records and Arrow data.

use crate::Result;
use arrow_array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeStringArray, RecordBatch, RecordBatchOptions, StringArray, UInt64Array,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use datafusion::arrow::util::display::{ArrayFormatter, FormatOptions};
use pipeline_core::{DataValue, Entity, FieldType};
use pipeline_validator::SourceRecord;
use std::sync::Arc;

/// A column of an entity relation.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Type used for the Arrow column
    pub field_type: FieldType,
}

/// Column layout of an entity's relations.
///
/// Source header columns come first, in header order, then declared fields
/// the header lacks. Undeclared columns are strings.
pub fn layout(entity: &Entity, header: &[String]) -> Vec<Column> {
    let mut columns: Vec<Column> = header
        .iter()
        .map(|name| Column {
            name: name.clone(),
            field_type: entity
                .field(name)
                .map_or(FieldType::Str, |field| field.field_type),
        })
        .collect();

    for field in &entity.fields {
        if !header.contains(&field.name) {
            columns.push(Column {
                name: field.name.clone(),
                field_type: field.field_type,
            });
        }
    }

    columns
}

/// Maps a declared field type to an Arrow type.
pub fn arrow_type(field_type: FieldType) -> DataType {
    match field_type {
        FieldType::Int => DataType::Int64,
        FieldType::Float => DataType::Float64,
        FieldType::Str => DataType::Utf8,
        FieldType::Bool => DataType::Boolean,
    }
}

/// Arrow schema for a column layout; every column is nullable.
pub fn arrow_schema(columns: &[Column]) -> SchemaRef {
    let fields: Vec<Field> = columns
        .iter()
        .map(|c| Field::new(&c.name, arrow_type(c.field_type), true))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Builds a record batch holding `records` in the given order.
pub fn records_to_batch(columns: &[Column], records: &[SourceRecord]) -> Result<RecordBatch> {
    let schema = arrow_schema(columns);
    let arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|column| column_array(column, records))
        .collect();

    let options = RecordBatchOptions::new().with_row_count(Some(records.len()));
    Ok(RecordBatch::try_new_with_options(schema, arrays, &options)?)
}

fn column_array(column: &Column, records: &[SourceRecord]) -> ArrayRef {
    let values = records.iter().map(|r| r.get(&column.name));
    match column.field_type {
        FieldType::Int => Arc::new(
            values
                .map(|v| v.and_then(DataValue::as_int))
                .collect::<Int64Array>(),
        ),
        FieldType::Float => Arc::new(
            values
                .map(|v| v.and_then(DataValue::as_float))
                .collect::<Float64Array>(),
        ),
        FieldType::Bool => Arc::new(
            values
                .map(|v| v.and_then(DataValue::as_bool))
                .collect::<BooleanArray>(),
        ),
        FieldType::Str => Arc::new(
            values
                .map(|v| v.map(ToString::to_string))
                .collect::<StringArray>(),
        ),
    }
}

/// Converts one Arrow cell to a [`DataValue`].
///
/// Types without a direct counterpart (dates, decimals, ...) fall back to
/// their display form.
pub fn arrow_value_to_data_value(array: &ArrayRef, row: usize) -> Result<DataValue> {
    if array.is_null(row) {
        return Ok(DataValue::Null);
    }

    let any = array.as_any();
    let value = match array.data_type() {
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| DataValue::Bool(a.value(row))),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| DataValue::Int(i64::from(a.value(row)))),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| DataValue::Int(a.value(row))),
        DataType::UInt64 => any
            .downcast_ref::<UInt64Array>()
            .and_then(|a| i64::try_from(a.value(row)).ok())
            .map(DataValue::Int),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| DataValue::Float(f64::from(a.value(row)))),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| DataValue::Float(a.value(row))),
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| DataValue::String(a.value(row).to_string())),
        DataType::LargeUtf8 => any
            .downcast_ref::<LargeStringArray>()
            .map(|a| DataValue::String(a.value(row).to_string())),
        _ => None,
    };

    match value {
        Some(value) => Ok(value),
        None => {
            let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())?;
            Ok(DataValue::String(formatter.value(row).to_string()))
        }
    }
}

/// Converts every row of a batch.
pub fn batch_to_rows(batch: &RecordBatch) -> Result<Vec<Vec<DataValue>>> {
    (0..batch.num_rows())
        .map(|row| {
            batch
                .columns()
                .iter()
                .map(|array| arrow_value_to_data_value(array, row))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::Date32Array;
    use pipeline_core::{EntityBuilder, FieldSpecBuilder};
    use pretty_assertions::assert_eq;

    fn entity() -> Entity {
        EntityBuilder::new("employees", "employees.csv")
            .field(FieldSpecBuilder::new("id", FieldType::Int).build())
            .field(FieldSpecBuilder::new("active", FieldType::Bool).build())
            .build()
    }

    #[test]
    fn test_layout_appends_declared_fields() {
        let header = vec!["name".to_string(), "id".to_string()];
        let columns = layout(&entity(), &header);

        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["name", "id", "active"]);
        assert_eq!(columns[0].field_type, FieldType::Str);
        assert_eq!(columns[1].field_type, FieldType::Int);
        assert_eq!(columns[2].field_type, FieldType::Bool);
    }

    #[test]
    fn test_records_to_batch() {
        let columns = layout(&entity(), &["id".to_string(), "name".to_string()]);
        let mut first = SourceRecord::from_cells(1, &["name".to_string()], ["ana"]);
        first.row.insert("id".into(), DataValue::Int(7));
        first.row.insert("active".into(), DataValue::Bool(true));
        let second = SourceRecord::from_cells(2, &["name".to_string()], [""]);

        let batch = records_to_batch(&columns, &[first, second]).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 3);
        assert_eq!(batch.schema().field(0).data_type(), &DataType::Int64);

        let rows = batch_to_rows(&batch).unwrap();
        assert_eq!(
            rows[0],
            vec![
                DataValue::Int(7),
                DataValue::String("ana".into()),
                DataValue::Bool(true)
            ]
        );
        assert_eq!(rows[1], vec![DataValue::Null; 3]);
    }

    #[test]
    fn test_empty_batch_without_columns() {
        let batch = records_to_batch(&[], &[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
    }

    #[test]
    fn test_arrow_value_conversion() {
        let ints: ArrayRef = Arc::new(Int64Array::from(vec![Some(42), None]));
        assert_eq!(arrow_value_to_data_value(&ints, 0).unwrap(), DataValue::Int(42));
        assert_eq!(arrow_value_to_data_value(&ints, 1).unwrap(), DataValue::Null);

        let floats: ArrayRef = Arc::new(Float64Array::from(vec![1.5]));
        assert_eq!(
            arrow_value_to_data_value(&floats, 0).unwrap(),
            DataValue::Float(1.5)
        );

        let dates: ArrayRef = Arc::new(Date32Array::from(vec![19737]));
        assert_eq!(
            arrow_value_to_data_value(&dates, 0).unwrap(),
            DataValue::String("2024-01-15".into())
        );
    }
}
