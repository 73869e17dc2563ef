//! Reading an entity's delimited source file.

use pipeline_core::{ConfigError, Entity};
use pipeline_validator::{DataSet, SourceRecord};
use tracing::debug;

/// Reads the entity's source file into a dataset.
///
/// The header row names the columns. Rows shorter than the header leave
/// the trailing columns absent; extra cells are ignored. Any failure to
/// open or decode the file is a configuration error for the entity.
pub fn read_source(entity: &Entity) -> Result<DataSet, ConfigError> {
    let unreadable = |message: String| ConfigError::SourceUnreadable {
        entity: entity.name.clone(),
        path: entity.source.display().to_string(),
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(&entity.source)
        .map_err(|e| unreadable(e.to_string()))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| unreadable(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for (position, result) in reader.records().enumerate() {
        let record = result.map_err(|e| unreadable(e.to_string()))?;
        records.push(SourceRecord::from_cells(position + 1, &columns, record.iter()));
    }

    debug!(
        entity = %entity.name,
        columns = columns.len(),
        rows = records.len(),
        "read source file"
    );
    Ok(DataSet::new(columns, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_core::{DataValue, EntityBuilder};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_read_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "id,name,city\n1,ana,rome\n2,,oslo\n3,carl\n").unwrap();
        let entity = EntityBuilder::new("people", file.path()).build();

        let dataset = read_source(&entity).unwrap();
        assert_eq!(dataset.columns(), ["id", "name", "city"]);
        assert_eq!(dataset.len(), 3);

        let records: Vec<_> = dataset.records().collect();
        assert_eq!(records[0].index, 1);
        assert_eq!(records[0].get("name"), Some(&DataValue::from("ana")));
        assert_eq!(records[1].get("name"), None);
        assert_eq!(records[2].get("city"), None);
    }

    #[test]
    fn test_missing_source_is_config_error() {
        let entity = EntityBuilder::new("people", "does/not/exist.csv").build();
        assert!(matches!(
            read_source(&entity),
            Err(ConfigError::SourceUnreadable { entity, .. }) if entity == "people"
        ));
    }

    #[test]
    fn test_header_only_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,name").unwrap();
        let entity = EntityBuilder::new("people", file.path()).build();

        let dataset = read_source(&entity).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(dataset.columns().len(), 2);
    }
}
