//! Query engine capability and its DataFusion implementation.
//!
//! The pipeline only ever talks to the engine through [`QueryEngine`]:
//! register rows, plan or run a query, create a table or view from a
//! query, count a relation, export a relation to a file. It issues one
//! statement at a time and never shares a session between entity runs.

use crate::converter::{Column, batch_to_rows, records_to_batch};
use crate::{EngineError, Result};
use datafusion::datasource::MemTable;
use datafusion::execution::context::SQLOptions;
use datafusion::prelude::{DataFrame, SessionConfig, SessionContext};
use datafusion::sql::TableReference;
use pipeline_core::DataValue;
use pipeline_validator::SourceRecord;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Rows returned by a query, values in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Output column names
    pub columns: Vec<String>,
    /// Rows in result order
    pub rows: Vec<Vec<DataValue>>,
}

impl ResultSet {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the query produced no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, if present.
    pub fn column(&self, name: &str) -> Option<Vec<&DataValue>> {
        let position = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[position]).collect())
    }
}

/// Relational engine the pipeline delegates queries to.
#[allow(async_fn_in_trait)]
pub trait QueryEngine {
    /// Registers `records` as relation `name`, replacing any previous one.
    async fn register_records(
        &self,
        name: &str,
        columns: &[Column],
        records: &[SourceRecord],
    ) -> Result<()>;

    /// Output column names of a query, without running it.
    async fn output_columns(&self, query: &str) -> Result<Vec<String>>;

    /// Runs a read-only query.
    async fn execute(&self, query: &str) -> Result<ResultSet>;

    /// Creates a persisted table from a query.
    async fn create_table(&self, name: &str, query: &str) -> Result<()>;

    /// Creates a view over a query.
    async fn create_view(&self, name: &str, query: &str) -> Result<()>;

    /// Removes a relation if it exists.
    async fn drop_relation(&self, name: &str) -> Result<()>;

    /// Number of rows in a relation.
    async fn row_count(&self, name: &str) -> Result<usize>;

    /// Writes a relation to a CSV file under `header`; returns rows written.
    async fn export_relation(&self, name: &str, path: &Path, header: &[String]) -> Result<usize>;
}

/// Double-quotes an SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// [`QueryEngine`] over an in-memory DataFusion session.
pub struct DataFusionEngine {
    ctx: SessionContext,
}

impl DataFusionEngine {
    /// Creates an engine with a fresh session.
    ///
    /// A single partition keeps relations in the order rows were registered.
    /// Unquoted identifiers keep their case, so relations and columns named
    /// after mixed-case headers resolve as written.
    pub fn new() -> Self {
        let mut config = SessionConfig::new().with_target_partitions(1);
        config.options_mut().sql_parser.enable_ident_normalization = false;
        Self {
            ctx: SessionContext::new_with_config(config),
        }
    }

    /// Plans a query that may only read.
    async fn read_only(&self, query: &str) -> Result<DataFrame> {
        let options = SQLOptions::new()
            .with_allow_ddl(false)
            .with_allow_dml(false)
            .with_allow_statements(false);
        Ok(self.ctx.sql_with_options(query, options).await?)
    }

    async fn run_ddl(&self, statement: String) -> Result<()> {
        debug!(statement = %statement, "executing statement");
        self.ctx.sql(&statement).await?.collect().await?;
        Ok(())
    }
}

impl Default for DataFusionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryEngine for DataFusionEngine {
    async fn register_records(
        &self,
        name: &str,
        columns: &[Column],
        records: &[SourceRecord],
    ) -> Result<()> {
        let batch = records_to_batch(columns, records)?;
        let table = MemTable::try_new(batch.schema(), vec![vec![batch]])?;

        self.ctx.deregister_table(TableReference::bare(name))?;
        self.ctx
            .register_table(TableReference::bare(name), Arc::new(table))?;
        debug!(relation = name, rows = records.len(), "registered relation");
        Ok(())
    }

    async fn output_columns(&self, query: &str) -> Result<Vec<String>> {
        let frame = self.read_only(query).await?;
        Ok(frame
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect())
    }

    async fn execute(&self, query: &str) -> Result<ResultSet> {
        let frame = self.read_only(query).await?;
        let columns = frame
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();

        let mut rows = Vec::new();
        for batch in frame.collect().await? {
            rows.extend(batch_to_rows(&batch)?);
        }

        Ok(ResultSet { columns, rows })
    }

    async fn create_table(&self, name: &str, query: &str) -> Result<()> {
        self.run_ddl(format!("CREATE TABLE {} AS {query}", quote_ident(name)))
            .await
    }

    async fn create_view(&self, name: &str, query: &str) -> Result<()> {
        self.run_ddl(format!("CREATE VIEW {} AS {query}", quote_ident(name)))
            .await
    }

    async fn drop_relation(&self, name: &str) -> Result<()> {
        self.ctx.deregister_table(TableReference::bare(name))?;
        Ok(())
    }

    async fn row_count(&self, name: &str) -> Result<usize> {
        Ok(self.ctx.table(TableReference::bare(name)).await?.count().await?)
    }

    async fn export_relation(&self, name: &str, path: &Path, header: &[String]) -> Result<usize> {
        let batches = self
            .ctx
            .table(TableReference::bare(name))
            .await?
            .collect()
            .await?;

        let file = File::create(path).map_err(|e| EngineError::io(path, e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::new(file));
        writer.write_record(header)?;

        let mut written = 0;
        for batch in &batches {
            for row in batch_to_rows(batch)? {
                writer.write_record(row.iter().map(ToString::to_string))?;
                written += 1;
            }
        }
        writer.flush().map_err(|e| EngineError::io(path, e))?;

        debug!(relation = name, rows = written, path = %path.display(), "exported relation");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_core::FieldType;
    use pretty_assertions::assert_eq;

    fn columns() -> Vec<Column> {
        vec![
            Column {
                name: "id".into(),
                field_type: FieldType::Int,
            },
            Column {
                name: "city".into(),
                field_type: FieldType::Str,
            },
        ]
    }

    fn records() -> Vec<SourceRecord> {
        let header = vec!["city".to_string()];
        [(1, "rome"), (2, "oslo"), (3, "rome")]
            .into_iter()
            .map(|(id, city)| {
                let mut record = SourceRecord::from_cells(id as usize, &header, [city]);
                record.row.insert("id".into(), DataValue::Int(id));
                record
            })
            .collect()
    }

    async fn engine() -> DataFusionEngine {
        let engine = DataFusionEngine::new();
        engine
            .register_records("people", &columns(), &records())
            .await
            .unwrap();
        engine
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("people"), "\"people\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[tokio::test]
    async fn test_execute_returns_typed_rows() {
        let engine = engine().await;
        let result = engine
            .execute("SELECT id, city FROM people WHERE city = 'rome' ORDER BY id")
            .await
            .unwrap();

        assert_eq!(result.columns, vec!["id", "city"]);
        assert_eq!(
            result.rows,
            vec![
                vec![DataValue::Int(1), DataValue::String("rome".into())],
                vec![DataValue::Int(3), DataValue::String("rome".into())],
            ]
        );
        assert_eq!(
            result.column("id").unwrap(),
            vec![&DataValue::Int(1), &DataValue::Int(3)]
        );
    }

    #[tokio::test]
    async fn test_output_columns_does_not_need_rows() {
        let engine = DataFusionEngine::new();
        engine
            .register_records("people", &columns(), &[])
            .await
            .unwrap();

        let columns = engine
            .output_columns("SELECT city, COUNT(*) AS total FROM people GROUP BY city")
            .await
            .unwrap();
        assert_eq!(columns, vec!["city", "total"]);

        assert!(engine.output_columns("SELECT nope FROM people").await.is_err());
    }

    #[tokio::test]
    async fn test_execute_rejects_ddl() {
        let engine = engine().await;
        assert!(engine.execute("DROP TABLE people").await.is_err());
    }

    #[tokio::test]
    async fn test_register_replaces_relation() {
        let engine = engine().await;
        engine
            .register_records("people", &columns(), &records()[..1])
            .await
            .unwrap();
        assert_eq!(engine.row_count("people").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_tables_and_views() {
        let engine = engine().await;
        engine
            .create_table("romans", "SELECT * FROM people WHERE city = 'rome'")
            .await
            .unwrap();
        engine
            .create_view("oslo_people", "SELECT * FROM people WHERE city = 'oslo'")
            .await
            .unwrap();

        assert_eq!(engine.row_count("romans").await.unwrap(), 2);
        assert_eq!(engine.row_count("oslo_people").await.unwrap(), 1);

        engine.drop_relation("oslo_people").await.unwrap();
        assert!(engine.row_count("oslo_people").await.is_err());
    }

    #[tokio::test]
    async fn test_export_relation() {
        let engine = engine().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.csv");

        let header = vec!["person_id".to_string(), "city".to_string()];
        let written = engine
            .export_relation("people", &path, &header)
            .await
            .unwrap();

        assert_eq!(written, 3);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "person_id,city\n1,rome\n2,oslo\n3,rome\n");
    }

    #[tokio::test]
    async fn test_unquoted_identifiers_keep_case() {
        let engine = DataFusionEngine::new();
        let columns = vec![Column {
            name: "EmployeeID".into(),
            field_type: FieldType::Int,
        }];
        engine.register_records("Staff", &columns, &[]).await.unwrap();

        let output = engine
            .output_columns("SELECT EmployeeID FROM Staff")
            .await
            .unwrap();
        assert_eq!(output, vec!["EmployeeID"]);
    }
}
