//! Projection materialization.
//!
//! Projections are checked against the entity's column layout before any
//! row is read, then materialized in declaration order once the
//! deduplicated relation holds data. A later projection may select from an
//! earlier one.

use crate::query::{QueryEngine, quote_ident};
use crate::{EngineError, PipelineError};
use pipeline_core::{AliasScope, ConfigError, ProjectionKind, ProjectionSpec, ProjectionSummary};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Creates projection relations and exports tables.
pub struct ProjectionMaterializer<'a, E: QueryEngine> {
    engine: &'a E,
    entity: &'a str,
    exports_dir: PathBuf,
}

impl<'a, E: QueryEngine> ProjectionMaterializer<'a, E> {
    /// Creates a materializer writing exports to `exports_dir`.
    pub fn new(engine: &'a E, entity: &'a str, exports_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            entity,
            exports_dir: exports_dir.into(),
        }
    }

    /// Checks every projection against the currently registered relations.
    ///
    /// Each projection is planned, its aliases are checked against the
    /// columns it produces, and it is created as a temporary view so later
    /// projections can refer to it. The temporary views are dropped before
    /// returning.
    pub async fn check(&self, projections: &[ProjectionSpec]) -> Result<(), PipelineError> {
        let mut probes = Vec::new();
        let outcome = self.check_all(projections, &mut probes).await;

        for name in probes {
            self.engine.drop_relation(name).await?;
        }
        outcome
    }

    async fn check_all<'p>(
        &self,
        projections: &'p [ProjectionSpec],
        probes: &mut Vec<&'p str>,
    ) -> Result<(), PipelineError> {
        for projection in projections {
            let columns = self
                .engine
                .output_columns(&projection.query)
                .await
                .map_err(|e| ConfigError::InvalidProjectionQuery {
                    entity: self.entity.to_string(),
                    projection: projection.name.clone(),
                    message: e.to_string(),
                })?;

            if let Some(column) = projection.aliases.keys().find(|c| !columns.contains(c)) {
                return Err(ConfigError::UnknownAliasColumn {
                    entity: self.entity.to_string(),
                    projection: projection.name.clone(),
                    column: column.clone(),
                }
                .into());
            }

            let query = relation_query(projection, &columns);
            self.engine.create_view(&projection.name, &query).await?;
            probes.push(&projection.name);
            debug!(projection = %projection.name, columns = columns.len(), "projection checked");
        }
        Ok(())
    }

    /// Creates one projection and, for tables, exports it.
    pub async fn materialize(
        &self,
        projection: &ProjectionSpec,
    ) -> Result<ProjectionSummary, EngineError> {
        let columns = self.engine.output_columns(&projection.query).await?;
        let query = relation_query(projection, &columns);

        match projection.kind {
            ProjectionKind::Table => self.engine.create_table(&projection.name, &query).await?,
            ProjectionKind::View => self.engine.create_view(&projection.name, &query).await?,
        }
        let rows = self.engine.row_count(&projection.name).await?;

        let export_path = match projection.kind {
            ProjectionKind::Table => {
                let header: Vec<String> = columns
                    .iter()
                    .map(|c| projection.output_name(c).to_string())
                    .collect();
                let path = self.exports_dir.join(format!("{}.csv", projection.name));
                fs::create_dir_all(&self.exports_dir)
                    .map_err(|e| EngineError::io(&self.exports_dir, e))?;
                self.engine
                    .export_relation(&projection.name, &path, &header)
                    .await?;
                Some(path)
            }
            ProjectionKind::View => None,
        };

        info!(
            projection = %projection.name,
            kind = %projection.kind,
            rows,
            exported = export_path.is_some(),
            "projection materialized"
        );

        Ok(ProjectionSummary {
            name: projection.name.clone(),
            kind: projection.kind,
            rows,
            export_path,
        })
    }
}

/// Query the relation is created from.
///
/// With `relation` scope the declared query is wrapped in a renaming
/// projection; otherwise it is used as written.
pub fn relation_query(projection: &ProjectionSpec, columns: &[String]) -> String {
    if projection.alias_scope == AliasScope::Export || projection.aliases.is_empty() {
        return projection.query.clone();
    }

    let select: Vec<String> = columns
        .iter()
        .map(|column| match projection.aliases.get(column) {
            Some(alias) => format!("{} AS {}", quote_ident(column), quote_ident(alias)),
            None => quote_ident(column),
        })
        .collect();

    let inner = projection.query.trim().trim_end_matches(';');
    format!("SELECT {} FROM ({inner}) AS projected", select.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_core::ProjectionBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_export_scope_keeps_query() {
        let projection = ProjectionBuilder::table("by_city", "SELECT city FROM people")
            .alias("city", "town")
            .build();
        assert_eq!(
            relation_query(&projection, &["city".to_string()]),
            "SELECT city FROM people"
        );
    }

    #[test]
    fn test_relation_scope_wraps_query() {
        let projection = ProjectionBuilder::table("by_city", "SELECT id, city FROM people;")
            .alias("city", "town")
            .alias_scope(AliasScope::Relation)
            .build();
        assert_eq!(
            relation_query(&projection, &["id".to_string(), "city".to_string()]),
            r#"SELECT "id", "city" AS "town" FROM (SELECT id, city FROM people) AS projected"#
        );
    }
}
