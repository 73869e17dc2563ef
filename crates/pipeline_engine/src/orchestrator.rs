//! Per-entity pipeline orchestration.
//!
//! A run walks `Loading → SchemaValidating → CustomValidating → Loaded →
//! Deduplicating → Projecting → Done`, or drops to `Failed` on a fatal
//! condition. Whatever the outcome, error files are flushed and the
//! [`RunSummary`] reflects everything accumulated up to that point.

use crate::converter::{Column, layout};
use crate::export::write_error_files;
use crate::projection::ProjectionMaterializer;
use crate::query::QueryEngine;
use crate::source::read_source;
use crate::PipelineError;
use chrono::NaiveDate;
use pipeline_core::{
    ConfigError, Entity, ErrorCategory, ErrorLog, PipelineConfig, RunState, RunSummary,
};
use pipeline_validator::{Deduplicator, RuleEngine, SchemaValidator};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Options shared by every run of a pipeline.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Root of `errors/` and `exports/`
    pub output_dir: PathBuf,

    /// Date ages and "future" are measured against
    pub processing_date: NaiveDate,
}

impl RunOptions {
    /// Creates options measuring dates against `processing_date`.
    pub fn new(output_dir: impl Into<PathBuf>, processing_date: NaiveDate) -> Self {
        Self {
            output_dir: output_dir.into(),
            processing_date,
        }
    }

    /// Directory holding error files.
    pub fn errors_dir(&self) -> PathBuf {
        self.output_dir.join("errors")
    }

    /// Directory holding projection exports.
    pub fn exports_dir(&self) -> PathBuf {
        self.output_dir.join("exports")
    }
}

/// Runs entities against a query engine.
pub struct Pipeline<E: QueryEngine> {
    engine: E,
    options: RunOptions,
}

impl<E: QueryEngine> Pipeline<E> {
    /// Creates a pipeline over `engine`.
    pub fn new(engine: E, options: RunOptions) -> Self {
        Self { engine, options }
    }

    /// The engine, e.g. to query projections after a run.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Runs one entity to a terminal state.
    pub async fn run(&self, entity: &Entity) -> RunSummary {
        let mut run = Run {
            summary: RunSummary::new(&entity.name),
            log: ErrorLog::new(),
        };
        info!(entity = %entity.name, source = %entity.source.display(), "starting run");

        let outcome = self.run_stages(entity, &mut run).await;

        match write_error_files(&self.options.errors_dir(), entity, &run.log) {
            Ok(paths) => run.summary.error_files = paths,
            Err(e) => {
                error!(entity = %entity.name, error = %e, "failed to write error files");
                if outcome.is_ok() {
                    run.fail(e.into());
                    return run.summary;
                }
            }
        }

        match outcome {
            Ok(()) => {
                run.summary.state = RunState::Done;
                info!(
                    entity = %entity.name,
                    rows = run.summary.rows_processed,
                    valid = run.summary.rows_valid,
                    deduplicated = run.summary.rows_deduplicated,
                    "run complete"
                );
            }
            Err(e) => {
                error!(entity = %entity.name, state = %run.summary.state, error = %e, "run failed");
                run.fail(e);
            }
        }

        run.summary
    }

    async fn run_stages(&self, entity: &Entity, run: &mut Run) -> Result<(), PipelineError> {
        let materializer =
            ProjectionMaterializer::new(&self.engine, &entity.name, self.options.exports_dir());

        // Loading: nothing below runs unless configuration checks pass
        run.enter(RunState::Loading);
        let dataset = read_source(entity)?;
        let (header, records) = dataset.into_parts();
        let columns = layout(entity, &header);
        check_keys(entity, &columns)?;
        self.register_empty(entity, &columns).await?;
        materializer.check(&entity.projections).await?;
        run.summary.rows_processed = records.len();

        run.enter(RunState::SchemaValidating);
        let schema = SchemaValidator::new(&entity.fields).validate(records, &entity.name);
        run.summary.schema_errors = schema.rejected;

        run.enter(RunState::CustomValidating);
        let custom = RuleEngine::new(&entity.rules, self.options.processing_date).run(
            schema.valid,
            &entity.name,
            entity.settings.custom_validation_mode,
        );
        run.summary.custom_errors = custom.rejected;
        run.summary.rows_valid = custom.passed.len();
        if let Some(row) = custom.halted_at {
            let rule = custom
                .errors
                .iter()
                .find_map(|e| match &e.category {
                    ErrorCategory::Custom(rule) => Some(rule.clone()),
                    _ => None,
                })
                .unwrap_or_default();
            // Rows after the halting row count as never processed
            let schema_errors: Vec<_> = schema
                .errors
                .into_iter()
                .filter(|e| e.row <= row)
                .collect();
            run.summary.schema_errors = schema_errors
                .iter()
                .map(|e| e.row)
                .collect::<BTreeSet<_>>()
                .len();
            run.log.extend(schema_errors);
            run.log.extend(custom.errors);
            run.summary.rows_processed = row;
            warn!(entity = %entity.name, row, "stopping at first custom validation failure");
            return Err(PipelineError::Halted {
                entity: entity.name.clone(),
                row,
                rule,
            });
        }
        run.log.extend(schema.errors);
        run.log.extend(custom.errors);

        run.enter(RunState::Loaded);
        self.engine
            .register_records(&entity.raw_relation(), &columns, &custom.passed)
            .await?;

        run.enter(RunState::Deduplicating);
        let dedup = Deduplicator::new(
            &entity.settings.unique_composite,
            entity.settings.duplicate_resolution,
        )
        .deduplicate(custom.passed, &entity.name);
        run.summary.duplicates_removed = dedup.removed.len();
        run.summary.rows_deduplicated = dedup.kept.len();
        run.log.extend(dedup.errors);
        self.engine
            .register_records(entity.relation(), &columns, &dedup.kept)
            .await?;

        run.enter(RunState::Projecting);
        for projection in &entity.projections {
            let summary = materializer.materialize(projection).await?;
            run.summary.projections.push(summary);
        }

        Ok(())
    }

    /// Registers both entity relations without rows, so projections can be
    /// planned against the entity's column layout.
    async fn register_empty(&self, entity: &Entity, columns: &[Column]) -> Result<(), PipelineError> {
        self.engine
            .register_records(&entity.raw_relation(), columns, &[])
            .await?;
        self.engine
            .register_records(entity.relation(), columns, &[])
            .await?;
        Ok(())
    }
}

/// Rejects composite-key fields the source header and schema both lack.
fn check_keys(entity: &Entity, columns: &[Column]) -> Result<(), ConfigError> {
    let unknown = entity
        .settings
        .unique_composite
        .iter()
        .flatten()
        .find(|field| !columns.iter().any(|c| &c.name == *field));

    match unknown {
        Some(field) => Err(ConfigError::invalid(
            &entity.name,
            "settings.unique_composite",
            format!("unknown field '{field}'"),
        )),
        None => Ok(()),
    }
}

/// Mutable state of one run.
struct Run {
    summary: RunSummary,
    log: ErrorLog,
}

impl Run {
    fn enter(&mut self, state: RunState) {
        info!(entity = %self.summary.entity, state = %state, "entering stage");
        self.summary.state = state;
    }

    fn fail(&mut self, error: PipelineError) {
        self.summary.failure = Some(error.to_string());
        self.summary.state = RunState::Failed;
    }
}

/// Runs the named entities of a configuration one after another.
///
/// Each entity gets its own engine from `new_engine`. An entity whose
/// configuration does not resolve yields a `Failed` summary; a failed
/// entity does not stop the rest.
pub async fn run_all<E, F>(
    config: &PipelineConfig,
    names: &[&str],
    config_dir: &Path,
    options: &RunOptions,
    mut new_engine: F,
) -> Vec<RunSummary>
where
    E: QueryEngine,
    F: FnMut() -> E,
{
    let mut summaries = Vec::with_capacity(names.len());
    for &name in names {
        let summary = match resolve_entity(config, name, config_dir) {
            Ok(entity) => {
                let pipeline = Pipeline::new(new_engine(), options.clone());
                pipeline.run(&entity).await
            }
            Err(e) => {
                warn!(entity = name, error = %e, "entity configuration does not resolve");
                let mut run = Run {
                    summary: RunSummary::new(name),
                    log: ErrorLog::new(),
                };
                run.fail(e);
                run.summary
            }
        };
        summaries.push(summary);
    }
    summaries
}

/// Resolves `name` from a parsed configuration and rebases its source on
/// `config_dir`.
pub fn resolve_entity(
    config: &PipelineConfig,
    name: &str,
    config_dir: &Path,
) -> Result<Entity, PipelineError> {
    Ok(config.entity(name)?.with_source_base(config_dir))
}
