use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use pipeline_engine::{run_all, DataFusionEngine, RunOptions};
use pipeline_parser::parse_file;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::output::{self, OutputFormat};

/// Arguments of the `run` subcommand.
pub struct RunRequest {
    pub entity: Option<String>,
    pub all: bool,
    pub config: PathBuf,
    pub output_dir: PathBuf,
    pub processing_date: Option<NaiveDate>,
}

pub async fn execute(request: RunRequest, format: OutputFormat) -> Result<()> {
    info!("Loading configuration: {}", request.config.display());

    let config = parse_file(&request.config).with_context(|| {
        format!(
            "Failed to parse configuration file: {}",
            request.config.display()
        )
    })?;
    let config_dir = config_dir(&request.config);

    let names: Vec<&str> = if request.all {
        config.entity_names()
    } else {
        request.entity.as_deref().into_iter().collect()
    };
    if names.is_empty() {
        bail!(
            "No entities declared in {}",
            request.config.display()
        );
    }

    let processing_date = request
        .processing_date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let options = RunOptions::new(&request.output_dir, processing_date);
    info!(
        "Processing date: {}, output directory: {}",
        processing_date,
        request.output_dir.display()
    );

    if format == OutputFormat::Text {
        output::print_info(&format!("Running {}", names.join(", ")));
    }
    let summaries = run_all(
        &config,
        &names,
        &config_dir,
        &options,
        DataFusionEngine::new,
    )
    .await;

    output::print_run_summaries(&summaries, format)?;

    if summaries.iter().any(|s| !s.passed()) {
        std::process::exit(1);
    }

    Ok(())
}

/// Directory relative source paths resolve against.
fn config_dir(config: &Path) -> PathBuf {
    match config.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
