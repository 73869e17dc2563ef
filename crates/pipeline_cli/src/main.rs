mod commands;
mod output;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use output::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "etl")]
#[command(
    version,
    about = "Validate, deduplicate and project tabular data from a configuration file",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for one entity, or for every entity with --all
    Run {
        /// Entity name as declared under `transformations_config`
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        entity: Option<String>,

        /// Run every declared entity, one after another
        #[arg(long)]
        all: bool,

        /// Path to the configuration file (YAML or TOML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Directory receiving `errors/` and `exports/`
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Output format: text, json
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Date age and future-date rules measure against (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        processing_date: Option<NaiveDate>,
    },

    /// Check entity configuration without reading any data
    Check {
        /// Entity to check (defaults to every declared entity)
        entity: Option<String>,

        /// Path to the configuration file (YAML or TOML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Output format: text, json
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    // Execute command
    match cli.command {
        Commands::Run {
            entity,
            all,
            config,
            output_dir,
            format,
            processing_date,
        } => {
            let request = commands::run::RunRequest {
                entity,
                all,
                config,
                output_dir,
                processing_date,
            };
            commands::run::execute(request, format).await
        }

        Commands::Check {
            entity,
            config,
            format,
        } => commands::check::execute(&config, entity.as_deref(), format),
    }
}
