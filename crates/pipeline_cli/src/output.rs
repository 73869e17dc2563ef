use anyhow::Result;
use clap::ValueEnum;
use colored::*;
use pipeline_core::RunSummary;

/// Console output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn print_run_summaries(summaries: &[RunSummary], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json_summaries(summaries),
        OutputFormat::Text => {
            for summary in summaries {
                print_text_summary(summary);
            }
            Ok(())
        }
    }
}

fn print_text_summary(summary: &RunSummary) {
    println!("\n{}", "═".repeat(60));
    println!("{}", format!("  RUN SUMMARY: {}", summary.entity).bold());
    println!("{}", "═".repeat(60));

    if summary.passed() {
        println!("\n{} {}", "✓".green().bold(), "Run DONE".green().bold());
    } else {
        println!("\n{} {}", "✗".red().bold(), "Run FAILED".red().bold());
        if let Some(reason) = &summary.failure {
            println!("  {}", reason.red());
        }
    }

    println!("\n{}", "Rows:".bold());
    println!("  Total rows processed:       {}", summary.rows_processed);
    println!("  Valid rows:                 {}", summary.rows_valid);
    println!("  Rows with schema errors:    {}", summary.schema_errors);
    println!("  Rows with custom errors:    {}", summary.custom_errors);
    println!("  Duplicates removed:         {}", summary.duplicates_removed);
    println!("  Rows after deduplication:   {}", summary.rows_deduplicated);

    if !summary.projections.is_empty() {
        println!("\n{}", "Projections:".bold());
        for projection in &summary.projections {
            let target = projection
                .export_path
                .as_ref()
                .map(|p| format!(" → {}", p.display()))
                .unwrap_or_default();
            println!(
                "  {} ({}): {} rows{}",
                projection.name, projection.kind, projection.rows, target
            );
        }
    }

    if !summary.error_files.is_empty() {
        println!("\n{}", "Error files:".yellow().bold());
        for path in &summary.error_files {
            println!("  {}", path.display().to_string().yellow());
        }
    }

    println!("{}", "═".repeat(60));
}

fn print_json_summaries(summaries: &[RunSummary]) -> Result<()> {
    let output = if let [summary] = summaries {
        serde_json::to_string_pretty(summary)?
    } else {
        serde_json::to_string_pretty(summaries)?
    };
    println!("{output}");
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}
