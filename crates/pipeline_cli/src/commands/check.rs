use anyhow::{bail, Context, Result};
use pipeline_core::{Entity, FieldSpec};
use pipeline_parser::parse_file;
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

use crate::output::{self, OutputFormat};

/// Resolves one entity, or every declared entity, without reading any data.
pub fn execute(config_path: &Path, entity: Option<&str>, format: OutputFormat) -> Result<()> {
    info!("Checking configuration: {}", config_path.display());

    let config = parse_file(config_path).with_context(|| {
        format!(
            "Failed to parse configuration file: {}",
            config_path.display()
        )
    })?;

    let names: Vec<&str> = match entity {
        Some(name) => vec![name],
        None => config.entity_names(),
    };
    if names.is_empty() {
        bail!("No entities declared in {}", config_path.display());
    }

    let mut reports = Vec::with_capacity(names.len());
    let mut invalid = 0;
    for name in names {
        match config.entity(name) {
            Ok(entity) => match format {
                OutputFormat::Text => print_entity(&entity),
                OutputFormat::Json => reports.push(entity_json(&entity)),
            },
            Err(e) => {
                invalid += 1;
                match format {
                    OutputFormat::Text => output::print_error(&format!("{name}: {e}")),
                    OutputFormat::Json => reports.push(json!({
                        "entity": name,
                        "valid": false,
                        "error": e.to_string(),
                    })),
                }
            }
        }
    }

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    if invalid > 0 {
        bail!("{invalid} entity configuration(s) are invalid");
    }
    Ok(())
}

fn print_entity(entity: &Entity) {
    output::print_success(&format!("Entity '{}' is valid", entity.name));

    println!("\nEntity Summary:");
    println!("  Name:        {}", entity.name);
    println!("  Source:      {}", entity.source.display());
    println!(
        "  Duplicates:  {}",
        entity.settings.duplicate_resolution
    );
    println!(
        "  Custom mode: {}",
        entity.settings.custom_validation_mode
    );
    if !entity.settings.unique_composite.is_empty() {
        let keys: Vec<String> = entity
            .settings
            .unique_composite
            .iter()
            .map(|key| format!("[{}]", key.join(", ")))
            .collect();
        println!("  Unique keys: {}", keys.join(" "));
    }

    println!("\nFields ({}):", entity.fields.len());
    for field in &entity.fields {
        println!("  {}", describe_field(field));
    }

    if !entity.rules.is_empty() {
        println!("\nCustom Rules:");
        for rule in &entity.rules {
            println!("  {} on {}: {}", rule.name, rule.field, rule.rule);
        }
    }

    if !entity.projections.is_empty() {
        println!("\nProjections:");
        for projection in &entity.projections {
            println!("  {} ({})", projection.name, projection.kind);
            if !projection.aliases.is_empty() {
                let aliases: Vec<String> = projection
                    .aliases
                    .iter()
                    .map(|(from, to)| format!("{from} → {to}"))
                    .collect();
                println!(
                    "    aliases ({}): {}",
                    projection.alias_scope,
                    aliases.join(", ")
                );
            }
        }
    }
    println!();
}

fn describe_field(field: &FieldSpec) -> String {
    let mut parts = vec![format!("{}: {}", field.name, field.field_type)];
    if field.required {
        parts.push("required".to_string());
    }
    if let Some(default) = &field.default {
        parts.push(format!("default={default}"));
    }
    if let Some(pattern) = &field.pattern {
        parts.push(format!("pattern={}", pattern.as_str()));
    }
    if let Some(min) = field.min {
        parts.push(format!("min={min}"));
    }
    if let Some(max) = field.max {
        parts.push(format!("max={max}"));
    }
    parts.join(", ")
}

fn entity_json(entity: &Entity) -> Value {
    json!({
        "entity": entity.name,
        "valid": true,
        "source": entity.source.display().to_string(),
        "duplicate_resolution": entity.settings.duplicate_resolution,
        "custom_validation_mode": entity.settings.custom_validation_mode,
        "unique_composite": entity.settings.unique_composite,
        "fields": entity.fields.iter().map(|f| json!({
            "name": f.name,
            "type": f.field_type.to_string(),
            "required": f.required,
        })).collect::<Vec<_>>(),
        "rules": entity.rules.iter().map(|r| json!({
            "name": r.name,
            "field": r.field,
            "rule": r.rule.to_string(),
        })).collect::<Vec<_>>(),
        "projections": entity.projections.iter().map(|p| json!({
            "name": p.name,
            "type": p.kind,
            "aliases": p.aliases,
            "alias_scope": p.alias_scope,
        })).collect::<Vec<_>>(),
    })
}
