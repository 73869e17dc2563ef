//! Error file output.
//!
//! One CSV file per error category that recorded at least one error, under
//! `<output>/errors/`. Files of categories that stayed empty in this run
//! are removed so a directory never mixes results of two runs.

use crate::{EngineError, Result};
use pipeline_core::{Entity, ErrorCategory, ErrorLog};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Header of every error file.
pub const ERROR_FILE_HEADER: [&str; 3] = ["row", "field", "error"];

/// Every category an entity can produce, in reporting order.
pub fn categories(entity: &Entity) -> Vec<ErrorCategory> {
    let mut categories = vec![ErrorCategory::Schema];
    for rule in &entity.rules {
        let category = ErrorCategory::Custom(rule.name.clone());
        if !categories.contains(&category) {
            categories.push(category);
        }
    }
    categories.push(ErrorCategory::Duplicate);
    categories
}

/// Writes the error files of one run; returns the paths written.
pub fn write_error_files(dir: &Path, entity: &Entity, log: &ErrorLog) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| EngineError::io(dir, e))?;

    let mut written = Vec::new();
    for category in categories(entity) {
        let path = dir.join(category.file_name(&entity.name));
        let records = log.of(&category);

        if records.is_empty() {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| EngineError::io(&path, e))?;
                debug!(path = %path.display(), "removed stale error file");
            }
            continue;
        }

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(ERROR_FILE_HEADER)?;
        for record in &records {
            writer.write_record([
                record.row.to_string(),
                record.field.clone().unwrap_or_default(),
                record.detail.clone(),
            ])?;
        }
        writer.flush().map_err(|e| EngineError::io(&path, e))?;

        info!(
            category = %category,
            errors = records.len(),
            path = %path.display(),
            "wrote error file"
        );
        written.push(path);
    }

    Ok(written)
}
