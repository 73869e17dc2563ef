//! Parser for pipeline configuration files (YAML/TOML formats).
//!
//! This module provides functionality to parse pipeline configurations from YAML and
//! TOML files into the [`PipelineConfig`] structure. Parsing only checks the shape of
//! the file; resolving an entity with [`PipelineConfig::entity`] checks its meaning.
//!
//! # Example
//!
//! ```rust
//! use pipeline_parser::parse_yaml;
//!
//! let yaml = r#"
//! transformations_config:
//!   employees:
//!     source: data/employees.csv
//!     settings:
//!       duplicate_resolution: first
//!       custom_validation_mode: skip
//!       unique_composite:
//!         - [employee_id]
//!     validations:
//!       schema:
//!         fields:
//!           employee_id:
//!             type: int
//!             required: true
//! "#;
//!
//! let config = parse_yaml(yaml).expect("Failed to parse configuration");
//! let entity = config.entity("employees").expect("Failed to resolve entity");
//! assert_eq!(entity.fields.len(), 1);
//! ```

use pipeline_core::PipelineConfig;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration parsing.
#[derive(Debug, Error)]
pub enum ParserError {
    /// YAML parsing or deserialization failed
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),

    /// TOML parsing or deserialization failed
    #[error("Failed to parse TOML: {0}")]
    TomlError(String),

    /// File I/O error
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unsupported file format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Invalid file extension
    #[error("Invalid or missing file extension")]
    InvalidExtension,
}

/// Result type alias for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format (.yml, .yaml)
    Yaml,
    /// TOML format (.toml)
    Toml,
}

/// Parse a configuration from a YAML string.
pub fn parse_yaml(content: &str) -> Result<PipelineConfig> {
    let config: PipelineConfig = serde_yaml_ng::from_str(content)?;
    Ok(config)
}

/// Parse a configuration from a TOML string.
///
/// # Example
///
/// ```rust
/// use pipeline_parser::parse_toml;
///
/// let toml = r#"
/// [transformations_config.orders]
/// source = "orders.csv"
///
/// [transformations_config.orders.settings]
/// duplicate_resolution = "last"
/// custom_validation_mode = "stop"
/// unique_composite = [["order_id"]]
///
/// [transformations_config.orders.validations.schema.fields.order_id]
/// type = "int"
/// required = true
/// "#;
///
/// let config = parse_toml(toml).unwrap();
/// assert_eq!(config.entity_names(), vec!["orders"]);
/// ```
pub fn parse_toml(content: &str) -> Result<PipelineConfig> {
    let config: PipelineConfig =
        toml::from_str(content).map_err(|e| ParserError::TomlError(e.to_string()))?;
    Ok(config)
}

/// Detect the configuration format from a file path based on its extension.
///
/// # Supported Extensions
///
/// * `.yaml`, `.yml` → `ConfigFormat::Yaml`
/// * `.toml` → `ConfigFormat::Toml`
///
/// # Errors
///
/// Returns `ParserError::InvalidExtension` if the file has no extension.
/// Returns `ParserError::UnsupportedFormat` if the extension is not recognized.
pub fn detect_format(path: &Path) -> Result<ConfigFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or(ParserError::InvalidExtension)?;

    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(ConfigFormat::Yaml),
        "toml" => Ok(ConfigFormat::Toml),
        other => Err(ParserError::UnsupportedFormat(other.to_string())),
    }
}

/// Parse a configuration from a file with automatic format detection.
///
/// ```no_run
/// use pipeline_parser::parse_file;
/// use std::path::Path;
///
/// let config = parse_file(Path::new("config.yaml")).unwrap();
/// println!("Entities: {:?}", config.entity_names());
/// ```
pub fn parse_file(path: &Path) -> Result<PipelineConfig> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        ConfigFormat::Yaml => parse_yaml(&content),
        ConfigFormat::Toml => parse_toml(&content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_core::{
        AliasScope, ConfigError, CustomValidationMode, DataValue, DuplicateResolution, FieldType,
        ProjectionKind, RuleKind,
    };
    use pretty_assertions::assert_eq;

    const EMPLOYEES: &str = r#"
transformations_config:
  employees:
    source: data/employees.csv
    settings:
      duplicate_resolution: last
      custom_validation_mode: skip
      unique_composite:
        - [employee_id]
        - [email, company_id]
    projections:
      - name: employees_by_company
        type: table
        query: SELECT company_id, COUNT(*) AS headcount FROM employees GROUP BY company_id
        aliases:
          headcount: total
      - name: adults
        type: view
        query: SELECT * FROM employees
    validations:
      schema:
        fields:
          employee_id:
            type: int
            required: true
          email:
            type: str
            pattern: ^[^@]+@[^@]+$
          salary:
            type: float
            min: 0
          pt_contract_type_id:
            type: int
            default: 0
      custom:
        rules:
          - field: birthday_on
            validation: age_gte
            params:
              min_age: 18
"#;

    #[test]
    fn test_parse_full_yaml() {
        let config = parse_yaml(EMPLOYEES).expect("Failed to parse YAML");
        let entity = config.entity("employees").expect("Failed to resolve");

        assert_eq!(
            entity.settings.duplicate_resolution,
            DuplicateResolution::Last
        );
        assert_eq!(
            entity.settings.custom_validation_mode,
            CustomValidationMode::Skip
        );
        assert_eq!(
            entity.settings.unique_composite,
            vec![
                vec!["employee_id".to_string()],
                vec!["email".to_string(), "company_id".to_string()],
            ]
        );

        let names: Vec<&str> = entity.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["employee_id", "email", "salary", "pt_contract_type_id"]
        );
        assert_eq!(entity.fields[2].field_type, FieldType::Float);
        assert_eq!(entity.fields[2].min, Some(0.0));
        assert_eq!(entity.fields[3].default, Some(DataValue::Int(0)));
        assert!(entity.fields[1].pattern.is_some());

        assert_eq!(entity.rules.len(), 1);
        assert_eq!(entity.rules[0].rule, RuleKind::AgeGte { min_age: 18 });

        assert_eq!(entity.projections.len(), 2);
        assert_eq!(entity.projections[0].kind, ProjectionKind::Table);
        assert_eq!(entity.projections[0].aliases["headcount"], "total");
        assert_eq!(entity.projections[0].alias_scope, AliasScope::Export);
        assert_eq!(entity.projections[1].kind, ProjectionKind::View);
    }

    #[test]
    fn test_parse_yaml_missing_required_settings() {
        let yaml = r#"
transformations_config:
  employees:
    source: data/employees.csv
    settings:
      duplicate_resolution: first
    validations: {}
"#;

        let config = parse_yaml(yaml).expect("Shape is valid");
        assert_eq!(
            config.entity("employees").unwrap_err(),
            ConfigError::missing("employees", "settings.custom_validation_mode")
        );
    }

    #[test]
    fn test_parse_yaml_missing_entity() {
        let config = parse_yaml(EMPLOYEES).unwrap();
        assert!(matches!(
            config.entity("nonexistent_entity"),
            Err(ConfigError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let invalid_yaml = r#"
transformations_config:
  employees:
    projections: not-a-list
"#;

        let result = parse_yaml(invalid_yaml);
        assert!(matches!(result.unwrap_err(), ParserError::YamlError(_)));
    }

    #[test]
    fn test_parse_toml_with_rules() {
        let toml = r#"
[transformations_config.employees]
source = "employees.csv"

[transformations_config.employees.settings]
duplicate_resolution = "exclude_all"
custom_validation_mode = "stop"

[transformations_config.employees.validations.schema.fields.name]
required = true

[[transformations_config.employees.validations.custom.rules]]
field = "department"
validation = "one_of"
name = "known_department"
params = { values = ["sales", "ops"] }

[[transformations_config.employees.projections]]
name = "all_rows"
type = "view"
query = "SELECT * FROM employees"
"#;

        let config = parse_toml(toml).expect("Failed to parse TOML");
        let entity = config.entity("employees").unwrap();

        assert_eq!(
            entity.settings.duplicate_resolution,
            DuplicateResolution::ExcludeAll
        );
        assert_eq!(entity.fields[0].field_type, FieldType::Str);
        assert!(entity.fields[0].required);
        assert_eq!(entity.rules[0].name, "known_department");
        assert_eq!(
            entity.rules[0].rule,
            RuleKind::OneOf {
                values: vec!["sales".into(), "ops".into()]
            }
        );
    }

    #[test]
    fn test_parse_invalid_toml() {
        let invalid_toml = r#"
[transformations_config.employees
source = "x"
"#;

        let result = parse_toml(invalid_toml);
        assert!(matches!(result.unwrap_err(), ParserError::TomlError(_)));
    }

    #[test]
    fn test_detect_format_yaml() {
        assert_eq!(
            detect_format(Path::new("config.yaml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            detect_format(Path::new("config.yml")).unwrap(),
            ConfigFormat::Yaml
        );
    }

    #[test]
    fn test_detect_format_toml() {
        assert_eq!(
            detect_format(Path::new("config.toml")).unwrap(),
            ConfigFormat::Toml
        );
    }

    #[test]
    fn test_detect_format_unsupported() {
        assert!(matches!(
            detect_format(Path::new("config.json")).unwrap_err(),
            ParserError::UnsupportedFormat(_)
        ));
    }

    #[test]
    fn test_detect_format_no_extension() {
        assert!(matches!(
            detect_format(Path::new("config")).unwrap_err(),
            ParserError::InvalidExtension
        ));
    }

    #[test]
    fn test_parse_file_missing() {
        let result = parse_file(Path::new("does/not/exist.yaml"));
        assert!(matches!(result.unwrap_err(), ParserError::IoError(_)));
    }

    #[test]
    fn test_entities_keep_declaration_order() {
        let yaml = r#"
transformations_config:
  zeta: {}
  alpha: {}
"#;
        let config = parse_yaml(yaml).unwrap();
        assert_eq!(config.entity_names(), vec!["zeta", "alpha"]);
    }
}
