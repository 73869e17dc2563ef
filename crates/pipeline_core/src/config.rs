//! Configuration file structures.
//!
//! These types mirror the configuration file one-to-one and stay loosely
//! typed: every key that an operator may forget is optional, type names and
//! keywords are plain strings. [`PipelineConfig::entity`] turns one entity
//! section into the strongly typed [`Entity`] the pipeline runs on, and is
//! the only place configuration mistakes are detected.

use crate::{ConfigError, Entity, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root of a pipeline configuration file.
///
/// ```rust
/// use pipeline_core::{EntityDefinition, PipelineConfig};
///
/// let mut config = PipelineConfig::default();
/// config
///     .transformations_config
///     .insert("employees".to_string(), EntityDefinition::default());
///
/// assert_eq!(config.entity_names(), vec!["employees"]);
/// // No source, settings or validations yet
/// assert!(config.entity("employees").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Entity name to entity definition, in declaration order
    #[serde(default)]
    pub transformations_config: IndexMap<String, EntityDefinition>,
}

impl PipelineConfig {
    /// Names of all declared entities, in declaration order.
    pub fn entity_names(&self) -> Vec<&str> {
        self.transformations_config
            .keys()
            .map(String::as_str)
            .collect()
    }

    /// Resolves one entity section into a validated [`Entity`].
    pub fn entity(&self, name: &str) -> Result<Entity> {
        let definition = self
            .transformations_config
            .get(name)
            .ok_or_else(|| ConfigError::UnknownEntity(name.to_string()))?;

        Entity::resolve(name, definition)
    }
}

/// One entity section as written in the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Path to the delimited source file
    pub source: Option<String>,

    /// Run settings
    pub settings: Option<SettingsDefinition>,

    /// Derived tables and views
    #[serde(default)]
    pub projections: Vec<ProjectionDefinition>,

    /// Schema and custom validations
    pub validations: Option<ValidationsDefinition>,
}

/// `settings` block of an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsDefinition {
    /// `first`, `last` or `exclude_all`
    pub duplicate_resolution: Option<String>,

    /// `stop` or `skip`
    pub custom_validation_mode: Option<String>,

    /// Composite keys, each an ordered list of field names
    #[serde(default)]
    pub unique_composite: Vec<Vec<String>>,
}

/// One entry of `projections`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectionDefinition {
    /// Relation name, unique per entity
    pub name: String,

    /// `table` or `view`
    #[serde(rename = "type")]
    pub kind: String,

    /// SQL query over the deduplicated entity relation
    #[serde(default)]
    pub query: String,

    /// Column renames, old name to new name
    #[serde(default)]
    pub aliases: IndexMap<String, String>,

    /// `export` (default) or `relation`
    pub alias_scope: Option<String>,
}

/// `validations` block of an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationsDefinition {
    /// Declarative field checks
    #[serde(default)]
    pub schema: SchemaDefinition,

    /// Named rule checks
    #[serde(default)]
    pub custom: CustomDefinition,
}

/// `validations.schema` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Field name to field checks, in declaration order
    #[serde(default)]
    pub fields: IndexMap<String, FieldDefinition>,
}

/// Checks declared for one field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Type name; `str` when omitted
    #[serde(rename = "type")]
    pub field_type: Option<String>,

    /// Whether the field must be present
    #[serde(default)]
    pub required: bool,

    /// Value used when the field is absent
    pub default: Option<serde_json::Value>,

    /// Regex the raw value must match
    pub pattern: Option<String>,

    /// Inclusive lower bound for numeric fields
    pub min: Option<f64>,

    /// Inclusive upper bound for numeric fields
    pub max: Option<f64>,
}

/// `validations.custom` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomDefinition {
    /// Rules applied in declaration order
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

/// One custom rule entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Field the rule applies to
    pub field: String,

    /// Rule identifier, e.g. `age_gte`
    pub validation: String,

    /// Optional name; defaults to the identifier
    pub name: Option<String>,

    /// Rule parameters
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}
