//! Strongly typed entity configuration.
//!
//! An [`Entity`] is built once per run from its [`EntityDefinition`] and is
//! immutable afterwards. Type names, keywords, patterns, defaults and rule
//! identifiers are all resolved here, so nothing in the per-row path looks
//! anything up by string.

use crate::{
    ConfigError, DataValue, EntityDefinition, FieldDefinition, FieldType, ProjectionDefinition,
    Result, RuleDefinition,
};
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// One named source-to-projections pipeline.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Entity name; also the name of the deduplicated relation
    pub name: String,

    /// Delimited source file
    pub source: PathBuf,

    /// Dedup and custom-validation behaviour
    pub settings: EntitySettings,

    /// Declared schema fields, in declaration order
    pub fields: Vec<FieldSpec>,

    /// Custom rules, in declaration order
    pub rules: Vec<CustomRuleSpec>,

    /// Projections, in declaration order
    pub projections: Vec<ProjectionSpec>,
}

impl Entity {
    /// Resolves a configuration section into an entity.
    pub fn resolve(name: &str, definition: &EntityDefinition) -> Result<Self> {
        let source = definition
            .source
            .as_deref()
            .ok_or_else(|| ConfigError::missing(name, "source"))?;
        let settings = definition
            .settings
            .as_ref()
            .ok_or_else(|| ConfigError::missing(name, "settings"))?;
        let validations = definition
            .validations
            .as_ref()
            .ok_or_else(|| ConfigError::missing(name, "validations"))?;

        let duplicate_resolution = settings
            .duplicate_resolution
            .as_deref()
            .ok_or_else(|| ConfigError::missing(name, "settings.duplicate_resolution"))?;
        let duplicate_resolution = DuplicateResolution::parse(duplicate_resolution).ok_or_else(
            || {
                ConfigError::invalid(
                    name,
                    "settings.duplicate_resolution",
                    format!("'{duplicate_resolution}' is not one of first, last, exclude_all"),
                )
            },
        )?;

        let mode = settings
            .custom_validation_mode
            .as_deref()
            .ok_or_else(|| ConfigError::missing(name, "settings.custom_validation_mode"))?;
        let custom_validation_mode = CustomValidationMode::parse(mode).ok_or_else(|| {
            ConfigError::invalid(
                name,
                "settings.custom_validation_mode",
                format!("'{mode}' is not one of stop, skip"),
            )
        })?;

        let fields = validations
            .schema
            .fields
            .iter()
            .map(|(field, def)| FieldSpec::resolve(name, field, def))
            .collect::<Result<Vec<_>>>()?;

        let rules = validations
            .custom
            .rules
            .iter()
            .map(|rule| CustomRuleSpec::resolve(name, rule))
            .collect::<Result<Vec<_>>>()?;

        let projections = definition
            .projections
            .iter()
            .map(|projection| ProjectionSpec::resolve(name, projection))
            .collect::<Result<Vec<_>>>()?;

        let entity = Entity {
            name: name.to_string(),
            source: PathBuf::from(source),
            settings: EntitySettings {
                duplicate_resolution,
                custom_validation_mode,
                unique_composite: settings.unique_composite.clone(),
            },
            fields,
            rules,
            projections,
        };
        entity.validate()?;

        Ok(entity)
    }

    /// Checks cross-field invariants that a builder cannot enforce.
    ///
    /// Projection names must be unique and must not shadow the relations the
    /// pipeline registers for the entity; every projection needs a query;
    /// composite keys must name at least one field. Rule and projection
    /// names become file names, so they may not contain path components.
    pub fn validate(&self) -> Result<()> {
        let reserved = [self.relation().to_string(), self.raw_relation()];
        let mut seen = HashSet::new();

        for rule in &self.rules {
            if !is_file_stem(&rule.name) {
                return Err(ConfigError::invalid(
                    &self.name,
                    "validations.custom.rules.name",
                    format!("'{}' cannot be used in a file name", rule.name),
                ));
            }
        }

        for projection in &self.projections {
            if !is_file_stem(&projection.name) {
                return Err(ConfigError::invalid(
                    &self.name,
                    "projections.name",
                    format!("'{}' cannot be used in a file name", projection.name),
                ));
            }
            if reserved.contains(&projection.name) {
                return Err(ConfigError::ReservedProjectionName {
                    entity: self.name.clone(),
                    name: projection.name.clone(),
                });
            }
            if !seen.insert(projection.name.as_str()) {
                return Err(ConfigError::DuplicateProjection {
                    entity: self.name.clone(),
                    name: projection.name.clone(),
                });
            }
            if projection.query.trim().is_empty() {
                return Err(ConfigError::EmptyQuery {
                    entity: self.name.clone(),
                    projection: projection.name.clone(),
                });
            }
        }

        if self
            .settings
            .unique_composite
            .iter()
            .any(|key| key.is_empty())
        {
            return Err(ConfigError::invalid(
                &self.name,
                "settings.unique_composite",
                "composite key must name at least one field",
            ));
        }

        Ok(())
    }

    /// Name of the deduplicated relation projections query from.
    pub fn relation(&self) -> &str {
        &self.name
    }

    /// Name of the relation holding loaded, not yet deduplicated rows.
    pub fn raw_relation(&self) -> String {
        format!("{}_raw", self.name)
    }

    /// Looks up a declared field.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Rebases a relative source path onto `base`, typically the directory
    /// holding the configuration file.
    pub fn with_source_base(mut self, base: &Path) -> Self {
        if self.source.is_relative() {
            self.source = base.join(&self.source);
        }
        self
    }
}

/// True if `name` can sit inside a single path component.
fn is_file_stem(name: &str) -> bool {
    !name.contains(['/', '\\']) && name != "." && name != ".."
}

/// Per-entity run settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySettings {
    /// Which row of a colliding group survives
    pub duplicate_resolution: DuplicateResolution,

    /// What a custom-rule failure does to the run
    pub custom_validation_mode: CustomValidationMode,

    /// Composite keys, applied in order
    pub unique_composite: Vec<Vec<String>>,
}

impl Default for EntitySettings {
    fn default() -> Self {
        Self {
            duplicate_resolution: DuplicateResolution::First,
            custom_validation_mode: CustomValidationMode::Stop,
            unique_composite: Vec::new(),
        }
    }
}

/// Duplicate resolution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateResolution {
    /// Keep the earliest row of each group
    First,
    /// Keep the latest row of each group
    Last,
    /// Remove every row of each group
    ExcludeAll,
}

impl DuplicateResolution {
    /// Parses a configuration keyword.
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword.trim() {
            "first" => Some(Self::First),
            "last" => Some(Self::Last),
            "exclude_all" => Some(Self::ExcludeAll),
            _ => None,
        }
    }
}

impl fmt::Display for DuplicateResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateResolution::First => f.write_str("first"),
            DuplicateResolution::Last => f.write_str("last"),
            DuplicateResolution::ExcludeAll => f.write_str("exclude_all"),
        }
    }
}

/// Custom validation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomValidationMode {
    /// First failing row aborts the run
    Stop,
    /// Failing rows are excluded and recorded
    Skip,
}

impl CustomValidationMode {
    /// Parses a configuration keyword.
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword.trim() {
            "stop" => Some(Self::Stop),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

impl fmt::Display for CustomValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomValidationMode::Stop => f.write_str("stop"),
            CustomValidationMode::Skip => f.write_str("skip"),
        }
    }
}

/// A declared schema field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Column name
    pub name: String,

    /// Declared type
    pub field_type: FieldType,

    /// Whether the field must be present
    pub required: bool,

    /// Typed default used when the field is absent
    pub default: Option<DataValue>,

    /// Compiled pattern the raw value must match
    pub pattern: Option<Regex>,

    /// Inclusive numeric lower bound
    pub min: Option<f64>,

    /// Inclusive numeric upper bound
    pub max: Option<f64>,
}

impl FieldSpec {
    fn resolve(entity: &str, name: &str, def: &FieldDefinition) -> Result<Self> {
        let field_type = match def.field_type.as_deref() {
            None => FieldType::Str,
            Some(type_name) => FieldType::parse(type_name).ok_or_else(|| {
                ConfigError::invalid(
                    entity,
                    format!("validations.schema.fields.{name}.type"),
                    format!("unknown type '{type_name}'"),
                )
            })?,
        };

        let pattern = def
            .pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| ConfigError::InvalidPattern {
                entity: entity.to_string(),
                field: name.to_string(),
                error: e.to_string(),
            })?;

        let default = def
            .default
            .as_ref()
            .filter(|value| !value.is_null())
            .map(|value| {
                field_type
                    .coerce_json(value)
                    .ok_or_else(|| ConfigError::InvalidDefault {
                        entity: entity.to_string(),
                        field: name.to_string(),
                        message: format!("{value} is not a valid {field_type}"),
                    })
            })
            .transpose()?;

        if (def.min.is_some() || def.max.is_some())
            && !matches!(field_type, FieldType::Int | FieldType::Float)
        {
            return Err(ConfigError::invalid(
                entity,
                format!("validations.schema.fields.{name}"),
                "min/max only apply to int and float fields",
            ));
        }

        Ok(FieldSpec {
            name: name.to_string(),
            field_type,
            required: def.required,
            default,
            pattern,
            min: def.min,
            max: def.max,
        })
    }
}

/// Built-in custom rule catalogue.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    /// Date field; age in whole years at the processing date must be at least `min_age`
    AgeGte {
        /// Minimum age in years
        min_age: u32,
    },
    /// Date field; age in whole years at the processing date must be at most `max_age`
    AgeLte {
        /// Maximum age in years
        max_age: u32,
    },
    /// Field's string form must be one of `values`
    OneOf {
        /// Accepted values
        values: Vec<String>,
    },
    /// Date field must not be after the processing date
    NotInFuture,
}

impl RuleKind {
    /// Resolves an identifier and its params into a rule.
    pub fn resolve(
        entity: &str,
        field: &str,
        identifier: &str,
        params: &BTreeMap<String, serde_json::Value>,
    ) -> Result<Self> {
        let years = |key: &str| -> Result<u32> {
            let value = params.get(key).ok_or_else(|| {
                ConfigError::rule_params(entity, identifier, format!("missing param '{key}'"))
            })?;
            value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| {
                    ConfigError::rule_params(
                        entity,
                        identifier,
                        format!("param '{key}' must be a non-negative integer, got {value}"),
                    )
                })
        };

        match identifier {
            "age_gte" => Ok(RuleKind::AgeGte {
                min_age: years("min_age")?,
            }),
            "age_lte" => Ok(RuleKind::AgeLte {
                max_age: years("max_age")?,
            }),
            "one_of" => {
                let values = params
                    .get("values")
                    .and_then(|v| v.as_array())
                    .ok_or_else(|| {
                        ConfigError::rule_params(entity, identifier, "param 'values' must be a list")
                    })?;
                let values = values
                    .iter()
                    .map(|v| match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                Ok(RuleKind::OneOf { values })
            }
            "not_in_future" => Ok(RuleKind::NotInFuture),
            other => Err(ConfigError::UnknownRule {
                entity: entity.to_string(),
                field: field.to_string(),
                rule: other.to_string(),
            }),
        }
    }

    /// Identifier as written in configuration.
    pub fn identifier(&self) -> &'static str {
        match self {
            RuleKind::AgeGte { .. } => "age_gte",
            RuleKind::AgeLte { .. } => "age_lte",
            RuleKind::OneOf { .. } => "one_of",
            RuleKind::NotInFuture => "not_in_future",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::AgeGte { min_age } => write!(f, "age_gte(min_age={min_age})"),
            RuleKind::AgeLte { max_age } => write!(f, "age_lte(max_age={max_age})"),
            RuleKind::OneOf { values } => write!(f, "one_of([{}])", values.join(", ")),
            RuleKind::NotInFuture => f.write_str("not_in_future"),
        }
    }
}

/// A custom rule bound to a field.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomRuleSpec {
    /// Rule name; names the error category and error file
    pub name: String,

    /// Field the rule checks
    pub field: String,

    /// Resolved predicate
    pub rule: RuleKind,
}

impl CustomRuleSpec {
    /// Binds a rule to a field, named after the rule identifier.
    pub fn new(field: impl Into<String>, rule: RuleKind) -> Self {
        Self {
            name: rule.identifier().to_string(),
            field: field.into(),
            rule,
        }
    }

    fn resolve(entity: &str, def: &RuleDefinition) -> Result<Self> {
        if def.field.trim().is_empty() {
            return Err(ConfigError::missing(entity, "validations.custom.rules.field"));
        }
        let rule = RuleKind::resolve(entity, &def.field, &def.validation, &def.params)?;

        Ok(CustomRuleSpec {
            name: def
                .name
                .clone()
                .unwrap_or_else(|| rule.identifier().to_string()),
            field: def.field.clone(),
            rule,
        })
    }
}

/// Projection target kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionKind {
    /// Persisted relation, exported to a file
    Table,
    /// Virtual relation, not exported
    View,
}

impl fmt::Display for ProjectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionKind::Table => f.write_str("table"),
            ProjectionKind::View => f.write_str("view"),
        }
    }
}

/// Where projection aliases apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasScope {
    /// Only the exported file's header is renamed
    #[default]
    Export,
    /// The relation itself carries the renamed columns
    Relation,
}

impl fmt::Display for AliasScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AliasScope::Export => f.write_str("export"),
            AliasScope::Relation => f.write_str("relation"),
        }
    }
}

/// A derived relation over the deduplicated entity relation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSpec {
    /// Relation name
    pub name: String,

    /// Table or view
    pub kind: ProjectionKind,

    /// SQL query
    pub query: String,

    /// Column renames, old name to new name
    pub aliases: IndexMap<String, String>,

    /// Where the renames apply
    pub alias_scope: AliasScope,
}

impl ProjectionSpec {
    fn resolve(entity: &str, def: &ProjectionDefinition) -> Result<Self> {
        if def.name.trim().is_empty() {
            return Err(ConfigError::missing(entity, "projections.name"));
        }
        let kind = match def.kind.trim() {
            "table" => ProjectionKind::Table,
            "view" => ProjectionKind::View,
            other => {
                return Err(ConfigError::invalid(
                    entity,
                    format!("projections.{}.type", def.name),
                    format!("'{other}' is not one of table, view"),
                ));
            }
        };
        let alias_scope = match def.alias_scope.as_deref().map(str::trim) {
            None | Some("export") => AliasScope::Export,
            Some("relation") => AliasScope::Relation,
            Some(other) => {
                return Err(ConfigError::invalid(
                    entity,
                    format!("projections.{}.alias_scope", def.name),
                    format!("'{other}' is not one of export, relation"),
                ));
            }
        };

        Ok(ProjectionSpec {
            name: def.name.clone(),
            kind,
            query: def.query.clone(),
            aliases: def.aliases.clone(),
            alias_scope,
        })
    }

    /// Column name as it appears after aliasing.
    pub fn output_name<'a>(&'a self, column: &'a str) -> &'a str {
        self.aliases.get(column).map(String::as_str).unwrap_or(column)
    }
}
