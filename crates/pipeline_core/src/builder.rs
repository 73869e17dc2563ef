//! Builder pattern for creating entities.
//!
//! This module provides ergonomic builders for constructing entities
//! and their components in code, bypassing configuration files.

use crate::{
    AliasScope, CustomRuleSpec, CustomValidationMode, DataValue, DuplicateResolution, Entity,
    EntitySettings, FieldSpec, FieldType, ProjectionKind, ProjectionSpec, Result, RuleKind,
};
use indexmap::IndexMap;
use regex::Regex;
use std::path::PathBuf;

/// Builder for creating an [`Entity`].
///
/// # Example
///
/// ```rust
/// use pipeline_core::{
///     DuplicateResolution, EntityBuilder, FieldSpecBuilder, FieldType, ProjectionBuilder,
/// };
///
/// let entity = EntityBuilder::new("employees", "data/employees.csv")
///     .duplicate_resolution(DuplicateResolution::Last)
///     .unique_composite(["employee_id"])
///     .field(FieldSpecBuilder::new("employee_id", FieldType::Int).required(true).build())
///     .projection(ProjectionBuilder::table("all_employees", "SELECT * FROM employees").build())
///     .try_build()
///     .unwrap();
///
/// assert_eq!(entity.raw_relation(), "employees_raw");
/// ```
#[derive(Debug)]
pub struct EntityBuilder {
    name: String,
    source: PathBuf,
    settings: EntitySettings,
    fields: Vec<FieldSpec>,
    rules: Vec<CustomRuleSpec>,
    projections: Vec<ProjectionSpec>,
}

impl EntityBuilder {
    /// Creates a new entity builder.
    ///
    /// Settings default to `first` resolution and `stop` mode, with no
    /// composite keys.
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            settings: EntitySettings::default(),
            fields: Vec::new(),
            rules: Vec::new(),
            projections: Vec::new(),
        }
    }

    /// Sets the duplicate resolution policy.
    pub fn duplicate_resolution(mut self, policy: DuplicateResolution) -> Self {
        self.settings.duplicate_resolution = policy;
        self
    }

    /// Sets the custom validation mode.
    pub fn custom_validation_mode(mut self, mode: CustomValidationMode) -> Self {
        self.settings.custom_validation_mode = mode;
        self
    }

    /// Appends a composite key.
    pub fn unique_composite<I, S>(mut self, key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings
            .unique_composite
            .push(key.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a schema field.
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a custom rule on a field.
    pub fn rule(mut self, field: impl Into<String>, rule: RuleKind) -> Self {
        self.rules.push(CustomRuleSpec::new(field, rule));
        self
    }

    /// Adds a projection.
    pub fn projection(mut self, projection: ProjectionSpec) -> Self {
        self.projections.push(projection);
        self
    }

    /// Builds the entity without cross-field checks.
    pub fn build(self) -> Entity {
        Entity {
            name: self.name,
            source: self.source,
            settings: self.settings,
            fields: self.fields,
            rules: self.rules,
            projections: self.projections,
        }
    }

    /// Builds the entity and runs [`Entity::validate`].
    pub fn try_build(self) -> Result<Entity> {
        let entity = self.build();
        entity.validate()?;
        Ok(entity)
    }
}

/// Builder for creating a [`FieldSpec`].
#[derive(Debug)]
pub struct FieldSpecBuilder {
    name: String,
    field_type: FieldType,
    required: bool,
    default: Option<DataValue>,
    pattern: Option<Regex>,
    min: Option<f64>,
    max: Option<f64>,
}

impl FieldSpecBuilder {
    /// Creates a new optional field of the given type.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            default: None,
            pattern: None,
            min: None,
            max: None,
        }
    }

    /// Sets whether the field is required.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the default value.
    pub fn default_value(mut self, value: impl Into<DataValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the pattern.
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Sets the inclusive numeric range.
    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Builds the field spec.
    pub fn build(self) -> FieldSpec {
        FieldSpec {
            name: self.name,
            field_type: self.field_type,
            required: self.required,
            default: self.default,
            pattern: self.pattern,
            min: self.min,
            max: self.max,
        }
    }
}

/// Builder for creating a [`ProjectionSpec`].
#[derive(Debug)]
pub struct ProjectionBuilder {
    name: String,
    kind: ProjectionKind,
    query: String,
    aliases: IndexMap<String, String>,
    alias_scope: AliasScope,
}

impl ProjectionBuilder {
    /// Creates a table projection.
    pub fn table(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self::new(name, ProjectionKind::Table, query)
    }

    /// Creates a view projection.
    pub fn view(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self::new(name, ProjectionKind::View, query)
    }

    fn new(name: impl Into<String>, kind: ProjectionKind, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            query: query.into(),
            aliases: IndexMap::new(),
            alias_scope: AliasScope::Export,
        }
    }

    /// Renames a column.
    pub fn alias(mut self, column: impl Into<String>, alias: impl Into<String>) -> Self {
        self.aliases.insert(column.into(), alias.into());
        self
    }

    /// Sets where aliases apply.
    pub fn alias_scope(mut self, scope: AliasScope) -> Self {
        self.alias_scope = scope;
        self
    }

    /// Builds the projection spec.
    pub fn build(self) -> ProjectionSpec {
        ProjectionSpec {
            name: self.name,
            kind: self.kind,
            query: self.query,
            aliases: self.aliases,
            alias_scope: self.alias_scope,
        }
    }
}
