//! Error types for pipeline configuration.
//!
//! Every variant here is fatal for the entity it concerns and is raised
//! before any source row is processed. Each carries the offending
//! configuration key so operators can find it in the file.

use thiserror::Error;

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main error type for configuration resolution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Entity is not declared under `transformations_config`
    #[error("Entity '{0}' not found in the configuration")]
    UnknownEntity(String),

    /// A mandatory key is absent
    #[error("Missing required configuration '{key}' for entity '{entity}'")]
    MissingKey {
        /// Entity name
        entity: String,
        /// Dotted key path
        key: String,
    },

    /// A key holds a value outside its accepted vocabulary
    #[error("Invalid value for '{entity}.{key}': {message}")]
    InvalidValue {
        /// Entity name
        entity: String,
        /// Dotted key path
        key: String,
        /// What was wrong
        message: String,
    },

    /// Field pattern does not compile
    #[error("Invalid regex pattern for field '{entity}.{field}': {error}")]
    InvalidPattern {
        /// Entity name
        entity: String,
        /// Field name
        field: String,
        /// Regex compiler message
        error: String,
    },

    /// Field default cannot be coerced to the declared type
    #[error("Invalid default for field '{entity}.{field}': {message}")]
    InvalidDefault {
        /// Entity name
        entity: String,
        /// Field name
        field: String,
        /// What was wrong
        message: String,
    },

    /// Custom rule identifier is not in the built-in catalogue
    #[error("Unknown custom validation '{rule}' on field '{entity}.{field}'")]
    UnknownRule {
        /// Entity name
        entity: String,
        /// Field the rule targets
        field: String,
        /// Offending identifier
        rule: String,
    },

    /// Custom rule params are missing or ill-typed
    #[error("Invalid params for custom validation '{rule}' in entity '{entity}': {message}")]
    InvalidRuleParams {
        /// Entity name
        entity: String,
        /// Rule identifier
        rule: String,
        /// What was wrong
        message: String,
    },

    /// Two projections share a name
    #[error("Duplicate projection name '{name}' in entity '{entity}'")]
    DuplicateProjection {
        /// Entity name
        entity: String,
        /// Projection name
        name: String,
    },

    /// Projection collides with a relation the pipeline registers itself
    #[error("Projection name '{name}' is reserved in entity '{entity}'")]
    ReservedProjectionName {
        /// Entity name
        entity: String,
        /// Projection name
        name: String,
    },

    /// Projection has no query
    #[error("No query defined for projection '{projection}' in entity '{entity}'")]
    EmptyQuery {
        /// Entity name
        entity: String,
        /// Projection name
        projection: String,
    },

    /// Projection query cannot be planned against the entity's columns
    #[error("Query for projection '{projection}' in entity '{entity}' is invalid: {message}")]
    InvalidProjectionQuery {
        /// Entity name
        entity: String,
        /// Projection name
        projection: String,
        /// Planner message
        message: String,
    },

    /// Alias key does not name a column produced by the projection query
    #[error("Alias '{column}' in projection '{projection}' of entity '{entity}' is not produced by its query")]
    UnknownAliasColumn {
        /// Entity name
        entity: String,
        /// Projection name
        projection: String,
        /// Offending column
        column: String,
    },

    /// Source file cannot be opened or has no header
    #[error("Cannot read source '{path}' for entity '{entity}': {message}")]
    SourceUnreadable {
        /// Entity name
        entity: String,
        /// Source path as configured
        path: String,
        /// Underlying reason
        message: String,
    },
}

impl ConfigError {
    /// Creates a missing key error.
    pub fn missing(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingKey {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid(
        entity: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            entity: entity.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid rule params error.
    pub fn rule_params(
        entity: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidRuleParams {
            entity: entity.into(),
            rule: rule.into(),
            message: message.into(),
        }
    }
}
