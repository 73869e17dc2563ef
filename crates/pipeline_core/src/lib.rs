//! # Pipeline Core
//!
//! Core data structures and types for the projection pipeline.
//!
//! A pipeline run takes one entity's source file, validates each record
//! against declared field specs and custom rules, removes composite-key
//! duplicates, and materializes named projections. This crate holds the
//! types every stage shares.
//!
//! ## Key Concepts
//!
//! - **PipelineConfig**: the configuration file as written, loosely typed
//! - **Entity**: one resolved, strongly typed entity section
//! - **ErrorRecord / ErrorLog**: row-level problems routed by category
//! - **RunSummary**: counters reported once a run reaches a terminal state
//!
//! ## Example
//!
//! ```rust
//! use pipeline_core::{CustomValidationMode, EntityBuilder, FieldSpecBuilder, FieldType, RuleKind};
//!
//! let entity = EntityBuilder::new("employees", "data/employees.csv")
//!     .custom_validation_mode(CustomValidationMode::Skip)
//!     .field(FieldSpecBuilder::new("name", FieldType::Str).required(true).build())
//!     .rule("birthday_on", RuleKind::AgeGte { min_age: 18 })
//!     .build();
//!
//! assert_eq!(entity.relation(), "employees");
//! ```

pub mod builder;
pub mod config;
pub mod entity;
pub mod error;
pub mod report;
pub mod value;

pub use builder::*;
pub use config::*;
pub use entity::*;
pub use error::*;
pub use report::*;
pub use value::*;
