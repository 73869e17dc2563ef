//! # Pipeline Validator
//!
//! Row-level stages of the entity pipeline. Each stage takes records in
//! source order and splits them into a stream that moves on and a set of
//! error records:
//!
//! - Schema validation (presence, type coercion, pattern, numeric bounds)
//! - Custom rules (`age_gte`, `one_of`, ...) in `stop` or `skip` mode
//! - Deduplication by composite keys under a resolution policy
//!
//! ## Example
//!
//! ```rust
//! use pipeline_core::{DuplicateResolution, FieldSpecBuilder, FieldType};
//! use pipeline_validator::{Deduplicator, SchemaValidator, SourceRecord};
//!
//! let fields = vec![FieldSpecBuilder::new("id", FieldType::Int).required(true).build()];
//! let columns = vec!["id".to_string()];
//! let records = vec![
//!     SourceRecord::from_cells(1, &columns, ["1"]),
//!     SourceRecord::from_cells(2, &columns, [""]),
//!     SourceRecord::from_cells(3, &columns, ["1"]),
//! ];
//!
//! let schema = SchemaValidator::new(&fields).validate(records, "orders");
//! assert_eq!(schema.rejected, 1);
//!
//! let keys = vec![vec!["id".to_string()]];
//! let dedup = Deduplicator::new(&keys, DuplicateResolution::First)
//!     .deduplicate(schema.valid, "orders");
//! assert_eq!(dedup.kept.len(), 1);
//! ```

mod custom;
mod dataset;
mod dedup;
mod error;
mod schema;

pub use custom::*;
pub use dataset::*;
pub use dedup::*;
pub use error::*;
pub use schema::*;
