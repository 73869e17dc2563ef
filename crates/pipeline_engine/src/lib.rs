//! # Pipeline Engine
//!
//! Runs one entity end to end: reads its source file, validates and
//! deduplicates the rows, loads them into a query engine and materializes
//! the entity's projections.
//!
//! The engine is reached through the [`QueryEngine`] trait;
//! [`DataFusionEngine`] implements it over an in-memory DataFusion session.
//!
//! ## Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use pipeline_engine::{DataFusionEngine, Pipeline, RunOptions};
//! use pipeline_parser::parse_file;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = parse_file(Path::new("config.yaml"))?;
//! let entity = config.entity("employees")?;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
//! let pipeline = Pipeline::new(DataFusionEngine::new(), RunOptions::new("output", date));
//! let summary = pipeline.run(&entity).await;
//!
//! println!("{} rows valid, state {}", summary.rows_valid, summary.state);
//! # Ok(())
//! # }
//! ```

pub mod converter;
mod error;
pub mod export;
mod orchestrator;
pub mod projection;
mod query;
pub mod source;

pub use error::*;
pub use orchestrator::*;
pub use query::*;
