//! Banking risk snapshot pipeline.
//!
//! Raw customer extract → enriched records → risk scores → portfolio and
//! dimensional KPIs → one immutable, versioned run in SQLite → CSV exports.
//! See `pipeline.rs` for the stage order and `store/run.rs` for the commit
//! protocol.

pub mod aggregation;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod feature_engineering;
pub mod pipeline;
pub mod record;
pub mod risk_scoring;
pub mod snapshot;
pub mod store;
pub mod types;

pub use error::{PipelineError, PipelineResult, ValidationError};
