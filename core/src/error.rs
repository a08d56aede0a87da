use crate::types::{ClientId, RunId};
use thiserror::Error;

/// A single input row that could not be turned into a typed record.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("row {row} (client '{client_id}'): field '{field}' {reason}")]
pub struct ValidationError {
    /// 1-based data row number in the source extract.
    pub row: usize,
    pub client_id: ClientId,
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(row: usize, client_id: &str, field: &str, reason: impl Into<String>) -> Self {
        Self {
            row,
            client_id: client_id.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Validation aborted run: {rejected} record(s) rejected, first: {first}")]
    ValidationAborted { rejected: usize, first: ValidationError },

    #[error("Computation error for client '{client_id}': {detail}")]
    Computation { client_id: ClientId, detail: String },

    #[error("Persistence error in run {run_id}: {source}")]
    Persistence {
        run_id: RunId,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Commit lock on {store} is held by another writer")]
    LockHeld { store: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
