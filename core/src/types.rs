//! Shared primitive types used across the entire pipeline.

use serde::{Deserialize, Serialize};

/// A pipeline run identifier. Allocated by the store, strictly increasing.
pub type RunId = i64;

/// A stable customer identifier from the source extract.
pub type ClientId = String;

/// Lifecycle of a pipeline run. Stored as lowercase text in `pipeline_runs`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::InProgress => "in_progress",
            RunStatus::Success    => "success",
            RunStatus::Failed     => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(RunStatus::InProgress),
            "success"     => Some(RunStatus::Success),
            "failed"      => Some(RunStatus::Failed),
            _ => None,
        }
    }
}
