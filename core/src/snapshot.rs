//! A computed snapshot: everything one run commits, built before any write.
//!
//! The snapshot is the hand-off between the pure stages and the store:
//! once built it is never mutated, and the store writes it all or nothing.

use crate::{
    aggregation::{DimensionMetric, KpiValue, RiskDistribution},
    error::ValidationError,
    record::EnrichedRecord,
    risk_scoring::RiskComponents,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub records: Vec<EnrichedRecord>,
    pub components: Vec<RiskComponents>,
    pub kpi_summary: Vec<KpiValue>,
    pub kpi_by_dimension: Vec<DimensionMetric>,
    pub risk_distribution: RiskDistribution,
    /// Rows dropped under the drop-and-count policy.
    #[serde(skip)]
    pub rejections: Vec<ValidationError>,
}

impl Snapshot {
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn kpi(&self, name: &str) -> Option<&KpiValue> {
        self.kpi_summary.iter().find(|k| k.kpi_name == name)
    }
}

/// Audit facts about a run that are known before the commit starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Name of the extract the run was built from.
    pub source: String,
    pub records_extracted: usize,
    pub records_rejected: usize,
}
