//! The pipeline: wires the pure stages to the one side-effecting commit.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Extract        (extract.rs, before the pipeline is called)
//!   2. Enrich         (feature_engineering.rs)   per record, parallel
//!   3. Score          (risk_scoring.rs)          per record, parallel
//!   4. Rejection policy applied to the whole run
//!   5. Aggregate      (aggregation.rs)           barrier: needs every record
//!   6. Commit         (store)                    single writer
//!
//! RULES:
//!   - Stages 2–5 are pure and never see the store.
//!   - Validation failures are handled uniformly for the run: either the run
//!     aborts before any write, or every rejected row is dropped and counted.
//!   - Failed commits are reported, never retried.

use crate::{
    aggregation,
    config::{PipelineConfig, RejectionPolicy},
    error::{PipelineError, PipelineResult, ValidationError},
    extract::ExtractedBatch,
    feature_engineering,
    record::{EnrichedRecord, RawRecord},
    risk_scoring::{self, RiskComponents},
    snapshot::{RunManifest, Snapshot},
    store::SnapshotStore,
    types::RunId,
};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// What a successful run reports back to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub source: String,
    pub records_extracted: usize,
    pub records_loaded: usize,
    pub records_rejected: usize,
    pub kpi_summary: Vec<aggregation::KpiValue>,
}

pub struct Pipeline {
    config: PipelineConfig,
    reference_date: NaiveDate,
}

impl Pipeline {
    /// Build a pipeline. A config without a reference date measures
    /// engagement against today.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        let reference_date = config
            .reference_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        Self::with_reference_date(config, reference_date)
    }

    pub fn with_reference_date(config: PipelineConfig, reference_date: NaiveDate) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self { config, reference_date })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    /// Stages 2 and 3 for one record.
    pub fn process(&self, raw: RawRecord) -> Result<(EnrichedRecord, RiskComponents), ValidationError> {
        let enriched = feature_engineering::enrich(raw, &self.config, self.reference_date)?;
        let assessment = risk_scoring::score(&enriched, &self.config.scoring);
        let scored = risk_scoring::apply(enriched, &assessment);
        Ok((scored, assessment.components))
    }

    /// Build the full snapshot for a batch without touching any store.
    pub fn build_snapshot(&self, batch: ExtractedBatch) -> PipelineResult<Snapshot> {
        let ExtractedBatch { source, records, rejections: mut rejected, .. } = batch;
        let total = records.len();

        let processed: Vec<_> = records.into_par_iter().map(|raw| self.process(raw)).collect();

        let mut enriched = Vec::with_capacity(total);
        let mut components = Vec::with_capacity(total);
        for result in processed {
            match result {
                Ok((record, breakdown)) => {
                    check_bounds(&record, &breakdown)?;
                    enriched.push(record);
                    components.push(breakdown);
                }
                Err(e) => {
                    log::warn!("Rejected {e}");
                    rejected.push(e);
                }
            }
        }
        rejected.sort_by_key(|e| e.row);

        if let Some(first) = rejected.first() {
            match self.config.rejection_policy {
                RejectionPolicy::Abort => {
                    return Err(PipelineError::ValidationAborted {
                        rejected: rejected.len(),
                        first: first.clone(),
                    });
                }
                RejectionPolicy::DropAndCount => {
                    log::warn!("{source}: dropping {} rejected record(s)", rejected.len());
                }
            }
        }

        let (kpi_summary, kpi_by_dimension) = aggregation::aggregate(&enriched);
        let risk_distribution = aggregation::risk_distribution(&enriched);
        log::info!(
            "{source}: {} record(s) scored, {} KPI(s), {} dimension row(s)",
            enriched.len(),
            kpi_summary.len(),
            kpi_by_dimension.len()
        );

        Ok(Snapshot {
            records: enriched,
            components,
            kpi_summary,
            kpi_by_dimension,
            risk_distribution,
            rejections: rejected,
        })
    }

    /// Run every stage and commit the result as a new run.
    pub fn run(&self, store: &mut SnapshotStore, batch: ExtractedBatch) -> PipelineResult<RunOutcome> {
        let started = Instant::now();
        let source = batch.source.clone();
        let records_extracted = batch.records_extracted();
        log::info!(
            "{source}: starting pipeline over {records_extracted} row(s), reference date {}",
            self.reference_date
        );

        let snapshot = self.build_snapshot(batch)?;
        let manifest = RunManifest {
            source: source.clone(),
            records_extracted,
            records_rejected: snapshot.rejections.len(),
        };
        let run_id = store.commit(&manifest, &snapshot, started)?;

        Ok(RunOutcome {
            run_id,
            source,
            records_extracted,
            records_loaded: snapshot.record_count(),
            records_rejected: manifest.records_rejected,
            kpi_summary: snapshot.kpi_summary,
        })
    }
}

/// Scoring is bounded by construction; anything outside the bounds is a
/// defect in the scoring code, not a data condition.
fn check_bounds(record: &EnrichedRecord, c: &RiskComponents) -> PipelineResult<()> {
    let unit = |v: f64| (0.0..=1.0).contains(&v);
    let score_ok = (0.0..=100.0).contains(&record.risk_score);
    let components_ok = unit(c.debt_burden)
        && unit(c.liquidity_risk)
        && unit(c.credit_utilization)
        && unit(c.asset_backing)
        && unit(c.tenure_risk);
    if score_ok && components_ok {
        return Ok(());
    }
    Err(PipelineError::Computation {
        client_id: record.raw.client_id.clone(),
        detail: format!("risk score {} or components {c:?} out of bounds", record.risk_score),
    })
}
