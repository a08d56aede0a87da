//! Risk scoring: five weighted components rolled into a 0–100 score.
//!
//! Components (weights from ScoringConfig, defaults shown):
//!   1. Debt burden         35%  total debt / income
//!   2. Liquidity risk      25%  1 - liquid assets / total debt
//!   3. Credit utilisation  20%  card balance / income
//!   4. Asset backing       10%  1 - (property + superannuation) / total debt
//!   5. Tenure risk         10%  1 - engagement days / max tenure
//!
//! Every raw ratio is clamped to [0, ratio_cap], divided by its saturation
//! point and clamped again to [0, 1]. Every division is guarded: zero income
//! scores as the cap, zero debt carries no liquidity or backing risk.

use crate::{
    config::ScoringConfig,
    record::{EnrichedRecord, RiskCategory},
    types::ClientId,
};
use serde::{Deserialize, Serialize};

/// Normalised per-component subscores, each in [0, 1]. Audit artifact only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskComponents {
    pub client_id: ClientId,
    pub debt_burden: f64,
    pub liquidity_risk: f64,
    pub credit_utilization: f64,
    pub asset_backing: f64,
    pub tenure_risk: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub components: RiskComponents,
    pub risk_score: f64,
    pub risk_category: RiskCategory,
}

fn normalise(raw_ratio: f64, cap: f64, saturation: f64) -> f64 {
    // NaN compares false everywhere; treat it as the worst case.
    let ratio = if raw_ratio.is_nan() { cap } else { raw_ratio.clamp(0.0, cap) };
    (ratio / saturation).clamp(0.0, 1.0)
}

pub fn debt_burden(record: &EnrichedRecord, cfg: &ScoringConfig) -> f64 {
    let income = record.raw.estimated_income;
    let ratio = if income <= 0.0 { cfg.ratio_cap } else { record.total_debt() / income };
    normalise(ratio, cfg.ratio_cap, cfg.debt_burden_saturation)
}

pub fn liquidity_risk(record: &EnrichedRecord, cfg: &ScoringConfig) -> f64 {
    let debt = record.total_debt();
    if debt <= 0.0 {
        return 0.0;
    }
    let coverage = normalise(record.liquid_assets() / debt, cfg.ratio_cap, cfg.liquidity_coverage_saturation);
    1.0 - coverage
}

pub fn credit_utilization(record: &EnrichedRecord, cfg: &ScoringConfig) -> f64 {
    let income = record.raw.estimated_income;
    let ratio = if income <= 0.0 {
        cfg.ratio_cap
    } else {
        record.raw.credit_card_balance / income
    };
    normalise(ratio, cfg.ratio_cap, cfg.credit_utilization_saturation)
}

pub fn asset_backing(record: &EnrichedRecord, cfg: &ScoringConfig) -> f64 {
    let debt = record.total_debt();
    if debt <= 0.0 {
        return 0.0;
    }
    let assets = f64::from(record.raw.properties_owned) * cfg.property_value
        + record.raw.superannuation_savings;
    let backing = normalise(assets / debt, cfg.ratio_cap, cfg.asset_backing_saturation);
    1.0 - backing
}

pub fn tenure_risk(record: &EnrichedRecord, cfg: &ScoringConfig) -> f64 {
    let max_days = cfg.max_tenure_days.max(1);
    let days = record.engagement_days.clamp(0, max_days);
    1.0 - days as f64 / max_days as f64
}

/// Score one enriched record. Never fails: every ratio has a defined
/// zero-denominator value and every component is bounded before weighting.
pub fn score(record: &EnrichedRecord, cfg: &ScoringConfig) -> RiskAssessment {
    let components = RiskComponents {
        client_id: record.raw.client_id.clone(),
        debt_burden: debt_burden(record, cfg),
        liquidity_risk: liquidity_risk(record, cfg),
        credit_utilization: credit_utilization(record, cfg),
        asset_backing: asset_backing(record, cfg),
        tenure_risk: tenure_risk(record, cfg),
    };

    let w = &cfg.weights;
    let composite = components.debt_burden * w.debt_burden
        + components.liquidity_risk * w.liquidity_risk
        + components.credit_utilization * w.credit_utilization
        + components.asset_backing * w.asset_backing
        + components.tenure_risk * w.tenure_risk;

    let risk_score = ((composite * 1000.0).round() / 10.0).clamp(0.0, 100.0);

    RiskAssessment {
        risk_category: RiskCategory::from_score(risk_score),
        risk_score,
        components,
    }
}

/// Apply a scoring result to its record, consuming the unscored record.
pub fn apply(mut record: EnrichedRecord, assessment: &RiskAssessment) -> EnrichedRecord {
    record.risk_score = assessment.risk_score;
    record.risk_category = assessment.risk_category;
    record
}
