use crate::error::{PipelineError, PipelineResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "pipeline_config.json";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JoinDatePolicy {
    /// A join date after the reference date is a validation error.
    Reject,
    /// A join date after the reference date yields zero engagement days.
    Clamp,
}

/// How a run treats records that fail validation. Applies to the whole run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
    /// Any rejected record aborts the run before anything is written.
    Abort,
    /// Rejected records are dropped and recorded against the run.
    DropAndCount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeBandConfig {
    /// Incomes strictly below this are `Low`.
    pub low_upper: f64,
    /// Incomes up to and including this are `Medium`; above is `High`.
    pub medium_upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeRates {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeeFormula {
    /// total_loan × processing fee of the record's fee structure.
    LoanOnly,
    /// LoanOnly plus total_deposit × deposit_rate.
    Blended { deposit_rate: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    pub formula: FeeFormula,
    pub processing_rates: FeeRates,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskWeights {
    pub debt_burden: f64,
    pub liquidity_risk: f64,
    pub credit_utilization: f64,
    pub asset_backing: f64,
    pub tenure_risk: f64,
}

impl RiskWeights {
    pub fn total(&self) -> f64 {
        self.debt_burden
            + self.liquidity_risk
            + self.credit_utilization
            + self.asset_backing
            + self.tenure_risk
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: RiskWeights,
    /// Upper bound applied to every raw ratio before normalisation.
    pub ratio_cap: f64,
    /// Debt-to-income ratio at which debt burden saturates.
    pub debt_burden_saturation: f64,
    /// Liquid-to-debt coverage at which liquidity risk reaches zero.
    pub liquidity_coverage_saturation: f64,
    /// Card-balance-to-income ratio at which utilisation saturates.
    pub credit_utilization_saturation: f64,
    /// Asset-to-debt backing at which asset risk reaches zero.
    pub asset_backing_saturation: f64,
    /// Assumed value of one owned property.
    pub property_value: f64,
    /// Tenure in days at which tenure risk reaches zero.
    pub max_tenure_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Date engagement is measured against. `None` means "today" at run time.
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
    pub income_bands: IncomeBandConfig,
    pub fees: FeeConfig,
    pub scoring: ScoringConfig,
    pub join_date_policy: JoinDatePolicy,
    pub rejection_policy: RejectionPolicy,
}

impl PipelineConfig {
    /// Load from `{data_dir}/pipeline_config.json`.
    /// In tests, use PipelineConfig::default_test().
    pub fn load(data_dir: &str) -> PipelineResult<Self> {
        let path = format!("{data_dir}/{CONFIG_FILE}");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| PipelineError::Configuration(format!("Cannot read {path}: {e}")))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| PipelineError::Configuration(format!("Cannot parse {path}: {e}")))?;
        config.validate()?;
        log::debug!("Loaded pipeline config from {path}");
        Ok(config)
    }

    /// Reject configurations the scoring and banding code cannot honour.
    pub fn validate(&self) -> PipelineResult<()> {
        let bad = |msg: String| Err(PipelineError::Configuration(msg));

        let total = self.scoring.weights.total();
        if (total - 1.0).abs() > 1e-9 {
            return bad(format!("risk weights must sum to 1.0, got {total}"));
        }
        let w = &self.scoring.weights;
        for (name, v) in [
            ("debt_burden", w.debt_burden),
            ("liquidity_risk", w.liquidity_risk),
            ("credit_utilization", w.credit_utilization),
            ("asset_backing", w.asset_backing),
            ("tenure_risk", w.tenure_risk),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return bad(format!("weight {name} must be within [0, 1], got {v}"));
            }
        }

        let s = &self.scoring;
        for (name, v) in [
            ("ratio_cap", s.ratio_cap),
            ("debt_burden_saturation", s.debt_burden_saturation),
            ("liquidity_coverage_saturation", s.liquidity_coverage_saturation),
            ("credit_utilization_saturation", s.credit_utilization_saturation),
            ("asset_backing_saturation", s.asset_backing_saturation),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return bad(format!("{name} must be positive, got {v}"));
            }
        }
        if s.property_value < 0.0 {
            return bad(format!("property_value must be non-negative, got {}", s.property_value));
        }
        if s.max_tenure_days <= 0 {
            return bad(format!("max_tenure_days must be positive, got {}", s.max_tenure_days));
        }

        let b = &self.income_bands;
        if !(b.low_upper >= 0.0 && b.low_upper <= b.medium_upper) {
            return bad(format!(
                "income band cut points must satisfy 0 <= low_upper <= medium_upper, got {} / {}",
                b.low_upper, b.medium_upper
            ));
        }

        let r = &self.fees.processing_rates;
        for (name, v) in [("low", r.low), ("mid", r.mid), ("high", r.high)] {
            if v < 0.0 {
                return bad(format!("processing rate '{name}' must be non-negative, got {v}"));
            }
        }
        if let FeeFormula::Blended { deposit_rate } = self.fees.formula {
            if deposit_rate < 0.0 {
                return bad(format!("deposit_rate must be non-negative, got {deposit_rate}"));
            }
        }
        Ok(())
    }

    /// Config with hardcoded defaults for use in unit tests.
    /// Reference date is pinned so engagement figures never drift.
    pub fn default_test() -> Self {
        Self {
            reference_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            income_bands: IncomeBandConfig {
                low_upper: 100_000.0,
                medium_upper: 300_000.0,
            },
            fees: FeeConfig {
                formula: FeeFormula::LoanOnly,
                processing_rates: FeeRates {
                    low: 0.01,
                    mid: 0.03,
                    high: 0.05,
                },
            },
            scoring: ScoringConfig {
                weights: RiskWeights {
                    debt_burden: 0.35,
                    liquidity_risk: 0.25,
                    credit_utilization: 0.20,
                    asset_backing: 0.10,
                    tenure_risk: 0.10,
                },
                ratio_cap: 3.0,
                debt_burden_saturation: 1.0,
                liquidity_coverage_saturation: 1.0,
                credit_utilization_saturation: 0.5,
                asset_backing_saturation: 3.0,
                property_value: 500_000.0,
                max_tenure_days: 7300,
            },
            join_date_policy: JoinDatePolicy::Reject,
            rejection_policy: RejectionPolicy::Abort,
        }
    }
}
