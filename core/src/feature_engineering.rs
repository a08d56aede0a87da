//! Feature engineering: pure per-record derivation of engagement, banding,
//! totals and fees.
//!
//! No I/O and no shared state: the same record, config and reference date
//! always produce the same EnrichedRecord. Risk fields are left at their
//! unscored defaults; risk_scoring fills them in.

use crate::{
    config::{FeeConfig, FeeFormula, FeeRates, IncomeBandConfig, JoinDatePolicy, PipelineConfig},
    error::ValidationError,
    record::{EngagementTimeframe, EnrichedRecord, FeeStructure, IncomeBand, RawRecord, RiskCategory},
};
use chrono::NaiveDate;

const FIVE_YEARS_DAYS: i64 = 1825;
const TEN_YEARS_DAYS: i64 = 3650;
const TWENTY_YEARS_DAYS: i64 = 7300;

/// Whole days between joining and the reference date.
pub fn engagement_days(
    raw: &RawRecord,
    reference_date: NaiveDate,
    policy: JoinDatePolicy,
) -> Result<i64, ValidationError> {
    let days = (reference_date - raw.joined_bank).num_days();
    if days >= 0 {
        return Ok(days);
    }
    match policy {
        JoinDatePolicy::Clamp => {
            log::debug!(
                "client {}: join date {} after reference {reference_date}, clamped to 0 days",
                raw.client_id,
                raw.joined_bank
            );
            Ok(0)
        }
        JoinDatePolicy::Reject => Err(ValidationError::new(
            raw.source_row,
            &raw.client_id,
            "Joined Bank",
            format!("{} is after reference date {reference_date}", raw.joined_bank),
        )),
    }
}

/// Inclusive lower / exclusive upper day boundaries.
pub fn engagement_timeframe(days: i64) -> EngagementTimeframe {
    if days < FIVE_YEARS_DAYS {
        EngagementTimeframe::UnderFiveYears
    } else if days < TEN_YEARS_DAYS {
        EngagementTimeframe::UnderTenYears
    } else if days < TWENTY_YEARS_DAYS {
        EngagementTimeframe::UnderTwentyYears
    } else {
        EngagementTimeframe::OverTwentyYears
    }
}

pub fn income_band(income: f64, bands: &IncomeBandConfig) -> IncomeBand {
    if income < bands.low_upper {
        IncomeBand::Low
    } else if income <= bands.medium_upper {
        IncomeBand::Medium
    } else {
        IncomeBand::High
    }
}

pub fn processing_fee(fee_structure: FeeStructure, rates: &FeeRates) -> f64 {
    match fee_structure {
        FeeStructure::Low  => rates.low,
        FeeStructure::Mid  => rates.mid,
        FeeStructure::High => rates.high,
    }
}

pub fn total_fees(total_loan: f64, total_deposit: f64, fee: f64, fees: &FeeConfig) -> f64 {
    match fees.formula {
        FeeFormula::LoanOnly => total_loan * fee,
        FeeFormula::Blended { deposit_rate } => total_loan * fee + total_deposit * deposit_rate,
    }
}

fn check_financials(raw: &RawRecord) -> Result<(), ValidationError> {
    for (field, value) in raw.financial_fields() {
        if !value.is_finite() {
            return Err(ValidationError::new(raw.source_row, &raw.client_id, field, "is not a finite number"));
        }
        if value < 0.0 {
            return Err(ValidationError::new(
                raw.source_row,
                &raw.client_id,
                field,
                format!("must be non-negative, got {value}"),
            ));
        }
    }
    Ok(())
}

/// Derive every non-risk field of an EnrichedRecord.
pub fn enrich(
    raw: RawRecord,
    config: &PipelineConfig,
    reference_date: NaiveDate,
) -> Result<EnrichedRecord, ValidationError> {
    check_financials(&raw)?;

    let engagement_days = engagement_days(&raw, reference_date, config.join_date_policy)?;
    let total_loan = raw.bank_loans + raw.business_lending + raw.credit_card_balance;
    let total_deposit =
        raw.bank_deposits + raw.saving_accounts + raw.checking_accounts + raw.foreign_currency_account;
    let fee = processing_fee(raw.fee_structure, &config.fees.processing_rates);

    Ok(EnrichedRecord {
        engagement_timeframe: engagement_timeframe(engagement_days),
        income_band: income_band(raw.estimated_income, &config.income_bands),
        engagement_days,
        processing_fee: fee,
        total_loan,
        total_deposit,
        total_fees: total_fees(total_loan, total_deposit, fee, &config.fees),
        risk_score: 0.0,
        risk_category: RiskCategory::Low,
        raw,
    })
}
