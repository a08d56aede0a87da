//! Feature engineering: totals, engagement, banding and fees.

use bankrisk_core::{
    config::{FeeFormula, JoinDatePolicy, PipelineConfig},
    feature_engineering::enrich,
    record::{EngagementTimeframe, FeeStructure, IncomeBand, RawRecord},
};
use chrono::{Duration, NaiveDate};

fn reference() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn funded(client_id: &str) -> RawRecord {
    let mut raw = RawRecord::test_record(client_id);
    raw.estimated_income = 150_000.0;
    raw.bank_loans = 40_000.0;
    raw.business_lending = 15_000.0;
    raw.credit_card_balance = 2_500.0;
    raw.bank_deposits = 30_000.0;
    raw.saving_accounts = 12_000.0;
    raw.checking_accounts = 4_000.0;
    raw.foreign_currency_account = 1_000.0;
    raw
}

#[test]
fn totals_are_derived_from_components() {
    let cfg = PipelineConfig::default_test();
    let r = enrich(funded("C-1"), &cfg, reference()).unwrap();

    assert_eq!(r.total_loan, 40_000.0 + 15_000.0 + 2_500.0);
    assert_eq!(r.total_deposit, 30_000.0 + 12_000.0 + 4_000.0 + 1_000.0);
    assert_eq!(r.income_band, IncomeBand::Medium);
}

#[test]
fn engagement_days_counts_whole_days_to_reference() {
    let cfg = PipelineConfig::default_test();
    let mut raw = funded("C-2");
    raw.joined_bank = reference() - Duration::days(3000);

    let r = enrich(raw, &cfg, reference()).unwrap();
    assert_eq!(r.engagement_days, 3000);
    assert_eq!(r.engagement_timeframe, EngagementTimeframe::UnderTenYears);
}

#[test]
fn join_date_on_reference_date_is_zero_days() {
    let cfg = PipelineConfig::default_test();
    let mut raw = funded("C-3");
    raw.joined_bank = reference();

    let r = enrich(raw, &cfg, reference()).unwrap();
    assert_eq!(r.engagement_days, 0);
    assert_eq!(r.engagement_timeframe, EngagementTimeframe::UnderFiveYears);
}

#[test]
fn future_join_date_is_rejected_by_default() {
    let cfg = PipelineConfig::default_test();
    let mut raw = funded("C-4");
    raw.source_row = 7;
    raw.joined_bank = reference() + Duration::days(1);

    let err = enrich(raw, &cfg, reference()).unwrap_err();
    assert_eq!(err.row, 7);
    assert_eq!(err.client_id, "C-4");
    assert_eq!(err.field, "Joined Bank");
}

#[test]
fn future_join_date_clamps_when_configured() {
    let mut cfg = PipelineConfig::default_test();
    cfg.join_date_policy = JoinDatePolicy::Clamp;
    let mut raw = funded("C-5");
    raw.joined_bank = reference() + Duration::days(30);

    let r = enrich(raw, &cfg, reference()).unwrap();
    assert_eq!(r.engagement_days, 0);
}

#[test]
fn loan_only_fees_follow_fee_structure() {
    let cfg = PipelineConfig::default_test();
    for (structure, rate) in [
        (FeeStructure::Low, 0.01),
        (FeeStructure::Mid, 0.03),
        (FeeStructure::High, 0.05),
    ] {
        let mut raw = funded("C-6");
        raw.fee_structure = structure;
        let r = enrich(raw, &cfg, reference()).unwrap();
        assert_eq!(r.processing_fee, rate);
        assert!(
            (r.total_fees - r.total_loan * rate).abs() < 1e-9,
            "{structure}: fees {} != loan {} x {rate}",
            r.total_fees,
            r.total_loan
        );
    }
}

#[test]
fn blended_fees_add_deposit_component() {
    let mut cfg = PipelineConfig::default_test();
    cfg.fees.formula = FeeFormula::Blended { deposit_rate: 0.002 };
    let r = enrich(funded("C-7"), &cfg, reference()).unwrap();

    let expected = r.total_loan * 0.03 + r.total_deposit * 0.002;
    assert!((r.total_fees - expected).abs() < 1e-9);
}

#[test]
fn negative_balance_names_the_field() {
    let cfg = PipelineConfig::default_test();
    let mut raw = funded("C-8");
    raw.bank_deposits = -1.0;

    let err = enrich(raw, &cfg, reference()).unwrap_err();
    assert_eq!(err.field, "Bank Deposits");
    assert_eq!(err.client_id, "C-8");
}

#[test]
fn non_finite_balance_is_rejected() {
    let cfg = PipelineConfig::default_test();
    let mut raw = funded("C-9");
    raw.estimated_income = f64::NAN;

    let err = enrich(raw, &cfg, reference()).unwrap_err();
    assert_eq!(err.field, "Estimated Income");
}

#[test]
fn enrichment_is_pure() {
    let cfg = PipelineConfig::default_test();
    let a = enrich(funded("C-10"), &cfg, reference()).unwrap();
    let b = enrich(funded("C-10"), &cfg, reference()).unwrap();
    assert_eq!(a, b);
}
