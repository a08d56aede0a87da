//! Risk scoring: pinned example, guarded ratios, bounds and categories.

use bankrisk_core::{
    config::PipelineConfig,
    feature_engineering::enrich,
    record::{EnrichedRecord, RawRecord, RiskCategory},
    risk_scoring::{apply, score},
};
use chrono::{Duration, NaiveDate};

fn reference() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn enriched(raw: RawRecord) -> EnrichedRecord {
    enrich(raw, &PipelineConfig::default_test(), reference()).unwrap()
}

/// Income 100k, loans 50k, card balance 10k, deposits 20k, 3000 days.
fn worked_example() -> RawRecord {
    let mut raw = RawRecord::test_record("IND-WORKED");
    raw.estimated_income = 100_000.0;
    raw.bank_loans = 50_000.0;
    raw.credit_card_balance = 10_000.0;
    raw.bank_deposits = 20_000.0;
    raw.joined_bank = reference() - Duration::days(3000);
    raw
}

fn assert_unit(name: &str, v: f64) {
    assert!((0.0..=1.0).contains(&v), "{name} out of [0,1]: {v}");
}

#[test]
fn worked_example_scores_moderate() {
    let cfg = PipelineConfig::default_test();
    let record = enriched(worked_example());
    let assessment = score(&record, &cfg.scoring);

    let c = &assessment.components;
    assert!((c.debt_burden - 0.6).abs() < 1e-9);
    assert!((c.liquidity_risk - 2.0 / 3.0).abs() < 1e-9);
    assert!((c.credit_utilization - 0.2).abs() < 1e-9);
    assert!((c.asset_backing - 1.0).abs() < 1e-9);
    assert!((c.tenure_risk - (1.0 - 3000.0 / 7300.0)).abs() < 1e-9);

    assert_eq!(assessment.risk_score, 57.6);
    assert_eq!(assessment.risk_category, RiskCategory::Moderate);
}

#[test]
fn zero_income_with_debt_maxes_income_ratios() {
    let cfg = PipelineConfig::default_test();
    let mut raw = RawRecord::test_record("IND-ZERO-INC");
    raw.bank_loans = 1_000.0;
    let assessment = score(&enriched(raw), &cfg.scoring);

    assert_eq!(assessment.components.debt_burden, 1.0);
    assert_eq!(assessment.components.credit_utilization, 1.0);
    assert!(assessment.risk_score >= 60.0, "got {}", assessment.risk_score);
    assert!(matches!(
        assessment.risk_category,
        RiskCategory::High | RiskCategory::Critical
    ));
}

#[test]
fn zero_debt_carries_no_liquidity_or_backing_risk() {
    let cfg = PipelineConfig::default_test();
    let mut raw = RawRecord::test_record("IND-NO-DEBT");
    raw.estimated_income = 80_000.0;
    raw.bank_deposits = 5_000.0;
    let assessment = score(&enriched(raw), &cfg.scoring);

    assert_eq!(assessment.components.debt_burden, 0.0);
    assert_eq!(assessment.components.liquidity_risk, 0.0);
    assert_eq!(assessment.components.asset_backing, 0.0);
    assert!(assessment.risk_score.is_finite());
}

#[test]
fn all_zero_record_is_bounded() {
    let cfg = PipelineConfig::default_test();
    let assessment = score(&enriched(RawRecord::test_record("IND-EMPTY")), &cfg.scoring);

    let c = &assessment.components;
    for (name, v) in [
        ("debt_burden", c.debt_burden),
        ("liquidity_risk", c.liquidity_risk),
        ("credit_utilization", c.credit_utilization),
        ("asset_backing", c.asset_backing),
        ("tenure_risk", c.tenure_risk),
    ] {
        assert_unit(name, v);
    }
    assert!((0.0..=100.0).contains(&assessment.risk_score));
}

#[test]
fn extreme_ratios_are_capped() {
    let cfg = PipelineConfig::default_test();
    let mut raw = RawRecord::test_record("IND-EXTREME");
    raw.estimated_income = 1.0;
    raw.bank_loans = 1e12;
    raw.credit_card_balance = 1e9;
    raw.joined_bank = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap();
    let assessment = score(&enriched(raw), &cfg.scoring);

    assert_eq!(assessment.components.debt_burden, 1.0);
    assert_eq!(assessment.components.tenure_risk, 0.0);
    assert!(assessment.risk_score <= 100.0);
}

#[test]
fn long_tenure_and_property_reduce_score() {
    let cfg = PipelineConfig::default_test();
    let base = score(&enriched(worked_example()), &cfg.scoring);

    let mut raw = worked_example();
    raw.properties_owned = 1;
    raw.joined_bank = reference() - Duration::days(8000);
    let better = score(&enriched(raw), &cfg.scoring);

    assert_eq!(better.components.asset_backing, 0.0);
    assert_eq!(better.components.tenure_risk, 0.0);
    assert!(better.risk_score < base.risk_score);
}

#[test]
fn score_has_one_decimal() {
    let cfg = PipelineConfig::default_test();
    let assessment = score(&enriched(worked_example()), &cfg.scoring);
    let tenths = assessment.risk_score * 10.0;
    assert!((tenths - tenths.round()).abs() < 1e-9);
}

#[test]
fn category_boundaries() {
    assert_eq!(RiskCategory::from_score(0.0), RiskCategory::Low);
    assert_eq!(RiskCategory::from_score(30.0), RiskCategory::Low);
    assert_eq!(RiskCategory::from_score(30.1), RiskCategory::Moderate);
    assert_eq!(RiskCategory::from_score(60.0), RiskCategory::Moderate);
    assert_eq!(RiskCategory::from_score(60.1), RiskCategory::High);
    assert_eq!(RiskCategory::from_score(80.0), RiskCategory::High);
    assert_eq!(RiskCategory::from_score(80.1), RiskCategory::Critical);
    assert_eq!(RiskCategory::from_score(100.0), RiskCategory::Critical);
}

#[test]
fn apply_copies_score_onto_record() {
    let cfg = PipelineConfig::default_test();
    let record = enriched(worked_example());
    let assessment = score(&record, &cfg.scoring);
    let scored = apply(record, &assessment);

    assert_eq!(scored.risk_score, 57.6);
    assert_eq!(scored.risk_category, RiskCategory::Moderate);
    assert_eq!(assessment.components.client_id, "IND-WORKED");
}
