//! Pipeline: stage wiring and the run-level rejection policy.

use bankrisk_core::{
    config::{PipelineConfig, RejectionPolicy},
    error::{PipelineError, ValidationError},
    extract::ExtractedBatch,
    pipeline::Pipeline,
    record::RawRecord,
    store::SnapshotStore,
};
use chrono::{Duration, NaiveDate};

fn store() -> SnapshotStore {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = SnapshotStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

/// Three good records and one that joins after the reference date.
fn batch_with_future_join() -> ExtractedBatch {
    let reference = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let mut records: Vec<RawRecord> = ["C1", "C2", "C3", "C4"]
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let mut raw = RawRecord::test_record(id);
            raw.source_row = i + 1;
            raw.estimated_income = 90_000.0;
            raw.bank_loans = 10_000.0;
            raw
        })
        .collect();
    records[2].joined_bank = reference + Duration::days(10);
    ExtractedBatch { source: "policy.csv".into(), records, rejections: Vec::new() }
}

#[test]
fn abort_policy_writes_nothing() {
    let mut store = store();
    let pipeline = Pipeline::new(PipelineConfig::default_test()).unwrap();

    let err = pipeline.run(&mut store, batch_with_future_join()).unwrap_err();
    match err {
        PipelineError::ValidationAborted { rejected, first } => {
            assert_eq!(rejected, 1);
            assert_eq!(first.client_id, "C3");
            assert_eq!(first.row, 3);
        }
        other => panic!("expected validation abort, got {other}"),
    }
    assert!(store.runs().unwrap().is_empty());
    assert_eq!(store.latest_run_id().unwrap(), None);
}

#[test]
fn drop_and_count_policy_records_rejections() {
    let mut store = store();
    let mut config = PipelineConfig::default_test();
    config.rejection_policy = RejectionPolicy::DropAndCount;
    let pipeline = Pipeline::new(config).unwrap();

    let outcome = pipeline.run(&mut store, batch_with_future_join()).unwrap();
    assert_eq!(outcome.records_extracted, 4);
    assert_eq!(outcome.records_loaded, 3);
    assert_eq!(outcome.records_rejected, 1);

    assert_eq!(store.record_count(outcome.run_id).unwrap(), 3);
    assert_eq!(store.rejection_count(outcome.run_id).unwrap(), 1);
    let run = store.run(outcome.run_id).unwrap().unwrap();
    assert_eq!(run.records_rejected, 1);
    assert_eq!(run.records_extracted, 4);

    let summary = store.latest_kpi_summary().unwrap();
    assert_eq!(summary[0].value, 3.0);
}

#[test]
fn extract_rejections_follow_the_same_policy() {
    let mut batch = batch_with_future_join();
    batch.records.remove(2);
    batch
        .rejections
        .push(ValidationError::new(9, "C9", "Bank Loans", "is not numeric: 'x'"));

    let mut store = store();
    let err = Pipeline::new(PipelineConfig::default_test())
        .unwrap()
        .run(&mut store, batch.clone())
        .unwrap_err();
    assert!(matches!(err, PipelineError::ValidationAborted { rejected: 1, .. }));

    let mut config = PipelineConfig::default_test();
    config.rejection_policy = RejectionPolicy::DropAndCount;
    let outcome = Pipeline::new(config).unwrap().run(&mut store, batch).unwrap();
    assert_eq!(outcome.records_loaded, 3);
    assert_eq!(store.rejection_count(outcome.run_id).unwrap(), 1);
}

#[test]
fn build_snapshot_pairs_records_with_components() {
    let mut config = PipelineConfig::default_test();
    config.rejection_policy = RejectionPolicy::DropAndCount;
    let snapshot = Pipeline::new(config)
        .unwrap()
        .build_snapshot(batch_with_future_join())
        .unwrap();

    assert_eq!(snapshot.record_count(), 3);
    assert_eq!(snapshot.components.len(), 3);
    for (r, c) in snapshot.records.iter().zip(&snapshot.components) {
        assert_eq!(r.client_id(), c.client_id);
    }
    assert_eq!(snapshot.rejections.len(), 1);
    assert_eq!(snapshot.kpi("Total Clients").unwrap().value, 3.0);
}

#[test]
fn invalid_config_is_refused_up_front() {
    let mut config = PipelineConfig::default_test();
    config.scoring.weights.debt_burden = 0.9;
    assert!(matches!(
        Pipeline::new(config),
        Err(PipelineError::Configuration(_))
    ));
}

#[test]
fn reference_date_comes_from_config() {
    let pipeline = Pipeline::new(PipelineConfig::default_test()).unwrap();
    assert_eq!(
        pipeline.reference_date(),
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    );
}
