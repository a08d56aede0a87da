//! Extract: header lookup, typed parsing and per-row validation errors.

use bankrisk_core::{
    error::PipelineError,
    extract::{read_csv, read_records, REQUIRED_COLUMNS},
    record::FeeStructure,
};
use chrono::NaiveDate;
use std::path::Path;

const HEADER: &str = "Client ID,Name,Age,Location ID,Joined Bank,Banking Contact,Nationality,Occupation,Fee Structure,Loyalty Classification,Estimated Income,Superannuation Savings,Amount of Credit Cards,Credit Card Balance,Bank Loans,Bank Deposits,Checking Accounts,Saving Accounts,Foreign Currency Account,Business Lending,Properties Owned,BRId,GenderId,IAId";

const GOOD_ROW: &str = "IND81288,Raymond Mills,24,34324,05/06/2019,Anthony Torres,American,Safety Technician IV,High,Jade,75384.77,67076.09,1,484.54,1485828.64,1134475.3,112116.31,1104862.4,152764.47,1524217.03,1,1,2,16";

fn extract(rows: &[&str]) -> String {
    let mut text = String::from(HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    text
}

#[test]
fn well_formed_row_parses_to_typed_record() {
    let batch = read_records("t.csv", extract(&[GOOD_ROW]).as_bytes()).unwrap();
    assert_eq!(batch.source, "t.csv");
    assert_eq!(batch.records.len(), 1);
    assert!(batch.rejections.is_empty());

    let r = &batch.records[0];
    assert_eq!(r.source_row, 1);
    assert_eq!(r.client_id, "IND81288");
    assert_eq!(r.age, 24);
    assert_eq!(r.joined_bank, NaiveDate::from_ymd_opt(2019, 5, 6).unwrap());
    assert_eq!(r.fee_structure, FeeStructure::High);
    assert_eq!(r.estimated_income, 75384.77);
    assert_eq!(r.business_lending, 1524217.03);
    assert_eq!(r.properties_owned, 1);
    assert_eq!((r.br_id, r.gender_id, r.ia_id), (1, 2, 16));
}

#[test]
fn iso_dates_are_accepted() {
    let row = GOOD_ROW.replace("05/06/2019", "2019-05-06");
    let batch = read_records("t.csv", extract(&[&row]).as_bytes()).unwrap();
    assert_eq!(
        batch.records[0].joined_bank,
        NaiveDate::from_ymd_opt(2019, 5, 6).unwrap()
    );
}

#[test]
fn extra_and_reordered_columns_are_tolerated() {
    let header = format!("Risk Weighting,{HEADER}");
    let text = format!("{header}\n3,{GOOD_ROW}\n");
    let batch = read_records("t.csv", text.as_bytes()).unwrap();
    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records[0].client_id, "IND81288");
}

#[test]
fn missing_column_fails_whole_extract() {
    let header = HEADER.replace(",Bank Loans", "");
    let text = format!("{header}\n");
    match read_records("t.csv", text.as_bytes()) {
        Err(PipelineError::Configuration(msg)) => assert!(msg.contains("Bank Loans"), "{msg}"),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn non_numeric_value_rejects_only_its_row() {
    let bad = GOOD_ROW
        .replace("IND81288", "IND00002")
        .replace("1485828.64", "lots");
    let batch = read_records("t.csv", extract(&[GOOD_ROW, &bad]).as_bytes()).unwrap();

    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records_extracted(), 2);
    let e = &batch.rejections[0];
    assert_eq!(e.row, 2);
    assert_eq!(e.client_id, "IND00002");
    assert_eq!(e.field, "Bank Loans");
}

#[test]
fn blank_value_is_missing_not_zero() {
    let bad = GOOD_ROW.replace(",484.54,", ",,");
    let batch = read_records("t.csv", extract(&[&bad]).as_bytes()).unwrap();
    assert!(batch.records.is_empty());
    assert_eq!(batch.rejections[0].field, "Credit Card Balance");
    assert!(batch.rejections[0].reason.contains("missing"));
}

#[test]
fn negative_amount_is_rejected() {
    let bad = GOOD_ROW.replace("75384.77", "-75384.77");
    let batch = read_records("t.csv", extract(&[&bad]).as_bytes()).unwrap();
    assert_eq!(batch.rejections[0].field, "Estimated Income");
}

#[test]
fn unknown_fee_structure_is_rejected() {
    let bad = GOOD_ROW.replace(",High,", ",Premium,");
    let batch = read_records("t.csv", extract(&[&bad]).as_bytes()).unwrap();
    assert_eq!(batch.rejections[0].field, "Fee Structure");
}

#[test]
fn unopenable_source_is_configuration_error() {
    let err = read_csv(Path::new("/nonexistent/banking.csv")).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
}

#[test]
fn sample_extract_parses_cleanly() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../data/sample_banking.csv");
    let batch = read_csv(&path).unwrap();
    assert_eq!(batch.source, "sample_banking.csv");
    assert_eq!(batch.records.len(), 6);
    assert!(batch.rejections.is_empty());
    assert_eq!(REQUIRED_COLUMNS.len(), 24);
}

#[test]
fn invalid_utf8_rejects_only_its_row() {
    let bad = GOOD_ROW.replacen("IND81288", "IND00002", 1);
    let mut text = Vec::from(HEADER.as_bytes());
    text.push(b'\n');
    text.extend_from_slice(GOOD_ROW.replacen("IND81288", "IND00001", 1).as_bytes());
    text.push(b'\n');
    let (id, rest) = bad.split_once(',').unwrap();
    let (_, tail) = rest.split_once(',').unwrap();
    text.extend_from_slice(format!("{id},").as_bytes());
    text.extend_from_slice(b"Ray\xff\xfe Mills");
    text.extend_from_slice(format!(",{tail}\n").as_bytes());
    text.extend_from_slice(GOOD_ROW.replacen("IND81288", "IND00003", 1).as_bytes());
    text.push(b'\n');

    let batch = read_records("t.csv", text.as_slice()).unwrap();
    let ids: Vec<&str> = batch.records.iter().map(|r| r.client_id.as_str()).collect();
    assert_eq!(ids, vec!["IND00001", "IND00003"]);
    assert_eq!(batch.rejections.len(), 1);

    let e = &batch.rejections[0];
    assert_eq!(e.row, 2);
    assert_eq!(e.client_id, "IND00002");
    assert_eq!(e.field, "Name");
    assert!(e.reason.contains("UTF-8"), "{}", e.reason);
    assert_eq!(batch.records_extracted(), 3);
}
