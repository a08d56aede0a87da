//! Extract: parse a banking CSV extract into typed RawRecords.
//!
//! Every row either becomes a fully typed RawRecord or a ValidationError
//! naming the row, the client and the offending column. Nothing is coerced:
//! a blank or non-numeric balance is an error, not a zero.
//! Columns the pipeline derives itself (Total Loan, Risk Weighting, ...) are
//! ignored if present.

use crate::{
    error::{PipelineError, PipelineResult, ValidationError},
    record::{FeeStructure, RawRecord},
};
use chrono::NaiveDate;
use std::{io::Read, path::Path, str::FromStr};

pub const REQUIRED_COLUMNS: [&str; 24] = [
    "Client ID",
    "Name",
    "Age",
    "Location ID",
    "Joined Bank",
    "Banking Contact",
    "Nationality",
    "Occupation",
    "Fee Structure",
    "Loyalty Classification",
    "Estimated Income",
    "Superannuation Savings",
    "Amount of Credit Cards",
    "Credit Card Balance",
    "Bank Loans",
    "Bank Deposits",
    "Checking Accounts",
    "Saving Accounts",
    "Foreign Currency Account",
    "Business Lending",
    "Properties Owned",
    "BRId",
    "GenderId",
    "IAId",
];

const DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];

/// Result of reading one extract.
#[derive(Debug, Clone, Default)]
pub struct ExtractedBatch {
    pub source: String,
    pub records: Vec<RawRecord>,
    pub rejections: Vec<ValidationError>,
}

impl ExtractedBatch {
    pub fn records_extracted(&self) -> usize {
        self.records.len() + self.rejections.len()
    }
}

struct RowReader<'a> {
    row: usize,
    client_id: String,
    record: &'a csv::ByteRecord,
    columns: &'a [usize; 24],
}

impl RowReader<'_> {
    fn column(&self, name: &str) -> usize {
        let idx = REQUIRED_COLUMNS.iter().position(|c| *c == name).unwrap_or(0);
        self.columns[idx]
    }

    fn text(&self, name: &str) -> Result<String, ValidationError> {
        let bytes = self.record.get(self.column(name)).unwrap_or_default();
        let value = std::str::from_utf8(bytes)
            .map_err(|_| ValidationError::new(self.row, &self.client_id, name, "is not valid UTF-8"))?
            .trim();
        if value.is_empty() {
            return Err(ValidationError::new(self.row, &self.client_id, name, "is missing"));
        }
        Ok(value.to_string())
    }

    fn parse<T: FromStr>(&self, name: &str) -> Result<T, ValidationError> {
        let raw = self.text(name)?;
        let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != '$').collect();
        cleaned.parse::<T>().map_err(|_| {
            ValidationError::new(self.row, &self.client_id, name, format!("is not numeric: '{raw}'"))
        })
    }

    fn amount(&self, name: &str) -> Result<f64, ValidationError> {
        let value: f64 = self.parse(name)?;
        if !value.is_finite() || value < 0.0 {
            return Err(ValidationError::new(
                self.row,
                &self.client_id,
                name,
                format!("must be a non-negative amount, got {value}"),
            ));
        }
        Ok(value)
    }

    fn date(&self, name: &str) -> Result<NaiveDate, ValidationError> {
        let raw = self.text(name)?;
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(&raw, fmt).ok())
            .ok_or_else(|| {
                ValidationError::new(self.row, &self.client_id, name, format!("is not a date: '{raw}'"))
            })
    }

    fn fee_structure(&self, name: &str) -> Result<FeeStructure, ValidationError> {
        let raw = self.text(name)?;
        FeeStructure::parse(&raw).ok_or_else(|| {
            ValidationError::new(self.row, &self.client_id, name, format!("is not Low/Mid/High: '{raw}'"))
        })
    }

    fn build(&self) -> Result<RawRecord, ValidationError> {
        Ok(RawRecord {
            source_row: self.row,
            client_id: self.text("Client ID")?,
            name: self.text("Name")?,
            age: self.parse("Age")?,
            location_id: self.parse("Location ID")?,
            joined_bank: self.date("Joined Bank")?,
            banking_contact: self.text("Banking Contact")?,
            nationality: self.text("Nationality")?,
            occupation: self.text("Occupation")?,
            fee_structure: self.fee_structure("Fee Structure")?,
            loyalty_classification: self.text("Loyalty Classification")?,
            gender_id: self.parse("GenderId")?,
            br_id: self.parse("BRId")?,
            ia_id: self.parse("IAId")?,
            estimated_income: self.amount("Estimated Income")?,
            superannuation_savings: self.amount("Superannuation Savings")?,
            amount_of_credit_cards: self.parse("Amount of Credit Cards")?,
            credit_card_balance: self.amount("Credit Card Balance")?,
            bank_loans: self.amount("Bank Loans")?,
            bank_deposits: self.amount("Bank Deposits")?,
            checking_accounts: self.amount("Checking Accounts")?,
            saving_accounts: self.amount("Saving Accounts")?,
            foreign_currency_account: self.amount("Foreign Currency Account")?,
            business_lending: self.amount("Business Lending")?,
            properties_owned: self.parse("Properties Owned")?,
        })
    }
}

fn locate_columns(headers: &csv::StringRecord) -> PipelineResult<[usize; 24]> {
    let mut columns = [0usize; 24];
    let mut missing = Vec::new();
    for (slot, name) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
        match headers.iter().position(|h| h.trim() == name) {
            Some(idx) => *slot = idx,
            None => missing.push(name),
        }
    }
    if !missing.is_empty() {
        return Err(PipelineError::Configuration(format!(
            "extract is missing required column(s): {}",
            missing.join(", ")
        )));
    }
    Ok(columns)
}

/// Parse an extract from any reader. A missing required column fails the
/// whole extract; a bad value fails only its row, including bytes that are
/// not UTF-8.
pub fn read_records<R: Read>(source: &str, reader: R) -> PipelineResult<ExtractedBatch> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let columns = locate_columns(&headers)?;
    let client_col = columns[0];

    let mut batch = ExtractedBatch {
        source: source.to_string(),
        ..Default::default()
    };

    for (idx, result) in csv_reader.byte_records().enumerate() {
        let record = result?;
        let row = idx + 1;
        let client_id = String::from_utf8_lossy(record.get(client_col).unwrap_or_default())
            .trim()
            .to_string();
        let reader = RowReader { row, client_id, record: &record, columns: &columns };
        match reader.build() {
            Ok(raw) => batch.records.push(raw),
            Err(e) => {
                log::warn!("Rejected {e}");
                batch.rejections.push(e);
            }
        }
    }

    log::info!(
        "Extracted {} record(s) from {source}, {} rejected",
        batch.records.len(),
        batch.rejections.len()
    );
    Ok(batch)
}

/// Parse an extract file. A source that cannot be opened is a configuration
/// error: nothing downstream runs.
pub fn read_csv(path: &Path) -> PipelineResult<ExtractedBatch> {
    let file = std::fs::File::open(path).map_err(|e| {
        PipelineError::Configuration(format!("Cannot open source {}: {e}", path.display()))
    })?;
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    read_records(&source, file)
}
