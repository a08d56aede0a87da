//! Export: flat CSV artifacts of the latest successful snapshot for the
//! dashboard. Read-only: nothing here writes to the store, and the pipeline
//! never reads these files back.

use crate::{
    aggregation::{Dimension, DIMENSION_METRICS},
    error::PipelineResult,
    store::SnapshotStore,
    types::RunId,
};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

pub const RECORDS_FILE: &str = "cleaned_banking.csv";
pub const KPI_SUMMARY_FILE: &str = "kpi_summary.csv";
pub const RISK_BREAKDOWN_FILE: &str = "risk_score_breakdown.csv";
pub const RISK_DISTRIBUTION_FILE: &str = "risk_distribution.csv";

const RECORD_HEADERS: [&str; 33] = [
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
    "Engagement Days",
    "Engagement Timeframe",
    "Income Band",
    "Processing Fees",
    "Total Loan",
    "Total Deposit",
    "Total Fees",
    "Risk Score",
    "Risk Category",
];

/// Column headers for DIMENSION_METRICS, same order.
const METRIC_HEADERS: [&str; 14] = [
    "Total Clients",
    "Total Loan",
    "Bank Loan",
    "Business Lending",
    "Credit Cards Balance",
    "Total Deposit",
    "Bank Deposit",
    "Checking Account Amount",
    "Saving Account Amount",
    "Foreign Currency Amount",
    "Total CC Amount",
    "Total Fees",
    "Engagement Days",
    "Avg Risk Score",
];

/// What an export wrote, and from which run.
#[derive(Debug, Clone)]
pub struct ExportManifest {
    pub run_id: RunId,
    pub files: Vec<PathBuf>,
}

pub fn dimension_file_name(dimension: Dimension) -> String {
    format!("kpi_by_{}.csv", dimension.as_str())
}

fn export_records(store: &SnapshotStore, path: &Path) -> PipelineResult<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(RECORD_HEADERS)?;
    for r in store.latest_records()? {
        let raw = &r.raw;
        w.write_record([
            raw.client_id.clone(),
            raw.name.clone(),
            raw.age.to_string(),
            raw.location_id.to_string(),
            raw.joined_bank.format("%Y-%m-%d").to_string(),
            raw.banking_contact.clone(),
            raw.nationality.clone(),
            raw.occupation.clone(),
            raw.fee_structure.to_string(),
            raw.loyalty_classification.clone(),
            raw.estimated_income.to_string(),
            raw.superannuation_savings.to_string(),
            raw.amount_of_credit_cards.to_string(),
            raw.credit_card_balance.to_string(),
            raw.bank_loans.to_string(),
            raw.bank_deposits.to_string(),
            raw.checking_accounts.to_string(),
            raw.saving_accounts.to_string(),
            raw.foreign_currency_account.to_string(),
            raw.business_lending.to_string(),
            raw.properties_owned.to_string(),
            raw.br_id.to_string(),
            raw.gender_id.to_string(),
            raw.ia_id.to_string(),
            r.engagement_days.to_string(),
            r.engagement_timeframe.to_string(),
            r.income_band.to_string(),
            r.processing_fee.to_string(),
            r.total_loan.to_string(),
            r.total_deposit.to_string(),
            r.total_fees.to_string(),
            r.risk_score.to_string(),
            r.risk_category.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn export_kpi_summary(store: &SnapshotStore, path: &Path) -> PipelineResult<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(["KPI", "Value", "Formatted"])?;
    for k in store.latest_kpi_summary()? {
        w.write_record([k.kpi_name, k.value.to_string(), k.formatted])?;
    }
    w.flush()?;
    Ok(())
}

/// One wide row per dimension value: the long-format rollup pivoted back.
fn export_dimension(store: &SnapshotStore, dimension: Dimension, path: &Path) -> PipelineResult<()> {
    let mut pivot: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for m in store.latest_kpi_by_dimension(dimension)? {
        pivot
            .entry(m.dimension_value)
            .or_default()
            .insert(m.metric_name, m.metric_value);
    }

    let mut w = csv::Writer::from_path(path)?;
    let mut header = vec![dimension.label()];
    header.extend(METRIC_HEADERS);
    w.write_record(&header)?;
    for (value, metrics) in pivot {
        let mut row = Vec::with_capacity(DIMENSION_METRICS.len() + 1);
        row.push(value);
        for metric in DIMENSION_METRICS {
            row.push(metrics.get(metric).map(|v| v.to_string()).unwrap_or_default());
        }
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

/// Component scores beside the client's name and composite score.
fn export_risk_breakdown(store: &SnapshotStore, path: &Path) -> PipelineResult<()> {
    let scored: BTreeMap<String, (String, f64)> = store
        .latest_records()?
        .into_iter()
        .map(|r| (r.raw.client_id, (r.raw.name, r.risk_score)))
        .collect();

    let mut w = csv::Writer::from_path(path)?;
    w.write_record([
        "Client ID",
        "Name",
        "Risk Score",
        "Debt Burden Score",
        "Liquidity Risk Score",
        "Credit Utilization Score",
        "Asset Backing Score",
        "Tenure Risk Score",
    ])?;
    for c in store.latest_risk_components()? {
        let (name, score) = scored
            .get(&c.client_id)
            .map(|(name, score)| (name.clone(), score.to_string()))
            .unwrap_or_default();
        w.write_record([
            c.client_id,
            name,
            score,
            c.debt_burden.to_string(),
            c.liquidity_risk.to_string(),
            c.credit_utilization.to_string(),
            c.asset_backing.to_string(),
            c.tenure_risk.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn export_risk_distribution(store: &SnapshotStore, path: &Path) -> PipelineResult<()> {
    let dist = store.latest_risk_distribution()?.unwrap_or_default();
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(["Statistic", "Value"])?;
    for (label, value) in dist.rows() {
        w.write_record([label.to_string(), value.to_string()])?;
    }
    w.flush()?;
    Ok(())
}

/// Write every artifact for the latest successful run into `out_dir`.
/// Returns None, writing nothing, when no run has succeeded yet.
pub fn export_latest(store: &SnapshotStore, out_dir: &Path) -> PipelineResult<Option<ExportManifest>> {
    store.with_read_snapshot(|store| write_all(store, out_dir))
}

fn write_all(store: &SnapshotStore, out_dir: &Path) -> PipelineResult<Option<ExportManifest>> {
    let Some(run_id) = store.latest_run_id()? else {
        log::warn!("No successful run to export");
        return Ok(None);
    };
    std::fs::create_dir_all(out_dir)?;

    let mut files = Vec::new();

    let path = out_dir.join(RECORDS_FILE);
    export_records(store, &path)?;
    files.push(path);

    let path = out_dir.join(KPI_SUMMARY_FILE);
    export_kpi_summary(store, &path)?;
    files.push(path);

    for dimension in Dimension::ALL {
        let path = out_dir.join(dimension_file_name(dimension));
        export_dimension(store, dimension, &path)?;
        files.push(path);
    }

    let path = out_dir.join(RISK_BREAKDOWN_FILE);
    export_risk_breakdown(store, &path)?;
    files.push(path);

    let path = out_dir.join(RISK_DISTRIBUTION_FILE);
    export_risk_distribution(store, &path)?;
    files.push(path);

    for f in &files {
        log::info!("run={run_id} exported {}", f.display());
    }
    Ok(Some(ExportManifest { run_id, files }))
}
