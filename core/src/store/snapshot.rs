//! Snapshot rows of one run: the insert path used by the commit and the
//! per-run counts.

use super::SnapshotStore;
use crate::{error::PipelineResult, snapshot::Snapshot, types::RunId};
use rusqlite::{params, Connection};

impl SnapshotStore {
    // ── Test / summary helpers ────────────────────────────────────────

    /// Number of enriched records stored under a run, whatever its status.
    pub fn record_count(&self, run_id: RunId) -> PipelineResult<i64> {
        self.count_for_run("enriched_records", run_id)
    }

    pub fn kpi_count(&self, run_id: RunId) -> PipelineResult<i64> {
        self.count_for_run("kpi_summary", run_id)
    }

    pub fn dimension_row_count(&self, run_id: RunId) -> PipelineResult<i64> {
        self.count_for_run("kpi_by_dimension", run_id)
    }

    pub fn rejection_count(&self, run_id: RunId) -> PipelineResult<i64> {
        self.count_for_run("record_rejections", run_id)
    }

    pub fn distribution_count(&self, run_id: RunId) -> PipelineResult<i64> {
        self.count_for_run("risk_distribution", run_id)
    }

    fn count_for_run(&self, table: &str, run_id: RunId) -> PipelineResult<i64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE run_id = ?1"),
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

pub(super) fn insert_snapshot_rows(conn: &Connection, run_id: RunId, snapshot: &Snapshot) -> rusqlite::Result<()> {
    {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO enriched_records (
                run_id, source_row, client_id, name, age, location_id, joined_bank,
                banking_contact, nationality, occupation, fee_structure,
                loyalty_classification, gender_id, br_id, ia_id, estimated_income,
                superannuation_savings, amount_of_credit_cards, credit_card_balance,
                bank_loans, bank_deposits, checking_accounts, saving_accounts,
                foreign_currency_account, business_lending, properties_owned,
                engagement_days, engagement_timeframe, income_band, processing_fee,
                total_loan, total_deposit, total_fees, risk_score, risk_category
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31, ?32,
                ?33, ?34, ?35
            )",
        )?;
        for r in &snapshot.records {
            let raw = &r.raw;
            stmt.execute(params![
                run_id,
                raw.source_row as i64,
                raw.client_id,
                raw.name,
                raw.age,
                raw.location_id,
                raw.joined_bank.format("%Y-%m-%d").to_string(),
                raw.banking_contact,
                raw.nationality,
                raw.occupation,
                raw.fee_structure.as_str(),
                raw.loyalty_classification,
                raw.gender_id,
                raw.br_id,
                raw.ia_id,
                raw.estimated_income,
                raw.superannuation_savings,
                raw.amount_of_credit_cards,
                raw.credit_card_balance,
                raw.bank_loans,
                raw.bank_deposits,
                raw.checking_accounts,
                raw.saving_accounts,
                raw.foreign_currency_account,
                raw.business_lending,
                raw.properties_owned,
                r.engagement_days,
                r.engagement_timeframe.as_str(),
                r.income_band.as_str(),
                r.processing_fee,
                r.total_loan,
                r.total_deposit,
                r.total_fees,
                r.risk_score,
                r.risk_category.as_str(),
            ])?;
        }
    }

    {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO risk_components (
                run_id, client_id, debt_burden, liquidity_risk, credit_utilization,
                asset_backing, tenure_risk
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for c in &snapshot.components {
            stmt.execute(params![
                run_id,
                c.client_id,
                c.debt_burden,
                c.liquidity_risk,
                c.credit_utilization,
                c.asset_backing,
                c.tenure_risk,
            ])?;
        }
    }

    {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO record_rejections (run_id, source_row, client_id, field, reason)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for e in &snapshot.rejections {
            stmt.execute(params![run_id, e.row as i64, e.client_id, e.field, e.reason])?;
        }
    }

    {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO kpi_summary (run_id, kpi_name, value, formatted)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for k in &snapshot.kpi_summary {
            stmt.execute(params![run_id, k.kpi_name, k.value, k.formatted])?;
        }
    }

    {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO kpi_by_dimension (
                run_id, dimension_name, dimension_value, metric_name, metric_value
            ) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for m in &snapshot.kpi_by_dimension {
            stmt.execute(params![
                run_id,
                m.dimension_name,
                m.dimension_value,
                m.metric_name,
                m.metric_value,
            ])?;
        }
    }

    let d = &snapshot.risk_distribution;
    conn.prepare_cached(
        "INSERT INTO risk_distribution (
            run_id, clients, mean_score, median_score, min_score, max_score, std_dev,
            low_count, moderate_count, high_count, critical_count
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?
    .execute(params![
        run_id,
        d.clients as i64,
        d.mean,
        d.median,
        d.min,
        d.max,
        d.std_dev,
        d.low as i64,
        d.moderate as i64,
        d.high as i64,
        d.critical as i64,
    ])?;

    Ok(())
}
