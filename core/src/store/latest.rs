//! Read side: the latest successful snapshot, through the latest_* views.
//!
//! Readers never take the commit lock. A run that failed or is still in
//! progress is invisible here by construction of the views.

use super::SnapshotStore;
use crate::{
    aggregation::{Dimension, DimensionMetric, KpiValue, RiskDistribution},
    error::PipelineResult,
    record::{EngagementTimeframe, EnrichedRecord, FeeStructure, IncomeBand, RawRecord, RiskCategory},
    risk_scoring::RiskComponents,
};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

fn decode<T>(idx: usize, value: &str, parse: impl Fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    parse(value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unexpected stored value '{value}'").into(),
        )
    })
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<EnrichedRecord> {
    let joined: String = row.get(5)?;
    let fee_structure: String = row.get(9)?;
    let timeframe: String = row.get(26)?;
    let band: String = row.get(27)?;
    let category: String = row.get(33)?;

    let raw = RawRecord {
        source_row: row.get::<_, i64>(0)? as usize,
        client_id: row.get(1)?,
        name: row.get(2)?,
        age: row.get::<_, i64>(3)? as u32,
        location_id: row.get(4)?,
        joined_bank: decode(5, &joined, |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())?,
        banking_contact: row.get(6)?,
        nationality: row.get(7)?,
        occupation: row.get(8)?,
        fee_structure: decode(9, &fee_structure, FeeStructure::parse)?,
        loyalty_classification: row.get(10)?,
        gender_id: row.get(11)?,
        br_id: row.get(12)?,
        ia_id: row.get(13)?,
        estimated_income: row.get(14)?,
        superannuation_savings: row.get(15)?,
        amount_of_credit_cards: row.get::<_, i64>(16)? as u32,
        credit_card_balance: row.get(17)?,
        bank_loans: row.get(18)?,
        bank_deposits: row.get(19)?,
        checking_accounts: row.get(20)?,
        saving_accounts: row.get(21)?,
        foreign_currency_account: row.get(22)?,
        business_lending: row.get(23)?,
        properties_owned: row.get::<_, i64>(24)? as u32,
    };

    Ok(EnrichedRecord {
        raw,
        engagement_days: row.get(25)?,
        engagement_timeframe: decode(26, &timeframe, EngagementTimeframe::parse)?,
        income_band: decode(27, &band, IncomeBand::parse)?,
        processing_fee: row.get(28)?,
        total_loan: row.get(29)?,
        total_deposit: row.get(30)?,
        total_fees: row.get(31)?,
        risk_score: row.get(32)?,
        risk_category: decode(33, &category, RiskCategory::parse)?,
    })
}

impl SnapshotStore {
    /// Run `f` inside one read transaction so every latest_* query it makes
    /// sees the same run, even if a commit lands meanwhile.
    pub fn with_read_snapshot<T>(
        &self,
        f: impl FnOnce(&Self) -> PipelineResult<T>,
    ) -> PipelineResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }

    /// Enriched records of the latest successful run, ordered by client_id.
    pub fn latest_records(&self) -> PipelineResult<Vec<EnrichedRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_row, client_id, name, age, location_id, joined_bank,
                    banking_contact, nationality, occupation, fee_structure,
                    loyalty_classification, gender_id, br_id, ia_id, estimated_income,
                    superannuation_savings, amount_of_credit_cards, credit_card_balance,
                    bank_loans, bank_deposits, checking_accounts, saving_accounts,
                    foreign_currency_account, business_lending, properties_owned,
                    engagement_days, engagement_timeframe, income_band, processing_fee,
                    total_loan, total_deposit, total_fees, risk_score, risk_category
             FROM latest_enriched_records
             ORDER BY client_id ASC",
        )?;
        let records = stmt
            .query_map([], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn latest_risk_components(&self) -> PipelineResult<Vec<RiskComponents>> {
        let mut stmt = self.conn.prepare(
            "SELECT client_id, debt_burden, liquidity_risk, credit_utilization,
                    asset_backing, tenure_risk
             FROM latest_risk_components
             ORDER BY client_id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RiskComponents {
                client_id: row.get(0)?,
                debt_burden: row.get(1)?,
                liquidity_risk: row.get(2)?,
                credit_utilization: row.get(3)?,
                asset_backing: row.get(4)?,
                tenure_risk: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// KPI summary of the latest successful run, in the order it was computed.
    pub fn latest_kpi_summary(&self) -> PipelineResult<Vec<KpiValue>> {
        let mut stmt = self.conn.prepare(
            "SELECT kpi_name, value, formatted FROM latest_kpi_summary ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(KpiValue {
                kpi_name: row.get(0)?,
                value: row.get(1)?,
                formatted: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Rollup rows of one dimension from the latest successful run, sorted by
    /// dimension value and then in metric order.
    pub fn latest_kpi_by_dimension(&self, dimension: Dimension) -> PipelineResult<Vec<DimensionMetric>> {
        let mut stmt = self.conn.prepare(
            "SELECT dimension_name, dimension_value, metric_name, metric_value
             FROM latest_kpi_by_dimension
             WHERE dimension_name = ?1
             ORDER BY dimension_value ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![dimension.as_str()], |row| {
            Ok(DimensionMetric {
                dimension_name: row.get(0)?,
                dimension_value: row.get(1)?,
                metric_name: row.get(2)?,
                metric_value: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Risk score distribution of the latest successful run.
    pub fn latest_risk_distribution(&self) -> PipelineResult<Option<RiskDistribution>> {
        let dist = self
            .conn
            .query_row(
                "SELECT clients, mean_score, median_score, min_score, max_score, std_dev,
                        low_count, moderate_count, high_count, critical_count
                 FROM latest_risk_distribution",
                [],
                |row| {
                    Ok(RiskDistribution {
                        clients: row.get::<_, i64>(0)? as u64,
                        mean: row.get(1)?,
                        median: row.get(2)?,
                        min: row.get(3)?,
                        max: row.get(4)?,
                        std_dev: row.get(5)?,
                        low: row.get::<_, i64>(6)? as u64,
                        moderate: row.get::<_, i64>(7)? as u64,
                        high: row.get::<_, i64>(8)? as u64,
                        critical: row.get::<_, i64>(9)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(dist)
    }
}
