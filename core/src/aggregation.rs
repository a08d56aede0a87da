//! Aggregation: portfolio KPIs and per-dimension rollups over a full set of
//! scored records.
//!
//! Records are reduced in canonical client_id order, so floating-point sums
//! are bit-identical whatever order the caller supplies them in.

use crate::record::{EnrichedRecord, RiskCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Names of the 13 portfolio KPIs, in output order.
pub const KPI_NAMES: [&str; 13] = [
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
    "Average Risk Score",
];

/// Metrics emitted for every dimension value, in output order.
pub const DIMENSION_METRICS: [&str; 14] = [
    "total_clients",
    "total_loan",
    "bank_loan",
    "business_lending",
    "credit_cards_balance",
    "total_deposit",
    "bank_deposit",
    "checking_account_amount",
    "saving_account_amount",
    "foreign_currency_amount",
    "total_cc_amount",
    "total_fees",
    "engagement_days",
    "avg_risk_score",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Nationality,
    IncomeBand,
    EngagementTimeframe,
    FeeStructure,
    LoyaltyClassification,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Nationality,
        Dimension::IncomeBand,
        Dimension::EngagementTimeframe,
        Dimension::FeeStructure,
        Dimension::LoyaltyClassification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Nationality           => "nationality",
            Dimension::IncomeBand            => "income_band",
            Dimension::EngagementTimeframe   => "engagement_timeframe",
            Dimension::FeeStructure          => "fee_structure",
            Dimension::LoyaltyClassification => "loyalty_classification",
        }
    }

    /// Column header used when this dimension is exported.
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Nationality           => "Nationality",
            Dimension::IncomeBand            => "Income Band",
            Dimension::EngagementTimeframe   => "Engagement Timeframe",
            Dimension::FeeStructure          => "Fee Structure",
            Dimension::LoyaltyClassification => "Loyalty Classification",
        }
    }

    pub fn value_of(&self, record: &EnrichedRecord) -> String {
        match self {
            Dimension::Nationality           => record.raw.nationality.clone(),
            Dimension::IncomeBand            => record.income_band.to_string(),
            Dimension::EngagementTimeframe   => record.engagement_timeframe.to_string(),
            Dimension::FeeStructure          => record.raw.fee_structure.to_string(),
            Dimension::LoyaltyClassification => record.raw.loyalty_classification.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KpiValue {
    pub kpi_name: String,
    pub value: f64,
    pub formatted: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DimensionMetric {
    pub dimension_name: String,
    pub dimension_value: String,
    pub metric_name: String,
    pub metric_value: f64,
}

/// Spread of risk scores across a run, with client counts per category.
/// An empty set is all zeros; so is the standard deviation of one client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RiskDistribution {
    pub clients: u64,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation (n - 1 denominator).
    pub std_dev: f64,
    pub low: u64,
    pub moderate: u64,
    pub high: u64,
    pub critical: u64,
}

impl RiskDistribution {
    pub fn category_count(&self, category: RiskCategory) -> u64 {
        match category {
            RiskCategory::Low => self.low,
            RiskCategory::Moderate => self.moderate,
            RiskCategory::High => self.high,
            RiskCategory::Critical => self.critical,
        }
    }

    /// (label, value) pairs in report order.
    pub fn rows(&self) -> [(&'static str, f64); 10] {
        [
            ("Total Clients", self.clients as f64),
            ("Mean Risk Score", self.mean),
            ("Median Risk Score", self.median),
            ("Min Risk Score", self.min),
            ("Max Risk Score", self.max),
            ("Std Dev", self.std_dev),
            ("Low Risk (0-30)", self.low as f64),
            ("Moderate Risk (31-60)", self.moderate as f64),
            ("High Risk (61-80)", self.high as f64),
            ("Critical Risk (81-100)", self.critical as f64),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Totals {
    clients: u64,
    total_loan: f64,
    bank_loans: f64,
    business_lending: f64,
    credit_card_balance: f64,
    total_deposit: f64,
    bank_deposits: f64,
    checking_accounts: f64,
    saving_accounts: f64,
    foreign_currency_account: f64,
    credit_cards: u64,
    total_fees: f64,
    engagement_days: i64,
    risk_score_sum: f64,
}

impl Totals {
    fn add(&mut self, r: &EnrichedRecord) {
        self.clients += 1;
        self.total_loan += r.total_loan;
        self.bank_loans += r.raw.bank_loans;
        self.business_lending += r.raw.business_lending;
        self.credit_card_balance += r.raw.credit_card_balance;
        self.total_deposit += r.total_deposit;
        self.bank_deposits += r.raw.bank_deposits;
        self.checking_accounts += r.raw.checking_accounts;
        self.saving_accounts += r.raw.saving_accounts;
        self.foreign_currency_account += r.raw.foreign_currency_account;
        self.credit_cards += u64::from(r.raw.amount_of_credit_cards);
        self.total_fees += r.total_fees;
        self.engagement_days += r.engagement_days;
        self.risk_score_sum += r.risk_score;
    }

    /// Mean over an empty set is 0, not NaN.
    fn avg_risk_score(&self) -> f64 {
        if self.clients == 0 {
            0.0
        } else {
            self.risk_score_sum / self.clients as f64
        }
    }

    fn metric_values(&self) -> [f64; 14] {
        [
            self.clients as f64,
            self.total_loan,
            self.bank_loans,
            self.business_lending,
            self.credit_card_balance,
            self.total_deposit,
            self.bank_deposits,
            self.checking_accounts,
            self.saving_accounts,
            self.foreign_currency_account,
            self.credit_cards as f64,
            self.total_fees,
            self.engagement_days as f64,
            self.avg_risk_score(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum KpiKind {
    Count,
    Money,
    Score,
}

fn kpi_kind(kpi_name: &str) -> KpiKind {
    match kpi_name {
        "Total Clients" | "Total CC Amount" => KpiKind::Count,
        "Average Risk Score" => KpiKind::Score,
        _ => KpiKind::Money,
    }
}

/// Integer with thousands separators: 1234567 -> "1,234,567".
pub fn format_count(value: f64) -> String {
    let n = value.round() as i64;
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}

pub fn format_money(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("${:.2}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("${:.2}K", value / 1_000.0)
    } else {
        format!("${value:.2}")
    }
}

pub fn format_kpi(kpi_name: &str, value: f64) -> String {
    match kpi_kind(kpi_name) {
        KpiKind::Count => format_count(value),
        KpiKind::Money => format_money(value),
        KpiKind::Score => format!("{value:.1}"),
    }
}

fn canonical_order(records: &[EnrichedRecord]) -> Vec<&EnrichedRecord> {
    let mut ordered: Vec<&EnrichedRecord> = records.iter().collect();
    ordered.sort_by(|a, b| {
        a.raw
            .client_id
            .cmp(&b.raw.client_id)
            .then(a.raw.source_row.cmp(&b.raw.source_row))
    });
    ordered
}

fn summarise(totals: &Totals) -> Vec<KpiValue> {
    let values = [
        totals.clients as f64,
        totals.total_loan,
        totals.bank_loans,
        totals.business_lending,
        totals.credit_card_balance,
        totals.total_deposit,
        totals.bank_deposits,
        totals.checking_accounts,
        totals.saving_accounts,
        totals.foreign_currency_account,
        totals.credit_cards as f64,
        totals.total_fees,
        totals.avg_risk_score(),
    ];
    KPI_NAMES
        .iter()
        .zip(values)
        .map(|(name, value)| KpiValue {
            kpi_name: name.to_string(),
            value,
            formatted: format_kpi(name, value),
        })
        .collect()
}

/// The 13 portfolio KPIs.
pub fn kpi_summary(records: &[EnrichedRecord]) -> Vec<KpiValue> {
    let mut totals = Totals::default();
    for r in canonical_order(records) {
        totals.add(r);
    }
    summarise(&totals)
}

/// Per-value rollup for one dimension, sorted by dimension value ascending.
/// Values that never occur produce no rows.
pub fn kpi_by_dimension(records: &[EnrichedRecord], dimension: Dimension) -> Vec<DimensionMetric> {
    let mut groups: BTreeMap<String, Totals> = BTreeMap::new();
    for r in canonical_order(records) {
        groups.entry(dimension.value_of(r)).or_default().add(r);
    }

    let mut rows = Vec::with_capacity(groups.len() * DIMENSION_METRICS.len());
    for (value, totals) in &groups {
        for (metric, metric_value) in DIMENSION_METRICS.iter().zip(totals.metric_values()) {
            rows.push(DimensionMetric {
                dimension_name: dimension.as_str().to_string(),
                dimension_value: value.clone(),
                metric_name: metric.to_string(),
                metric_value,
            });
        }
    }
    rows
}

pub fn risk_distribution(records: &[EnrichedRecord]) -> RiskDistribution {
    let ordered = canonical_order(records);
    if ordered.is_empty() {
        return RiskDistribution::default();
    }

    let mut dist = RiskDistribution {
        clients: ordered.len() as u64,
        ..Default::default()
    };
    let mut scores = Vec::with_capacity(ordered.len());
    for r in &ordered {
        scores.push(r.risk_score);
        match r.risk_category {
            RiskCategory::Low => dist.low += 1,
            RiskCategory::Moderate => dist.moderate += 1,
            RiskCategory::High => dist.high += 1,
            RiskCategory::Critical => dist.critical += 1,
        }
    }

    let n = scores.len() as f64;
    dist.mean = scores.iter().sum::<f64>() / n;
    if scores.len() > 1 {
        let squares: f64 = scores.iter().map(|s| (s - dist.mean).powi(2)).sum();
        dist.std_dev = (squares / (n - 1.0)).sqrt();
    }

    scores.sort_by(f64::total_cmp);
    let mid = scores.len() / 2;
    dist.median = if scores.len() % 2 == 0 {
        (scores[mid - 1] + scores[mid]) / 2.0
    } else {
        scores[mid]
    };
    dist.min = scores[0];
    dist.max = scores[scores.len() - 1];
    dist
}

/// Full reduction: summary plus every dimension rollup.
pub fn aggregate(records: &[EnrichedRecord]) -> (Vec<KpiValue>, Vec<DimensionMetric>) {
    let summary = kpi_summary(records);
    let by_dimension = Dimension::ALL
        .iter()
        .flat_map(|d| kpi_by_dimension(records, *d))
        .collect();
    (summary, by_dimension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_use_thousands_separators() {
        assert_eq!(format_count(0.0), "0");
        assert_eq!(format_count(999.0), "999");
        assert_eq!(format_count(1_000.0), "1,000");
        assert_eq!(format_count(1_234_567.0), "1,234,567");
    }

    #[test]
    fn money_scales_to_k_and_m() {
        assert_eq!(format_money(12.3), "$12.30");
        assert_eq!(format_money(1_500.0), "$1.50K");
        assert_eq!(format_money(2_750_000.0), "$2.75M");
    }

    #[test]
    fn kpi_formatting_by_kind() {
        assert_eq!(format_kpi("Total Clients", 3000.0), "3,000");
        assert_eq!(format_kpi("Average Risk Score", 45.26), "45.3");
        assert_eq!(format_kpi("Total Fees", 50.0), "$50.00");
    }
}
