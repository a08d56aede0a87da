//! Typed customer records as they move through the pipeline.
//!
//! RawRecord:      one validated input row, never stored directly.
//! EnrichedRecord: RawRecord plus derived and scored fields; the unit of a
//!                 persisted snapshot.

use crate::types::ClientId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeeStructure {
    Low,
    Mid,
    High,
}

impl FeeStructure {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeStructure::Low  => "Low",
            FeeStructure::Mid  => "Mid",
            FeeStructure::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("low")  => Some(FeeStructure::Low),
            s if s.eq_ignore_ascii_case("mid")  => Some(FeeStructure::Mid),
            s if s.eq_ignore_ascii_case("high") => Some(FeeStructure::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EngagementTimeframe {
    UnderFiveYears,
    UnderTenYears,
    UnderTwentyYears,
    OverTwentyYears,
}

impl EngagementTimeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementTimeframe::UnderFiveYears   => "<5Y",
            EngagementTimeframe::UnderTenYears    => "<10Y",
            EngagementTimeframe::UnderTwentyYears => "<20Y",
            EngagementTimeframe::OverTwentyYears  => ">20Y",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "<5Y"  => Some(EngagementTimeframe::UnderFiveYears),
            "<10Y" => Some(EngagementTimeframe::UnderTenYears),
            "<20Y" => Some(EngagementTimeframe::UnderTwentyYears),
            ">20Y" => Some(EngagementTimeframe::OverTwentyYears),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IncomeBand {
    Low,
    Medium,
    High,
}

impl IncomeBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncomeBand::Low    => "Low",
            IncomeBand::Medium => "Medium",
            IncomeBand::High   => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Low"    => Some(IncomeBand::Low),
            "Medium" => Some(IncomeBand::Medium),
            "High"   => Some(IncomeBand::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskCategory {
    /// `[0,30] Low`, `(30,60] Moderate`, `(60,80] High`, `(80,100] Critical`.
    pub fn from_score(score: f64) -> Self {
        if score <= 30.0 {
            RiskCategory::Low
        } else if score <= 60.0 {
            RiskCategory::Moderate
        } else if score <= 80.0 {
            RiskCategory::High
        } else {
            RiskCategory::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Low      => "Low",
            RiskCategory::Moderate => "Moderate",
            RiskCategory::High     => "High",
            RiskCategory::Critical => "Critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Low"      => Some(RiskCategory::Low),
            "Moderate" => Some(RiskCategory::Moderate),
            "High"     => Some(RiskCategory::High),
            "Critical" => Some(RiskCategory::Critical),
            _ => None,
        }
    }
}

macro_rules! display_via_as_str {
    ($($t:ty),*) => {
        $(impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_via_as_str!(FeeStructure, EngagementTimeframe, IncomeBand, RiskCategory);

/// One validated input row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawRecord {
    /// 1-based data row in the source extract; used in error reports only.
    pub source_row: usize,
    pub client_id: ClientId,
    pub name: String,
    pub age: u32,
    pub location_id: i64,
    pub joined_bank: NaiveDate,
    pub banking_contact: String,
    pub nationality: String,
    pub occupation: String,
    pub fee_structure: FeeStructure,
    pub loyalty_classification: String,
    pub gender_id: i64,
    pub br_id: i64,
    pub ia_id: i64,
    pub estimated_income: f64,
    pub superannuation_savings: f64,
    pub amount_of_credit_cards: u32,
    pub credit_card_balance: f64,
    pub bank_loans: f64,
    pub bank_deposits: f64,
    pub checking_accounts: f64,
    pub saving_accounts: f64,
    pub foreign_currency_account: f64,
    pub business_lending: f64,
    pub properties_owned: u32,
}

impl RawRecord {
    /// A well-formed record with zero balances, for tests and tooling.
    pub fn test_record(client_id: &str) -> Self {
        Self {
            source_row: 1,
            client_id: client_id.to_string(),
            name: format!("Client {client_id}"),
            age: 40,
            location_id: 1,
            joined_bank: NaiveDate::from_ymd_opt(2015, 6, 1).unwrap_or_default(),
            banking_contact: "Unassigned".into(),
            nationality: "European".into(),
            occupation: "Engineer".into(),
            fee_structure: FeeStructure::Mid,
            loyalty_classification: "Silver".into(),
            gender_id: 1,
            br_id: 1,
            ia_id: 1,
            estimated_income: 0.0,
            superannuation_savings: 0.0,
            amount_of_credit_cards: 0,
            credit_card_balance: 0.0,
            bank_loans: 0.0,
            bank_deposits: 0.0,
            checking_accounts: 0.0,
            saving_accounts: 0.0,
            foreign_currency_account: 0.0,
            business_lending: 0.0,
            properties_owned: 0,
        }
    }

    /// Financial fields that must never be negative, by column name.
    pub fn financial_fields(&self) -> [(&'static str, f64); 9] {
        [
            ("Estimated Income", self.estimated_income),
            ("Superannuation Savings", self.superannuation_savings),
            ("Credit Card Balance", self.credit_card_balance),
            ("Bank Loans", self.bank_loans),
            ("Bank Deposits", self.bank_deposits),
            ("Checking Accounts", self.checking_accounts),
            ("Saving Accounts", self.saving_accounts),
            ("Foreign Currency Account", self.foreign_currency_account),
            ("Business Lending", self.business_lending),
        ]
    }
}

/// A raw record plus every derived field. Immutable once scored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedRecord {
    pub raw: RawRecord,
    pub engagement_days: i64,
    pub engagement_timeframe: EngagementTimeframe,
    pub income_band: IncomeBand,
    pub processing_fee: f64,
    pub total_loan: f64,
    pub total_deposit: f64,
    pub total_fees: f64,
    pub risk_score: f64,
    pub risk_category: RiskCategory,
}

impl EnrichedRecord {
    pub fn client_id(&self) -> &str {
        &self.raw.client_id
    }

    /// Bank loans + card balance + business lending.
    pub fn total_debt(&self) -> f64 {
        self.total_loan
    }

    /// Deposits readily available to service debt (foreign currency excluded).
    pub fn liquid_assets(&self) -> f64 {
        self.raw.bank_deposits + self.raw.checking_accounts + self.raw.saving_accounts
    }
}
