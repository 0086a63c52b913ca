//! Insurance policy record and scoring types

use crate::window::Month;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Fresh vs renewal, derived during scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Fresh,
    Renewal,
}

/// One converted policy as ingested from the CRM export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub lead_id: String,
    pub policy_number: String,
    #[serde(default)]
    pub client_name: Option<String>,
    pub conversion_date: NaiveDate,
    #[serde(default)]
    pub policy_start: Option<NaiveDate>,
    #[serde(default)]
    pub policy_end: Option<NaiveDate>,
    #[serde(default)]
    pub renewal_date: Option<NaiveDate>,
    #[serde(default)]
    pub this_year_premium: f64,
    #[serde(default)]
    pub last_year_premium: f64,
    #[serde(default)]
    pub renewal_notice_premium: f64,
    #[serde(default)]
    pub policy_type: String,
    #[serde(default)]
    pub conversion_status: String,
    #[serde(default)]
    pub processing_user_id: Option<String>,
    #[serde(default)]
    pub processing_user_name: String,
    #[serde(default)]
    pub direct_associate: Option<String>,
    #[serde(default)]
    pub deductible_added: bool,
    #[serde(default)]
    pub cashback_amount: f64,
    #[serde(default)]
    pub eldest_member_dob: Option<NaiveDate>,
    #[serde(default)]
    pub company_name: Option<String>,
}

impl PolicyRecord {
    pub fn period_month(&self) -> Month {
        Month::from_date(self.conversion_date)
    }

    pub fn is_portability(&self) -> bool {
        self.policy_type.to_lowercase().contains("portability")
            || self.conversion_status.to_lowercase().contains("portability")
    }
}

/// Multiplicative weight factor broken out per leg
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightParts {
    pub tenure: f64,
    pub category: f64,
    pub deductible: f64,
    pub associate: f64,
    pub cashback: f64,
    pub company: f64,
}

impl WeightParts {
    pub fn factor(&self) -> f64 {
        self.tenure * self.category * self.deductible * self.associate * self.cashback
            * self.company
    }
}

/// Per-policy scoring output, one per (lead_id, policy_number)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyScore {
    pub lead_id: String,
    pub policy_number: String,
    pub employee_id: String,
    pub employee_name: String,
    pub period_month: Month,

    pub classification: Classification,
    pub is_portability: bool,
    pub upsell_eligible: bool,
    pub days_to_renewal: Option<i64>,
    pub term_years: u32,

    pub base_points: f64,
    pub upsell_points: f64,
    pub weight_parts: WeightParts,
    pub weight_factor: f64,
    pub total_points: f64,

    /// Fresh premium that counts toward premium bonuses
    pub fresh_premium_eligible: f64,
    /// Renewal premium that feeds the renew-percent payout leg
    pub renewal_premium: f64,

    pub sanity_adjusted: bool,

    pub schema_version: String,
    pub config_hash: String,
    pub updated_at: NaiveDateTime,
}

/// Payout block on the monthly insurance row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsurancePayout {
    pub slab_label: String,
    /// Percent values (0.5 = 0.5%)
    pub fresh_pct: f64,
    pub renew_pct: f64,
    pub bonus_rupees: f64,
    /// Credited only in quarter-end months
    pub qtr_bonus_rupees: f64,
    /// Credited only in the FY-end month
    pub annual_bonus_rupees: f64,
    pub payout_amount: f64,
}

/// One monthly insurance row per (employee_id, period_month)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceMonthlyRow {
    pub employee_id: String,
    pub employee_name: String,
    pub month: Month,
    pub is_active: bool,
    pub payout_eligible: bool,

    pub policy_count: u32,
    pub fresh_count: u32,
    pub renewal_count: u32,

    pub points_policy: f64,
    pub points_bonus: f64,
    pub points_total: f64,

    pub fresh_premium_eligible: f64,
    pub renewal_premium: f64,
    /// Consecutive months meeting the fresh-premium threshold
    pub premium_streak_months: u32,

    pub payout: InsurancePayout,

    pub schema_version: String,
    pub config_hash: String,
    pub config_fallback_used: bool,
    pub updated_at: NaiveDateTime,
}
