//! Lumpsum transaction and output-row types

use crate::audit::AuditBlock;
use crate::window::Month;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six lumpsum transaction buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxnType {
    Purchase,
    Redemption,
    SwitchIn,
    SwitchOut,
    /// Change of broker, assets coming in (TICOB)
    CobIn,
    /// Change of broker, assets going out (TOCOB)
    CobOut,
}

impl TxnType {
    pub fn label(&self) -> &'static str {
        match self {
            TxnType::Purchase => "Purchase",
            TxnType::Redemption => "Redemption",
            TxnType::SwitchIn => "Switch In",
            TxnType::SwitchOut => "Switch Out",
            TxnType::CobIn => "COB In",
            TxnType::CobOut => "COB Out",
        }
    }

    pub fn all() -> [TxnType; 6] {
        [
            TxnType::Purchase,
            TxnType::Redemption,
            TxnType::SwitchIn,
            TxnType::SwitchOut,
            TxnType::CobIn,
            TxnType::CobOut,
        ]
    }
}

impl FromStr for TxnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Feeds vary between hyphenated and spaced forms
        let norm = s.trim().to_lowercase().replace(['-', '_'], " ");
        match norm.as_str() {
            "purchase" => Ok(TxnType::Purchase),
            "redemption" => Ok(TxnType::Redemption),
            "switch in" => Ok(TxnType::SwitchIn),
            "switch out" => Ok(TxnType::SwitchOut),
            "cob in" | "ticob" => Ok(TxnType::CobIn),
            "cob out" | "tocob" => Ok(TxnType::CobOut),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

impl fmt::Display for TxnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One raw lumpsum transaction. Amounts are un-weighted; weights apply only
/// at aggregation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub rm_name: String,
    pub transaction_date: NaiveDate,
    pub amount: f64,
    pub txn_type: TxnType,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub scheme_name: String,
}

/// Raw sums per bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeSums {
    pub purchase: f64,
    pub redemption: f64,
    pub switch_in: f64,
    pub switch_out: f64,
    pub cob_in: f64,
    pub cob_out: f64,
}

impl TypeSums {
    pub fn add(&mut self, t: TxnType, amount: f64) {
        match t {
            TxnType::Purchase => self.purchase += amount,
            TxnType::Redemption => self.redemption += amount,
            TxnType::SwitchIn => self.switch_in += amount,
            TxnType::SwitchOut => self.switch_out += amount,
            TxnType::CobIn => self.cob_in += amount,
            TxnType::CobOut => self.cob_out += amount,
        }
    }
}

/// Weighted legs of the net-purchase formula
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedSums {
    pub purchase: f64,
    pub switch_in: f64,
    pub cob_in: f64,
    pub debt_bonus: f64,
    /// Zero-weighted purchases, reported but never added
    pub blacklisted_purchase: f64,
    pub redemption: f64,
    pub switch_out: f64,
    pub cob_out: f64,
}

impl WeightedSums {
    pub fn additions(&self) -> f64 {
        self.purchase + self.switch_in + self.cob_in + self.debt_bonus
    }

    pub fn subtractions(&self) -> f64 {
        self.redemption + self.switch_out + self.cob_out
    }

    pub fn net_purchase(&self) -> f64 {
        self.additions() - self.subtractions()
    }
}

/// Positive-streak state carried between months.
/// Always derived from the prior month's persisted row, never from
/// module-level state, so re-aggregation stays deterministic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StreakState {
    pub positive_months: u32,
}

/// Quarterly or annual bonus projection (quarter-end months only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodProjection {
    pub period: String,
    pub net_purchase_period: f64,
    pub positive_months: u32,
    /// Zero unless qualified
    pub projected_amount: f64,
    /// What the slab would pay if qualification were met
    pub potential_amount: f64,
    pub is_qualified: bool,
    pub min_positive_months_req: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusProjection {
    pub quarterly: PeriodProjection,
    pub annual: PeriodProjection,
}

/// One Lumpsum output row per (employee_id, month)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LumpsumRow {
    pub employee_id: String,
    pub employee_name: String,
    pub month: Month,
    pub is_active: bool,
    pub payout_eligible: bool,

    pub raw: TypeSums,
    pub weighted: WeightedSums,
    pub total_additions: f64,
    pub total_subtractions: f64,
    pub net_purchase: f64,

    pub aum_start: f64,
    pub missing_aum: bool,
    pub growth_pct: f64,
    pub rate_used: f64,
    pub rate_label: String,

    pub meeting_count: u32,
    pub meeting_multiplier: f64,

    pub base_incentive: f64,
    pub penalty_rupees: f64,
    pub positive_np_streak: u32,
    pub streak_bonus_rupees: f64,
    pub final_incentive: f64,

    pub bonus_projected: Option<BonusProjection>,

    #[serde(rename = "Audit")]
    pub audit: AuditBlock,

    pub schema_version: String,
    pub config_hash: String,
    pub config_fallback_used: bool,
    pub updated_at: NaiveDateTime,
}
