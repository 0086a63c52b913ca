//! Public row, adjustment and leader-credit document types

use crate::window::Month;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentType {
    Points,
    Rupees,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentStatus {
    Pending,
    Approved,
    Rejected,
}

/// Manual adjustment; only APPROVED ones affect totals, and only additively
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub id: String,
    pub employee_id: String,
    pub month: Month,
    pub reason: String,
    pub value: f64,
    pub adjustment_type: AdjustmentType,
    pub status: AdjustmentStatus,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

/// Compact embedding of an adjustment on the public row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentView {
    pub id: String,
    pub reason: String,
    pub val: f64,
    #[serde(rename = "type")]
    pub adjustment_type: AdjustmentType,
}

/// Leader-credit bucket by profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LeaderBucket {
    #[serde(rename = "INS")]
    Ins,
    #[serde(rename = "MF")]
    Mf,
}

impl LeaderBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderBucket::Ins => "INS",
            LeaderBucket::Mf => "MF",
        }
    }
}

/// One 20% roll-up row per (source RM, month, bucket)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderCredit {
    /// The contributing RM's employee id
    pub source: String,
    pub period_month: Month,
    pub bucket: LeaderBucket,
    pub source_points: f64,
    pub credited_points: f64,
    pub updated_at: NaiveDateTime,
}

/// Reconciliation outcome per (month, bucket), folded into the credit write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderReconciliation {
    pub period_month: Month,
    pub bucket: LeaderBucket,
    pub expected_points: f64,
    pub credited_points: f64,
    pub reconciled: bool,
}

/// Rupee incentive block embedded on the public row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RupeeIncentive {
    pub ins_points_effective: f64,
    pub ins_slab_label: String,
    /// Percent values (0.5 = 0.5%)
    pub ins_fresh_pct: f64,
    pub ins_renew_pct: f64,
    pub ins_bonus_rupees: f64,
    pub ins_rupees_from_fresh: f64,
    pub ins_rupees_from_renew: f64,
    pub ins_rupees_total: f64,

    pub mf_points_effective: f64,
    pub mf_tier: String,
    pub mf_factor: f64,
    pub mf_rupees: f64,

    pub ref_rupees: f64,
    /// Approved Rupees-typed adjustments
    pub adj_rupees_total: f64,
    pub total_incentive: f64,
}

/// Compact per-row audit block for the public document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicAudit {
    pub sip_tier: String,
    pub ls_gate_applied: bool,
    pub ins_slab_label: String,
    pub leader_bucket: LeaderBucket,
}

/// One public leaderboard row per (employee_id, period_month)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicRow {
    pub employee_id: String,
    pub rm_name: String,
    pub period_month: Month,

    pub mf_sip_points: f64,
    pub mf_lumpsum_points: f64,
    pub mf_points: f64,
    pub ins_points: f64,
    pub ref_points: f64,
    pub total_points_public: f64,

    pub adjustments: Vec<AdjustmentView>,
    pub adj_points_total: f64,
    pub total_points_final: f64,

    pub net_sip: f64,
    pub aum_start: f64,
    pub ins_fresh_premium: f64,

    pub payout_eligible: bool,
    pub is_active: bool,
    pub profile: String,
    pub team_id: Option<String>,
    pub reporting_manager_id: Option<String>,

    pub rupee_incentive: RupeeIncentive,
    pub audit: PublicAudit,

    pub schema_version: String,
    pub config_hash: String,
    pub updated_at: NaiveDateTime,
}
