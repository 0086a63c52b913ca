//! SIP/SWP document and output-row types

use crate::audit::TypeSum;
use crate::window::Month;
use chrono::{NaiveDateTime, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SipTxnType {
    Sip,
    Swp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SipTxnFor {
    Registration,
    Cancellation,
}

impl SipTxnFor {
    /// Registration adds, cancellation subtracts
    pub fn sign(&self) -> f64 {
        match self {
            SipTxnFor::Registration => 1.0,
            SipTxnFor::Cancellation => -1.0,
        }
    }
}

/// Reconciliation outcome on a document or fraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconStatus {
    Reconciled,
    ReconciledWithMinor,
    #[serde(other)]
    Other,
}

impl ReconStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, ReconStatus::Reconciled | ReconStatus::ReconciledWithMinor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStatus {
    Approved,
    Rejected,
    #[serde(other)]
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validation {
    pub status: ValidationStatus,
    pub validated_at: NaiveDateTime,
}

/// A fraction of a split transaction; scored independently of its parent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fraction {
    pub line_id: String,
    pub amount: f64,
    #[serde(default)]
    pub reconciliation_status: Option<ReconStatus>,
    #[serde(default)]
    pub validations: Vec<Validation>,
}

/// One systematic-transaction document as ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SipDocument {
    pub doc_id: String,
    pub rm_name: String,
    pub transaction_type: SipTxnType,
    pub transaction_for: SipTxnFor,
    pub amount: f64,
    #[serde(default)]
    pub scheme_name: String,
    #[serde(default)]
    pub reconciliation_status: Option<ReconStatus>,
    #[serde(default)]
    pub validations: Vec<Validation>,
    #[serde(default)]
    pub fractions: Vec<Fraction>,
}

/// Where a normalized row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnSource {
    Main,
    Fraction,
}

/// One effective transaction after windowing, reconciliation filtering and
/// scheme weighting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedTxn {
    /// Latest approved validation timestamp inside the window
    pub date: NaiveDateTime,
    /// Scheme-weighted amount used for scoring
    pub amount: f64,
    /// Unweighted amount kept for the audit trail
    pub amount_raw: f64,
    pub scheme_name: String,
    pub weight: f64,
    pub txn_type: SipTxnType,
    pub txn_for: SipTxnFor,
    pub rm_name: String,
    pub source: TxnSource,
    pub parent_id: String,
    pub line_id: String,
}

impl NormalizedTxn {
    pub fn month(&self) -> Month {
        Month::from_date(self.date.date())
    }

    pub fn txn_date(&self) -> NaiveDate {
        self.date.date()
    }
}

/// Basis-point composition of the monthly SIP rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RateComponents {
    pub base_bps: f64,
    pub ratio_bonus_bps: f64,
    pub amount_bonus_bps: f64,
    pub avg_bonus_bps: f64,
    pub consistency_bonus_bps: f64,
    /// Negative months carry only this component
    pub penalty_bps: f64,
}

/// One SIP output row per (employee_id, month)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SipRow {
    pub employee_id: String,
    pub employee_name: String,
    pub rm_name: String,
    pub month: Month,
    pub is_active: bool,
    pub payout_eligible: bool,

    pub gross_sip: f64,
    pub cancel_sip: f64,
    pub net_sip_core: f64,
    pub avg_sip: f64,
    pub swp_adj_registration: f64,
    pub swp_adj_cancellation: f64,
    pub swp_net_effect: f64,
    pub net_sip: f64,

    pub aum_start: f64,
    pub missing_aum: bool,
    pub sip_to_aum: f64,

    pub ls_net_purchase: f64,
    pub ls_growth_pct: Option<f64>,
    pub ls_gate_applied: bool,
    pub ls_gate_reason: String,

    pub sip_rate_bps: f64,
    pub rate_components: RateComponents,
    pub consecutive_positive_months: u32,

    pub sip_points: f64,
    pub lumpsum_points: f64,
    pub total_points: f64,
    pub tier: String,
    /// 20% leader roll-up, informational on the row
    pub vp_points_credit: f64,

    #[serde(rename = "Audit")]
    pub audit: SipAudit,

    pub schema_version: String,
    pub config_hash: String,
    pub config_fallback_used: bool,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SipAudit {
    #[serde(rename = "ByType")]
    pub by_type: Vec<TypeSum>,
    /// Weighted minus raw across all legs
    pub scheme_bonus: f64,
}

/// Per-RM trail row derived from the SIP tier and start-of-month AUM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailRow {
    pub employee_id: String,
    pub employee_name: String,
    pub month: Month,
    pub tier: String,
    pub total_points: f64,
    pub sip_points: f64,
    pub lumpsum_points: f64,
    pub aum_start: f64,
    pub monthly_factor: f64,
    pub annual_factor: f64,
    pub trail_amount_month: f64,
    pub vp_points_credit: f64,
    pub schema_version: String,
    pub config_hash: String,
    pub updated_at: NaiveDateTime,
}

/// One summary row per month accumulating the VP credit roll-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpSummaryRow {
    pub month: Month,
    pub vp_points_total: f64,
    pub schema_version: String,
    pub config_hash: String,
    pub updated_at: NaiveDateTime,
}
