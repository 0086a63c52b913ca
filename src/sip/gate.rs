//! Lumpsum gate for SIP scoring
//!
//! Cross-metric coupling made explicit: the resolver consumes the RM's
//! Lumpsum row for the month and produces a `LumpsumGateResult` that the
//! scorer receives as a parameter. A missing row means the gate does not
//! apply.

use crate::lumpsum::LumpsumRow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LumpsumGateResult {
    pub applied: bool,
    pub reason: String,
    pub ls_net_purchase: f64,
    pub ls_aum_start: Option<f64>,
    pub ls_growth_pct: Option<f64>,
    /// The rate the Lumpsum scorer used; feeds the SIP row's lumpsum points
    pub ls_rate_used: f64,
    pub threshold_pct: f64,
    pub min_rupees: f64,
}

impl LumpsumGateResult {
    fn not_applied(reason: &str, threshold_pct: f64, min_rupees: f64) -> Self {
        Self {
            applied: false,
            reason: reason.to_string(),
            ls_net_purchase: 0.0,
            ls_aum_start: None,
            ls_growth_pct: None,
            ls_rate_used: 0.0,
            threshold_pct,
            min_rupees,
        }
    }
}

/// Evaluate the gate against an optional Lumpsum row.
/// Applied iff growth_pct <= threshold AND |net_purchase| >= min_rupees.
pub fn check_gate(
    ls_row: Option<&LumpsumRow>,
    threshold_pct: f64,
    min_rupees: f64,
) -> LumpsumGateResult {
    let Some(row) = ls_row else {
        return LumpsumGateResult::not_applied("ls_doc_not_found", threshold_pct, min_rupees);
    };

    if row.aum_start <= 0.0 {
        let mut res = LumpsumGateResult::not_applied("no_aum", threshold_pct, min_rupees);
        res.ls_net_purchase = row.net_purchase;
        res.ls_rate_used = row.rate_used;
        return res;
    }

    let growth_pct = row.net_purchase / row.aum_start * 100.0;
    let applied = growth_pct <= threshold_pct && row.net_purchase.abs() >= min_rupees;
    LumpsumGateResult {
        applied,
        reason: if applied { "gate_triggered".into() } else { "ok".into() },
        ls_net_purchase: row.net_purchase,
        ls_aum_start: Some(row.aum_start),
        ls_growth_pct: Some(growth_pct),
        ls_rate_used: row.rate_used,
        threshold_pct,
        min_rupees,
    }
}
