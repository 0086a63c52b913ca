//! Monthly SIP rollups and incentive computation
//!
//! Rolls normalized transactions up per (RM, month), nets SWP per config,
//! derives the basis-point rate from the bonus/penalty slabs, applies the
//! Lumpsum gate, and maps combined points to a tier and trail rate.

use super::gate::{check_gate, LumpsumGateResult};
use super::types::*;
use crate::audit::TypeSum;
use crate::aum::AumBook;
use crate::config::store::SCHEMA_VERSION;
use crate::config::{SipConfig, TierThreshold};
use crate::identity::{normalize_name, Directory, SkipList};
use crate::lumpsum::LumpsumRow;
use crate::window::Month;
use chrono::NaiveDateTime;
use log::info;
use std::collections::{BTreeMap, HashMap};

/// Negative Lumpsum points reflected on a SIP row never drag below this
const LUMPSUM_POINTS_FLOOR: f64 = -5_000.0;

/// Leader roll-up share of each RM's total points
const VP_CREDIT_SHARE: f64 = 0.20;

/// Everything a SIP rollup run reads
pub struct SipScoreInputs<'a> {
    pub config: &'a SipConfig,
    pub config_hash: &'a str,
    pub config_fallback_used: bool,
    pub directory: &'a Directory,
    pub skip: &'a SkipList,
    pub aum: &'a AumBook,
    /// Lumpsum output rows, keyed (employee_id, month), for the gate
    pub lumpsum_rows: &'a HashMap<(String, Month), LumpsumRow>,
    /// Previously persisted SIP rows, for the consecutive-months streak
    pub sip_history: &'a HashMap<(String, Month), SipRow>,
    pub now: NaiveDateTime,
}

/// Outcome of the bps computation for one month
#[derive(Debug, Clone, PartialEq)]
pub struct IncentiveResult {
    pub rate_bps: f64,
    pub components: RateComponents,
    pub points: f64,
}

/// Rate and points for one month's net SIP.
/// Positive months stack base + ratio + amount + average + consistency
/// bonuses; negative months walk the penalty slabs. Points scale by the
/// horizon because one month's net SIP persists as AUM over it.
pub fn compute_incentive(
    cfg: &SipConfig,
    net_sip: f64,
    sip_to_aum: f64,
    avg_sip: f64,
    consec_positive_months: u32,
) -> IncentiveResult {
    let horizon = cfg.options.horizon_months.max(1) as f64;

    if net_sip < 0.0 {
        if !cfg.sip_penalty.enable {
            return IncentiveResult {
                rate_bps: 0.0,
                components: RateComponents::default(),
                points: 0.0,
            };
        }
        let severity = net_sip.abs();
        let mut slabs: Vec<_> = cfg.sip_penalty.slabs.iter().collect();
        slabs.sort_by(|a, b| {
            b.rate_bps
                .partial_cmp(&a.rate_bps)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut penalty_bps = 0.0;
        for s in slabs {
            let amount_hit = s.threshold_amount > 0.0 && severity >= s.threshold_amount;
            // Ratio leg only participates when a real (negative) threshold
            // is configured; 0.0 means "amount-only slab"
            let ratio_hit =
                s.threshold_ratio < 0.0 && sip_to_aum < 0.0 && sip_to_aum <= s.threshold_ratio;
            if amount_hit || ratio_hit {
                penalty_bps = -s.rate_bps;
                break;
            }
        }
        let effective_rate = penalty_bps / 10_000.0;
        let points = net_sip * effective_rate.abs() * horizon;
        return IncentiveResult {
            rate_bps: penalty_bps,
            components: RateComponents { penalty_bps, ..RateComponents::default() },
            points,
        };
    }

    let base_bps = cfg.base_bps();

    // Ratio bonus keeps the legacy strictly-greater comparison
    let mut ratio_bonus = 0.0;
    let mut ratio_slabs: Vec<_> = cfg.bonus_slabs.sip_to_aum.iter().collect();
    ratio_slabs.sort_by(|a, b| b.val.partial_cmp(&a.val).unwrap_or(std::cmp::Ordering::Equal));
    for s in ratio_slabs {
        if sip_to_aum > s.val {
            ratio_bonus = s.bps;
            break;
        }
    }

    let mut amount_bonus = 0.0;
    let mut abs_slabs: Vec<_> = cfg.bonus_slabs.absolute_sip.iter().collect();
    abs_slabs.sort_by(|a, b| b.val.partial_cmp(&a.val).unwrap_or(std::cmp::Ordering::Equal));
    for s in abs_slabs {
        if net_sip >= s.val {
            amount_bonus = s.bps;
            break;
        }
    }

    let mut avg_bonus = 0.0;
    let mut avg_slabs: Vec<_> = cfg.bonus_slabs.avg_ticket.iter().collect();
    avg_slabs.sort_by(|a, b| b.val.partial_cmp(&a.val).unwrap_or(std::cmp::Ordering::Equal));
    for s in avg_slabs {
        if avg_sip >= s.val {
            avg_bonus = s.bps;
            break;
        }
    }

    // Consistency: streak length plus optional secondary ratio/amount criteria
    let mut consistency_bonus = 0.0;
    if consec_positive_months > 0 {
        let mut cons: Vec<_> = cfg.bonus_slabs.consistency.iter().collect();
        cons.sort_by(|a, b| {
            b.min_months
                .cmp(&a.min_months)
                .then(b.bps.partial_cmp(&a.bps).unwrap_or(std::cmp::Ordering::Equal))
        });
        for s in cons {
            if consec_positive_months >= s.min_months {
                let has_criteria = s.min_ratio > 0.0 || s.min_amount > 0.0;
                if !has_criteria {
                    consistency_bonus = s.bps;
                    break;
                }
                let pass_ratio = s.min_ratio > 0.0 && sip_to_aum >= s.min_ratio;
                let pass_amount = s.min_amount > 0.0 && net_sip >= s.min_amount;
                if pass_ratio || pass_amount {
                    consistency_bonus = s.bps;
                    break;
                }
            }
        }
    }

    let rate_bps = base_bps + ratio_bonus + amount_bonus + avg_bonus + consistency_bonus;
    let points = net_sip * rate_bps / 10_000.0 * horizon;
    IncentiveResult {
        rate_bps,
        components: RateComponents {
            base_bps,
            ratio_bonus_bps: ratio_bonus,
            amount_bonus_bps: amount_bonus,
            avg_bonus_bps: avg_bonus,
            consistency_bonus_bps: consistency_bonus,
            penalty_bps: 0.0,
        },
        points,
    }
}

/// Map total points to a tier name (thresholds sorted descending before use)
pub fn tier_for_points(thresholds: &[TierThreshold], total_points: f64) -> String {
    let mut sorted: Vec<_> = thresholds.iter().collect();
    sorted.sort_by(|a, b| b.min_val.partial_cmp(&a.min_val).unwrap_or(std::cmp::Ordering::Equal));
    for t in &sorted {
        if total_points >= t.min_val {
            return t.tier.clone();
        }
    }
    sorted.last().map(|t| t.tier.clone()).unwrap_or_else(|| "T0".to_string())
}

/// Roll up normalized transactions into one row per (RM, month).
/// Months are processed ascending so the consecutive-positive streak
/// propagates correctly inside a multi-month batch.
pub fn rollup_months(inputs: &SipScoreInputs, txns: &[NormalizedTxn]) -> Vec<SipRow> {
    let cfg = inputs.config;

    // Group by (month, normalized rm). SWP-only keys still produce rows so
    // the SWP aggregates surface even when netting is off.
    let mut groups: BTreeMap<(Month, String), (String, Vec<&NormalizedTxn>)> = BTreeMap::new();
    for t in txns {
        let norm = normalize_name(&t.rm_name);
        if norm.is_empty() {
            continue;
        }
        groups
            .entry((t.month(), norm))
            .or_insert_with(|| (t.rm_name.clone(), Vec::new()))
            .1
            .push(t);
    }

    // Streak state propagated within this batch, keyed (employee_id, month)
    let mut batch_streaks: HashMap<(String, Month), u32> = HashMap::new();
    let mut rows = Vec::with_capacity(groups.len());

    for ((month, _), (display_name, group)) in groups {
        if inputs.skip.contains(&display_name) {
            continue;
        }
        let Some(identity) = inputs.directory.resolve(&display_name) else {
            continue;
        };
        let employee_id = identity
            .employee_id
            .clone()
            .unwrap_or_else(|| identity.canonical_name.clone());
        let payout_eligible = inputs.directory.eligible_by_name(&display_name, month);

        // SIP aggregates (weighted and raw)
        let mut gross_sip = 0.0;
        let mut cancel_sip = 0.0;
        let mut net_sip_core = 0.0;
        let mut gross_raw = 0.0;
        let mut cancel_raw = 0.0;
        let mut net_raw = 0.0;
        let mut reg_amounts: Vec<f64> = Vec::new();
        // SWP aggregates, always computed
        let w = &cfg.options.swp_weights;
        let mut swp_adj_reg = 0.0;
        let mut swp_adj_cancel = 0.0;
        let mut swp_adj_reg_raw = 0.0;
        let mut swp_adj_cancel_raw = 0.0;

        for t in &group {
            match t.txn_type {
                SipTxnType::Sip => {
                    let sign = t.txn_for.sign();
                    net_sip_core += t.amount * sign;
                    net_raw += t.amount_raw * sign;
                    match t.txn_for {
                        SipTxnFor::Registration => {
                            gross_sip += t.amount;
                            gross_raw += t.amount_raw;
                            reg_amounts.push(t.amount);
                        }
                        SipTxnFor::Cancellation => {
                            cancel_sip += t.amount;
                            cancel_raw += t.amount_raw;
                        }
                    }
                }
                SipTxnType::Swp => match t.txn_for {
                    SipTxnFor::Registration => {
                        swp_adj_reg += t.amount * w.registration;
                        swp_adj_reg_raw += t.amount_raw * w.registration;
                    }
                    SipTxnFor::Cancellation => {
                        swp_adj_cancel += t.amount * w.cancellation;
                        swp_adj_cancel_raw += t.amount_raw * w.cancellation;
                    }
                },
            }
        }

        let avg_sip = if reg_amounts.is_empty() {
            0.0
        } else {
            reg_amounts.iter().sum::<f64>() / reg_amounts.len() as f64
        };

        let swp_net_effect = swp_adj_reg + swp_adj_cancel;
        let net_sip = if cfg.options.include_swp {
            net_sip_core + swp_net_effect
        } else {
            net_sip_core
        };

        // Lumpsum gate and AUM sourcing
        let ls_row = inputs.lumpsum_rows.get(&(employee_id.clone(), month));
        let gate: LumpsumGateResult =
            check_gate(ls_row, cfg.options.ls_gate_pct, cfg.options.ls_gate_min_rupees);

        let mut aum_start = gate.ls_aum_start.unwrap_or(0.0);
        if aum_start <= 0.0 {
            aum_start = inputs.aum.aum_for(&display_name, month).aum;
        }
        let missing_aum = aum_start <= 0.0;
        let sip_to_aum = if missing_aum { 0.0 } else { net_sip / aum_start };

        // Streak: batch propagation first, then persisted history
        let prev_month = month.prev();
        let prev_streak = batch_streaks
            .get(&(employee_id.clone(), prev_month))
            .copied()
            .or_else(|| {
                inputs
                    .sip_history
                    .get(&(employee_id.clone(), prev_month))
                    .map(|r| r.consecutive_positive_months)
            })
            .unwrap_or(0);
        let streak = if net_sip > 0.0 { prev_streak + 1 } else { 0 };
        batch_streaks.insert((employee_id.clone(), month), streak);

        let inc = compute_incentive(cfg, net_sip, sip_to_aum, avg_sip, streak);

        // Gate zeroes positive points; penalties persist
        let sip_points = if gate.applied && inc.points > 0.0 { 0.0 } else { inc.points };

        // Lumpsum points reflected from the Lumpsum scorer's rate, floored
        let lumpsum_points = if gate.ls_rate_used > 0.0 {
            (gate.ls_net_purchase * gate.ls_rate_used).max(LUMPSUM_POINTS_FLOOR)
        } else {
            0.0
        };

        let total_points = sip_points + lumpsum_points;
        let tier = tier_for_points(&cfg.tier_thresholds, total_points);

        let scheme_bonus = (gross_sip - gross_raw) + (cancel_raw - cancel_sip)
            + (swp_adj_reg - swp_adj_reg_raw)
            + (swp_adj_cancel - swp_adj_cancel_raw);

        let audit = SipAudit {
            by_type: vec![
                TypeSum::new("SIP Registration", gross_raw),
                TypeSum::new("SIP Cancellation", cancel_raw),
                TypeSum::new("SWP Registration", swp_adj_reg_raw),
                TypeSum::new("SWP Cancellation", swp_adj_cancel_raw),
                TypeSum::new("Net SIP", net_raw + swp_adj_reg_raw + swp_adj_cancel_raw),
            ],
            scheme_bonus,
        };

        rows.push(SipRow {
            employee_id,
            employee_name: identity.canonical_name,
            rm_name: display_name,
            month,
            is_active: identity.is_active,
            payout_eligible,
            gross_sip,
            cancel_sip,
            net_sip_core,
            avg_sip,
            swp_adj_registration: swp_adj_reg,
            swp_adj_cancellation: swp_adj_cancel,
            swp_net_effect,
            net_sip,
            aum_start,
            missing_aum,
            sip_to_aum,
            ls_net_purchase: gate.ls_net_purchase,
            ls_growth_pct: gate.ls_growth_pct,
            ls_gate_applied: gate.applied,
            ls_gate_reason: gate.reason.clone(),
            sip_rate_bps: inc.rate_bps,
            rate_components: inc.components,
            consecutive_positive_months: streak,
            sip_points,
            lumpsum_points,
            total_points,
            tier,
            vp_points_credit: total_points * VP_CREDIT_SHARE,
            audit,
            schema_version: SCHEMA_VERSION.to_string(),
            config_hash: inputs.config_hash.to_string(),
            config_fallback_used: inputs.config_fallback_used,
            updated_at: inputs.now,
        });
    }

    info!("[Month Done] SIP rollup buckets={}", rows.len());
    rows
}

/// Derive per-RM trail rows and the monthly VP summary from SIP rows
pub fn aggregate_trail(
    rows: &[SipRow],
    cfg: &SipConfig,
    config_hash: &str,
    now: NaiveDateTime,
) -> (Vec<TrailRow>, Vec<VpSummaryRow>) {
    let mut trail = Vec::with_capacity(rows.len());
    let mut vp_by_month: BTreeMap<Month, f64> = BTreeMap::new();

    for row in rows {
        let monthly_factor = cfg.tier_factors.get(&row.tier).copied().unwrap_or(0.0);
        trail.push(TrailRow {
            employee_id: row.employee_id.clone(),
            employee_name: row.employee_name.clone(),
            month: row.month,
            tier: row.tier.clone(),
            total_points: row.total_points,
            sip_points: row.sip_points,
            lumpsum_points: row.lumpsum_points,
            aum_start: row.aum_start,
            monthly_factor,
            annual_factor: monthly_factor * 12.0,
            trail_amount_month: row.aum_start * monthly_factor,
            vp_points_credit: row.vp_points_credit,
            schema_version: SCHEMA_VERSION.to_string(),
            config_hash: config_hash.to_string(),
            updated_at: now,
        });
        *vp_by_month.entry(row.month).or_insert(0.0) += row.vp_points_credit;
    }

    let summaries = vp_by_month
        .into_iter()
        .map(|(month, vp_points_total)| VpSummaryRow {
            month,
            vp_points_total,
            schema_version: SCHEMA_VERSION.to_string(),
            config_hash: config_hash.to_string(),
            updated_at: now,
        })
        .collect();

    (trail, summaries)
}
