//! Public leaderboard aggregator
//!
//! Joins the per-metric outputs by (employee_id, month) into the canonical
//! public row, applies the inactivity gate and approved adjustments, rolls
//! 20% leader credits up per profile bucket, and reconciles the credit sums
//! in the same pass that writes them.

use super::incentives::{bucket_for_profile, compute_incentive, IncentiveBasis};
use super::public_row::*;
use crate::config::store::SCHEMA_VERSION;
use crate::config::{config_hash, InsuranceConfig, ReferralConfig, SipConfig};
use crate::identity::Directory;
use crate::insurance::InsuranceMonthlyRow;
use crate::lumpsum::LumpsumRow;
use crate::referral::ReferralRow;
use crate::sip::SipRow;
use crate::window::Month;
use chrono::NaiveDateTime;
use log::{info, warn};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Share of each RM's base total rolled up to their bucket leader
const LEADER_CREDIT_SHARE: f64 = 0.20;

/// Effective config hashes of the metric runs feeding this aggregation
#[derive(Debug, Clone)]
pub struct MetricHashes {
    pub lumpsum: String,
    pub sip: String,
    pub insurance: String,
    pub referral: String,
}

impl MetricHashes {
    /// Combined digest stamped on public rows
    pub fn combined(&self) -> String {
        config_hash(&json!({
            "lumpsum": self.lumpsum,
            "sip": self.sip,
            "insurance": self.insurance,
            "referral": self.referral,
        }))
    }
}

/// Designated leaders receiving the bucket roll-ups in the incentive block
#[derive(Debug, Clone, Default)]
pub struct LeaderAssignment {
    pub ins_leader_id: Option<String>,
    pub mf_leader_id: Option<String>,
}

/// Everything an aggregation pass reads
pub struct AggregateInputs<'a> {
    pub directory: &'a Directory,
    pub sip_config: &'a SipConfig,
    pub insurance_config: &'a InsuranceConfig,
    pub referral_config: &'a ReferralConfig,
    pub leaders: &'a LeaderAssignment,

    pub lumpsum: &'a HashMap<(String, Month), LumpsumRow>,
    pub sip: &'a HashMap<(String, Month), SipRow>,
    pub insurance: &'a HashMap<(String, Month), InsuranceMonthlyRow>,
    pub referrals: &'a [ReferralRow],
    pub adjustments: &'a [Adjustment],

    pub hashes: &'a MetricHashes,
    pub now: NaiveDateTime,
}

/// Aggregate one month into public rows, leader credits and bucket
/// reconciliations
pub fn aggregate_month(
    inputs: &AggregateInputs,
    month: Month,
) -> (Vec<PublicRow>, Vec<LeaderCredit>, Vec<LeaderReconciliation>) {
    // Candidate set: every RM any metric scored this month
    let mut candidates: BTreeSet<String> = BTreeSet::new();
    for (emp, m) in inputs.sip.keys() {
        if *m == month {
            candidates.insert(emp.clone());
        }
    }
    for (emp, m) in inputs.insurance.keys() {
        if *m == month {
            candidates.insert(emp.clone());
        }
    }
    for (emp, m) in inputs.lumpsum.keys() {
        if *m == month {
            candidates.insert(emp.clone());
        }
    }
    for r in inputs.referrals.iter().filter(|r| r.month == month) {
        candidates.insert(r.employee_id.clone());
    }

    let combined_hash = inputs.hashes.combined();
    let mut rows = Vec::with_capacity(candidates.len());
    let mut credits = Vec::new();
    let mut bucket_totals: BTreeMap<LeaderBucket, (f64, f64)> = BTreeMap::new();

    for employee_id in candidates {
        let sip_row = inputs.sip.get(&(employee_id.clone(), month));
        let ins_row = inputs.insurance.get(&(employee_id.clone(), month));
        let ls_row = inputs.lumpsum.get(&(employee_id.clone(), month));

        // The SIP scorer is authoritative for both MF point components
        let mf_sip_points = sip_row.map(|r| r.sip_points).unwrap_or(0.0);
        let mf_lumpsum_points = sip_row.map(|r| r.lumpsum_points).unwrap_or(0.0);
        let mf_points = mf_sip_points + mf_lumpsum_points;
        let ins_points = ins_row.map(|r| r.points_total).unwrap_or(0.0);
        let ref_points: f64 = inputs
            .referrals
            .iter()
            .filter(|r| r.month == month && r.employee_id == employee_id)
            .map(|r| r.points)
            .sum();
        let total_points_public = mf_points + ins_points + ref_points;

        // Identity context
        let directory_rec = inputs.directory.by_id(&employee_id);
        let rm_name = directory_rec
            .map(|r| r.full_name.clone())
            .or_else(|| sip_row.map(|r| r.employee_name.clone()))
            .or_else(|| ins_row.map(|r| r.employee_name.clone()))
            .or_else(|| ls_row.map(|r| r.employee_name.clone()))
            .unwrap_or_else(|| employee_id.clone());
        let profile = directory_rec.map(|r| r.profile.clone()).unwrap_or_default();
        let is_active = directory_rec.map(|r| r.is_active).unwrap_or(false);
        let payout_eligible = inputs.directory.eligible_for_month(&employee_id, month);

        // Approved adjustments: Points add to the final total, Rupees
        // surface only inside the incentive block
        let approved: Vec<&Adjustment> = inputs
            .adjustments
            .iter()
            .filter(|a| {
                a.employee_id == employee_id
                    && a.month == month
                    && a.status == AdjustmentStatus::Approved
            })
            .collect();
        let adj_points_total: f64 = approved
            .iter()
            .filter(|a| a.adjustment_type == AdjustmentType::Points)
            .map(|a| a.value)
            .sum();
        let adj_rupees_total: f64 = approved
            .iter()
            .filter(|a| a.adjustment_type == AdjustmentType::Rupees)
            .map(|a| a.value)
            .sum();
        let adjustments: Vec<AdjustmentView> = approved
            .iter()
            .map(|a| AdjustmentView {
                id: a.id.clone(),
                reason: a.reason.clone(),
                val: a.value,
                adjustment_type: a.adjustment_type,
            })
            .collect();

        // Leader credit: 20% of the base total into the profile bucket
        let bucket = bucket_for_profile(&profile);
        let credited = total_points_public * LEADER_CREDIT_SHARE;
        let entry = bucket_totals.entry(bucket).or_insert((0.0, 0.0));
        entry.0 += total_points_public;
        entry.1 += credited;
        credits.push(LeaderCredit {
            source: employee_id.clone(),
            period_month: month,
            bucket,
            source_points: total_points_public,
            credited_points: credited,
            updated_at: inputs.now,
        });

        // Designated leaders see their bucket's roll-up in the incentive
        let leader_ins_points = if inputs.leaders.ins_leader_id.as_deref() == Some(&employee_id) {
            bucket_rollup(inputs, month, LeaderBucket::Ins)
        } else {
            0.0
        };
        let leader_mf_points = if inputs.leaders.mf_leader_id.as_deref() == Some(&employee_id) {
            bucket_rollup(inputs, month, LeaderBucket::Mf)
        } else {
            0.0
        };

        let net_sip = sip_row.map(|r| r.net_sip).unwrap_or(0.0);
        let aum_start = sip_row
            .map(|r| r.aum_start)
            .filter(|a| *a > 0.0)
            .or_else(|| ls_row.map(|r| r.aum_start))
            .unwrap_or(0.0);
        let ins_fresh_premium = ins_row.map(|r| r.fresh_premium_eligible).unwrap_or(0.0);
        let renewal_premium = ins_row.map(|r| r.renewal_premium).unwrap_or(0.0);

        let rupee_incentive = compute_incentive(&IncentiveBasis {
            ins_config: inputs.insurance_config,
            sip_config: inputs.sip_config,
            referral_config: inputs.referral_config,
            ins_points,
            mf_points,
            ref_points,
            leader_ins_points,
            leader_mf_points,
            is_investment_rm: bucket == LeaderBucket::Mf,
            fresh_premium: ins_fresh_premium,
            renewal_premium,
            aum_start,
            adj_rupees_total,
        });

        rows.push(PublicRow {
            employee_id: employee_id.clone(),
            rm_name,
            period_month: month,
            mf_sip_points,
            mf_lumpsum_points,
            mf_points,
            ins_points,
            ref_points,
            total_points_public,
            adjustments,
            adj_points_total,
            total_points_final: total_points_public + adj_points_total,
            net_sip,
            aum_start,
            ins_fresh_premium,
            payout_eligible,
            is_active,
            profile,
            team_id: directory_rec.and_then(|r| r.team_id.clone()),
            reporting_manager_id: directory_rec.and_then(|r| r.reporting_manager_id.clone()),
            audit: PublicAudit {
                sip_tier: sip_row.map(|r| r.tier.clone()).unwrap_or_else(|| "T0".into()),
                ls_gate_applied: sip_row.map(|r| r.ls_gate_applied).unwrap_or(false),
                ins_slab_label: rupee_incentive.ins_slab_label.clone(),
                leader_bucket: bucket,
            },
            rupee_incentive,
            schema_version: SCHEMA_VERSION.to_string(),
            config_hash: combined_hash.clone(),
            updated_at: inputs.now,
        });
    }

    // Reconcile: credited must equal the 20% share of each bucket's total
    let reconciliations: Vec<LeaderReconciliation> = bucket_totals
        .into_iter()
        .map(|(bucket, (total, credited))| {
            let expected = total * LEADER_CREDIT_SHARE;
            let reconciled = (credited - expected).abs() < 1e-6;
            if !reconciled {
                warn!(
                    "[LeaderCredit] {} {} credited {} != expected {}",
                    month,
                    bucket.as_str(),
                    credited,
                    expected
                );
            }
            LeaderReconciliation {
                period_month: month,
                bucket,
                expected_points: expected,
                credited_points: credited,
                reconciled,
            }
        })
        .collect();

    info!("[Month Done] Public aggregation month={} rows={}", month, rows.len());
    (rows, credits, reconciliations)
}

/// Total bucket roll-up for a month: 20% of every bucket member's base total
fn bucket_rollup(inputs: &AggregateInputs, month: Month, bucket: LeaderBucket) -> f64 {
    let mut total = 0.0;
    let mut seen: BTreeSet<&String> = BTreeSet::new();
    for ((emp, m), row) in inputs.sip.iter() {
        if *m != month || !seen.insert(emp) {
            continue;
        }
        let profile = inputs
            .directory
            .by_id(emp)
            .map(|r| r.profile.clone())
            .unwrap_or_default();
        if bucket_for_profile(&profile) == bucket {
            total += (row.sip_points + row.lumpsum_points) * LEADER_CREDIT_SHARE;
        }
    }
    for ((emp, m), row) in inputs.insurance.iter() {
        if *m != month {
            continue;
        }
        let profile = inputs
            .directory
            .by_id(emp)
            .map(|r| r.profile.clone())
            .unwrap_or_default();
        if bucket_for_profile(&profile) == bucket {
            total += row.points_total * LEADER_CREDIT_SHARE;
        }
    }
    total
}
