//! Rupee incentive computation
//!
//! Converts a public row's points into rupees: insurance payout slab on
//! effective insurance points, MF tier factor on start-of-month AUM, and a
//! flat rupee rate per referral point.

use super::public_row::{LeaderBucket, RupeeIncentive};
use crate::config::{InsuranceConfig, ReferralConfig, SipConfig};
use crate::insurance::scorer::payout_slab_for;
use crate::sip::scorer::tier_for_points;

/// Inputs for one row's incentive computation
pub struct IncentiveBasis<'a> {
    pub ins_config: &'a InsuranceConfig,
    pub sip_config: &'a SipConfig,
    pub referral_config: &'a ReferralConfig,

    pub ins_points: f64,
    pub mf_points: f64,
    pub ref_points: f64,

    /// Leader credit added when this RM is the designated leader of a bucket
    pub leader_ins_points: f64,
    pub leader_mf_points: f64,

    pub is_investment_rm: bool,
    pub fresh_premium: f64,
    pub renewal_premium: f64,
    pub aum_start: f64,
    pub adj_rupees_total: f64,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn compute_incentive(basis: &IncentiveBasis) -> RupeeIncentive {
    let ins_points_effective = basis.ins_points + basis.leader_ins_points;
    let table = if basis.is_investment_rm {
        &basis.ins_config.slabs_investment_rm
    } else {
        &basis.ins_config.slabs
    };
    let slab = payout_slab_for(table, ins_points_effective);
    let (ins_slab_label, ins_fresh_pct, ins_renew_pct, ins_bonus_rupees) = match slab {
        Some(s) => (s.label.clone(), s.fresh_pct, s.renew_pct, s.bonus_rupees),
        None => (String::new(), 0.0, 0.0, 0.0),
    };
    let ins_rupees_from_fresh = round2(basis.fresh_premium * ins_fresh_pct / 100.0);
    let ins_rupees_from_renew = round2(basis.renewal_premium * ins_renew_pct / 100.0);
    let ins_rupees_total = ins_bonus_rupees + ins_rupees_from_fresh + ins_rupees_from_renew;

    let mf_points_effective = basis.mf_points + basis.leader_mf_points;
    let mf_tier = tier_for_points(&basis.sip_config.tier_thresholds, mf_points_effective);
    let mf_factor = basis.sip_config.tier_factors.get(&mf_tier).copied().unwrap_or(0.0);
    let mf_rupees = round2(basis.aum_start * mf_factor);

    let ref_rupees = if basis.ref_points >= 1.0 {
        basis.ref_points * basis.referral_config.rupees_per_point
    } else {
        0.0
    };

    let total_incentive =
        ins_rupees_total + mf_rupees + ref_rupees + basis.adj_rupees_total;

    RupeeIncentive {
        ins_points_effective,
        ins_slab_label,
        ins_fresh_pct,
        ins_renew_pct,
        ins_bonus_rupees,
        ins_rupees_from_fresh,
        ins_rupees_from_renew,
        ins_rupees_total,
        mf_points_effective,
        mf_tier,
        mf_factor,
        mf_rupees,
        ref_rupees,
        adj_rupees_total: basis.adj_rupees_total,
        total_incentive,
    }
}

/// Profile-based leader bucket: MF-profile RMs roll up to the MF leader,
/// everyone else to the insurance leader
pub fn bucket_for_profile(profile: &str) -> LeaderBucket {
    if profile.to_lowercase().contains("mutual fund") {
        LeaderBucket::Mf
    } else {
        LeaderBucket::Ins
    }
}
