//! Built-in default configuration documents
//!
//! Stored config documents override these field by field; a metric with no
//! stored document scores with exactly these values.

use super::model::*;
use crate::window::{FyMode, RangeMode};
use std::collections::BTreeMap;

pub fn default_lumpsum_config() -> LumpsumConfig {
    LumpsumConfig {
        weights: LumpsumWeights {
            switch_in_pct: 120.0,
            switch_out_pct: 120.0,
            cob_in_pct: 50.0,
            cob_out_pct: 120.0,
            hattrick_bonus: 5000.0,
            five_streak_bonus: 500.0,
            hattrick_threshold_pct: 0.1,
            debt_bonus: DebtBonusConfig {
                enable: false,
                bonus_pct: 20.0,
                max_debt_ratio_pct: 75.0,
                debt_categories: vec!["debt".into()],
            },
            scheme_rules: Vec::new(),
            apply_to: LumpsumApplyTo::default(),
        },
        rate_slabs: vec![
            RateSlab { min_pct: 0.0, max_pct: Some(0.25), rate: 0.0006, label: "0-<0.25%".into() },
            RateSlab { min_pct: 0.25, max_pct: Some(0.5), rate: 0.0009, label: "0.25-<0.5%".into() },
            RateSlab { min_pct: 0.5, max_pct: Some(0.75), rate: 0.00115, label: "0.5-<0.75%".into() },
            RateSlab { min_pct: 0.75, max_pct: Some(1.25), rate: 0.00135, label: "0.75-<1.25%".into() },
            RateSlab { min_pct: 1.25, max_pct: Some(1.5), rate: 0.00145, label: "1.25-<1.5%".into() },
            RateSlab { min_pct: 1.5, max_pct: Some(2.0), rate: 0.00148, label: "1.5-<2%".into() },
            RateSlab { min_pct: 2.0, max_pct: None, rate: 0.0015, label: ">=2%".into() },
        ],
        meeting_slabs: vec![
            MeetingSlab { max_count: Some(5), mult: 1.0, label: "0-5".into() },
            MeetingSlab { max_count: Some(11), mult: 1.05, label: "6-11".into() },
            MeetingSlab { max_count: Some(17), mult: 1.075, label: "12-17".into() },
            MeetingSlab { max_count: None, mult: 1.10, label: "18+".into() },
        ],
        ls_penalty: LsPenaltyConfig {
            enable: true,
            strategy: PenaltyStrategy::Min,
            slabs: vec![
                // High negative: growth <= -1.0%
                LsPenaltySlab {
                    max_growth_pct: -1.0,
                    trail_pct: 0.5,
                    cap_rupees: 5000.0,
                    flat_rupees: 0.0,
                },
                // Moderate negative: -1.0% < growth <= -0.5%
                LsPenaltySlab {
                    max_growth_pct: -0.5,
                    trail_pct: 0.0,
                    cap_rupees: 0.0,
                    flat_rupees: 2500.0,
                },
            ],
        },
        qtr_bonus_template: BonusTemplate {
            min_positive_months: 2,
            slabs: vec![
                NpBonusSlab { min_np: 0.0, bonus_rupees: 0.0 },
                NpBonusSlab { min_np: 1_000_000.0, bonus_rupees: 0.0 },
                NpBonusSlab { min_np: 2_500_000.0, bonus_rupees: 0.0 },
                NpBonusSlab { min_np: 5_000_000.0, bonus_rupees: 0.0 },
            ],
        },
        annual_bonus_template: BonusTemplate {
            min_positive_months: 6,
            slabs: vec![
                NpBonusSlab { min_np: 0.0, bonus_rupees: 0.0 },
                NpBonusSlab { min_np: 3_000_000.0, bonus_rupees: 0.0 },
                NpBonusSlab { min_np: 7_500_000.0, bonus_rupees: 0.0 },
                NpBonusSlab { min_np: 12_000_000.0, bonus_rupees: 0.0 },
            ],
        },
        category_rules: CategoryRules {
            blacklisted_categories: vec![
                "liquid".into(),
                "overnight".into(),
                "low duration".into(),
                "money market".into(),
                "ultra short".into(),
            ],
            zero_weight_purchase: true,
            zero_weight_switch_in: true,
            exclude_from_debt_bonus: true,
        },
        options: LumpsumOptions {
            range_mode: RangeMode::Last5,
            fy_mode: FyMode::FyApr,
            since_month: None,
            periodic_bonus_enable: false,
            periodic_bonus_apply: true,
            audit_mode: AuditMode::Compact,
            apply_streak_bonus: false,
            cob_in_correction_factor: 1.0,
        },
        ignored_rms: Vec::new(),
    }
}

pub fn default_sip_config() -> SipConfig {
    let mut tier_factors = BTreeMap::new();
    tier_factors.insert("T0".into(), 0.0);
    tier_factors.insert("T1".into(), 0.000016667); // annual 0.020% / 12
    tier_factors.insert("T2".into(), 0.000020833); // annual 0.025% / 12
    tier_factors.insert("T3".into(), 0.000025000); // annual 0.030% / 12
    tier_factors.insert("T4".into(), 0.000029167); // annual 0.035% / 12
    tier_factors.insert("T5".into(), 0.000033333); // annual 0.040% / 12
    tier_factors.insert("T6".into(), 0.000037500); // annual 0.045% / 12

    SipConfig {
        tier_thresholds: vec![
            TierThreshold { tier: "T6".into(), min_val: 60_000.0, label: ">=60k".into() },
            TierThreshold { tier: "T5".into(), min_val: 40_000.0, label: "40k-60k".into() },
            TierThreshold { tier: "T4".into(), min_val: 25_000.0, label: "25k-40k".into() },
            TierThreshold { tier: "T3".into(), min_val: 15_000.0, label: "15k-25k".into() },
            TierThreshold { tier: "T2".into(), min_val: 8_000.0, label: "8k-15k".into() },
            TierThreshold { tier: "T1".into(), min_val: 2_000.0, label: "2k-8k".into() },
            // Catch-all floor; JSON cannot carry -inf so a large negative stands in
            TierThreshold { tier: "T0".into(), min_val: -1.0e15, label: "<2k".into() },
        ],
        tier_factors,
        coefficients: SipCoefficients {
            sip_points_per_rupee: 0.03,
            sip_base_bps: None,
        },
        bonus_slabs: SipBonusSlabs {
            sip_to_aum: vec![
                ValBps { val: 0.0005, bps: 4.0 },
                ValBps { val: 0.0004, bps: 3.0 },
                ValBps { val: 0.0003, bps: 2.0 },
                ValBps { val: 0.0002, bps: 1.0 },
            ],
            absolute_sip: vec![
                ValBps { val: 300_000.0, bps: 3.0 },
                ValBps { val: 200_000.0, bps: 2.0 },
                ValBps { val: 100_000.0, bps: 1.0 },
                ValBps { val: 50_000.0, bps: 0.5 },
            ],
            avg_ticket: vec![
                ValBps { val: 8_000.0, bps: 2.0 },
                ValBps { val: 5_000.0, bps: 1.0 },
                ValBps { val: 3_000.0, bps: 0.5 },
            ],
            consistency: Vec::new(),
        },
        sip_penalty: SipPenaltyConfig {
            enable: true,
            slabs: vec![
                SipPenaltySlab { threshold_amount: 50_000.0, threshold_ratio: 0.0, rate_bps: 1.0 },
                SipPenaltySlab { threshold_amount: 100_000.0, threshold_ratio: 0.0, rate_bps: 2.0 },
                SipPenaltySlab {
                    threshold_amount: 999_999_999.0,
                    threshold_ratio: 0.0,
                    rate_bps: 3.0,
                },
            ],
        },
        weights: SipWeights::default(),
        options: SipOptions {
            range_mode: RangeMode::Month,
            fy_mode: FyMode::FyApr,
            audit_mode: AuditMode::Compact,
            ls_gate_pct: -3.0,
            ls_gate_min_rupees: 50_000.0,
            sip_net_mode: SipNetMode::SipOnly,
            include_swp: false,
            swp_weights: SwpWeights::default(),
            horizon_months: 24,
        },
        ignored_rms: Vec::new(),
    }
}

pub fn default_insurance_config() -> InsuranceConfig {
    let payout_slabs = vec![
        PayoutSlab {
            min_points: 0.0,
            max_points: Some(500.0),
            label: "Foundational".into(),
            fresh_pct: 0.0,
            renew_pct: 0.0,
            bonus_rupees: 0.0,
        },
        PayoutSlab {
            min_points: 500.0,
            max_points: Some(1000.0),
            label: "Accelerator".into(),
            fresh_pct: 0.5,
            renew_pct: 0.25,
            bonus_rupees: 0.0,
        },
        PayoutSlab {
            min_points: 1000.0,
            max_points: Some(1800.0),
            label: "Performer".into(),
            fresh_pct: 0.75,
            renew_pct: 0.5,
            bonus_rupees: 0.0,
        },
        PayoutSlab {
            min_points: 1800.0,
            max_points: Some(2500.0),
            label: "Achiever".into(),
            fresh_pct: 1.0,
            renew_pct: 0.75,
            bonus_rupees: 0.0,
        },
        PayoutSlab {
            min_points: 2500.0,
            max_points: None,
            label: "Master".into(),
            fresh_pct: 1.25,
            renew_pct: 1.0,
            bonus_rupees: 2000.0,
        },
    ];

    InsuranceConfig {
        slabs: payout_slabs.clone(),
        slabs_investment_rm: payout_slabs,
        conversion: ConversionRules {
            fresh_slabs: vec![
                FreshSlab { min_val: 0.0, max_val: Some(25_000.0), points: 40.0 },
                FreshSlab { min_val: 25_000.0, max_val: Some(75_000.0), points: 100.0 },
                FreshSlab { min_val: 75_000.0, max_val: Some(200_000.0), points: 250.0 },
                FreshSlab { min_val: 200_000.0, max_val: None, points: 350.0 },
            ],
            renew_slabs: vec![
                RenewSlab { min_dtr: Some(31), max_dtr: None, points: 175.0 },
                RenewSlab { min_dtr: Some(15), max_dtr: Some(31), points: 100.0 },
                RenewSlab { min_dtr: Some(8), max_dtr: Some(15), points: 50.0 },
                RenewSlab { min_dtr: Some(-1), max_dtr: Some(8), points: 35.0 },
                RenewSlab { min_dtr: Some(-7), max_dtr: Some(-1), points: 20.0 },
                RenewSlab { min_dtr: Some(-15), max_dtr: Some(-7), points: -100.0 },
                RenewSlab { min_dtr: Some(-29), max_dtr: Some(-15), points: -150.0 },
                RenewSlab { min_dtr: None, max_dtr: Some(-29), points: -200.0 },
            ],
            upsell_divisor: 500.0,
        },
        weights: InsuranceWeights {
            categories: vec![
                CategoryWeight { keyword: "gmc otc".into(), weight: 0.50 },
                CategoryWeight { keyword: "gmc".into(), weight: 0.20 },
                CategoryWeight { keyword: "gpa".into(), weight: 0.20 },
                CategoryWeight { keyword: "motor".into(), weight: 0.40 },
                CategoryWeight { keyword: "fire".into(), weight: 0.40 },
                CategoryWeight { keyword: "burglary".into(), weight: 0.40 },
                CategoryWeight { keyword: "marine".into(), weight: 0.40 },
                CategoryWeight { keyword: "misc".into(), weight: 0.40 },
                CategoryWeight { keyword: "term insurance".into(), weight: 1.00 },
                CategoryWeight { keyword: "health".into(), weight: 1.00 },
                CategoryWeight { keyword: "ulip".into(), weight: 0.00 },
                CategoryWeight { keyword: "life".into(), weight: 0.00 },
            ],
            tenure: TenureTables {
                fresh: TenureTable { by_year: vec![1.0, 1.20, 1.60, 1.75, 2.00] },
                renewal_positive: TenureTable { by_year: vec![1.0, 1.1, 1.25, 1.35, 1.5] },
                renewal_negative: TenureTable { by_year: vec![1.0, 0.9, 0.75, 0.65, 0.5] },
            },
            deductible_weight: 1.15,
            associate_weight: 0.25,
            cashback: CashbackTiers {
                term: vec![
                    CashbackTier { max_pct: Some(5.0), weight: 1.0 },
                    CashbackTier { max_pct: Some(10.0), weight: 0.8 },
                    CashbackTier { max_pct: None, weight: 0.5 },
                ],
                non_term: vec![
                    CashbackTier { max_pct: Some(2.0), weight: 1.0 },
                    CashbackTier { max_pct: Some(5.0), weight: 0.8 },
                    CashbackTier { max_pct: None, weight: 0.6 },
                ],
            },
        },
        streak_bonus: InsuranceStreakBonus {
            premium_threshold: 300_000.0,
            monthly_points: 2000.0,
            hattrick_points: 5000.0,
            continuation_points: 2000.0,
        },
        qtr_bonus_rupees: vec![
            PremiumBonusSlab { min_premium: 0.0, bonus_rupees: 0.0 },
            PremiumBonusSlab { min_premium: 1_000_000.0, bonus_rupees: 0.0 },
            PremiumBonusSlab { min_premium: 2_500_000.0, bonus_rupees: 0.0 },
        ],
        annual_bonus_rupees: vec![
            PremiumBonusSlab { min_premium: 0.0, bonus_rupees: 0.0 },
            PremiumBonusSlab { min_premium: 5_000_000.0, bonus_rupees: 0.0 },
            PremiumBonusSlab { min_premium: 10_000_000.0, bonus_rupees: 0.0 },
        ],
        options: InsuranceOptions {
            fy_mode: FyMode::FyApr,
            audit_mode: AuditMode::Compact,
            auto_correct_fresh: true,
            skip_empty_policy_numbers: true,
        },
        company_rules: Vec::new(),
        ignored_rms: Vec::new(),
    }
}

pub fn default_referral_config() -> ReferralConfig {
    ReferralConfig {
        insurance: ReferralInsurancePoints {
            self_sourced_points: 100.0,
            converter_points: 50.0,
            referrer_points: 30.0,
        },
        investment: ReferralInvestmentPoints {
            self_sourced_points: 200.0,
            converter_only_points: 50.0,
            referrer_points: 50.0,
            not_family_head_penalty_pct: 30.0,
        },
        gating: ReferralGating { inactive_months: 6 },
        rupees_per_point: 250.0,
        ignored_rms: Vec::new(),
    }
}

/// Default document for a metric as a JSON value (the shape the store keeps)
pub fn default_value(metric: Metric) -> serde_json::Value {
    match metric {
        Metric::Lumpsum => serde_json::to_value(default_lumpsum_config()),
        Metric::Sip => serde_json::to_value(default_sip_config()),
        Metric::Insurance => serde_json::to_value(default_insurance_config()),
        Metric::Referral => serde_json::to_value(default_referral_config()),
    }
    .expect("default config serializes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_roundtrip_through_json() {
        for metric in Metric::all() {
            let v = default_value(metric);
            match metric {
                Metric::Lumpsum => {
                    let cfg: LumpsumConfig = serde_json::from_value(v).unwrap();
                    assert_eq!(cfg.rate_slabs.len(), 7);
                    assert_eq!(cfg.meeting_slabs.len(), 4);
                }
                Metric::Sip => {
                    let cfg: SipConfig = serde_json::from_value(v).unwrap();
                    assert_eq!(cfg.tier_thresholds.len(), 7);
                }
                Metric::Insurance => {
                    let cfg: InsuranceConfig = serde_json::from_value(v).unwrap();
                    assert_eq!(cfg.conversion.renew_slabs.len(), 8);
                }
                Metric::Referral => {
                    let cfg: ReferralConfig = serde_json::from_value(v).unwrap();
                    assert_eq!(cfg.rupees_per_point, 250.0);
                }
            }
        }
    }

    #[test]
    fn test_rate_slab_top_is_open_ended() {
        let cfg = default_lumpsum_config();
        let top = cfg.rate_slabs.last().unwrap();
        assert!(top.max_pct.is_none());
        assert_eq!(top.rate, 0.0015);
    }
}
