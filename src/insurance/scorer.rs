//! Per-policy insurance scoring and monthly aggregation
//!
//! Each policy is classified (fresh vs renewal, with the portability rules),
//! scored from its slab table, then weighted by tenure, category,
//! deductible, associate, cashback and company rules. Monthly rows aggregate
//! per RM and carry the payout-slab block plus periodic rupee bonuses.

use super::types::*;
use crate::config::store::SCHEMA_VERSION;
use crate::config::{InsuranceConfig, PayoutSlab};
use crate::identity::{title_case, Directory, SkipList};
use crate::window::{fy_bounds, is_quarter_end, quarter_bounds, Month};
use chrono::NaiveDateTime;
use log::{info, warn};
use std::collections::{BTreeMap, HashMap};

/// The renewal cliff slab; never assigned without a days-to-renewal figure
const RENEWAL_FLOOR_POINTS: f64 = -200.0;

/// Everything an insurance scoring run reads
pub struct InsuranceScoreInputs<'a> {
    pub config: &'a InsuranceConfig,
    pub config_hash: &'a str,
    pub config_fallback_used: bool,
    pub directory: &'a Directory,
    pub skip: &'a SkipList,
    /// Previously persisted monthly rows, for premium streaks and periodic
    /// bonus accumulation
    pub history: &'a HashMap<(String, Month), InsuranceMonthlyRow>,
    pub now: NaiveDateTime,
}

/// Days from conversion to the renewal due date (renewal_date when present,
/// else the day before the current policy start). Positive = converted
/// early, negative = converted after the due date.
fn days_to_renewal(policy: &PolicyRecord) -> Option<i64> {
    let due = policy
        .renewal_date
        .or_else(|| policy.policy_start.map(|d| d - chrono::Duration::days(1)))?;
    Some((due - policy.conversion_date).num_days())
}

/// Policy term in whole years, rounded up; a 370-day tolerance band keeps
/// ~1-year policies at one year. Missing dates default to 1.
fn term_years(policy: &PolicyRecord) -> u32 {
    let (Some(start), Some(end)) = (policy.policy_start, policy.policy_end) else {
        return 1;
    };
    let days = (end - start).num_days();
    if days <= 370 {
        return 1;
    }
    (((days + 364) / 365) as u32).max(1)
}

/// Classification with the portability rules:
/// - portability without a renewal date is fresh;
/// - portability with a renewal date is a renewal (upsell-eligible only when
///   last year's premium is known);
/// - health / personal-accident with no days-to-renewal is a renewal;
/// - otherwise substring matching on conversion status / policy type.
fn classify(policy: &PolicyRecord, dtr: Option<i64>) -> (Classification, bool) {
    let port = policy.is_portability();
    if port {
        if policy.renewal_date.is_none() {
            return (Classification::Fresh, false);
        }
        return (Classification::Renewal, policy.last_year_premium > 0.0);
    }

    let type_lc = policy.policy_type.to_lowercase();
    let status_lc = policy.conversion_status.to_lowercase();
    let health_like = type_lc.contains("health") || type_lc.contains("personal accident");
    if health_like && dtr.is_none() {
        return (Classification::Renewal, policy.last_year_premium > 0.0);
    }

    if status_lc.contains("renew") || type_lc.contains("renew") {
        (Classification::Renewal, policy.last_year_premium > 0.0)
    } else {
        (Classification::Fresh, false)
    }
}

fn renewal_base_points(cfg: &InsuranceConfig, dtr: Option<i64>) -> f64 {
    // No days-to-renewal, no penalty
    let Some(days) = dtr else {
        return 0.0;
    };
    for slab in &cfg.conversion.renew_slabs {
        let min_ok = slab.min_dtr.map(|m| days >= m).unwrap_or(true);
        let max_ok = slab.max_dtr.map(|m| days < m).unwrap_or(true);
        if min_ok && max_ok {
            return slab.points;
        }
    }
    0.0
}

fn fresh_base_points(cfg: &InsuranceConfig, annualized_premium: f64) -> f64 {
    for slab in &cfg.conversion.fresh_slabs {
        let max_ok = slab.max_val.map(|m| annualized_premium < m).unwrap_or(true);
        if annualized_premium >= slab.min_val && max_ok {
            return slab.points;
        }
    }
    0.0
}

fn category_weight(cfg: &InsuranceConfig, policy_type: &str) -> f64 {
    let lc = policy_type.to_lowercase();
    for cw in &cfg.weights.categories {
        if lc.contains(&cw.keyword.to_lowercase()) {
            return cw.weight;
        }
    }
    1.0
}

fn cashback_weight(cfg: &InsuranceConfig, policy: &PolicyRecord) -> f64 {
    if policy.cashback_amount <= 0.0 || policy.this_year_premium <= 0.0 {
        return 1.0;
    }
    let cb_pct = policy.cashback_amount / policy.this_year_premium * 100.0;
    let is_term = policy.policy_type.to_lowercase().contains("term");
    let tiers = if is_term { &cfg.weights.cashback.term } else { &cfg.weights.cashback.non_term };
    for tier in tiers {
        match tier.max_pct {
            Some(max) if cb_pct < max => return tier.weight,
            None => return tier.weight,
            _ => {}
        }
    }
    1.0
}

fn company_weight(cfg: &InsuranceConfig, policy: &PolicyRecord) -> f64 {
    let Some(company) = policy.company_name.as_deref() else {
        return 1.0;
    };
    crate::config::resolve_scheme_weight(&cfg.company_rules, company, policy.conversion_date)
}

/// Score one policy. Returns None for records the run cannot key.
pub fn score_policy(
    inputs: &InsuranceScoreInputs,
    policy: &PolicyRecord,
) -> Option<PolicyScore> {
    let cfg = inputs.config;

    if cfg.options.skip_empty_policy_numbers && policy.policy_number.trim().is_empty() {
        warn!("[Insurance] Skipping lead={} with empty policy number", policy.lead_id);
        return None;
    }
    if inputs.skip.contains(&policy.processing_user_name) {
        return None;
    }

    let employee_name = title_case(&policy.processing_user_name);
    let employee_id = policy
        .processing_user_id
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| employee_name.clone());
    if employee_name.is_empty() {
        warn!("[Insurance] Skipping lead={} with no processing user", policy.lead_id);
        return None;
    }

    let dtr = days_to_renewal(policy);
    let (classification, upsell_eligible) = classify(policy, dtr);
    let term = term_years(policy);

    let mut base_points = match classification {
        Classification::Renewal => renewal_base_points(cfg, dtr),
        Classification::Fresh => {
            fresh_base_points(cfg, policy.this_year_premium / term.max(1) as f64)
        }
    };

    let mut sanity_adjusted = false;
    // Invariant: the cliff slab requires an actual days-to-renewal figure
    if dtr.is_none() && base_points == RENEWAL_FLOOR_POINTS {
        base_points = 0.0;
        sanity_adjusted = true;
    }
    // Fresh rows can never carry renewal-slab negatives
    if classification == Classification::Fresh
        && base_points < 0.0
        && cfg.options.auto_correct_fresh
    {
        base_points = fresh_base_points(cfg, policy.this_year_premium / term.max(1) as f64);
        sanity_adjusted = true;
    }

    // Upsell on renewals with a known prior premium
    let upsell_points = if classification == Classification::Renewal
        && upsell_eligible
        && policy.this_year_premium > policy.last_year_premium
        && policy.last_year_premium > 0.0
    {
        let delta = policy.this_year_premium - policy.last_year_premium;
        ((delta / term.max(1) as f64) / cfg.conversion.upsell_divisor).floor()
    } else {
        0.0
    };

    let tenure = match classification {
        Classification::Fresh => cfg.weights.tenure.fresh.weight(term),
        Classification::Renewal => {
            if base_points >= 0.0 {
                cfg.weights.tenure.renewal_positive.weight(term)
            } else {
                cfg.weights.tenure.renewal_negative.weight(term)
            }
        }
    };
    let weight_parts = WeightParts {
        tenure,
        category: category_weight(cfg, &policy.policy_type),
        deductible: if classification == Classification::Fresh && policy.deductible_added {
            cfg.weights.deductible_weight
        } else {
            1.0
        },
        associate: if policy.direct_associate.as_deref() == Some("Associate Client") {
            cfg.weights.associate_weight
        } else {
            1.0
        },
        cashback: cashback_weight(cfg, policy),
        company: company_weight(cfg, policy),
    };
    let weight_factor = weight_parts.factor();
    let total_points = ((base_points + upsell_points) * weight_factor * 100.0).round() / 100.0;

    let fresh_premium_eligible = match classification {
        Classification::Fresh => policy.this_year_premium.max(0.0),
        Classification::Renewal => 0.0,
    };
    let renewal_premium = match classification {
        Classification::Renewal => {
            if policy.renewal_notice_premium > 0.0 {
                policy.renewal_notice_premium
            } else {
                policy.last_year_premium
            }
        }
        Classification::Fresh => 0.0,
    };

    Some(PolicyScore {
        lead_id: policy.lead_id.clone(),
        policy_number: policy.policy_number.clone(),
        employee_id,
        employee_name,
        period_month: policy.period_month(),
        classification,
        is_portability: policy.is_portability(),
        upsell_eligible,
        days_to_renewal: dtr,
        term_years: term,
        base_points,
        upsell_points,
        weight_parts,
        weight_factor,
        total_points,
        fresh_premium_eligible,
        renewal_premium,
        sanity_adjusted,
        schema_version: SCHEMA_VERSION.to_string(),
        config_hash: inputs.config_hash.to_string(),
        updated_at: inputs.now,
    })
}

/// Pick the payout slab for a points total ([min, max); open-ended last)
pub fn payout_slab_for(slabs: &[PayoutSlab], points_total: f64) -> Option<&PayoutSlab> {
    let mut sorted: Vec<&PayoutSlab> = slabs.iter().collect();
    sorted.sort_by(|a, b| {
        a.min_points
            .partial_cmp(&b.min_points)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut open_ended = None;
    for slab in sorted {
        match slab.max_points {
            Some(max) => {
                if points_total >= slab.min_points && points_total < max {
                    return Some(slab);
                }
            }
            None => open_ended = Some(slab),
        }
    }
    open_ended.filter(|s| points_total >= s.min_points)
}

fn premium_bonus(slabs: &[crate::config::PremiumBonusSlab], premium: f64) -> f64 {
    let mut bonus = 0.0;
    for slab in slabs {
        if premium >= slab.min_premium && slab.bonus_rupees > bonus {
            bonus = slab.bonus_rupees;
        }
    }
    bonus
}

/// Sum eligible fresh premium across persisted rows for months in `months`
/// before `current`, then add the current month's figure.
fn period_fresh_premium(
    history: &HashMap<(String, Month), InsuranceMonthlyRow>,
    employee_id: &str,
    months: &[Month],
    current: Month,
    current_premium: f64,
) -> f64 {
    let mut total = current_premium;
    for m in months {
        if *m >= current {
            continue;
        }
        if let Some(row) = history.get(&(employee_id.to_string(), *m)) {
            total += row.fresh_premium_eligible;
        }
    }
    total
}

/// Aggregate scored policies into monthly per-RM rows for one month
pub fn aggregate_month(
    inputs: &InsuranceScoreInputs,
    month: Month,
    scores: &[PolicyScore],
) -> Vec<InsuranceMonthlyRow> {
    let cfg = inputs.config;
    let mut by_rm: BTreeMap<String, Vec<&PolicyScore>> = BTreeMap::new();
    for s in scores.iter().filter(|s| s.period_month == month) {
        by_rm.entry(s.employee_id.clone()).or_default().push(s);
    }

    let mut rows = Vec::with_capacity(by_rm.len());
    for (employee_id, policies) in by_rm {
        let employee_name = policies[0].employee_name.clone();

        let points_policy: f64 = policies.iter().map(|p| p.total_points).sum();
        let fresh_premium_eligible: f64 =
            policies.iter().map(|p| p.fresh_premium_eligible).sum();
        let renewal_premium: f64 = policies.iter().map(|p| p.renewal_premium).sum();
        let fresh_count =
            policies.iter().filter(|p| p.classification == Classification::Fresh).count() as u32;
        let renewal_count = policies.len() as u32 - fresh_count;

        // Fresh-premium streak from the prior month's persisted row
        let prev_streak = inputs
            .history
            .get(&(employee_id.clone(), month.prev()))
            .map(|r| r.premium_streak_months)
            .unwrap_or(0);
        let qualifies = fresh_premium_eligible >= cfg.streak_bonus.premium_threshold;
        let premium_streak_months = if qualifies { prev_streak + 1 } else { 0 };

        let mut points_bonus = 0.0;
        if qualifies {
            points_bonus += cfg.streak_bonus.monthly_points;
            if premium_streak_months == 3 {
                points_bonus += cfg.streak_bonus.hattrick_points;
            } else if premium_streak_months > 3 {
                points_bonus += cfg.streak_bonus.continuation_points;
            }
        }
        let points_total = points_policy + points_bonus;

        // Slab table depends on the RM's profile
        let profile = inputs
            .directory
            .by_id(&employee_id)
            .map(|r| r.profile.clone())
            .unwrap_or_default();
        let is_investment_rm = profile.to_lowercase().contains("mutual fund");
        let table = if is_investment_rm { &cfg.slabs_investment_rm } else { &cfg.slabs };
        let slab = payout_slab_for(table, points_total);
        let (slab_label, fresh_pct, renew_pct, bonus_rupees) = match slab {
            Some(s) => (s.label.clone(), s.fresh_pct, s.renew_pct, s.bonus_rupees),
            None => (String::new(), 0.0, 0.0, 0.0),
        };

        // Periodic rupee bonuses, credited only at period ends
        let fy_mode = cfg.options.fy_mode;
        let qtr_bonus_rupees = if is_quarter_end(month, fy_mode) {
            let (qs, qe, _) = quarter_bounds(month, fy_mode);
            let months = Month::range_inclusive(qs, qe);
            let qtd = period_fresh_premium(
                inputs.history,
                &employee_id,
                &months,
                month,
                fresh_premium_eligible,
            );
            premium_bonus(&cfg.qtr_bonus_rupees, qtd)
        } else {
            0.0
        };
        let (_, fy_end, _) = fy_bounds(month, fy_mode);
        let annual_bonus_rupees = if month == fy_end {
            let (fs, fe, _) = fy_bounds(month, fy_mode);
            let months = Month::range_inclusive(fs, fe);
            let fytd = period_fresh_premium(
                inputs.history,
                &employee_id,
                &months,
                month,
                fresh_premium_eligible,
            );
            premium_bonus(&cfg.annual_bonus_rupees, fytd)
        } else {
            0.0
        };

        let payout_amount = fresh_premium_eligible * fresh_pct / 100.0
            + renewal_premium * renew_pct / 100.0
            + bonus_rupees
            + qtr_bonus_rupees
            + annual_bonus_rupees;

        let is_active = inputs
            .directory
            .by_id(&employee_id)
            .map(|r| r.is_active)
            .unwrap_or(false);

        rows.push(InsuranceMonthlyRow {
            employee_id: employee_id.clone(),
            employee_name,
            month,
            is_active,
            payout_eligible: inputs.directory.eligible_for_month(&employee_id, month),
            policy_count: policies.len() as u32,
            fresh_count,
            renewal_count,
            points_policy,
            points_bonus,
            points_total,
            fresh_premium_eligible,
            renewal_premium,
            premium_streak_months,
            payout: InsurancePayout {
                slab_label,
                fresh_pct,
                renew_pct,
                bonus_rupees,
                qtr_bonus_rupees,
                annual_bonus_rupees,
                payout_amount,
            },
            schema_version: SCHEMA_VERSION.to_string(),
            config_hash: inputs.config_hash.to_string(),
            config_fallback_used: inputs.config_fallback_used,
            updated_at: inputs.now,
        });
    }

    info!("[Month Done] Insurance month={} rows={}", month, rows.len());
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::default_insurance_config;
    use crate::identity::{Directory, DirectoryRecord};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn base_policy() -> PolicyRecord {
        PolicyRecord {
            lead_id: "L1".into(),
            policy_number: "P1".into(),
            client_name: None,
            conversion_date: d("2025-09-10"),
            policy_start: Some(d("2025-09-15")),
            policy_end: Some(d("2026-09-14")),
            renewal_date: None,
            this_year_premium: 80_000.0,
            last_year_premium: 0.0,
            renewal_notice_premium: 0.0,
            policy_type: "Health".into(),
            conversion_status: "Converted".into(),
            processing_user_id: Some("E300".into()),
            processing_user_name: "Sumit Chadha".into(),
            direct_associate: None,
            deductible_added: false,
            cashback_amount: 0.0,
            eldest_member_dob: None,
            company_name: None,
        }
    }

    struct Fixture {
        config: InsuranceConfig,
        directory: Directory,
        skip: SkipList,
        history: HashMap<(String, Month), InsuranceMonthlyRow>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                config: default_insurance_config(),
                directory: Directory::with_records(vec![DirectoryRecord {
                    employee_id: "E300".into(),
                    full_name: "Sumit Chadha".into(),
                    email: None,
                    profile: "Insurance".into(),
                    is_active: true,
                    inactive_since: None,
                    team_id: None,
                    reporting_manager_id: None,
                }]),
                skip: SkipList::default(),
                history: HashMap::new(),
            }
        }

        fn inputs(&self) -> InsuranceScoreInputs<'_> {
            InsuranceScoreInputs {
                config: &self.config,
                config_hash: "feedface",
                config_fallback_used: false,
                directory: &self.directory,
                skip: &self.skip,
                history: &self.history,
                now: d("2025-10-01").and_hms_opt(5, 0, 0).unwrap(),
            }
        }
    }

    #[test]
    fn test_portability_without_renewal_date_is_fresh() {
        // S4: 80k premium, 1-year term, weight 1.0 → 250 points
        let fx = Fixture::new();
        let mut p = base_policy();
        p.conversion_status = "Portability".into();
        p.renewal_date = None;
        let score = score_policy(&fx.inputs(), &p).unwrap();
        assert_eq!(score.classification, Classification::Fresh);
        assert!(score.is_portability);
        assert_relative_eq!(score.base_points, 250.0);
        assert_eq!(score.upsell_points, 0.0);
        assert_relative_eq!(score.weight_factor, 1.0);
        assert_relative_eq!(score.total_points, 250.0);
    }

    #[test]
    fn test_portability_with_renewal_date_is_renewal() {
        let fx = Fixture::new();
        let mut p = base_policy();
        p.conversion_status = "Portability".into();
        p.renewal_date = Some(d("2025-10-20"));
        p.last_year_premium = 50_000.0;
        let score = score_policy(&fx.inputs(), &p).unwrap();
        assert_eq!(score.classification, Classification::Renewal);
        assert!(score.upsell_eligible);
        // 40 days to renewal → top renewal slab
        assert_eq!(score.days_to_renewal, Some(40));
        assert_relative_eq!(score.base_points, 175.0);
    }

    #[test]
    fn test_renewal_day_bands() {
        let fx = Fixture::new();
        let cfg = &fx.config;
        assert_eq!(renewal_base_points(cfg, Some(40)), 175.0);
        assert_eq!(renewal_base_points(cfg, Some(20)), 100.0);
        assert_eq!(renewal_base_points(cfg, Some(10)), 50.0);
        assert_eq!(renewal_base_points(cfg, Some(0)), 35.0);
        assert_eq!(renewal_base_points(cfg, Some(-3)), 20.0);
        assert_eq!(renewal_base_points(cfg, Some(-10)), -100.0);
        assert_eq!(renewal_base_points(cfg, Some(-20)), -150.0);
        assert_eq!(renewal_base_points(cfg, Some(-45)), -200.0);
        // P12: no days-to-renewal, no cliff
        assert_eq!(renewal_base_points(cfg, None), 0.0);
    }

    #[test]
    fn test_upsell_points() {
        let fx = Fixture::new();
        let mut p = base_policy();
        p.conversion_status = "Renewal".into();
        p.renewal_date = Some(d("2025-10-20"));
        p.last_year_premium = 50_000.0;
        p.this_year_premium = 80_000.0;
        let score = score_policy(&fx.inputs(), &p).unwrap();
        // delta 30k over 1 year / 500 → 60
        assert_relative_eq!(score.upsell_points, 60.0);
    }

    #[test]
    fn test_category_and_associate_weights() {
        let fx = Fixture::new();
        let mut p = base_policy();
        p.policy_type = "Motor - Private Car".into();
        p.direct_associate = Some("Associate Client".into());
        let score = score_policy(&fx.inputs(), &p).unwrap();
        assert_relative_eq!(score.weight_parts.category, 0.40);
        assert_relative_eq!(score.weight_parts.associate, 0.25);
    }

    #[test]
    fn test_term_years_tolerance() {
        let mut p = base_policy();
        // 364 days → 1 year
        p.policy_start = Some(d("2025-04-01"));
        p.policy_end = Some(d("2026-03-31"));
        assert_eq!(term_years(&p), 1);
        // 732 days → 2 years
        p.policy_end = Some(d("2027-04-03"));
        assert_eq!(term_years(&p), 2);
        // Missing dates default to 1
        p.policy_end = None;
        assert_eq!(term_years(&p), 1);
    }

    #[test]
    fn test_monthly_aggregation_and_payout_slab() {
        let fx = Fixture::new();
        let inputs = fx.inputs();
        let month: Month = "2025-09".parse().unwrap();

        let mut p1 = base_policy();
        p1.this_year_premium = 250_000.0; // fresh slab 350 base
        let mut p2 = base_policy();
        p2.lead_id = "L2".into();
        p2.policy_number = "P2".into();
        p2.this_year_premium = 100_000.0; // fresh slab 250 base

        let scores: Vec<PolicyScore> = [&p1, &p2]
            .iter()
            .filter_map(|p| score_policy(&inputs, p))
            .collect();
        let rows = aggregate_month(&inputs, month, &scores);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.policy_count, 2);
        assert_relative_eq!(row.points_policy, 600.0);
        // 350k fresh premium crosses the 300k streak threshold
        assert_eq!(row.premium_streak_months, 1);
        assert_relative_eq!(row.points_bonus, 2_000.0);
        assert_relative_eq!(row.points_total, 2_600.0);
        // 2600 points land in the open-ended Master slab
        assert_eq!(row.payout.slab_label, "Master");
        assert_relative_eq!(row.payout.fresh_pct, 1.25);
        // payout = 350000 × 1.25% + 2000 slab bonus + qtr bonus (Sep is
        // quarter-end but default quarterly slabs pay 0)
        assert_relative_eq!(row.payout.payout_amount, 350_000.0 * 0.0125 + 2_000.0);
    }

    #[test]
    fn test_premium_streak_hattrick() {
        let mut fx = Fixture::new();
        let aug: Month = "2025-08".parse().unwrap();
        let sep: Month = "2025-09".parse().unwrap();
        let mut p = base_policy();
        p.this_year_premium = 400_000.0;

        // Seed a prior row with a 2-month streak
        let (scores, prior) = {
            let inputs = fx.inputs();
            let scores = vec![score_policy(&inputs, &p).unwrap()];
            let mut prior = aggregate_month(&inputs, sep, &scores)[0].clone();
            prior.month = aug;
            prior.premium_streak_months = 2;
            (scores, prior)
        };
        fx.history.insert(("E300".into(), aug), prior);

        let inputs = fx.inputs();
        let rows = aggregate_month(&inputs, sep, &scores);
        let row = &rows[0];
        assert_eq!(row.premium_streak_months, 3);
        // 2000 monthly + 5000 hat-trick
        assert_relative_eq!(row.points_bonus, 7_000.0);
    }
}
