//! Typed per-metric configuration documents
//!
//! The admin store persists these as JSON; unknown fields in stored documents
//! are dropped on read, missing fields inherit the built-in defaults via the
//! merge in `store.rs`.

use crate::window::{FyMode, Month, RangeMode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The four configurable scoring metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Lumpsum,
    Sip,
    Insurance,
    Referral,
}

impl Metric {
    /// Document id in the config collection
    pub fn config_id(&self) -> &'static str {
        match self {
            Metric::Lumpsum => "Leaderboard_Lumpsum",
            Metric::Sip => "Leaderboard_SIP",
            Metric::Insurance => "Leaderboard_Insurance",
            Metric::Referral => "Leaderboard_Referral",
        }
    }

    pub fn all() -> [Metric; 4] {
        [Metric::Lumpsum, Metric::Sip, Metric::Insurance, Metric::Referral]
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Lumpsum => write!(f, "lumpsum"),
            Metric::Sip => write!(f, "sip"),
            Metric::Insurance => write!(f, "insurance"),
            Metric::Referral => write!(f, "referral"),
        }
    }
}

/// Audit payload verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuditMode {
    #[default]
    Compact,
    Full,
}

/// How a scheme/company rule keyword matches a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    #[default]
    Contains,
    Startswith,
}

impl MatchType {
    pub fn matches(&self, keyword_upper: &str, candidate_upper: &str) -> bool {
        match self {
            MatchType::Exact => candidate_upper == keyword_upper,
            MatchType::Contains => candidate_upper.contains(keyword_upper),
            MatchType::Startswith => candidate_upper.starts_with(keyword_upper),
        }
    }
}

/// Scheme-specific weight override; first matching rule wins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemeRule {
    pub keyword: String,
    #[serde(default)]
    pub match_type: MatchType,
    /// Percent multiplier: 100.0 = unchanged, 0.0 = zero-weight
    pub weight_pct: f64,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl SchemeRule {
    /// Resolve the weight multiplier for a scheme on a given date.
    /// Returns None when this rule does not apply.
    pub fn weight_for(&self, scheme_upper: &str, on: NaiveDate) -> Option<f64> {
        let kw = self.keyword.trim().to_uppercase();
        if kw.is_empty() || !self.match_type.matches(&kw, scheme_upper) {
            return None;
        }
        if let Some(start) = self.start_date {
            if on < start {
                return None;
            }
        }
        if let Some(end) = self.end_date {
            if on > end {
                return None;
            }
        }
        Some(self.weight_pct / 100.0)
    }
}

/// Walk an ordered rule list; unmatched schemes keep weight 1.0
pub fn resolve_scheme_weight(rules: &[SchemeRule], scheme_name: &str, on: NaiveDate) -> f64 {
    let upper = scheme_name.trim().to_uppercase();
    if upper.is_empty() {
        return 1.0;
    }
    for rule in rules {
        if let Some(w) = rule.weight_for(&upper, on) {
            return w;
        }
    }
    1.0
}

// ---------------------------------------------------------------------------
// Lumpsum
// ---------------------------------------------------------------------------

/// Growth-percent rate slab: rate applies on [min_pct, max_pct); the
/// open-ended top slab has max_pct = None
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateSlab {
    pub min_pct: f64,
    pub max_pct: Option<f64>,
    pub rate: f64,
    #[serde(default)]
    pub label: String,
}

/// Meeting-count multiplier slab: applies when count <= max_count; the
/// catch-all has max_count = None
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingSlab {
    pub max_count: Option<u32>,
    pub mult: f64,
    #[serde(default)]
    pub label: String,
}

/// Negative-month penalty band selected by growth_pct <= max_growth_pct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsPenaltySlab {
    pub max_growth_pct: f64,
    #[serde(default)]
    pub trail_pct: f64,
    #[serde(default)]
    pub cap_rupees: f64,
    #[serde(default)]
    pub flat_rupees: f64,
}

/// How flat and percentage penalties combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PenaltyStrategy {
    /// Softer: the smaller of flat rupees and capped trail percentage
    #[default]
    Min,
    /// Harsher: the larger of the two
    Max,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsPenaltyConfig {
    pub enable: bool,
    #[serde(default)]
    pub strategy: PenaltyStrategy,
    pub slabs: Vec<LsPenaltySlab>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtBonusConfig {
    pub enable: bool,
    /// Bonus percent applied to debt purchases
    pub bonus_pct: f64,
    /// Bonus only when debt share of purchases stays under this percent
    pub max_debt_ratio_pct: f64,
    /// Substring matches against transaction sub-category
    #[serde(default)]
    pub debt_categories: Vec<String>,
}

/// Which lumpsum legs receive scheme weighting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LumpsumApplyTo {
    pub purchase: bool,
    pub switch_in: bool,
    pub redemption: bool,
    pub switch_out: bool,
    pub cob_in: bool,
    pub cob_out: bool,
}

impl Default for LumpsumApplyTo {
    fn default() -> Self {
        Self {
            purchase: true,
            switch_in: true,
            redemption: false,
            switch_out: false,
            cob_in: false,
            cob_out: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LumpsumWeights {
    pub switch_in_pct: f64,
    pub switch_out_pct: f64,
    pub cob_in_pct: f64,
    pub cob_out_pct: f64,
    pub hattrick_bonus: f64,
    pub five_streak_bonus: f64,
    /// Growth percent a month must beat to extend the positive streak
    pub hattrick_threshold_pct: f64,
    pub debt_bonus: DebtBonusConfig,
    #[serde(default)]
    pub scheme_rules: Vec<SchemeRule>,
    #[serde(default)]
    pub apply_to: LumpsumApplyTo,
}

/// NP-threshold bonus slab for quarterly / annual templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpBonusSlab {
    pub min_np: f64,
    pub bonus_rupees: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusTemplate {
    pub min_positive_months: u32,
    pub slabs: Vec<NpBonusSlab>,
}

/// Category blacklist: matching purchases and switch-ins are zero-weighted
/// and excluded from debt-bonus eligibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRules {
    pub blacklisted_categories: Vec<String>,
    pub zero_weight_purchase: bool,
    pub zero_weight_switch_in: bool,
    pub exclude_from_debt_bonus: bool,
}

impl CategoryRules {
    pub fn is_blacklisted(&self, sub_category: &str) -> bool {
        let lc = sub_category.trim().to_lowercase();
        if lc.is_empty() {
            return false;
        }
        self.blacklisted_categories
            .iter()
            .any(|term| lc.contains(&term.trim().to_lowercase()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LumpsumOptions {
    pub range_mode: RangeMode,
    pub fy_mode: FyMode,
    #[serde(default)]
    pub since_month: Option<Month>,
    pub periodic_bonus_enable: bool,
    pub periodic_bonus_apply: bool,
    pub audit_mode: AuditMode,
    pub apply_streak_bonus: bool,
    /// Extra multiplier on the weighted COB-In leg
    pub cob_in_correction_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LumpsumConfig {
    pub weights: LumpsumWeights,
    pub rate_slabs: Vec<RateSlab>,
    pub meeting_slabs: Vec<MeetingSlab>,
    pub ls_penalty: LsPenaltyConfig,
    pub qtr_bonus_template: BonusTemplate,
    pub annual_bonus_template: BonusTemplate,
    pub category_rules: CategoryRules,
    pub options: LumpsumOptions,
    #[serde(default)]
    pub ignored_rms: Vec<String>,
}

// ---------------------------------------------------------------------------
// SIP
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierThreshold {
    pub tier: String,
    pub min_val: f64,
    #[serde(default)]
    pub label: String,
}

/// Threshold → basis-point bonus pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValBps {
    pub val: f64,
    pub bps: f64,
}

/// Consistency bonus: streak length plus optional ratio/amount criteria
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencySlab {
    pub min_months: u32,
    #[serde(default)]
    pub min_ratio: f64,
    #[serde(default)]
    pub min_amount: f64,
    pub bps: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SipBonusSlabs {
    #[serde(default)]
    pub sip_to_aum: Vec<ValBps>,
    #[serde(default)]
    pub absolute_sip: Vec<ValBps>,
    #[serde(default)]
    pub avg_ticket: Vec<ValBps>,
    #[serde(default)]
    pub consistency: Vec<ConsistencySlab>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SipPenaltySlab {
    /// Triggers when |net_sip| >= threshold_amount
    #[serde(default)]
    pub threshold_amount: f64,
    /// Or when the SIP/AUM ratio is negative and <= threshold_ratio
    #[serde(default)]
    pub threshold_ratio: f64,
    pub rate_bps: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SipPenaltyConfig {
    pub enable: bool,
    pub slabs: Vec<SipPenaltySlab>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SipCoefficients {
    /// Legacy coefficient; base bps derives as coeff * 10000 / horizon
    pub sip_points_per_rupee: f64,
    /// Explicit base bps; overrides the coefficient derivation when set
    #[serde(default)]
    pub sip_base_bps: Option<f64>,
}

/// Which transaction legs receive scheme weighting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemeApplyTo {
    pub sip_registration: bool,
    pub sip_cancellation: bool,
    pub swp_registration: bool,
    pub swp_cancellation: bool,
}

impl Default for SchemeApplyTo {
    fn default() -> Self {
        Self {
            sip_registration: true,
            sip_cancellation: false,
            swp_registration: false,
            swp_cancellation: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SipWeights {
    #[serde(default)]
    pub scheme_rules: Vec<SchemeRule>,
    #[serde(default)]
    pub apply_to: SchemeApplyTo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SipNetMode {
    #[default]
    SipOnly,
    SipPlusSwp,
}

/// SWP leg weights applied when SWP nets into SIP.
/// Registration reduces net SIP; cancellation restores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwpWeights {
    pub registration: f64,
    pub cancellation: f64,
}

impl Default for SwpWeights {
    fn default() -> Self {
        Self { registration: -1.0, cancellation: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SipOptions {
    pub range_mode: RangeMode,
    pub fy_mode: FyMode,
    pub audit_mode: AuditMode,
    /// Lumpsum gate triggers at growth_pct <= ls_gate_pct ...
    pub ls_gate_pct: f64,
    /// ... when |net_purchase| >= ls_gate_min_rupees
    pub ls_gate_min_rupees: f64,
    pub sip_net_mode: SipNetMode,
    pub include_swp: bool,
    pub swp_weights: SwpWeights,
    /// Months a net SIP is assumed to persist as AUM for trail accrual
    pub horizon_months: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SipConfig {
    pub tier_thresholds: Vec<TierThreshold>,
    pub tier_factors: BTreeMap<String, f64>,
    pub coefficients: SipCoefficients,
    pub bonus_slabs: SipBonusSlabs,
    pub sip_penalty: SipPenaltyConfig,
    pub weights: SipWeights,
    pub options: SipOptions,
    #[serde(default)]
    pub ignored_rms: Vec<String>,
}

impl SipConfig {
    /// Effective base bps: explicit override wins, else derived from the
    /// points-per-rupee coefficient over the horizon
    pub fn base_bps(&self) -> f64 {
        if let Some(bps) = self.coefficients.sip_base_bps {
            return bps;
        }
        let horizon = self.options.horizon_months.max(1) as f64;
        self.coefficients.sip_points_per_rupee * 10_000.0 / horizon
    }
}

// ---------------------------------------------------------------------------
// Insurance
// ---------------------------------------------------------------------------

/// Monthly payout slab selected by points_total on [min_points, max_points)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutSlab {
    pub min_points: f64,
    pub max_points: Option<f64>,
    #[serde(default)]
    pub label: String,
    /// Percent of eligible fresh premium (0.5 = 0.5%)
    pub fresh_pct: f64,
    /// Percent of renewal premium
    pub renew_pct: f64,
    pub bonus_rupees: f64,
}

/// Fresh-policy base points by annualized premium band [min_val, max_val)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshSlab {
    pub min_val: f64,
    pub max_val: Option<f64>,
    pub points: f64,
}

/// Renewal base points by days-to-renewal band [min_dtr, max_dtr)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewSlab {
    pub min_dtr: Option<i64>,
    pub max_dtr: Option<i64>,
    pub points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRules {
    pub fresh_slabs: Vec<FreshSlab>,
    pub renew_slabs: Vec<RenewSlab>,
    pub upsell_divisor: f64,
}

/// Tenure weight by term years (index 0 = 1-year term); terms beyond the
/// table clamp to the last entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenureTable {
    pub by_year: Vec<f64>,
}

impl TenureTable {
    pub fn weight(&self, term_years: u32) -> f64 {
        if self.by_year.is_empty() {
            return 1.0;
        }
        let idx = (term_years.max(1) as usize - 1).min(self.by_year.len() - 1);
        self.by_year[idx]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenureTables {
    pub fresh: TenureTable,
    pub renewal_positive: TenureTable,
    pub renewal_negative: TenureTable,
}

/// Cashback weight tier: applies while cashback% of premium < max_pct;
/// the open-ended tier has max_pct = None
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashbackTier {
    pub max_pct: Option<f64>,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashbackTiers {
    pub term: Vec<CashbackTier>,
    pub non_term: Vec<CashbackTier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceWeights {
    /// Policy-type substring → category weight, checked in order
    pub categories: Vec<CategoryWeight>,
    pub tenure: TenureTables,
    /// Multiplier for fresh policies sold with a deductible added
    pub deductible_weight: f64,
    /// Multiplier for associate-sourced policies
    pub associate_weight: f64,
    pub cashback: CashbackTiers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWeight {
    pub keyword: String,
    pub weight: f64,
}

/// Monthly fresh-premium streak bonuses (points, not rupees)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceStreakBonus {
    /// Fresh + portability premium a month must reach to count
    pub premium_threshold: f64,
    /// Points for each qualifying month
    pub monthly_points: f64,
    /// Extra points when the qualifying streak reaches three
    pub hattrick_points: f64,
    /// Points for every consecutive qualifying month beyond the third
    pub continuation_points: f64,
}

/// Quarter / FY fresh-premium rupee bonus threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PremiumBonusSlab {
    pub min_premium: f64,
    pub bonus_rupees: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceOptions {
    pub fy_mode: FyMode,
    pub audit_mode: AuditMode,
    /// Reclassify fresh rows accidentally scored on renewal slabs
    pub auto_correct_fresh: bool,
    pub skip_empty_policy_numbers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceConfig {
    pub slabs: Vec<PayoutSlab>,
    pub slabs_investment_rm: Vec<PayoutSlab>,
    pub conversion: ConversionRules,
    pub weights: InsuranceWeights,
    pub streak_bonus: InsuranceStreakBonus,
    pub qtr_bonus_rupees: Vec<PremiumBonusSlab>,
    pub annual_bonus_rupees: Vec<PremiumBonusSlab>,
    pub options: InsuranceOptions,
    /// Company-specific weight overrides, first match wins
    #[serde(default)]
    pub company_rules: Vec<SchemeRule>,
    #[serde(default)]
    pub ignored_rms: Vec<String>,
}

// ---------------------------------------------------------------------------
// Referral
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralInsurancePoints {
    pub self_sourced_points: f64,
    pub converter_points: f64,
    pub referrer_points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralInvestmentPoints {
    pub self_sourced_points: f64,
    /// Converter points when the lead has no referrer at all
    pub converter_only_points: f64,
    pub referrer_points: f64,
    /// Points retained (percent) when the client is not a family head
    /// and no special permission exists
    pub not_family_head_penalty_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralGating {
    pub inactive_months: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralConfig {
    pub insurance: ReferralInsurancePoints,
    pub investment: ReferralInvestmentPoints,
    pub gating: ReferralGating,
    /// Rupee payout per referral point in the incentive block
    pub rupees_per_point: f64,
    #[serde(default)]
    pub ignored_rms: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_rule_matching() {
        let rules = vec![
            SchemeRule {
                keyword: "NFO".into(),
                match_type: MatchType::Contains,
                weight_pct: 150.0,
                start_date: None,
                end_date: None,
            },
            SchemeRule {
                keyword: "HDFC LIQUID".into(),
                match_type: MatchType::Exact,
                weight_pct: 0.0,
                start_date: None,
                end_date: None,
            },
        ];
        let on = NaiveDate::from_ymd_opt(2025, 9, 10).unwrap();
        assert_eq!(resolve_scheme_weight(&rules, "Axis NFO Series 1", on), 1.5);
        assert_eq!(resolve_scheme_weight(&rules, "HDFC Liquid", on), 0.0);
        assert_eq!(resolve_scheme_weight(&rules, "HDFC Liquid Fund", on), 1.0);
        assert_eq!(resolve_scheme_weight(&rules, "ICICI Bluechip", on), 1.0);
    }

    #[test]
    fn test_scheme_rule_date_bounds() {
        let rules = vec![SchemeRule {
            keyword: "NFO".into(),
            match_type: MatchType::Contains,
            weight_pct: 150.0,
            start_date: NaiveDate::from_ymd_opt(2025, 9, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 9, 30),
        }];
        let before = NaiveDate::from_ymd_opt(2025, 8, 31).unwrap();
        let inside = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
        let after = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        assert_eq!(resolve_scheme_weight(&rules, "X NFO", before), 1.0);
        assert_eq!(resolve_scheme_weight(&rules, "X NFO", inside), 1.5);
        assert_eq!(resolve_scheme_weight(&rules, "X NFO", after), 1.0);
    }

    #[test]
    fn test_category_blacklist_substring() {
        let rules = CategoryRules {
            blacklisted_categories: vec!["liquid".into(), "overnight".into()],
            zero_weight_purchase: true,
            zero_weight_switch_in: true,
            exclude_from_debt_bonus: true,
        };
        assert!(rules.is_blacklisted("Debt - Liquid"));
        assert!(rules.is_blacklisted("OVERNIGHT FUND"));
        assert!(!rules.is_blacklisted("Equity - Large Cap"));
        assert!(!rules.is_blacklisted(""));
    }

    #[test]
    fn test_tenure_table_clamps() {
        let t = TenureTable { by_year: vec![1.0, 1.2, 1.6, 1.75, 2.0] };
        assert_eq!(t.weight(1), 1.0);
        assert_eq!(t.weight(3), 1.6);
        assert_eq!(t.weight(5), 2.0);
        assert_eq!(t.weight(9), 2.0);
        assert_eq!(t.weight(0), 1.0);
    }

    #[test]
    fn test_sip_base_bps_derivation() {
        let cfg = crate::config::defaults::default_sip_config();
        // 0.03 points/rupee over 24 months → 12.5 bps
        assert!((cfg.base_bps() - 12.5).abs() < 1e-9);
    }
}
