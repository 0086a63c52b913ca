//! Admin PUT validation
//!
//! A rejected document produces the full structured error list and writes
//! nothing; there are no partial writes.

use super::model::*;
use serde::Serialize;
use thiserror::Error;

/// One field-level validation failure
#[derive(Debug, Clone, Serialize, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

/// Validate an effective (defaults-merged) config document for a metric.
/// The raw JSON must already deserialize into the typed config; enum fields
/// (range_mode, fy_mode, net mode, audit_mode) are therefore already legal
/// by the time these rules run.
pub fn validate_metric(metric: Metric, raw: &serde_json::Value) -> Vec<ValidationError> {
    match metric {
        Metric::Lumpsum => match serde_json::from_value::<LumpsumConfig>(raw.clone()) {
            Ok(cfg) => validate_lumpsum(&cfg),
            Err(e) => vec![ValidationError::new("$", format!("malformed document: {}", e))],
        },
        Metric::Sip => match serde_json::from_value::<SipConfig>(raw.clone()) {
            Ok(cfg) => validate_sip(&cfg),
            Err(e) => vec![ValidationError::new("$", format!("malformed document: {}", e))],
        },
        Metric::Insurance => match serde_json::from_value::<InsuranceConfig>(raw.clone()) {
            Ok(cfg) => validate_insurance(&cfg),
            Err(e) => vec![ValidationError::new("$", format!("malformed document: {}", e))],
        },
        Metric::Referral => match serde_json::from_value::<ReferralConfig>(raw.clone()) {
            Ok(cfg) => validate_referral(&cfg),
            Err(e) => vec![ValidationError::new("$", format!("malformed document: {}", e))],
        },
    }
}

pub fn validate_lumpsum(cfg: &LumpsumConfig) -> Vec<ValidationError> {
    let mut errs = Vec::new();

    for (i, slab) in cfg.rate_slabs.iter().enumerate() {
        if let Some(max) = slab.max_pct {
            if slab.min_pct >= max {
                errs.push(ValidationError::new(
                    format!("rate_slabs[{}]", i),
                    format!("min_pct {} must be < max_pct {}", slab.min_pct, max),
                ));
            }
        }
        if slab.rate < 0.0 {
            errs.push(ValidationError::new(
                format!("rate_slabs[{}].rate", i),
                "rate must be >= 0",
            ));
        }
    }

    let mut prev_cap: Option<u32> = None;
    for (i, slab) in cfg.meeting_slabs.iter().enumerate() {
        if slab.mult < 1.0 {
            errs.push(ValidationError::new(
                format!("meeting_slabs[{}].mult", i),
                "multiplier must be >= 1.0",
            ));
        }
        match (prev_cap, slab.max_count) {
            (Some(p), Some(c)) if c <= p => {
                errs.push(ValidationError::new(
                    format!("meeting_slabs[{}].max_count", i),
                    format!("max_count {} must be strictly greater than {}", c, p),
                ));
            }
            (_, Some(c)) => prev_cap = Some(c),
            // The null catch-all must be last
            (_, None) if i + 1 != cfg.meeting_slabs.len() => {
                errs.push(ValidationError::new(
                    format!("meeting_slabs[{}]", i),
                    "open-ended slab must be the last entry",
                ));
            }
            _ => {}
        }
    }

    for (i, slab) in cfg.qtr_bonus_template.slabs.iter().enumerate() {
        if slab.min_np < 0.0 {
            errs.push(ValidationError::new(
                format!("qtr_bonus_template.slabs[{}].min_np", i),
                "min_np must be >= 0",
            ));
        }
    }
    for (i, slab) in cfg.annual_bonus_template.slabs.iter().enumerate() {
        if slab.min_np < 0.0 {
            errs.push(ValidationError::new(
                format!("annual_bonus_template.slabs[{}].min_np", i),
                "min_np must be >= 0",
            ));
        }
    }

    if cfg.weights.debt_bonus.max_debt_ratio_pct <= 0.0 {
        errs.push(ValidationError::new(
            "weights.debt_bonus.max_debt_ratio_pct",
            "must be > 0",
        ));
    }
    if cfg.options.cob_in_correction_factor < 0.0 {
        errs.push(ValidationError::new(
            "options.cob_in_correction_factor",
            "must be >= 0",
        ));
    }

    errs
}

pub fn validate_sip(cfg: &SipConfig) -> Vec<ValidationError> {
    let mut errs = Vec::new();

    if cfg.tier_thresholds.is_empty() {
        errs.push(ValidationError::new("tier_thresholds", "must not be empty"));
    }
    for (i, t) in cfg.tier_thresholds.iter().enumerate() {
        if t.tier.trim().is_empty() {
            errs.push(ValidationError::new(
                format!("tier_thresholds[{}].tier", i),
                "tier name must not be empty",
            ));
        }
        if !cfg.tier_factors.contains_key(&t.tier) {
            errs.push(ValidationError::new(
                format!("tier_thresholds[{}]", i),
                format!("tier '{}' has no entry in tier_factors", t.tier),
            ));
        }
    }
    for (tier, factor) in &cfg.tier_factors {
        if *factor < 0.0 {
            errs.push(ValidationError::new(
                format!("tier_factors.{}", tier),
                "monthly factor must be >= 0",
            ));
        }
    }

    if cfg.options.horizon_months == 0 {
        errs.push(ValidationError::new("options.horizon_months", "must be >= 1"));
    }
    if cfg.options.ls_gate_min_rupees < 0.0 {
        errs.push(ValidationError::new("options.ls_gate_min_rupees", "must be >= 0"));
    }
    if let Some(bps) = cfg.coefficients.sip_base_bps {
        if bps < 0.0 {
            errs.push(ValidationError::new("coefficients.sip_base_bps", "must be >= 0"));
        }
    }

    for (i, s) in cfg.sip_penalty.slabs.iter().enumerate() {
        if s.rate_bps < 0.0 {
            errs.push(ValidationError::new(
                format!("sip_penalty.slabs[{}].rate_bps", i),
                "penalty bps are stored positive",
            ));
        }
    }

    errs
}

pub fn validate_insurance(cfg: &InsuranceConfig) -> Vec<ValidationError> {
    let mut errs = Vec::new();

    for (name, slabs) in [("slabs", &cfg.slabs), ("slabs_investment_rm", &cfg.slabs_investment_rm)]
    {
        if slabs.is_empty() {
            errs.push(ValidationError::new(name, "must not be empty"));
        }
        for (i, s) in slabs.iter().enumerate() {
            if let Some(max) = s.max_points {
                if s.min_points >= max {
                    errs.push(ValidationError::new(
                        format!("{}[{}]", name, i),
                        format!("min_points {} must be < max_points {}", s.min_points, max),
                    ));
                }
            }
            if s.fresh_pct < 0.0 || s.renew_pct < 0.0 {
                errs.push(ValidationError::new(
                    format!("{}[{}]", name, i),
                    "payout percentages must be >= 0",
                ));
            }
        }
    }

    if cfg.conversion.upsell_divisor <= 0.0 {
        errs.push(ValidationError::new("conversion.upsell_divisor", "must be > 0"));
    }
    for (i, s) in cfg.conversion.fresh_slabs.iter().enumerate() {
        if let Some(max) = s.max_val {
            if s.min_val >= max {
                errs.push(ValidationError::new(
                    format!("conversion.fresh_slabs[{}]", i),
                    "min_val must be < max_val",
                ));
            }
        }
    }
    for (i, s) in cfg.conversion.renew_slabs.iter().enumerate() {
        if let (Some(min), Some(max)) = (s.min_dtr, s.max_dtr) {
            if min >= max {
                errs.push(ValidationError::new(
                    format!("conversion.renew_slabs[{}]", i),
                    "min_dtr must be < max_dtr",
                ));
            }
        }
    }

    if cfg.streak_bonus.premium_threshold < 0.0 {
        errs.push(ValidationError::new("streak_bonus.premium_threshold", "must be >= 0"));
    }

    errs
}

pub fn validate_referral(cfg: &ReferralConfig) -> Vec<ValidationError> {
    let mut errs = Vec::new();
    let pct = cfg.investment.not_family_head_penalty_pct;
    if !(0.0..=100.0).contains(&pct) {
        errs.push(ValidationError::new(
            "investment.not_family_head_penalty_pct",
            "must be between 0 and 100",
        ));
    }
    if cfg.rupees_per_point < 0.0 {
        errs.push(ValidationError::new("rupees_per_point", "must be >= 0"));
    }
    if cfg.gating.inactive_months == 0 {
        errs.push(ValidationError::new("gating.inactive_months", "must be >= 1"));
    }
    errs
}
