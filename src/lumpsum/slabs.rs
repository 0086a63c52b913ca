//! Slab lookups for the Lumpsum scorer
//!
//! Slabs are stored in document order; every lookup sorts before use.

use crate::config::{
    BonusTemplate, LsPenaltyConfig, MeetingSlab, PenaltyStrategy, RateSlab,
};

/// Incentive rate for a growth percent. First slab (ascending by min_pct)
/// where growth ∈ [min_pct, max_pct); the open-ended top slab matches
/// growth >= min_pct. No match yields rate 0.
pub fn rate_for_growth(slabs: &[RateSlab], growth_pct: f64) -> (f64, String) {
    let mut sorted: Vec<&RateSlab> = slabs.iter().collect();
    sorted.sort_by(|a, b| a.min_pct.partial_cmp(&b.min_pct).unwrap_or(std::cmp::Ordering::Equal));
    for slab in sorted {
        match slab.max_pct {
            Some(max) => {
                if growth_pct >= slab.min_pct && growth_pct < max {
                    return (slab.rate, slab.label.clone());
                }
            }
            None => {
                if growth_pct >= slab.min_pct {
                    return (slab.rate, slab.label.clone());
                }
            }
        }
    }
    (0.0, String::new())
}

/// Meeting multiplier: first slab (ascending by max_count) where
/// count <= max_count; the null slab is the catch-all.
pub fn multiplier_for_meetings(slabs: &[MeetingSlab], count: u32) -> (f64, String) {
    let mut sorted: Vec<&MeetingSlab> = slabs.iter().collect();
    sorted.sort_by_key(|s| s.max_count.unwrap_or(u32::MAX));
    for slab in sorted {
        match slab.max_count {
            Some(cap) if count <= cap => return (slab.mult, slab.label.clone()),
            None => return (slab.mult, slab.label.clone()),
            _ => {}
        }
    }
    (1.0, String::new())
}

/// Negative-month penalty in rupees. Slabs sorted ascending by
/// max_growth_pct; the first slab with growth_pct <= max_growth_pct wins.
/// The percentage leg is trail_pct% of AUM capped at cap_rupees; the flat
/// leg is flat_rupees; the strategy picks between them.
pub fn penalty_for_growth(
    cfg: &LsPenaltyConfig,
    growth_pct: f64,
    aum_start: f64,
) -> f64 {
    if !cfg.enable || growth_pct >= 0.0 {
        return 0.0;
    }
    let mut sorted: Vec<_> = cfg.slabs.iter().collect();
    sorted.sort_by(|a, b| {
        a.max_growth_pct
            .partial_cmp(&b.max_growth_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for slab in sorted {
        if growth_pct <= slab.max_growth_pct {
            let pct_pen = (slab.trail_pct / 100.0 * aum_start).min(slab.cap_rupees);
            let flat_pen = slab.flat_rupees;
            return match cfg.strategy {
                PenaltyStrategy::Min => flat_pen.min(pct_pen),
                PenaltyStrategy::Max => flat_pen.max(pct_pen),
            };
        }
    }
    0.0
}

/// Highest qualifying NP bonus slab for a cumulative net purchase.
/// Returns (bonus_rupees, matched min_np threshold).
pub fn np_slab_bonus(template: &BonusTemplate, np_value: f64) -> (f64, Option<f64>) {
    let mut sorted: Vec<_> = template.slabs.iter().collect();
    sorted.sort_by(|a, b| a.min_np.partial_cmp(&b.min_np).unwrap_or(std::cmp::Ordering::Equal));
    let mut bonus = 0.0;
    let mut picked = None;
    for slab in sorted {
        if np_value >= slab.min_np {
            bonus = slab.bonus_rupees;
            picked = Some(slab.min_np);
        }
    }
    (bonus, picked)
}
