//! Start-of-month AUM lookup
//!
//! Snapshots are keyed by (month, upper-cased RM name). Lookups walk a
//! fallback chain of name variants; a miss is not an error — it yields 0.0
//! and the consuming row flags `missing_aum`.

use crate::identity::{clean_name, normalize_name};
use crate::window::Month;
use chrono::NaiveDate;
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct AumSnapshot {
    pub month: Month,
    pub rm_name: String,
    pub aum: f64,
}

/// AUM lookup result: the value plus whether anything matched
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AumResult {
    pub aum: f64,
    pub found: bool,
}

impl AumResult {
    fn miss() -> Self {
        Self { aum: 0.0, found: false }
    }
}

#[derive(Debug, Default)]
pub struct AumBook {
    /// (month, UPPER name) → AUM
    exact: HashMap<(Month, String), f64>,
    /// month → Vec<(normalized name, UPPER name, aum)> for fuzzy passes
    by_month: HashMap<Month, Vec<(String, String, f64)>>,
    cache: Mutex<HashMap<(Month, String), AumResult>>,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
}

impl AumBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshots(snapshots: Vec<AumSnapshot>) -> Self {
        let mut book = Self::new();
        for snap in snapshots {
            book.insert(snap);
        }
        book
    }

    pub fn insert(&mut self, snap: AumSnapshot) {
        let upper = clean_name(&snap.rm_name).to_uppercase();
        let norm = normalize_name(&snap.rm_name);
        self.exact.insert((snap.month, upper.clone()), snap.aum);
        self.by_month
            .entry(snap.month)
            .or_default()
            .push((norm, upper, snap.aum));
        self.cache.lock().unwrap().clear();
    }

    /// Start-of-month AUM for an RM; 0.0 when nothing matches.
    ///
    /// Lookup order: exact upper-cased name, case-insensitive exact,
    /// substring containment, then tried variants (first two tokens,
    /// drop-last-token, first token).
    pub fn aum_for(&self, rm_name: &str, month: Month) -> AumResult {
        let norm = normalize_name(rm_name);
        if norm.is_empty() {
            return AumResult::miss();
        }
        let cache_key = (month, norm.clone());
        if let Some(hit) = self.cache.lock().unwrap().get(&cache_key) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return *hit;
        }
        self.cache_misses.fetch_add(1, Ordering::Relaxed);

        let result = self.lookup_uncached(rm_name, &norm, month);
        if !result.found {
            warn!("[AUM] No snapshot for rm='{}' month={}", clean_name(rm_name), month);
        }
        self.cache.lock().unwrap().insert(cache_key, result);
        result
    }

    fn lookup_uncached(&self, rm_name: &str, norm: &str, month: Month) -> AumResult {
        let upper = clean_name(rm_name).to_uppercase();

        // 1) Exact (month, UPPER) key
        if let Some(&aum) = self.exact.get(&(month, upper.clone())) {
            return AumResult { aum, found: true };
        }

        let Some(rows) = self.by_month.get(&month) else {
            return AumResult::miss();
        };

        // 2) Case-insensitive exact
        if let Some((_, _, aum)) = rows.iter().find(|(n, _, _)| n == norm) {
            return AumResult { aum: *aum, found: true };
        }

        // 3) Loose containment either way
        if let Some((_, _, aum)) = rows
            .iter()
            .find(|(n, _, _)| n.contains(norm) || norm.contains(n.as_str()))
        {
            return AumResult { aum: *aum, found: true };
        }

        // 4) Tried name variants
        let tokens: Vec<&str> = norm.split(' ').collect();
        let mut variants: Vec<String> = Vec::new();
        if tokens.len() >= 2 {
            variants.push(tokens[..2].join(" "));
            variants.push(tokens[..tokens.len() - 1].join(" "));
        }
        if !tokens.is_empty() {
            variants.push(tokens[0].to_string());
        }
        for variant in variants {
            if variant.is_empty() {
                continue;
            }
            if let Some((_, _, aum)) = rows
                .iter()
                .find(|(n, _, _)| n == &variant || n.contains(&variant))
            {
                return AumResult { aum: *aum, found: true };
            }
        }

        AumResult::miss()
    }
}

/// Raw CSV row for AUM snapshots
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "AsOfDate")]
    as_of_date: String,
    #[serde(rename = "RMName")]
    rm_name: String,
    #[serde(rename = "AUM")]
    aum: f64,
}

/// Load AUM snapshots from CSV; `AsOfDate` carries the snapshot month
pub fn load_aum_book<P: AsRef<Path>>(path: P) -> Result<AumBook, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut snapshots = Vec::new();

    for result in reader.deserialize() {
        let row: CsvRow = result?;
        let date = NaiveDate::parse_from_str(row.as_of_date.trim(), "%Y-%m-%d")?;
        snapshots.push(AumSnapshot {
            month: Month::from_date(date),
            rm_name: row.rm_name,
            aum: row.aum,
        });
    }

    Ok(AumBook::with_snapshots(snapshots))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> AumBook {
        AumBook::with_snapshots(vec![
            AumSnapshot {
                month: "2025-09".parse().unwrap(),
                rm_name: "ISHU MAVAR".into(),
                aum: 10_000_000.0,
            },
            AumSnapshot {
                month: "2025-09".parse().unwrap(),
                rm_name: "Sagar Kumar Maini".into(),
                aum: 5_000_000.0,
            },
        ])
    }

    #[test]
    fn test_exact_and_case_insensitive() {
        let b = book();
        let m = "2025-09".parse().unwrap();
        assert_eq!(b.aum_for("ISHU MAVAR", m).aum, 10_000_000.0);
        assert_eq!(b.aum_for("ishu mavar", m).aum, 10_000_000.0);
        assert_eq!(b.aum_for("Ishu   Mavar", m).aum, 10_000_000.0);
    }

    #[test]
    fn test_variant_fallbacks() {
        let b = book();
        let m = "2025-09".parse().unwrap();
        // Containment pass catches the truncated form
        assert_eq!(b.aum_for("Sagar Kumar", m).aum, 5_000_000.0);
        // Drop-last-token variant resolves the middle-name mismatch
        assert_eq!(b.aum_for("Sagar Maini", m).aum, 5_000_000.0);
        assert_eq!(b.aum_for("Sagar", m).aum, 5_000_000.0);
    }

    #[test]
    fn test_miss_is_zero_not_error() {
        let b = book();
        let m = "2025-10".parse().unwrap();
        let res = b.aum_for("Ishu Mavar", m);
        assert!(!res.found);
        assert_eq!(res.aum, 0.0);
    }

    #[test]
    fn test_cache_counters() {
        let b = book();
        let m = "2025-09".parse().unwrap();
        b.aum_for("ISHU MAVAR", m);
        b.aum_for("ishu mavar", m);
        assert_eq!(b.cache_hits.load(Ordering::Relaxed), 1);
        assert_eq!(b.cache_misses.load(Ordering::Relaxed), 1);
    }
}
