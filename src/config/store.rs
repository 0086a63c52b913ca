//! Versioned config store
//!
//! One document per metric. PUTs validate against the merged (effective)
//! document and archive the previous version; GETs merge the stored document
//! over the built-in defaults field by field. A stored field that breaks the
//! typed schema is dropped in favour of its default and the row-level
//! `config_fallback_used` flag is raised.

use super::defaults;
use super::hash::config_hash;
use super::model::Metric;
use super::validate::{validate_metric, ValidationError};
use chrono::NaiveDateTime;
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub const SCHEMA_VERSION: &str = "2025-11-15.r1";

/// Stored admin document for one metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredConfig {
    pub id: String,
    pub schema_version: String,
    pub version: u64,
    pub status: String,
    /// The overrides as last written (full or partial document)
    pub raw: Value,
    pub updated_at: NaiveDateTime,
    pub updated_by: String,
}

/// Archive entry written on every replace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigAuditEntry {
    pub config_id: String,
    pub version: u64,
    pub config_snapshot: Value,
    pub archived_at: NaiveDateTime,
    pub replaced_by: String,
    pub change_reason: String,
}

/// Effective config produced by a GET: defaults merged with overrides
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub value: Value,
    pub hash: String,
    pub version: u64,
    pub fallback_used: bool,
}

#[derive(Debug, Default)]
pub struct ConfigStore {
    docs: HashMap<Metric, StoredConfig>,
    audit: Vec<ConfigAuditEntry>,
}

/// Merge `overlay` into `base`: objects merge recursively, arrays and
/// scalars replace whole. Null overlay values keep the base.
pub fn merge_over(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(b), Value::Object(o)) => {
            let mut out = b.clone();
            for (k, ov) in o {
                if ov.is_null() {
                    continue;
                }
                let merged = match out.get(k) {
                    Some(bv) => merge_over(bv, ov),
                    None => ov.clone(),
                };
                out.insert(k.clone(), merged);
            }
            Value::Object(out)
        }
        (_, o) if !o.is_null() => o.clone(),
        (b, _) => b.clone(),
    }
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective config for a metric: stored overrides merged over defaults,
    /// with top-level field fallback when an override breaks the schema.
    pub fn effective(&self, metric: Metric) -> EffectiveConfig {
        let default = defaults::default_value(metric);
        let (value, fallback_used) = match self.docs.get(&metric) {
            Some(doc) => merge_with_fallback(metric, &default, &doc.raw),
            None => (default, false),
        };
        let hash = config_hash(&value);
        EffectiveConfig {
            value,
            hash,
            version: self.docs.get(&metric).map(|d| d.version).unwrap_or(0),
            fallback_used,
        }
    }

    pub fn lumpsum(&self) -> (super::model::LumpsumConfig, EffectiveConfig) {
        let eff = self.effective(Metric::Lumpsum);
        let cfg = serde_json::from_value(eff.value.clone()).unwrap_or_else(|e| {
            error!("[Config] effective lumpsum config unreadable ({}); using defaults", e);
            defaults::default_lumpsum_config()
        });
        (cfg, eff)
    }

    pub fn sip(&self) -> (super::model::SipConfig, EffectiveConfig) {
        let eff = self.effective(Metric::Sip);
        let cfg = serde_json::from_value(eff.value.clone()).unwrap_or_else(|e| {
            error!("[Config] effective sip config unreadable ({}); using defaults", e);
            defaults::default_sip_config()
        });
        (cfg, eff)
    }

    pub fn insurance(&self) -> (super::model::InsuranceConfig, EffectiveConfig) {
        let eff = self.effective(Metric::Insurance);
        let cfg = serde_json::from_value(eff.value.clone()).unwrap_or_else(|e| {
            error!("[Config] effective insurance config unreadable ({}); using defaults", e);
            defaults::default_insurance_config()
        });
        (cfg, eff)
    }

    pub fn referral(&self) -> (super::model::ReferralConfig, EffectiveConfig) {
        let eff = self.effective(Metric::Referral);
        let cfg = serde_json::from_value(eff.value.clone()).unwrap_or_else(|e| {
            error!("[Config] effective referral config unreadable ({}); using defaults", e);
            defaults::default_referral_config()
        });
        (cfg, eff)
    }

    /// The stored (raw) document, if any
    pub fn stored(&self, metric: Metric) -> Option<&StoredConfig> {
        self.docs.get(&metric)
    }

    /// Validate and write a new config; archives the previous document.
    /// Validation failure returns the full error list and writes nothing.
    pub fn put(
        &mut self,
        metric: Metric,
        new_raw: Value,
        change_reason: &str,
        actor: &str,
        now: NaiveDateTime,
    ) -> Result<&StoredConfig, Vec<ValidationError>> {
        let default = defaults::default_value(metric);
        let effective = merge_over(&default, &new_raw);
        let errors = validate_metric(metric, &effective);
        if !errors.is_empty() {
            return Err(errors);
        }

        let next_version = self.archive_current(metric, change_reason, actor, now);
        let doc = StoredConfig {
            id: metric.config_id().to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            version: next_version,
            status: "active".to_string(),
            raw: new_raw,
            updated_at: now,
            updated_by: actor.to_string(),
        };
        info!(
            "[Config] {} updated to v{} by {} ({})",
            metric, next_version, actor, change_reason
        );
        self.docs.insert(metric, doc);
        Ok(&self.docs[&metric])
    }

    /// Replace with the built-in defaults, archiving the previous document
    pub fn reset(&mut self, metric: Metric, actor: &str, now: NaiveDateTime) -> &StoredConfig {
        let next_version = self.archive_current(metric, "reset to defaults", actor, now);
        let doc = StoredConfig {
            id: metric.config_id().to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            version: next_version,
            status: "active".to_string(),
            raw: defaults::default_value(metric),
            updated_at: now,
            updated_by: actor.to_string(),
        };
        info!("[Config] {} reset to defaults (v{}) by {}", metric, next_version, actor);
        self.docs.insert(metric, doc);
        &self.docs[&metric]
    }

    /// Newest-first archived versions for a metric
    pub fn audit(&self, metric: Metric, limit: usize) -> Vec<&ConfigAuditEntry> {
        let id = metric.config_id();
        let mut entries: Vec<&ConfigAuditEntry> =
            self.audit.iter().filter(|e| e.config_id == id).collect();
        entries.sort_by(|a, b| b.archived_at.cmp(&a.archived_at).then(b.version.cmp(&a.version)));
        entries.truncate(limit);
        entries
    }

    fn archive_current(
        &mut self,
        metric: Metric,
        change_reason: &str,
        actor: &str,
        now: NaiveDateTime,
    ) -> u64 {
        match self.docs.get(&metric) {
            Some(existing) => {
                self.audit.push(ConfigAuditEntry {
                    config_id: existing.id.clone(),
                    version: existing.version,
                    config_snapshot: existing.raw.clone(),
                    archived_at: now,
                    replaced_by: actor.to_string(),
                    change_reason: change_reason.to_string(),
                });
                existing.version + 1
            }
            None => 1,
        }
    }
}

/// Merge each top-level stored field over the defaults independently,
/// dropping any field whose value breaks the typed schema.
fn merge_with_fallback(metric: Metric, default: &Value, stored: &Value) -> (Value, bool) {
    let merged = merge_over(default, stored);
    if validate_shape(metric, &merged) {
        return (merged, false);
    }

    let Value::Object(stored_map) = stored else {
        error!("[Config] {} stored document is not an object; using defaults", metric);
        return (default.clone(), true);
    };

    let mut effective = default.clone();
    let mut fallback_used = false;
    for (key, overlay_val) in stored_map {
        let mut candidate = effective.clone();
        if let Value::Object(map) = &mut candidate {
            let merged_field = match map.get(key) {
                Some(base_val) => merge_over(base_val, overlay_val),
                None => overlay_val.clone(),
            };
            map.insert(key.clone(), merged_field);
        }
        if validate_shape(metric, &candidate) {
            effective = candidate;
        } else {
            fallback_used = true;
            error!(
                "[Config] {} field '{}' breaks the schema; falling back to default for it",
                metric, key
            );
        }
    }
    (effective, fallback_used)
}

fn validate_shape(metric: Metric, value: &Value) -> bool {
    use super::model::*;
    match metric {
        Metric::Lumpsum => serde_json::from_value::<LumpsumConfig>(value.clone()).is_ok(),
        Metric::Sip => serde_json::from_value::<SipConfig>(value.clone()).is_ok(),
        Metric::Insurance => serde_json::from_value::<InsuranceConfig>(value.clone()).is_ok(),
        Metric::Referral => serde_json::from_value::<ReferralConfig>(value.clone()).is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 1).unwrap().and_hms_opt(8, 0, 0).unwrap()
    }

    #[test]
    fn test_merge_over_is_field_wise() {
        let base = json!({"a": {"x": 1, "y": 2}, "b": [1, 2], "c": 3});
        let overlay = json!({"a": {"y": 9}, "b": [7]});
        let merged = merge_over(&base, &overlay);
        assert_eq!(merged, json!({"a": {"x": 1, "y": 9}, "b": [7], "c": 3}));
    }

    #[test]
    fn test_put_bumps_version_and_archives() {
        let mut store = ConfigStore::new();
        let v1 = json!({"options": {"range_mode": "month"}});
        store.put(Metric::Lumpsum, v1, "initial", "ops@example.com", t0()).unwrap();
        assert_eq!(store.stored(Metric::Lumpsum).unwrap().version, 1);

        let v2 = json!({"options": {"range_mode": "fy"}});
        store.put(Metric::Lumpsum, v2, "widen window", "ops@example.com", t0()).unwrap();
        assert_eq!(store.stored(Metric::Lumpsum).unwrap().version, 2);

        let audit = store.audit(Metric::Lumpsum, 10);
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].change_reason, "initial");
    }

    #[test]
    fn test_put_rejects_without_writing() {
        let mut store = ConfigStore::new();
        let bad = json!({"rate_slabs": [{"min_pct": 2.0, "max_pct": 1.0, "rate": 0.001}]});
        let errs = store
            .put(Metric::Lumpsum, bad, "oops", "ops@example.com", t0())
            .unwrap_err();
        assert!(!errs.is_empty());
        assert!(store.stored(Metric::Lumpsum).is_none());
        assert!(store.audit(Metric::Lumpsum, 10).is_empty());
    }

    #[test]
    fn test_effective_merges_over_defaults() {
        let mut store = ConfigStore::new();
        store
            .put(
                Metric::Lumpsum,
                json!({"weights": {"switch_in_pct": 100.0}}),
                "legacy switch weight",
                "ops@example.com",
                t0(),
            )
            .unwrap();
        let (cfg, eff) = store.lumpsum();
        assert_eq!(cfg.weights.switch_in_pct, 100.0);
        // Untouched nested fields inherit defaults
        assert_eq!(cfg.weights.cob_in_pct, 50.0);
        assert_eq!(cfg.rate_slabs.len(), 7);
        assert!(!eff.fallback_used);
    }

    #[test]
    fn test_effective_hash_changes_with_config() {
        let mut store = ConfigStore::new();
        let before = store.effective(Metric::Sip).hash;
        store
            .put(
                Metric::Sip,
                json!({"options": {"horizon_months": 12}}),
                "shorter horizon",
                "ops@example.com",
                t0(),
            )
            .unwrap();
        let after = store.effective(Metric::Sip).hash;
        assert_ne!(before, after);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut store = ConfigStore::new();
        store
            .put(
                Metric::Sip,
                json!({"options": {"horizon_months": 12}}),
                "shorter horizon",
                "ops@example.com",
                t0(),
            )
            .unwrap();
        store.reset(Metric::Sip, "ops@example.com", t0());
        let (cfg, _) = store.sip();
        assert_eq!(cfg.options.horizon_months, 24);
        assert_eq!(store.stored(Metric::Sip).unwrap().version, 2);
    }

    #[test]
    fn test_field_level_fallback_on_broken_field() {
        let mut store = ConfigStore::new();
        // Write a document that bypasses validation by inserting directly
        store.docs.insert(
            Metric::Sip,
            StoredConfig {
                id: Metric::Sip.config_id().into(),
                schema_version: SCHEMA_VERSION.into(),
                version: 1,
                status: "active".into(),
                raw: json!({
                    "options": {"horizon_months": "twenty-four"},
                    "coefficients": {"sip_points_per_rupee": 0.05}
                }),
                updated_at: t0(),
                updated_by: "legacy".into(),
            },
        );
        let eff = store.effective(Metric::Sip);
        assert!(eff.fallback_used);
        let (cfg, _) = store.sip();
        // Broken field fell back, intact field survived
        assert_eq!(cfg.options.horizon_months, 24);
        assert_eq!(cfg.coefficients.sip_points_per_rupee, 0.05);
    }
}
