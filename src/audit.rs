//! Audit payloads written alongside every scoring row
//!
//! Two serializations of the same record: `full` keeps everything, `compact`
//! keeps ByType plus the top non-zero category buckets. Audit writes are
//! best-effort; a failure logs and never aborts the scorer's main write.

use crate::config::AuditMode;
use log::warn;
use serde::{Deserialize, Serialize};

/// Category label for zero-weighted (blacklisted) purchases
pub const EXCLUDED_BUCKET: &str = "Blacklisted/Liquid/Overnight (Excluded)";

/// How many ByCategory buckets survive compaction
const COMPACT_TOP_N: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSum {
    #[serde(rename = "type")]
    pub label: String,
    pub sum: f64,
}

impl TypeSum {
    pub fn new(label: impl Into<String>, sum: f64) -> Self {
        Self { label: label.into(), sum }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySum {
    pub category: String,
    pub sum: f64,
}

impl CategorySum {
    pub fn new(category: impl Into<String>, sum: f64) -> Self {
        Self { category: category.into(), sum }
    }
}

/// The per-row audit block every scorer emits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AuditBlock {
    #[serde(rename = "ByType")]
    pub by_type: Vec<TypeSum>,
    #[serde(rename = "ByCategory")]
    pub by_category: Vec<CategorySum>,
}

impl AuditBlock {
    pub fn has_activity(&self) -> bool {
        self.by_type.iter().any(|t| t.sum.abs() > 0.0)
            || self.by_category.iter().any(|c| c.sum.abs() > 0.0)
    }

    /// Apply the configured verbosity
    pub fn rendered(&self, mode: AuditMode) -> AuditBlock {
        match mode {
            AuditMode::Full => self.clone(),
            AuditMode::Compact => self.compact(),
        }
    }

    /// Keep ByType as-is; keep only the top non-zero categories by absolute
    /// sum, always surfacing a non-zero excluded bucket.
    pub fn compact(&self) -> AuditBlock {
        let mut non_zero: Vec<CategorySum> = self
            .by_category
            .iter()
            .filter(|c| c.sum != 0.0)
            .cloned()
            .collect();
        non_zero.sort_by(|a, b| {
            b.sum
                .abs()
                .partial_cmp(&a.sum.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut top: Vec<CategorySum> = non_zero.iter().take(COMPACT_TOP_N).cloned().collect();
        if let Some(excluded) = non_zero
            .iter()
            .find(|c| c.category == EXCLUDED_BUCKET && c.sum != 0.0)
        {
            if !top.iter().any(|c| c.category == EXCLUDED_BUCKET) {
                top.push(excluded.clone());
            }
        }
        AuditBlock { by_type: self.by_type.clone(), by_category: top }
    }
}

/// Append-only audit document sink; one per scorer collection
#[derive(Debug, Default)]
pub struct AuditSink {
    pub docs: Vec<serde_json::Value>,
}

impl AuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize and append; never propagates failure to the caller
    pub fn write<T: Serialize>(&mut self, scorer: &str, doc: &T) {
        match serde_json::to_value(doc) {
            Ok(v) => self.docs.push(v),
            Err(e) => warn!("[Audit] {} audit write failed: {}", scorer, e),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}
