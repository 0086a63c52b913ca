//! RM identity directory
//!
//! Mirrors the external user directory and resolves raw RM display names to
//! canonical employee records. Also owns the 6-month post-departure
//! eligibility rule and the configured skip list.

use crate::window::Month;
use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::path::Path;
use std::sync::Mutex;

/// Tokens that can never be real RM names
const INVALID_NAME_TOKENS: [&str; 7] = ["", "nan", "none", "null", "-", "na", "n/a"];

/// Collapse whitespace without changing case
pub fn clean_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace and lowercase; the key form for all name joins
pub fn normalize_name(raw: &str) -> String {
    clean_name(raw).to_lowercase()
}

/// Title-case each word for display
pub fn title_case(raw: &str) -> String {
    clean_name(raw)
        .split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns (cleaned, ok); ok=false means the name must be dropped
pub fn sanitize_name(raw: &str) -> (String, bool) {
    let cleaned = clean_name(raw);
    let ok = !INVALID_NAME_TOKENS.contains(&cleaned.to_lowercase().as_str());
    (cleaned, ok)
}

/// One directory record mirrored from the external user system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub employee_id: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile: String,
    pub is_active: bool,
    #[serde(default)]
    pub inactive_since: Option<NaiveDate>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub reporting_manager_id: Option<String>,
}

/// Result of resolving a raw display name
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    /// Canonical id when the directory knows the RM
    pub employee_id: Option<String>,
    /// Title-cased display form of the input name
    pub canonical_name: String,
    pub is_active: bool,
    pub inactive_since: Option<NaiveDate>,
    pub profile: Option<String>,
}

#[derive(Debug, Default)]
pub struct Directory {
    records: Vec<DirectoryRecord>,
    by_exact_name: HashMap<String, usize>,
    by_norm_name: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
    /// Post-departure eligibility window in months
    inactive_window_months: i64,
    resolve_cache: Mutex<HashMap<String, Option<usize>>>,
}

impl Directory {
    pub fn new() -> Self {
        Self { inactive_window_months: 6, ..Default::default() }
    }

    pub fn with_records(records: Vec<DirectoryRecord>) -> Self {
        let mut dir = Self::new();
        for rec in records {
            dir.insert(rec);
        }
        dir
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DirectoryRecord] {
        &self.records
    }

    fn insert(&mut self, rec: DirectoryRecord) {
        let idx = self.records.len();
        self.by_exact_name.insert(rec.full_name.clone(), idx);
        self.by_norm_name.insert(normalize_name(&rec.full_name), idx);
        self.by_id.insert(rec.employee_id.clone(), idx);
        self.records.push(rec);
        self.resolve_cache.lock().unwrap().clear();
    }

    pub fn by_id(&self, employee_id: &str) -> Option<&DirectoryRecord> {
        self.by_id.get(employee_id).map(|&i| &self.records[i])
    }

    fn lookup_index(&self, display_name: &str) -> Option<usize> {
        let cleaned = clean_name(display_name);
        let key = normalize_name(display_name);
        if let Some(hit) = self.resolve_cache.lock().unwrap().get(&key) {
            return *hit;
        }
        // Exact, then case-insensitive, then title-cased
        let found = self
            .by_exact_name
            .get(&cleaned)
            .or_else(|| self.by_norm_name.get(&key))
            .or_else(|| self.by_exact_name.get(&title_case(display_name)))
            .copied();
        self.resolve_cache.lock().unwrap().insert(key, found);
        found
    }

    /// Resolve a raw display name. Unknown names still produce an identity
    /// (title-cased, no id, inactive) so scorers can key a fallback row.
    pub fn resolve(&self, display_name: &str) -> Option<ResolvedIdentity> {
        let (cleaned, ok) = sanitize_name(display_name);
        if !ok {
            return None;
        }
        match self.lookup_index(&cleaned) {
            Some(idx) => {
                let rec = &self.records[idx];
                Some(ResolvedIdentity {
                    employee_id: Some(rec.employee_id.clone()),
                    canonical_name: title_case(&rec.full_name),
                    is_active: rec.is_active,
                    inactive_since: rec.inactive_since,
                    profile: Some(rec.profile.clone()),
                })
            }
            None => Some(ResolvedIdentity {
                employee_id: None,
                canonical_name: title_case(&cleaned),
                is_active: false,
                inactive_since: None,
                profile: None,
            }),
        }
    }

    /// 6-month post-departure rule, keyed by employee id.
    /// No record, active, or no inactive_since → eligible.
    /// Otherwise eligible only for the departure month plus the next five.
    pub fn eligible_for_month(&self, employee_id: &str, month: Month) -> bool {
        let Some(rec) = self.by_id(employee_id) else {
            return true;
        };
        self.record_eligible(rec, month)
    }

    /// Same rule, resolved from a raw display name. Unknown names are eligible.
    pub fn eligible_by_name(&self, display_name: &str, month: Month) -> bool {
        let (cleaned, ok) = sanitize_name(display_name);
        if !ok {
            return true;
        }
        match self.lookup_index(&cleaned) {
            Some(idx) => self.record_eligible(&self.records[idx], month),
            None => true,
        }
    }

    fn record_eligible(&self, rec: &DirectoryRecord, month: Month) -> bool {
        if rec.is_active {
            return true;
        }
        let Some(since) = rec.inactive_since else {
            return true;
        };
        let diff = month.index() - Month::from_date(since).index();
        (0..self.inactive_window_months).contains(&diff)
    }

    /// Upsert the full directory snapshot. Stamps `inactive_since` on
    /// active→inactive transitions and clears it on reactivation; existing
    /// departure dates are never moved.
    pub fn sync_all(&mut self, snapshot: Vec<DirectoryRecord>, today: NaiveDate) {
        let mut transitions = 0usize;
        for mut incoming in snapshot {
            match self.by_id.get(&incoming.employee_id).copied() {
                Some(idx) => {
                    let existing = &self.records[idx];
                    if existing.is_active && !incoming.is_active {
                        incoming.inactive_since = incoming.inactive_since.or(Some(today));
                        transitions += 1;
                    } else if !existing.is_active && incoming.is_active {
                        incoming.inactive_since = None;
                    } else if !incoming.is_active {
                        // Still inactive: keep the original departure date
                        incoming.inactive_since =
                            existing.inactive_since.or(incoming.inactive_since);
                    }
                    self.by_exact_name.remove(&self.records[idx].full_name);
                    self.by_norm_name.remove(&normalize_name(&self.records[idx].full_name));
                    self.by_exact_name.insert(incoming.full_name.clone(), idx);
                    self.by_norm_name.insert(normalize_name(&incoming.full_name), idx);
                    self.records[idx] = incoming;
                }
                None => self.insert(incoming),
            }
        }
        self.resolve_cache.lock().unwrap().clear();
        info!(
            "[Directory] Synced {} records ({} active→inactive transitions)",
            self.records.len(),
            transitions
        );
    }
}

/// Configured set of RM names excluded before any scoring
#[derive(Debug, Clone, Default)]
pub struct SkipList {
    normalized: HashSet<String>,
}

impl SkipList {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized = names
            .into_iter()
            .map(|n| normalize_name(n.as_ref()))
            .filter(|n| !n.is_empty())
            .collect();
        Self { normalized }
    }

    pub fn contains(&self, display_name: &str) -> bool {
        self.normalized.contains(&normalize_name(display_name))
    }

    pub fn len(&self) -> usize {
        self.normalized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}

/// Raw CSV row for the directory snapshot
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "EmployeeID")]
    employee_id: String,
    #[serde(rename = "FullName")]
    full_name: String,
    #[serde(rename = "Email")]
    email: Option<String>,
    #[serde(rename = "Profile")]
    profile: Option<String>,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "InactiveSince")]
    inactive_since: Option<String>,
    #[serde(rename = "TeamID")]
    team_id: Option<String>,
    #[serde(rename = "ReportingManagerID")]
    reporting_manager_id: Option<String>,
}

/// Load a directory snapshot from CSV
pub fn load_directory<P: AsRef<Path>>(path: P) -> Result<Directory, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();

    for result in reader.deserialize() {
        let row: CsvRow = result?;
        let (name, ok) = sanitize_name(&row.full_name);
        if !ok {
            warn!("[Directory] Dropping record with invalid name: {:?}", row.full_name);
            continue;
        }
        let inactive_since = row
            .inactive_since
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d"))
            .transpose()?;
        records.push(DirectoryRecord {
            employee_id: row.employee_id.trim().to_string(),
            full_name: name,
            email: row.email.filter(|e| !e.trim().is_empty()),
            profile: row.profile.unwrap_or_default().trim().to_string(),
            is_active: row.status.trim().to_lowercase() != "inactive",
            inactive_since,
            team_id: row.team_id.filter(|t| !t.trim().is_empty()),
            reporting_manager_id: row.reporting_manager_id.filter(|m| !m.trim().is_empty()),
        });
    }

    Ok(Directory::with_records(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rm(id: &str, name: &str, active: bool, inactive_since: Option<NaiveDate>) -> DirectoryRecord {
        DirectoryRecord {
            employee_id: id.into(),
            full_name: name.into(),
            email: None,
            profile: "Mutual Funds".into(),
            is_active: active,
            inactive_since,
            team_id: None,
            reporting_manager_id: None,
        }
    }

    #[test]
    fn test_name_helpers() {
        assert_eq!(clean_name("  Ishu   Mavar "), "Ishu Mavar");
        assert_eq!(normalize_name("ISHU  MAVAR"), "ishu mavar");
        assert_eq!(title_case("ishu mavar"), "Ishu Mavar");
        assert!(!sanitize_name("n/a").1);
        assert!(!sanitize_name("  ").1);
        assert!(sanitize_name("Sagar Maini").1);
    }

    #[test]
    fn test_resolve_case_insensitive() {
        let dir = Directory::with_records(vec![rm("E1", "Ishu Mavar", true, None)]);
        let hit = dir.resolve("ISHU MAVAR").unwrap();
        assert_eq!(hit.employee_id.as_deref(), Some("E1"));
        assert_eq!(hit.canonical_name, "Ishu Mavar");
        assert!(hit.is_active);
    }

    #[test]
    fn test_resolve_unknown_falls_back() {
        let dir = Directory::with_records(vec![]);
        let hit = dir.resolve("new joiner").unwrap();
        assert_eq!(hit.employee_id, None);
        assert_eq!(hit.canonical_name, "New Joiner");
        assert!(!hit.is_active);
    }

    #[test]
    fn test_six_month_window_boundary() {
        let since = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let dir = Directory::with_records(vec![rm("E1", "Departed Rm", false, Some(since))]);

        for month in ["2025-03", "2025-04", "2025-05", "2025-06", "2025-07", "2025-08"] {
            assert!(
                dir.eligible_for_month("E1", month.parse().unwrap()),
                "expected eligible in {}",
                month
            );
        }
        assert!(!dir.eligible_for_month("E1", "2025-09".parse().unwrap()));
        // Months before departure are not eligible on re-runs
        assert!(!dir.eligible_for_month("E1", "2025-02".parse().unwrap()));
    }

    #[test]
    fn test_unknown_employee_is_eligible() {
        let dir = Directory::with_records(vec![]);
        assert!(dir.eligible_for_month("missing", "2025-09".parse().unwrap()));
        assert!(dir.eligible_by_name("Unknown Rm", "2025-09".parse().unwrap()));
    }

    #[test]
    fn test_sync_stamps_and_clears_inactive_since() {
        let today = NaiveDate::from_ymd_opt(2025, 9, 10).unwrap();
        let mut dir = Directory::with_records(vec![rm("E1", "Ishu Mavar", true, None)]);

        // Active → inactive stamps today
        dir.sync_all(vec![rm("E1", "Ishu Mavar", false, None)], today);
        assert_eq!(dir.by_id("E1").unwrap().inactive_since, Some(today));

        // Still inactive keeps the original stamp
        let later = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        dir.sync_all(vec![rm("E1", "Ishu Mavar", false, None)], later);
        assert_eq!(dir.by_id("E1").unwrap().inactive_since, Some(today));

        // Reactivation clears it
        dir.sync_all(vec![rm("E1", "Ishu Mavar", true, None)], later);
        assert_eq!(dir.by_id("E1").unwrap().inactive_since, None);
    }

    #[test]
    fn test_skip_list_normalizes() {
        let skip = SkipList::from_names(["Vilakshan  Bhutani", "RUBY"]);
        assert!(skip.contains("vilakshan bhutani"));
        assert!(skip.contains("Ruby "));
        assert!(!skip.contains("Sagar Maini"));
    }
}
