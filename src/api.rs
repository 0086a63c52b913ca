//! Read-only leaderboard queries
//!
//! Library-level equivalents of the leaderboard HTTP surface: ranked month
//! views (MTD and FY-to-date), per-user breakdowns, and admin team
//! aggregations. Everything reads persisted collections only; transport and
//! auth live outside this crate.

use crate::aggregate::PublicRow;
use crate::config::{ConfigStore, Metric};
use crate::identity::{normalize_name, Directory};
use crate::insurance::InsuranceMonthlyRow;
use crate::lumpsum::LumpsumRow;
use crate::referral::ReferralRow;
use crate::sip::{SipRow, TrailRow};
use crate::store::MemStore;
use crate::window::{fy_bounds, FyMode, Month};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Mtd,
    Ytd,
}

/// Names excluded from public reads, unioned across all metric configs
pub fn ignored_names(config_store: &ConfigStore) -> HashSet<String> {
    let mut ignored = HashSet::new();
    for metric in Metric::all() {
        let eff = config_store.effective(metric);
        if let Some(list) = eff.value.get("ignored_rms").and_then(|v| v.as_array()) {
            for name in list.iter().filter_map(|v| v.as_str()) {
                ignored.insert(normalize_name(name));
            }
        }
    }
    ignored
}

/// FY-to-date aggregation row
#[derive(Debug, Clone, Serialize)]
pub struct YtdRow {
    pub employee_id: String,
    pub rm_name: String,
    pub mf_points: f64,
    pub ins_points: f64,
    pub ref_points: f64,
    pub total_points_public: f64,
    pub adj_points_total: f64,
    pub total_points_final: f64,
    pub months_counted: u32,
}

/// Ranked MTD view: public rows sorted by final points, ignored RMs removed
pub fn leaderboard_mtd(
    store: &MemStore,
    config_store: &ConfigStore,
    month: Month,
) -> Vec<PublicRow> {
    let ignored = ignored_names(config_store);
    let mut rows: Vec<PublicRow> = store
        .public_rows_for(month)
        .into_iter()
        .filter(|r| !ignored.contains(&normalize_name(&r.rm_name)))
        .cloned()
        .collect();
    rows.sort_by(|a, b| {
        b.total_points_final
            .partial_cmp(&a.total_points_final)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}

/// FY-to-date view: sums each RM's public rows from the FY start through
/// `month` (inclusive), adjustments included, incentives omitted
pub fn leaderboard_ytd(
    store: &MemStore,
    config_store: &ConfigStore,
    month: Month,
    fy_mode: FyMode,
) -> Vec<YtdRow> {
    let ignored = ignored_names(config_store);
    let (fy_start, _, _) = fy_bounds(month, fy_mode);

    let mut acc: BTreeMap<String, YtdRow> = BTreeMap::new();
    for row in store.public_leaderboard.values() {
        if row.period_month < fy_start || row.period_month > month {
            continue;
        }
        if ignored.contains(&normalize_name(&row.rm_name)) {
            continue;
        }
        let entry = acc.entry(row.employee_id.clone()).or_insert_with(|| YtdRow {
            employee_id: row.employee_id.clone(),
            rm_name: row.rm_name.clone(),
            mf_points: 0.0,
            ins_points: 0.0,
            ref_points: 0.0,
            total_points_public: 0.0,
            adj_points_total: 0.0,
            total_points_final: 0.0,
            months_counted: 0,
        });
        entry.mf_points += row.mf_points;
        entry.ins_points += row.ins_points;
        entry.ref_points += row.ref_points;
        entry.total_points_public += row.total_points_public;
        entry.adj_points_total += row.adj_points_total;
        entry.total_points_final += row.total_points_final;
        entry.months_counted += 1;
    }

    let mut rows: Vec<YtdRow> = acc.into_values().collect();
    rows.sort_by(|a, b| {
        b.total_points_final
            .partial_cmp(&a.total_points_final)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}

/// Full per-metric detail for one RM and month
#[derive(Debug, Clone, Serialize)]
pub struct UserBreakdown {
    pub public: PublicRow,
    pub lumpsum: Option<LumpsumRow>,
    pub sip: Option<SipRow>,
    pub insurance: Option<InsuranceMonthlyRow>,
    pub trail: Option<TrailRow>,
    pub referrals: Vec<ReferralRow>,
}

pub fn user_row<'a>(store: &'a MemStore, employee_id: &str, month: Month) -> Option<&'a PublicRow> {
    store.public_leaderboard.get(&(employee_id.to_string(), month))
}

pub fn user_breakdown(
    store: &MemStore,
    employee_id: &str,
    month: Month,
) -> Option<UserBreakdown> {
    let public = user_row(store, employee_id, month)?.clone();
    let key = (employee_id.to_string(), month);
    Some(UserBreakdown {
        public,
        lumpsum: store.leaderboard_lumpsum.get(&key).cloned(),
        sip: store.mf_sip_leaderboard.get(&key).cloned(),
        insurance: store.leaderboard_insurance.get(&key).cloned(),
        trail: store.trail_leaderboard.get(&key).cloned(),
        referrals: store
            .referral_leaderboard
            .values()
            .filter(|r| r.employee_id == employee_id && r.month == month)
            .cloned()
            .collect(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupType {
    Team,
    Manager,
    Unassigned,
}

/// One admin team-view aggregate
#[derive(Debug, Clone, Serialize)]
pub struct TeamGroup {
    pub group_key: String,
    pub member_count: u32,
    pub total_points: f64,
    pub total_incentive: f64,
}

fn group_key_for(directory: &Directory, row: &PublicRow, group_type: GroupType) -> Option<String> {
    let rec = directory.by_id(&row.employee_id);
    match group_type {
        GroupType::Team => rec.and_then(|r| r.team_id.clone()),
        GroupType::Manager => rec.and_then(|r| r.reporting_manager_id.clone()),
        GroupType::Unassigned => {
            let has_group = rec
                .map(|r| r.team_id.is_some() || r.reporting_manager_id.is_some())
                .unwrap_or(false);
            if has_group {
                None
            } else {
                Some("unassigned".to_string())
            }
        }
    }
}

/// Aggregate the month's public rows by team, manager, or unassigned
pub fn team_view(
    store: &MemStore,
    directory: &Directory,
    month: Month,
    group_type: GroupType,
) -> Vec<TeamGroup> {
    let mut groups: BTreeMap<String, TeamGroup> = BTreeMap::new();
    for row in store.public_rows_for(month) {
        let Some(key) = group_key_for(directory, row, group_type) else {
            continue;
        };
        let entry = groups.entry(key.clone()).or_insert_with(|| TeamGroup {
            group_key: key,
            member_count: 0,
            total_points: 0.0,
            total_incentive: 0.0,
        });
        entry.member_count += 1;
        entry.total_points += row.total_points_final;
        entry.total_incentive += row.rupee_incentive.total_incentive;
    }
    let mut out: Vec<TeamGroup> = groups.into_values().collect();
    out.sort_by(|a, b| {
        b.total_points
            .partial_cmp(&a.total_points)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out
}

/// Members of one group for the month, ranked
pub fn team_members(
    store: &MemStore,
    directory: &Directory,
    month: Month,
    group_type: GroupType,
    group_key: &str,
) -> Vec<PublicRow> {
    let mut rows: Vec<PublicRow> = store
        .public_rows_for(month)
        .into_iter()
        .filter(|r| group_key_for(directory, r, group_type).as_deref() == Some(group_key))
        .cloned()
        .collect();
    rows.sort_by(|a, b| {
        b.total_points_final
            .partial_cmp(&a.total_points_final)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aum::{AumBook, AumSnapshot};
    use crate::identity::DirectoryRecord;
    use crate::lumpsum::{Transaction, TxnType};
    use crate::meetings::MeetingBook;
    use crate::orchestrator::{Engine, Feeds};
    use chrono::NaiveDate;

    fn engine_with_two_rms() -> Engine {
        let directory = Directory::with_records(vec![
            DirectoryRecord {
                employee_id: "E1".into(),
                full_name: "Ishu Mavar".into(),
                email: None,
                profile: "Mutual Funds".into(),
                is_active: true,
                inactive_since: None,
                team_id: Some("T-ALPHA".into()),
                reporting_manager_id: None,
            },
            DirectoryRecord {
                employee_id: "E2".into(),
                full_name: "Sagar Maini".into(),
                email: None,
                profile: "Mutual Funds".into(),
                is_active: true,
                inactive_since: None,
                team_id: Some("T-BETA".into()),
                reporting_manager_id: None,
            },
        ]);
        let aum = AumBook::with_snapshots(vec![
            AumSnapshot {
                month: "2025-09".parse().unwrap(),
                rm_name: "Ishu Mavar".into(),
                aum: 10_000_000.0,
            },
            AumSnapshot {
                month: "2025-09".parse().unwrap(),
                rm_name: "Sagar Maini".into(),
                aum: 5_000_000.0,
            },
        ]);
        Engine::new(ConfigStore::new(), directory, aum, MeetingBook::new())
    }

    fn txn(rm: &str, amount: f64) -> Transaction {
        Transaction {
            rm_name: rm.into(),
            transaction_date: NaiveDate::from_ymd_opt(2025, 9, 5).unwrap(),
            amount,
            txn_type: TxnType::Purchase,
            sub_category: "Equity".into(),
            scheme_name: "Axis Bluechip".into(),
        }
    }

    #[test]
    fn test_mtd_ranking_and_team_view() {
        let mut engine = engine_with_two_rms();
        let month: Month = "2025-09".parse().unwrap();
        let feeds = Feeds {
            transactions: vec![txn("Ishu Mavar", 500_000.0), txn("Sagar Maini", 900_000.0)],
            ..Default::default()
        };
        let now = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        engine.run_month(month, &feeds, now).unwrap();

        let rows = leaderboard_mtd(&engine.store, &engine.config_store, month);
        assert_eq!(rows.len(), 2);
        // Sorted descending by final points
        assert!(rows[0].total_points_final >= rows[1].total_points_final);

        let groups = team_view(&engine.store, &engine.directory, month, GroupType::Team);
        assert_eq!(groups.len(), 2);
        let members =
            team_members(&engine.store, &engine.directory, month, GroupType::Team, "T-ALPHA");
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].employee_id, "E1");
    }

    #[test]
    fn test_ytd_sums_months() {
        let mut engine = engine_with_two_rms();
        let now = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let sep: Month = "2025-09".parse().unwrap();
        let feeds = Feeds {
            transactions: vec![txn("Ishu Mavar", 500_000.0)],
            ..Default::default()
        };
        engine.run_month(sep, &feeds, now).unwrap();

        let ytd = leaderboard_ytd(&engine.store, &engine.config_store, sep, FyMode::FyApr);
        assert!(!ytd.is_empty());
        let e1 = ytd.iter().find(|r| r.employee_id == "E1").unwrap();
        assert_eq!(e1.months_counted, 1);
    }

    #[test]
    fn test_ignored_rms_filtered_from_reads() {
        let mut engine = engine_with_two_rms();
        let month: Month = "2025-09".parse().unwrap();
        let now = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let feeds = Feeds {
            transactions: vec![txn("Ishu Mavar", 500_000.0), txn("Sagar Maini", 900_000.0)],
            ..Default::default()
        };
        engine.run_month(month, &feeds, now).unwrap();

        engine
            .config_store
            .put(
                Metric::Lumpsum,
                serde_json::json!({"ignored_rms": ["ishu mavar"]}),
                "hide internal account",
                "ops@example.com",
                now,
            )
            .unwrap();

        let rows = leaderboard_mtd(&engine.store, &engine.config_store, month);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].employee_id, "E2");
    }

    #[test]
    fn test_user_breakdown_joins_collections() {
        let mut engine = engine_with_two_rms();
        let month: Month = "2025-09".parse().unwrap();
        let now = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let feeds = Feeds {
            transactions: vec![txn("Ishu Mavar", 500_000.0)],
            ..Default::default()
        };
        engine.run_month(month, &feeds, now).unwrap();

        let breakdown = user_breakdown(&engine.store, "E1", month).unwrap();
        assert!(breakdown.lumpsum.is_some());
        assert_eq!(breakdown.public.employee_id, "E1");
        assert!(user_breakdown(&engine.store, "nobody", month).is_none());
    }
}
