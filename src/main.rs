//! Incentive Engine CLI
//!
//! Demo run: scores one month of sample data end-to-end and prints the
//! resulting public leaderboard

use chrono::NaiveDate;
use incentive_engine::aum::{AumBook, AumSnapshot};
use incentive_engine::config::ConfigStore;
use incentive_engine::identity::{Directory, DirectoryRecord};
use incentive_engine::lumpsum::{Transaction, TxnType};
use incentive_engine::meetings::MeetingBook;
use incentive_engine::{Engine, Feeds, Month};

fn main() {
    env_logger::init();

    println!("Incentive Engine v0.1.0");
    println!("=======================\n");

    let month: Month = "2025-09".parse().unwrap();

    let directory = Directory::with_records(vec![
        DirectoryRecord {
            employee_id: "E100".into(),
            full_name: "Ishu Mavar".into(),
            email: Some("ishu@example.com".into()),
            profile: "Mutual Funds".into(),
            is_active: true,
            inactive_since: None,
            team_id: Some("T-NORTH".into()),
            reporting_manager_id: None,
        },
        DirectoryRecord {
            employee_id: "E200".into(),
            full_name: "Sagar Maini".into(),
            email: Some("sagar@example.com".into()),
            profile: "Mutual Funds".into(),
            is_active: true,
            inactive_since: None,
            team_id: Some("T-NORTH".into()),
            reporting_manager_id: None,
        },
    ]);

    let aum = AumBook::with_snapshots(vec![
        AumSnapshot { month, rm_name: "Ishu Mavar".into(), aum: 10_000_000.0 },
        AumSnapshot { month, rm_name: "Sagar Maini".into(), aum: 5_000_000.0 },
    ]);

    let mut meetings = MeetingBook::new();
    meetings.add("Ishu Mavar", month, 6);

    let feeds = Feeds {
        transactions: vec![
            Transaction {
                rm_name: "Ishu Mavar".into(),
                transaction_date: NaiveDate::from_ymd_opt(2025, 9, 5).unwrap(),
                amount: 500_000.0,
                txn_type: TxnType::Purchase,
                sub_category: "Equity - Large Cap".into(),
                scheme_name: "Axis Bluechip".into(),
            },
            Transaction {
                rm_name: "Ishu Mavar".into(),
                transaction_date: NaiveDate::from_ymd_opt(2025, 9, 10).unwrap(),
                amount: 100_000.0,
                txn_type: TxnType::SwitchIn,
                sub_category: "Equity - Flexi Cap".into(),
                scheme_name: "Parag Parikh Flexi Cap".into(),
            },
            Transaction {
                rm_name: "Ishu Mavar".into(),
                transaction_date: NaiveDate::from_ymd_opt(2025, 9, 15).unwrap(),
                amount: 200_000.0,
                txn_type: TxnType::Redemption,
                sub_category: "Equity - Large Cap".into(),
                scheme_name: "Axis Bluechip".into(),
            },
            Transaction {
                rm_name: "Sagar Maini".into(),
                transaction_date: NaiveDate::from_ymd_opt(2025, 9, 12).unwrap(),
                amount: 300_000.0,
                txn_type: TxnType::Purchase,
                sub_category: "Hybrid - Balanced Advantage".into(),
                scheme_name: "ICICI Balanced Advantage".into(),
            },
        ],
        sip_documents: vec![],
        policies: vec![],
        referral_leads: vec![],
    };

    let mut engine = Engine::new(ConfigStore::new(), directory, aum, meetings);
    let now = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap().and_hms_opt(6, 0, 0).unwrap();

    engine.run_month(month, &feeds, now).expect("month run");

    // Print the lumpsum detail
    println!("Lumpsum rows ({}):", month);
    println!(
        "{:<20} {:>14} {:>8} {:>10} {:>6} {:>12}",
        "RM", "NetPurchase", "Growth%", "Rate", "Meets", "Incentive"
    );
    println!("{}", "-".repeat(76));
    let mut ls_rows: Vec<_> = engine
        .store
        .leaderboard_lumpsum
        .values()
        .filter(|r| r.month == month)
        .collect();
    ls_rows.sort_by(|a, b| {
        b.net_purchase
            .partial_cmp(&a.net_purchase)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for row in &ls_rows {
        println!(
            "{:<20} {:>14.2} {:>8.2} {:>10.5} {:>6} {:>12.2}",
            row.employee_name,
            row.net_purchase,
            row.growth_pct,
            row.rate_used,
            row.meeting_count,
            row.final_incentive,
        );
    }

    // Print the public leaderboard
    println!("\nPublic leaderboard ({}):", month);
    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>12} {:>8}",
        "RM", "MF", "INS", "REF", "Total", "Elig"
    );
    println!("{}", "-".repeat(76));
    let rows = incentive_engine::api::leaderboard_mtd(&engine.store, &engine.config_store, month);
    for row in &rows {
        println!(
            "{:<20} {:>10.2} {:>10.2} {:>10.2} {:>12.2} {:>8}",
            row.rm_name,
            row.mf_points,
            row.ins_points,
            row.ref_points,
            row.total_points_final,
            if row.payout_eligible { "yes" } else { "no" },
        );
    }

    println!("\nConfig hashes:");
    for metric in incentive_engine::Metric::all() {
        let eff = engine.config_store.effective(metric);
        println!("  {:<10} {}", metric.to_string(), eff.hash);
    }
}
