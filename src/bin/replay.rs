//! Re-aggregation replay
//!
//! Applies a config override file to a metric, then replays the affected
//! months in ascending order (metric scorers followed by the aggregator),
//! printing before/after totals per month. This is the offline equivalent
//! of the admin "reaggregate" action.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use incentive_engine::api;
use incentive_engine::aum::{load_aum_book, AumBook};
use incentive_engine::config::{ConfigStore, Metric};
use incentive_engine::identity::{load_directory, Directory};
use incentive_engine::meetings::{load_meeting_book, MeetingBook};
use incentive_engine::{Engine, Feeds, Month};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "replay", about = "Replay scoring for a month range after a config change")]
struct Args {
    /// Metric whose config changed: lumpsum | sip | insurance | referral
    #[arg(long)]
    metric: String,

    /// Config override JSON file (applied via the admin PUT path)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reason recorded in the config audit trail
    #[arg(long, default_value = "offline replay")]
    reason: String,

    /// First affected month (YYYY-MM)
    #[arg(long)]
    from: Month,

    /// Last month to replay (defaults to --from)
    #[arg(long)]
    through: Option<Month>,

    /// User directory CSV
    #[arg(long)]
    directory: Option<PathBuf>,

    /// AUM snapshot CSV
    #[arg(long)]
    aum: Option<PathBuf>,

    /// Meeting counts CSV
    #[arg(long)]
    meetings: Option<PathBuf>,

    /// Lumpsum transactions CSV
    #[arg(long)]
    transactions: Option<PathBuf>,

    /// SIP/SWP documents NDJSON
    #[arg(long)]
    sip: Option<PathBuf>,

    /// Insurance policies CSV
    #[arg(long)]
    policies: Option<PathBuf>,

    /// Referral leads CSV
    #[arg(long)]
    referrals: Option<PathBuf>,
}

fn parse_metric(s: &str) -> Result<Metric> {
    match s.trim().to_lowercase().as_str() {
        "lumpsum" => Ok(Metric::Lumpsum),
        "sip" => Ok(Metric::Sip),
        "insurance" => Ok(Metric::Insurance),
        "referral" => Ok(Metric::Referral),
        other => anyhow::bail!("unknown metric: {}", other),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let metric = parse_metric(&args.metric)?;
    let through = args.through.unwrap_or(args.from);
    let now = Utc::now().naive_utc();

    let directory = match &args.directory {
        Some(path) => load_directory(path).map_err(|e| anyhow::anyhow!("{}", e))?,
        None => Directory::new(),
    };
    let aum = match &args.aum {
        Some(path) => load_aum_book(path).map_err(|e| anyhow::anyhow!("{}", e))?,
        None => AumBook::new(),
    };
    let meetings = match &args.meetings {
        Some(path) => load_meeting_book(path).map_err(|e| anyhow::anyhow!("{}", e))?,
        None => MeetingBook::new(),
    };

    let feeds = Feeds {
        transactions: match &args.transactions {
            Some(path) => incentive_engine::lumpsum::loader::load_transactions(path)
                .map_err(|e| anyhow::anyhow!("{}", e))?,
            None => Vec::new(),
        },
        sip_documents: match &args.sip {
            Some(path) => incentive_engine::sip::loader::load_documents(path)
                .map_err(|e| anyhow::anyhow!("{}", e))?,
            None => Vec::new(),
        },
        policies: match &args.policies {
            Some(path) => incentive_engine::insurance::loader::load_policies(path)
                .map_err(|e| anyhow::anyhow!("{}", e))?,
            None => Vec::new(),
        },
        referral_leads: match &args.referrals {
            Some(path) => incentive_engine::referral::load_leads(path)
                .map_err(|e| anyhow::anyhow!("{}", e))?,
            None => Vec::new(),
        },
    };

    let mut engine = Engine::new(ConfigStore::new(), directory, aum, meetings);

    // Baseline pass with the current config
    for month in Month::range_inclusive(args.from, through) {
        engine.run_month(month, &feeds, now)?;
    }
    let baseline: Vec<(Month, f64)> = Month::range_inclusive(args.from, through)
        .into_iter()
        .map(|m| {
            let total: f64 = api::leaderboard_mtd(&engine.store, &engine.config_store, m)
                .iter()
                .map(|r| r.total_points_final)
                .sum();
            (m, total)
        })
        .collect();

    // Apply the override through the admin PUT path
    if let Some(path) = &args.config {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        match engine
            .config_store
            .put(metric, value, &args.reason, "replay-cli", now)
        {
            Ok(doc) => println!("Applied {} config v{}", metric, doc.version),
            Err(errors) => {
                eprintln!("Config rejected:");
                for e in errors {
                    eprintln!("  {}", e);
                }
                anyhow::bail!("config validation failed");
            }
        }
    }

    // Replay with the new config
    let replayed = engine.reaggregate(metric, args.from, through, &feeds, now)?;

    println!("\n{:<10} {:>16} {:>16} {:>12}", "Month", "Before", "After", "Delta");
    println!("{}", "-".repeat(58));
    for (month, before) in &baseline {
        let after: f64 = api::leaderboard_mtd(&engine.store, &engine.config_store, *month)
            .iter()
            .map(|r| r.total_points_final)
            .sum();
        println!(
            "{:<10} {:>16.2} {:>16.2} {:>12.2}",
            month,
            before,
            after,
            after - before
        );
    }
    println!("\nReplayed {} months", replayed.len());
    Ok(())
}
