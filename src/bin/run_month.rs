//! Score a month range end-to-end from file feeds
//!
//! Loads the directory, AUM snapshots, meeting counts and the four
//! transaction feeds, runs every scorer plus the aggregator for each month
//! in the range, and writes the public leaderboard to CSV.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use incentive_engine::api;
use incentive_engine::aum::{load_aum_book, AumBook};
use incentive_engine::config::ConfigStore;
use incentive_engine::identity::{load_directory, Directory};
use incentive_engine::meetings::{load_meeting_book, MeetingBook};
use incentive_engine::{Engine, Feeds, Month};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "run_month", about = "Run the incentive pipeline for a month range")]
struct Args {
    /// First month to score (YYYY-MM)
    #[arg(long)]
    month: Month,

    /// Last month to score (defaults to --month)
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

    /// Output CSV for the public leaderboard
    #[arg(long, default_value = "public_leaderboard.csv")]
    out: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let start = Instant::now();

    let directory = match &args.directory {
        Some(path) => load_directory(path)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("loading directory from {}", path.display()))?,
        None => Directory::new(),
    };
    let aum = match &args.aum {
        Some(path) => load_aum_book(path)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("loading AUM snapshots from {}", path.display()))?,
        None => AumBook::new(),
    };
    let meetings = match &args.meetings {
        Some(path) => load_meeting_book(path)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("loading meetings from {}", path.display()))?,
        None => MeetingBook::new(),
    };

    let feeds = Feeds {
        transactions: match &args.transactions {
            Some(path) => incentive_engine::lumpsum::loader::load_transactions(path)
                .map_err(|e| anyhow::anyhow!("{}", e))
                .with_context(|| format!("loading transactions from {}", path.display()))?,
            None => Vec::new(),
        },
        sip_documents: match &args.sip {
            Some(path) => incentive_engine::sip::loader::load_documents(path)
                .map_err(|e| anyhow::anyhow!("{}", e))
                .with_context(|| format!("loading SIP documents from {}", path.display()))?,
            None => Vec::new(),
        },
        policies: match &args.policies {
            Some(path) => incentive_engine::insurance::loader::load_policies(path)
                .map_err(|e| anyhow::anyhow!("{}", e))
                .with_context(|| format!("loading policies from {}", path.display()))?,
            None => Vec::new(),
        },
        referral_leads: match &args.referrals {
            Some(path) => incentive_engine::referral::load_leads(path)
                .map_err(|e| anyhow::anyhow!("{}", e))
                .with_context(|| format!("loading referral leads from {}", path.display()))?,
            None => Vec::new(),
        },
    };

    println!(
        "Loaded {} transactions, {} SIP docs, {} policies, {} leads in {:?}",
        feeds.transactions.len(),
        feeds.sip_documents.len(),
        feeds.policies.len(),
        feeds.referral_leads.len(),
        start.elapsed()
    );

    let mut engine = Engine::new(ConfigStore::new(), directory, aum, meetings);
    let now = Utc::now().naive_utc();
    let through = args.through.unwrap_or(args.month);

    for month in Month::range_inclusive(args.month, through) {
        println!("Scoring {}...", month);
        engine
            .run_month(month, &feeds, now)
            .with_context(|| format!("scoring month {}", month))?;
    }

    // Write the public leaderboard for the whole range
    let mut file = File::create(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;
    writeln!(
        file,
        "Month,EmployeeID,RMName,MFSIPPoints,MFLumpsumPoints,MFPoints,INSPoints,REFPoints,TotalPublic,AdjPoints,TotalFinal,NetSIP,AUMStart,PayoutEligible,TotalIncentive"
    )?;
    let mut total_rows = 0usize;
    for month in Month::range_inclusive(args.month, through) {
        for row in api::leaderboard_mtd(&engine.store, &engine.config_store, month) {
            writeln!(
                file,
                "{},{},{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{},{:.2}",
                row.period_month,
                row.employee_id,
                row.rm_name,
                row.mf_sip_points,
                row.mf_lumpsum_points,
                row.mf_points,
                row.ins_points,
                row.ref_points,
                row.total_points_public,
                row.adj_points_total,
                row.total_points_final,
                row.net_sip,
                row.aum_start,
                row.payout_eligible,
                row.rupee_incentive.total_incentive,
            )?;
            total_rows += 1;
        }
    }

    println!(
        "Wrote {} rows to {} in {:?}",
        total_rows,
        args.out.display(),
        start.elapsed()
    );
    Ok(())
}
