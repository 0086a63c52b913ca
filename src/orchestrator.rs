//! Run orchestration
//!
//! Owns the scorer sequencing for normal runs and config-triggered
//! re-aggregation. Each scorer run is guarded by a TTL'd job lock; months
//! are always processed ascending so streak state reproduces exactly.

use crate::aggregate::{self, AggregateInputs, LeaderAssignment, MetricHashes};
use crate::aum::AumBook;
use crate::config::{ConfigStore, Metric};
use crate::identity::{Directory, SkipList};
use crate::insurance::{self, InsuranceScoreInputs, PolicyRecord};
use crate::lumpsum::{self, LumpsumScoreInputs, Transaction};
use crate::meetings::MeetingBook;
use crate::referral::{self, ReferralLead};
use crate::sip::{self, SipDocument, SipScoreInputs};
use crate::store::lock::DEFAULT_LOCK_TTL_MINUTES;
use crate::store::MemStore;
use crate::window::Month;
use chrono::{Duration, NaiveDateTime};
use log::info;
use rayon::prelude::*;
use thiserror::Error;

const LOCK_LUMPSUM: &str = "lumpsum-scorer";
const LOCK_SIP: &str = "sip-scorer";
const LOCK_INSURANCE: &str = "insurance-scorer";
const LOCK_REFERRAL: &str = "referral-scorer";
const LOCK_AGGREGATOR: &str = "leaderboard-aggregator";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("lock acquisition failed: {0}")]
    Lock(#[from] crate::store::LockHeld),
}

/// Raw input feeds for a scoring run
#[derive(Debug, Default)]
pub struct Feeds {
    pub transactions: Vec<Transaction>,
    pub sip_documents: Vec<SipDocument>,
    pub policies: Vec<PolicyRecord>,
    pub referral_leads: Vec<ReferralLead>,
}

/// The engine: config, reference data, persisted collections, and the
/// scorer pipeline over them
pub struct Engine {
    pub config_store: ConfigStore,
    pub directory: Directory,
    pub aum: AumBook,
    pub meetings: MeetingBook,
    pub store: MemStore,
    pub leaders: LeaderAssignment,
    pub instance_id: String,
}

impl Engine {
    pub fn new(
        config_store: ConfigStore,
        directory: Directory,
        aum: AumBook,
        meetings: MeetingBook,
    ) -> Self {
        Self {
            config_store,
            directory,
            aum,
            meetings,
            store: MemStore::new(),
            leaders: LeaderAssignment::default(),
            instance_id: "engine-1".to_string(),
        }
    }

    fn acquire(&mut self, key: &str, now: NaiveDateTime) -> Result<(), EngineError> {
        self.store.locks.acquire(
            key,
            &self.instance_id,
            now,
            Duration::minutes(DEFAULT_LOCK_TTL_MINUTES),
        )?;
        Ok(())
    }

    fn release(&mut self, key: &str) {
        let owner = self.instance_id.clone();
        self.store.locks.release(key, &owner);
    }

    /// Run the Lumpsum scorer for one month over the given transactions
    pub fn run_lumpsum_month(
        &mut self,
        month: Month,
        transactions: &[Transaction],
        now: NaiveDateTime,
    ) -> Result<usize, EngineError> {
        self.acquire(LOCK_LUMPSUM, now)?;
        let (config, effective) = self.config_store.lumpsum();
        let skip = SkipList::from_names(&config.ignored_rms);

        let (start, end) = month.window();
        let in_window: Vec<Transaction> = transactions
            .iter()
            .filter(|t| {
                let d = t.transaction_date;
                d >= start.date() && d < end.date()
            })
            .cloned()
            .collect();

        let rows = {
            let inputs = LumpsumScoreInputs {
                config: &config,
                config_hash: &effective.hash,
                config_fallback_used: effective.fallback_used,
                directory: &self.directory,
                skip: &skip,
                aum: &self.aum,
                meetings: &self.meetings,
                history: &self.store.leaderboard_lumpsum,
                now,
            };
            lumpsum::score_month(&inputs, month, &in_window)
        };
        let n = self.store.upsert_lumpsum_rows(rows);
        self.release(LOCK_LUMPSUM);
        Ok(n)
    }

    /// Run the SIP scorer for one month over the given documents
    pub fn run_sip_month(
        &mut self,
        month: Month,
        documents: &[SipDocument],
        now: NaiveDateTime,
    ) -> Result<usize, EngineError> {
        self.acquire(LOCK_SIP, now)?;
        let (config, effective) = self.config_store.sip();
        let skip = SkipList::from_names(&config.ignored_rms);

        let txns =
            sip::normalize_documents(documents, month.window(), &config.weights, true);
        let txns_this_month: Vec<_> =
            txns.into_iter().filter(|t| t.month() == month).collect();

        let (rows, trail, vp) = {
            let inputs = SipScoreInputs {
                config: &config,
                config_hash: &effective.hash,
                config_fallback_used: effective.fallback_used,
                directory: &self.directory,
                skip: &skip,
                aum: &self.aum,
                lumpsum_rows: &self.store.leaderboard_lumpsum,
                sip_history: &self.store.mf_sip_leaderboard,
                now,
            };
            let rows = sip::rollup_months(&inputs, &txns_this_month);
            let (trail, vp) = sip::scorer::aggregate_trail(&rows, &config, &effective.hash, now);
            (rows, trail, vp)
        };
        let n = self.store.upsert_sip_rows(rows);
        self.store.upsert_trail(trail, vp);
        self.release(LOCK_SIP);
        Ok(n)
    }

    /// Run the Insurance scorer for one month over the given policies
    pub fn run_insurance_month(
        &mut self,
        month: Month,
        policies: &[PolicyRecord],
        now: NaiveDateTime,
    ) -> Result<usize, EngineError> {
        self.acquire(LOCK_INSURANCE, now)?;
        let (config, effective) = self.config_store.insurance();
        let skip = SkipList::from_names(&config.ignored_rms);

        let (scores, rows) = {
            let inputs = InsuranceScoreInputs {
                config: &config,
                config_hash: &effective.hash,
                config_fallback_used: effective.fallback_used,
                directory: &self.directory,
                skip: &skip,
                history: &self.store.leaderboard_insurance,
                now,
            };
            // Per-policy scoring is independent; fan out across cores
            let scores: Vec<_> = policies
                .par_iter()
                .filter(|p| p.period_month() == month)
                .filter_map(|p| insurance::score_policy(&inputs, p))
                .collect();
            let rows = insurance::aggregate_month(&inputs, month, &scores);
            (scores, rows)
        };
        self.store.upsert_policy_scores(scores);
        let n = self.store.upsert_insurance_rows(rows);
        self.release(LOCK_INSURANCE);
        Ok(n)
    }

    /// Run the Referral scorer over all leads converting in `month`
    pub fn run_referrals_month(
        &mut self,
        month: Month,
        leads: &[ReferralLead],
        now: NaiveDateTime,
    ) -> Result<usize, EngineError> {
        self.acquire(LOCK_REFERRAL, now)?;
        let (config, effective) = self.config_store.referral();
        let skip = SkipList::from_names(&config.ignored_rms);
        let month_leads: Vec<ReferralLead> = leads
            .iter()
            .filter(|l| l.month() == month)
            .cloned()
            .collect();
        let rows = referral::score_leads(
            &config,
            &self.directory,
            &skip,
            &month_leads,
            &effective.hash,
            now,
        );
        let n = self.store.upsert_referral_rows(rows);
        self.release(LOCK_REFERRAL);
        Ok(n)
    }

    /// Join the metric outputs into public rows for one month
    pub fn run_aggregation_month(
        &mut self,
        month: Month,
        now: NaiveDateTime,
    ) -> Result<usize, EngineError> {
        self.acquire(LOCK_AGGREGATOR, now)?;
        let (sip_config, sip_eff) = self.config_store.sip();
        let (ins_config, ins_eff) = self.config_store.insurance();
        let (ref_config, ref_eff) = self.config_store.referral();
        let ls_eff = self.config_store.effective(Metric::Lumpsum);
        let hashes = MetricHashes {
            lumpsum: ls_eff.hash,
            sip: sip_eff.hash,
            insurance: ins_eff.hash,
            referral: ref_eff.hash,
        };

        let referrals = self.store.referral_rows();
        let (rows, credits, reconciliations) = {
            let inputs = AggregateInputs {
                directory: &self.directory,
                sip_config: &sip_config,
                insurance_config: &ins_config,
                referral_config: &ref_config,
                leaders: &self.leaders,
                lumpsum: &self.store.leaderboard_lumpsum,
                sip: &self.store.mf_sip_leaderboard,
                insurance: &self.store.leaderboard_insurance,
                referrals: &referrals,
                adjustments: &self.store.adjustments,
                hashes: &hashes,
                now,
            };
            aggregate::aggregate_month(&inputs, month)
        };
        let n = self.store.upsert_public_rows(rows);
        self.store.upsert_leader_credits(credits, reconciliations);
        self.release(LOCK_AGGREGATOR);
        Ok(n)
    }

    /// Full pipeline for one month: metric scorers in dependency order, then
    /// the aggregator (which must run after every metric has completed)
    pub fn run_month(
        &mut self,
        month: Month,
        feeds: &Feeds,
        now: NaiveDateTime,
    ) -> Result<(), EngineError> {
        info!("[Run] Scoring month {}", month);
        self.run_lumpsum_month(month, &feeds.transactions, now)?;
        self.run_sip_month(month, &feeds.sip_documents, now)?;
        self.run_insurance_month(month, &feeds.policies, now)?;
        self.run_referrals_month(month, &feeds.referral_leads, now)?;
        self.run_aggregation_month(month, now)?;
        Ok(())
    }

    /// Config-triggered re-aggregation over `[start, through]`, ascending.
    /// Mutual-fund config changes rerun Lumpsum → SIP → aggregation per
    /// month; insurance changes rerun Insurance → aggregation; referral
    /// changes rerun Referral → aggregation. Cross-metric work inside one
    /// invocation stays strictly serial.
    pub fn reaggregate(
        &mut self,
        metric: Metric,
        start: Month,
        through: Month,
        feeds: &Feeds,
        now: NaiveDateTime,
    ) -> Result<Vec<Month>, EngineError> {
        let months = Month::range_inclusive(start, through);
        info!(
            "[Reaggregate] metric={} months={}..{} ({})",
            metric,
            start,
            through,
            months.len()
        );
        for &month in &months {
            match metric {
                Metric::Lumpsum | Metric::Sip => {
                    self.run_lumpsum_month(month, &feeds.transactions, now)?;
                    self.run_sip_month(month, &feeds.sip_documents, now)?;
                }
                Metric::Insurance => {
                    self.run_insurance_month(month, &feeds.policies, now)?;
                }
                Metric::Referral => {
                    self.run_referrals_month(month, &feeds.referral_leads, now)?;
                }
            }
            self.run_aggregation_month(month, now)?;
        }
        Ok(months)
    }
}
