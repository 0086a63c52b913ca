//! Incentive Engine - Performance-linked incentive scoring for RM leaderboards
//!
//! This library provides:
//! - Lumpsum net-purchase scoring (bucket weights, growth slabs, meeting
//!   multipliers, penalties, streak bonuses)
//! - SIP/SWP scoring (reconciled normalization, tiered trail rates, bonus
//!   and penalty slabs, Lumpsum-gate coupling)
//! - Insurance per-policy scoring and monthly payout slabs
//! - Referral scoring with inactivity gating
//! - Public leaderboard aggregation, leader credits and rupee incentives
//! - A versioned, hash-stamped runtime config layer with audit archival

pub mod aggregate;
pub mod api;
pub mod audit;
pub mod aum;
pub mod config;
pub mod identity;
pub mod insurance;
pub mod lumpsum;
pub mod meetings;
pub mod orchestrator;
pub mod referral;
pub mod sip;
pub mod store;
pub mod window;

// Re-export commonly used types
pub use aggregate::{Adjustment, LeaderCredit, PublicRow, RupeeIncentive};
pub use config::{ConfigStore, Metric};
pub use identity::Directory;
pub use insurance::{InsuranceMonthlyRow, PolicyRecord};
pub use lumpsum::{LumpsumRow, Transaction};
pub use orchestrator::{Engine, Feeds};
pub use sip::{SipDocument, SipRow};
pub use window::Month;
