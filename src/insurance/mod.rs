//! Insurance policy scoring: per-policy classification and points, monthly
//! aggregation, payout slabs, and periodic rupee bonuses

pub mod loader;
pub mod scorer;
pub mod types;

pub use scorer::{aggregate_month, score_policy, InsuranceScoreInputs};
pub use types::{Classification, InsuranceMonthlyRow, PolicyRecord, PolicyScore};
