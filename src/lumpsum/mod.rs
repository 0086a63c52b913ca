//! Lumpsum net-purchase scoring

pub mod loader;
pub mod scorer;
pub mod slabs;
pub mod types;

pub use scorer::{score_month, LumpsumScoreInputs};
pub use types::{LumpsumRow, Transaction, TxnType};
