//! SIP/SWP scoring: reconciled transaction normalization, monthly rollups,
//! tiered trail rates, and the Lumpsum gate coupling

pub mod gate;
pub mod loader;
pub mod normalize;
pub mod scorer;
pub mod types;

pub use gate::{check_gate, LumpsumGateResult};
pub use normalize::normalize_documents;
pub use scorer::{rollup_months, SipScoreInputs};
pub use types::{NormalizedTxn, SipDocument, SipRow, TrailRow, VpSummaryRow};
