//! Runtime configuration layer
//!
//! Each metric reads a versioned, schema-tagged config document on every run.
//! Stored documents are merged field-by-field over built-in defaults, hashed,
//! and the hash is stamped on every output row the run produces.

pub mod defaults;
pub mod hash;
pub mod model;
pub mod store;
pub mod validate;

pub use hash::config_hash;
pub use model::*;
pub use store::{ConfigAuditEntry, ConfigStore, StoredConfig};
pub use validate::{validate_metric, ValidationError};
