//! Job locks
//!
//! One lock document per job key, preventing concurrent scorer runs from
//! trampling each other's outputs. Held locks expire after a TTL so a
//! crashed owner never wedges the pipeline.

use chrono::{Duration, NaiveDateTime};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Default lock TTL in minutes
pub const DEFAULT_LOCK_TTL_MINUTES: i64 = 90;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobLock {
    pub key: String,
    pub owner_instance_id: String,
    pub acquired_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, Error)]
#[error("lock '{key}' held by {owner_instance_id} until {expires_at}")]
pub struct LockHeld {
    pub key: String,
    pub owner_instance_id: String,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Default)]
pub struct LockTable {
    locks: HashMap<String, JobLock>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock, or fail if another live owner holds it.
    /// Expired locks are reclaimed silently.
    pub fn acquire(
        &mut self,
        key: &str,
        owner: &str,
        now: NaiveDateTime,
        ttl: Duration,
    ) -> Result<JobLock, LockHeld> {
        if let Some(existing) = self.locks.get(key) {
            if existing.expires_at > now && existing.owner_instance_id != owner {
                return Err(LockHeld {
                    key: key.to_string(),
                    owner_instance_id: existing.owner_instance_id.clone(),
                    expires_at: existing.expires_at,
                });
            }
            if existing.expires_at <= now {
                warn!(
                    "[Lock] Reclaiming expired lock '{}' from {}",
                    key, existing.owner_instance_id
                );
            }
        }
        let lock = JobLock {
            key: key.to_string(),
            owner_instance_id: owner.to_string(),
            acquired_at: now,
            expires_at: now + ttl,
        };
        self.locks.insert(key.to_string(), lock.clone());
        info!("[Lock] '{}' acquired by {}", key, owner);
        Ok(lock)
    }

    /// Release by owner; a non-owner release is a no-op
    pub fn release(&mut self, key: &str, owner: &str) -> bool {
        match self.locks.get(key) {
            Some(lock) if lock.owner_instance_id == owner => {
                self.locks.remove(key);
                info!("[Lock] '{}' released by {}", key, owner);
                true
            }
            _ => false,
        }
    }

    pub fn holder(&self, key: &str) -> Option<&JobLock> {
        self.locks.get(key)
    }
}
