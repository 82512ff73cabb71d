//! # tollgate-cache
//!
//! Ephemeral TTL key-value store.
//!
//! Holds the usage-window baselines read by the overuse detector and the
//! short-lived node online/load samples. Nothing here is authoritative:
//! every entry expires on its own and a lost entry merely restarts window
//! tracking, so the store is deliberately not coupled to the database's
//! transactions.
//!
//! All methods take an explicit `now` timestamp; the store never reads the
//! wall clock itself, which keeps job tests deterministic.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// A cached value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Int(u64),
    Text(String),
}

#[derive(Clone, Debug)]
struct Entry {
    value: Value,
    expires_at: u64,
}

/// In-process TTL key-value store. Cheap to clone keys into, safe to share
/// across tasks.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a value with a TTL in seconds, replacing any previous entry.
    pub fn put(&self, key: &str, value: Value, ttl_secs: u64, now: u64) {
        let entry = Entry {
            value,
            expires_at: now.saturating_add(ttl_secs),
        };
        self.lock().insert(key.to_owned(), entry);
    }

    /// Store an integer value.
    pub fn put_int(&self, key: &str, value: u64, ttl_secs: u64, now: u64) {
        self.put(key, Value::Int(value), ttl_secs, now);
    }

    /// Store a text value.
    pub fn put_text(&self, key: &str, value: &str, ttl_secs: u64, now: u64) {
        self.put(key, Value::Text(value.to_owned()), ttl_secs, now);
    }

    /// Fetch a live value. Expired entries are invisible and dropped.
    pub fn get(&self, key: &str, now: u64) -> Option<Value> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Fetch a live integer value.
    pub fn get_int(&self, key: &str, now: u64) -> Option<u64> {
        match self.get(key, now) {
            Some(Value::Int(v)) => Some(v),
            _ => None,
        }
    }

    /// Fetch a live text value.
    pub fn get_text(&self, key: &str, now: u64) -> Option<String> {
        match self.get(key, now) {
            Some(Value::Text(v)) => Some(v),
            _ => None,
        }
    }

    /// Remove one entry.
    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Drop all expired entries. Returns the number purged.
    pub fn purge_expired(&self, now: u64) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let purged = before - entries.len();
        if purged > 0 {
            tracing::debug!(purged, "cache: dropped expired entries");
        }
        purged
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
