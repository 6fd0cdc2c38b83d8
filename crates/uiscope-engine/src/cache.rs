//! Result cache keyed by analyzed URL.
//!
//! The pipeline never touches storage itself; callers inject a [`ResultCache`]
//! in front of it.

use crate::config::CacheConfig;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;
use uiscope_common::protocol::Annotation;

pub trait ResultCache: Send + Sync {
    /// Cached annotations for `url`, if present and not expired.
    fn get(&self, url: &str) -> Option<Vec<Annotation>>;

    fn put(&self, url: &str, annotations: Vec<Annotation>);
}

struct Entry {
    stored_at: Instant,
    annotations: Vec<Annotation>,
}

/// In-process cache with a TTL and a capacity bound.
///
/// Expired entries are dropped when read. At capacity the oldest entry is
/// evicted before a new one is stored.
pub struct MemoryCache {
    prefix: String,
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            prefix: config.prefix.clone(),
            ttl: Duration::from_secs(config.ttl_secs),
            max_entries: config.max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Storage key: prefix followed by the base64 encoded URL.
    pub fn key_for(&self, url: &str) -> String {
        format!("{}{}", self.prefix, STANDARD.encode(url))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_at(&self, url: &str, now: Instant) -> Option<Vec<Annotation>> {
        let key = self.key_for(url);
        let mut entries = self.lock();
        let expired = match entries.get(&key) {
            Some(entry) => now.saturating_duration_since(entry.stored_at) > self.ttl,
            None => return None,
        };
        if expired {
            debug!("Cache entry for {} expired", url);
            entries.remove(&key);
            return None;
        }
        entries.get(&key).map(|e| e.annotations.clone())
    }

    pub fn put_at(&self, url: &str, annotations: Vec<Annotation>, now: Instant) {
        let key = self.key_for(url);
        let mut entries = self.lock();
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!("Cache full, evicting {}", oldest);
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            Entry {
                stored_at: now,
                annotations,
            },
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, url: &str) -> Option<Vec<Annotation>> {
        self.get_at(url, Instant::now())
    }

    fn put(&self, url: &str, annotations: Vec<Annotation>) {
        self.put_at(url, annotations, Instant::now());
    }
}
