//! Short-lived persisted cache of probe results.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use txlab_core::storage::{KEY_LATENCY_CACHE, KeyValueStore, load_json, save_json};

use crate::prober::{Latency, ProbeResult};

/// Default validity window.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedLatency {
    /// Milliseconds, `None` when the endpoint was unreachable.
    pub latency: Option<u64>,
    /// Epoch milliseconds of the measurement.
    pub timestamp: i64,
}

impl CachedLatency {
    pub fn to_latency(self) -> Latency {
        match self.latency {
            Some(ms) => Latency::Reachable(Duration::from_millis(ms)),
            None => Latency::Unreachable,
        }
    }

    fn to_result(self, url: &str) -> ProbeResult {
        ProbeResult::at(url, self.to_latency(), self.timestamp)
    }
}

pub struct LatencyCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl LatencyCache {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn entries(&self) -> HashMap<String, CachedLatency> {
        load_json(self.store.as_ref(), KEY_LATENCY_CACHE)
    }

    /// Store `results` under the time each probe completed.
    pub fn record(&self, results: &[ProbeResult]) -> Result<()> {
        let mut entries = self.entries();
        for result in results {
            entries.insert(
                result.url.clone(),
                CachedLatency {
                    latency: result.latency.as_millis(),
                    timestamp: result.timestamp,
                },
            );
        }
        save_json(self.store.as_ref(), KEY_LATENCY_CACHE, &entries)
    }

    /// The cached result for `url` if it is still within the window.
    pub fn fresh(&self, url: &str) -> Option<ProbeResult> {
        self.fresh_at(url, now_ms())
    }

    fn fresh_at(&self, url: &str, now: i64) -> Option<ProbeResult> {
        self.entries()
            .get(url)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.to_result(url))
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn prune(&self) -> Result<usize> {
        self.prune_at(now_ms())
    }

    fn prune_at(&self, now: i64) -> Result<usize> {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| self.is_fresh(entry, now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Pruned stale latency cache entries");
            save_json(self.store.as_ref(), KEY_LATENCY_CACHE, &entries)?;
        }
        Ok(removed)
    }

    fn is_fresh(&self, entry: &CachedLatency, now: i64) -> bool {
        let age = now.saturating_sub(entry.timestamp);
        age >= 0 && (age as u128) < self.ttl.as_millis()
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use txlab_core::storage::MemoryStore;

    fn cache() -> LatencyCache {
        LatencyCache::new(Arc::new(MemoryStore::new()), DEFAULT_CACHE_TTL)
    }

    fn results(timestamp: i64) -> Vec<ProbeResult> {
        vec![
            ProbeResult::at(
                "https://fast.example",
                Latency::Reachable(Duration::from_millis(80)),
                timestamp,
            ),
            ProbeResult::at("https://down.example", Latency::Unreachable, timestamp),
        ]
    }

    #[test]
    fn fresh_within_window() {
        let cache = cache();
        cache.record(&results(1_000_000)).unwrap();

        let fast = cache
            .fresh_at("https://fast.example", 1_000_000 + 60_000)
            .unwrap();
        assert_eq!(fast.latency, Latency::Reachable(Duration::from_millis(80)));
        assert_eq!(fast.timestamp, 1_000_000);
        assert_eq!(
            cache
                .fresh_at("https://down.example", 1_000_000)
                .map(|r| r.latency),
            Some(Latency::Unreachable)
        );
        assert_eq!(cache.fresh_at("https://unknown.example", 1_000_000), None);
    }

    #[test]
    fn expired_entries_are_ignored_and_pruned() {
        let cache = cache();
        cache.record(&results(0)).unwrap();
        cache
            .record(&[ProbeResult::at(
                "https://late.example",
                Latency::Reachable(Duration::from_millis(5)),
                200_000,
            )])
            .unwrap();

        let now = 300_000;
        assert_eq!(cache.fresh_at("https://fast.example", now), None);
        assert_eq!(cache.prune_at(now).unwrap(), 2);
        assert_eq!(cache.prune_at(now).unwrap(), 0);
        assert!(cache.fresh_at("https://late.example", now).is_some());
    }

    #[test]
    fn freshly_stamped_results_are_fresh() {
        let cache = cache();
        cache
            .record(&[ProbeResult::new("https://fast.example", Latency::Unreachable)])
            .unwrap();
        assert!(cache.fresh("https://fast.example").is_some());
    }
}
