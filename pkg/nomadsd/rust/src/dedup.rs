// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use dashmap::DashSet;

/// Allocation ids already handed to a branch during the current scrape cycle.
///
/// Several registrations can point at the same allocation; its checks must be
/// fetched and reported once per cycle.
#[derive(Debug, Default)]
pub struct DedupCache {
    claimed: DashSet<String>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true for the first claim of `key` since the last reset.
    pub fn try_claim(&self, key: &str) -> bool {
        self.claimed.insert(key.to_owned())
    }

    pub fn reset(&self) {
        self.claimed.clear();
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_claim_once() {
        let cache = DedupCache::new();
        assert!(cache.try_claim("alloc-1"));
        assert!(!cache.try_claim("alloc-1"));
        assert!(cache.try_claim("alloc-2"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_reset_forgets_claims() {
        let cache = DedupCache::new();
        assert!(cache.try_claim("alloc-1"));
        cache.reset();
        assert!(cache.is_empty());
        assert!(cache.try_claim("alloc-1"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_racing_claims_have_one_winner() {
        let cache = Arc::new(DedupCache::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..64 {
            let cache = Arc::clone(&cache);
            let winners = Arc::clone(&winners);
            tasks.spawn(async move {
                if cache.try_claim("shared-alloc") {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
