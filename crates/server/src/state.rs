// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use crate::aggregator::Aggregator;
use crate::cache::TtlCache;
use crate::config::ServerConfig;
use crate::usage::{AggregatedUsage, UsageSnapshot};

/// Shared server state.
pub struct ServerState {
    pub config: ServerConfig,
    aggregator: Aggregator,
    cache: TtlCache<UsageSnapshot>,
    /// Held while an aggregation runs so concurrent misses wait for it
    /// instead of spawning the tools again.
    refresh: Mutex<()>,
    aggregations: AtomicU64,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        let aggregator = Aggregator::from_filter(
            &config.adapters,
            config.adapter_timeouts(),
            config.aggregate_timeout(),
        );
        Self::with_aggregator(config, aggregator)
    }

    pub fn with_aggregator(config: ServerConfig, aggregator: Aggregator) -> Self {
        let cache = TtlCache::new(config.cache_ttl());
        Self {
            config,
            aggregator,
            cache,
            refresh: Mutex::new(()),
            aggregations: AtomicU64::new(0),
        }
    }

    /// Current usage, from cache when fresh.
    ///
    /// At most one aggregation runs at a time; callers that miss while one
    /// is in flight receive its result.
    pub async fn usage(&self) -> AggregatedUsage {
        if let Some(snapshot) = self.cache.get() {
            tracing::debug!(age_ms = self.cache_age_ms(), "usage cache hit");
            return snapshot.into_response(true);
        }

        let _guard = self.refresh.lock().await;
        if let Some(snapshot) = self.cache.get() {
            tracing::debug!("usage cache filled by concurrent refresh");
            return snapshot.into_response(true);
        }

        tracing::debug!("usage cache miss, aggregating");
        let snapshot = self.aggregator.aggregate().await;
        self.aggregations.fetch_add(1, Ordering::Relaxed);
        self.cache.set(snapshot.clone());
        snapshot.into_response(false)
    }

    /// Number of aggregations run since startup.
    pub fn aggregation_count(&self) -> u64 {
        self.aggregations.load(Ordering::Relaxed)
    }

    pub fn adapter_count(&self) -> usize {
        self.aggregator.adapter_count()
    }

    fn cache_age_ms(&self) -> u64 {
        self.cache.age().map(|a| a.as_millis() as u64).unwrap_or_default()
    }
}
