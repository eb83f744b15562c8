// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrent fan-out over usage adapters.
//!
//! Every adapter runs in its own task so a failing, panicking or hung tool
//! only affects its own breakdown entry. Results are reassembled in
//! registration order regardless of completion order.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use crate::adapter::{registry, AdapterFilter, AdapterTimeouts, UsageAdapter};
use crate::period::{now_iso, Period};
use crate::usage::{AdapterResult, UsageData, UsageSnapshot};

/// Queries a fixed, ordered set of adapters.
pub struct Aggregator {
    adapters: Vec<Arc<dyn UsageAdapter>>,
    deadline: Duration,
}

impl Aggregator {
    /// `deadline` bounds each adapter's whole check + usage sequence.
    pub fn new(adapters: Vec<Arc<dyn UsageAdapter>>, deadline: Duration) -> Self {
        Self { adapters, deadline }
    }

    /// Aggregator over the built-in adapters selected by `filter`.
    pub fn from_filter(filter: &AdapterFilter, timeouts: AdapterTimeouts, deadline: Duration) -> Self {
        Self::new(registry(filter, timeouts), deadline)
    }

    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Query every adapter and merge the results.
    pub async fn aggregate(&self) -> UsageSnapshot {
        let period = Period::today();

        let handles: Vec<_> = self
            .adapters
            .iter()
            .map(|adapter| {
                let adapter = Arc::clone(adapter);
                let deadline = self.deadline;
                tokio::spawn(async move { query(adapter.as_ref(), period, deadline).await })
            })
            .collect();

        let breakdown: Vec<AdapterResult> = join_all(handles)
            .await
            .into_iter()
            .zip(&self.adapters)
            .map(|(joined, adapter)| match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(adapter = %adapter.name(), err = %e, "adapter task failed");
                    AdapterResult::unavailable(
                        adapter.name(),
                        adapter.display_name(),
                        format!("{} crashed", adapter.display_name()),
                    )
                }
            })
            .collect();

        let total: UsageData = breakdown.iter().map(|r| r.usage).sum();
        let available = breakdown.iter().filter(|r| r.available).count();
        tracing::debug!(
            adapters = breakdown.len(),
            available,
            total_tokens = total.total_tokens,
            "aggregated usage"
        );

        UsageSnapshot {
            total,
            breakdown,
            timestamp: now_iso(),
            period_start: period.start(),
            period_end: period.end(),
        }
    }
}

async fn query(adapter: &dyn UsageAdapter, period: Period, deadline: Duration) -> AdapterResult {
    let name = adapter.name();
    let display = adapter.display_name();

    let work = async {
        if !adapter.check().await {
            tracing::debug!(adapter = %name, "adapter not installed");
            return AdapterResult::unavailable(name, display, format!("{display} not installed"));
        }
        match adapter.usage(period).await {
            Ok(usage) => AdapterResult::available(name, display, usage),
            Err(e) => {
                tracing::warn!(adapter = %name, err = %e, "adapter usage failed");
                AdapterResult::unavailable(name, display, e.to_string())
            }
        }
    };

    match tokio::time::timeout(deadline, work).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(adapter = %name, deadline_ms = deadline.as_millis() as u64, "adapter exceeded aggregation deadline");
            AdapterResult::unavailable(
                name,
                display,
                format!("{display} timed out after {}ms", deadline.as_millis()),
            )
        }
    }
}

#[cfg(test)]
#[path = "aggregator_tests.rs"]
mod tests;
