// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token usage types shared by adapters, the aggregator, and the HTTP API.

use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Token counts reported by one adapter (or summed across several).
///
/// `total_tokens` is always `input + output + reasoning`; construct through
/// [`UsageData::new`] so the invariant cannot drift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageData {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default)]
    pub reasoning_tokens: u64,
    pub total_tokens: u64,
}

impl UsageData {
    pub fn new(input_tokens: u64, output_tokens: u64, reasoning_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            reasoning_tokens,
            total_tokens: input_tokens
                .saturating_add(output_tokens)
                .saturating_add(reasoning_tokens),
        }
    }
}

impl Add for UsageData {
    type Output = UsageData;

    fn add(self, rhs: UsageData) -> UsageData {
        UsageData::new(
            self.input_tokens.saturating_add(rhs.input_tokens),
            self.output_tokens.saturating_add(rhs.output_tokens),
            self.reasoning_tokens.saturating_add(rhs.reasoning_tokens),
        )
    }
}

impl std::iter::Sum for UsageData {
    fn sum<I: Iterator<Item = UsageData>>(iter: I) -> Self {
        iter.fold(UsageData::default(), Add::add)
    }
}

/// Outcome of querying a single adapter during one aggregation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterResult {
    pub source: String,
    pub display_name: String,
    #[serde(flatten)]
    pub usage: UsageData,
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdapterResult {
    pub fn available(source: &str, display_name: &str, usage: UsageData) -> Self {
        Self {
            source: source.to_owned(),
            display_name: display_name.to_owned(),
            usage,
            available: true,
            error: None,
        }
    }

    /// An unavailable result. Numeric fields are zeroed so the entry never
    /// contributes to the aggregate total.
    pub fn unavailable(source: &str, display_name: &str, error: impl Into<String>) -> Self {
        Self {
            source: source.to_owned(),
            display_name: display_name.to_owned(),
            usage: UsageData::default(),
            available: false,
            error: Some(error.into()),
        }
    }
}

/// One aggregation cycle's result, as held by the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub total: UsageData,
    pub breakdown: Vec<AdapterResult>,
    pub timestamp: String,
    pub period_start: String,
    pub period_end: String,
}

impl UsageSnapshot {
    /// Attach the cache flag for the wire response.
    pub fn into_response(self, cached: bool) -> AggregatedUsage {
        AggregatedUsage { snapshot: self, cached }
    }
}

/// `GET /usage` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedUsage {
    #[serde(flatten)]
    pub snapshot: UsageSnapshot,
    pub cached: bool,
}

#[cfg(test)]
#[path = "usage_tests.rs"]
mod tests;
