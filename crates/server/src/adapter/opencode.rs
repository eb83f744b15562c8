// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenCode usage via the `opencode stats` text table.
//!
//! `opencode stats --days 1` prints a box-drawn table; the cells we need
//! look like `│ Input   12.3K │` and may share a line with other cells.
//! Values may carry thousands separators and a K/M/B suffix.

use std::sync::LazyLock;

use regex::Regex;

use super::{AdapterError, AdapterFuture, AdapterTimeouts, UsageAdapter};
use crate::exec;
use crate::period::Period;
use crate::usage::UsageData;

pub const NAME: &str = "opencode";
const DISPLAY_NAME: &str = "OpenCode";
const COMMAND: &str = "opencode";

pub struct OpenCodeAdapter {
    timeouts: AdapterTimeouts,
}

impl OpenCodeAdapter {
    pub fn new(timeouts: AdapterTimeouts) -> Self {
        Self { timeouts }
    }
}

impl UsageAdapter for OpenCodeAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn display_name(&self) -> &str {
        DISPLAY_NAME
    }

    fn check(&self) -> AdapterFuture<'_, bool> {
        Box::pin(async move {
            match tokio::time::timeout(self.timeouts.check, exec::command_exists(COMMAND)).await {
                Ok(found) => found,
                Err(_) => false,
            }
        })
    }

    // `--days 1` is opencode's own notion of today.
    fn usage(&self, _period: Period) -> AdapterFuture<'_, Result<UsageData, AdapterError>> {
        Box::pin(async move {
            let out = exec::run(COMMAND, &["stats", "--days", "1"], self.timeouts.usage)
                .await?
                .ensure_success("opencode stats")?;
            Ok(patterns()?.parse_stats(&out.stdout))
        })
    }
}

/// Compiled patterns for the `opencode stats` table.
pub struct StatsPatterns {
    input: Regex,
    output: Regex,
    value: Regex,
}

impl StatsPatterns {
    pub fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            input: Regex::new(r"(?i)│\s*Input\s+([^\s│]+)")?,
            output: Regex::new(r"(?i)│\s*Output\s+([^\s│]+)")?,
            value: Regex::new(r"(?i)^([\d.]+)([KMB])?$")?,
        })
    }

    /// Extract input/output totals from `opencode stats` output. Missing
    /// rows count as zero; a later row overrides an earlier one.
    pub fn parse_stats(&self, output: &str) -> UsageData {
        let mut input = 0;
        let mut output_tokens = 0;

        for line in output.lines() {
            if let Some(value) = self.input.captures(line).and_then(|c| c.get(1)) {
                input = self.parse_token_value(value.as_str());
            }
            if let Some(value) = self.output.captures(line).and_then(|c| c.get(1)) {
                output_tokens = self.parse_token_value(value.as_str());
            }
        }

        UsageData::new(input, output_tokens, 0)
    }

    /// Parse `"12.3K"`, `"1,234"`, `"1.1m"`, `"2B"`. Unparseable input is 0.
    pub fn parse_token_value(&self, value: &str) -> u64 {
        let cleaned = value.trim().replace(',', "");
        let Some(caps) = self.value.captures(&cleaned) else {
            return 0;
        };
        let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_uppercase()).as_deref() {
            Some("K") => 1e3,
            Some("M") => 1e6,
            Some("B") => 1e9,
            _ => 1.0,
        };
        match caps[1].parse::<f64>() {
            Ok(n) => (n * multiplier).round() as u64,
            Err(_) => 0,
        }
    }
}

static PATTERNS: LazyLock<Result<StatsPatterns, regex::Error>> =
    LazyLock::new(StatsPatterns::compile);

fn patterns() -> Result<&'static StatsPatterns, AdapterError> {
    PATTERNS
        .as_ref()
        .map_err(|e| AdapterError::Parse { tool: NAME.to_owned(), message: e.to_string() })
}

#[cfg(test)]
#[path = "opencode_tests.rs"]
mod tests;
