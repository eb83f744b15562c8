// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Codex usage via `@ccusage/codex daily --json`.

use serde::Deserialize;

use super::{parse_totals, AdapterError, AdapterFuture, AdapterTimeouts, UsageAdapter};
use crate::exec;
use crate::period::Period;
use crate::usage::UsageData;

pub const NAME: &str = "codex";
const DISPLAY_NAME: &str = "Codex";
const PACKAGE: &str = "@ccusage/codex";
const PACKAGE_LATEST: &str = "@ccusage/codex@latest";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Totals {
    input_tokens: u64,
    cached_input_tokens: u64,
    output_tokens: u64,
    reasoning_output_tokens: u64,
}

pub struct CodexAdapter {
    timeouts: AdapterTimeouts,
}

impl CodexAdapter {
    pub fn new(timeouts: AdapterTimeouts) -> Self {
        Self { timeouts }
    }
}

impl UsageAdapter for CodexAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn display_name(&self) -> &str {
        DISPLAY_NAME
    }

    fn check(&self) -> AdapterFuture<'_, bool> {
        Box::pin(async move {
            match exec::run_package(PACKAGE, &["--help"], self.timeouts.check).await {
                Ok(out) => !out.stdout.is_empty() || !out.stderr.is_empty(),
                Err(e) => {
                    tracing::debug!(adapter = NAME, err = %e, "check failed");
                    false
                }
            }
        })
    }

    fn usage(&self, period: Period) -> AdapterFuture<'_, Result<UsageData, AdapterError>> {
        Box::pin(async move {
            let since = period.since_arg();
            let out = exec::run_package(
                PACKAGE_LATEST,
                &["daily", "--json", "--since", &since],
                self.timeouts.usage,
            )
            .await?
            .ensure_success(PACKAGE)?;
            parse_report(&out.stdout)
        })
    }
}

/// Map a codex daily report to usage.
///
/// Codex counts cache hits inside `inputTokens`; only uncached input counts
/// toward the gate.
pub fn parse_report(stdout: &str) -> Result<UsageData, AdapterError> {
    let totals: Totals = parse_totals(PACKAGE, stdout)?;
    Ok(UsageData::new(
        totals.input_tokens.saturating_sub(totals.cached_input_tokens),
        totals.output_tokens,
        totals.reasoning_output_tokens,
    ))
}

#[cfg(test)]
#[path = "codex_tests.rs"]
mod tests;
