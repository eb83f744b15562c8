// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude Code usage via `ccusage daily --json`.

use serde::Deserialize;

use super::{parse_totals, AdapterError, AdapterFuture, AdapterTimeouts, UsageAdapter};
use crate::exec;
use crate::period::Period;
use crate::usage::UsageData;

pub const NAME: &str = "claude-code";
const DISPLAY_NAME: &str = "Claude Code";
const PACKAGE: &str = "ccusage";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Totals {
    input_tokens: u64,
    output_tokens: u64,
}

pub struct ClaudeCodeAdapter {
    timeouts: AdapterTimeouts,
}

impl ClaudeCodeAdapter {
    pub fn new(timeouts: AdapterTimeouts) -> Self {
        Self { timeouts }
    }
}

impl UsageAdapter for ClaudeCodeAdapter {
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
                PACKAGE,
                &["daily", "--json", "--since", &since],
                self.timeouts.usage,
            )
            .await?
            .ensure_success(PACKAGE)?;
            parse_report(&out.stdout)
        })
    }
}

/// Map a `ccusage daily --json` report to usage. Claude Code reports no
/// separate reasoning tokens.
pub fn parse_report(stdout: &str) -> Result<UsageData, AdapterError> {
    let totals: Totals = parse_totals(PACKAGE, stdout)?;
    Ok(UsageData::new(totals.input_tokens, totals.output_tokens, 0))
}

#[cfg(test)]
#[path = "claude_code_tests.rs"]
mod tests;
