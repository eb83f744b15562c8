// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Usage adapters: one per supported coding CLI.

pub mod claude_code;
pub mod codex;
pub mod opencode;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::period::Period;
use crate::usage::UsageData;

pub use claude_code::ClaudeCodeAdapter;
pub use codex::CodexAdapter;
pub use opencode::OpenCodeAdapter;

/// Boxed future returned by [`UsageAdapter`] methods.
pub type AdapterFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Detects and queries one external tool's daily token usage.
///
/// Object-safe for use as `Arc<dyn UsageAdapter>`. Implementations hold no
/// state between calls; every call re-invokes the tool.
pub trait UsageAdapter: Send + Sync {
    /// Stable identifier, e.g. `"claude-code"`.
    fn name(&self) -> &str;

    /// Human-readable name, e.g. `"Claude Code"`.
    fn display_name(&self) -> &str;

    /// Whether the tool is installed and usable. Never fails: spawn errors
    /// and timeouts resolve to `false`.
    fn check(&self) -> AdapterFuture<'_, bool>;

    /// Token usage for `period`.
    fn usage(&self, period: Period) -> AdapterFuture<'_, Result<UsageData, AdapterError>>;
}

/// Failure to obtain usage from an installed tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    Spawn { tool: String, message: String },
    Timeout { tool: String, after: Duration },
    NonZeroExit { tool: String, code: Option<i32>, stderr: String },
    Parse { tool: String, message: String },
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn { tool, message } => write!(f, "{tool}: failed to run: {message}"),
            Self::Timeout { tool, after } => {
                write!(f, "{tool}: timed out after {}ms", after.as_millis())
            }
            Self::NonZeroExit { tool, code: Some(code), stderr } => {
                write!(f, "{tool} failed (exit {code}): {stderr}")
            }
            Self::NonZeroExit { tool, code: None, stderr } => {
                write!(f, "{tool} failed (killed by signal): {stderr}")
            }
            Self::Parse { tool, message } => write!(f, "{tool}: unparseable output: {message}"),
        }
    }
}

impl std::error::Error for AdapterError {}

/// Per-call timeouts shared by all adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterTimeouts {
    pub check: Duration,
    pub usage: Duration,
}

impl Default for AdapterTimeouts {
    fn default() -> Self {
        Self { check: Duration::from_secs(15), usage: Duration::from_secs(30) }
    }
}

/// Which adapters to run: every registered adapter, or a named subset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AdapterFilter {
    #[default]
    All,
    Only(Vec<String>),
}

impl AdapterFilter {
    pub fn includes(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.iter().any(|n| n == name),
        }
    }
}

impl std::str::FromStr for AdapterFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let names = s.split(',').map(str::trim).filter(|n| !n.is_empty()).map(str::to_owned);
        Ok(Self::Only(names.collect()))
    }
}

impl fmt::Display for AdapterFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(names) => f.write_str(&names.join(",")),
        }
    }
}

/// Names of every registered adapter, in registration order.
pub const ADAPTER_NAMES: [&str; 3] =
    [claude_code::NAME, opencode::NAME, codex::NAME];

/// Build the adapters selected by `filter`, in registration order.
pub fn registry(filter: &AdapterFilter, timeouts: AdapterTimeouts) -> Vec<Arc<dyn UsageAdapter>> {
    if let AdapterFilter::Only(names) = filter {
        for unknown in names.iter().filter(|n| !ADAPTER_NAMES.contains(&n.as_str())) {
            tracing::warn!(adapter = %unknown, "ignoring unknown adapter in filter");
        }
    }

    let all: [Arc<dyn UsageAdapter>; 3] = [
        Arc::new(ClaudeCodeAdapter::new(timeouts)),
        Arc::new(OpenCodeAdapter::new(timeouts)),
        Arc::new(CodexAdapter::new(timeouts)),
    ];
    all.into_iter().filter(|a| filter.includes(a.name())).collect()
}

/// Parse a ccusage-style `--json` report's `totals` object.
pub(crate) fn parse_totals<T: serde::de::DeserializeOwned + Default>(
    tool: &str,
    stdout: &str,
) -> Result<T, AdapterError> {
    #[derive(serde::Deserialize)]
    struct Report<T> {
        #[serde(default)]
        totals: Option<T>,
    }

    let report: Report<T> = serde_json::from_str(stdout)
        .map_err(|e| AdapterError::Parse { tool: tool.to_owned(), message: e.to_string() })?;
    Ok(report.totals.unwrap_or_default())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
