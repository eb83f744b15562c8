// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

use crate::adapter::{AdapterFilter, AdapterTimeouts};

/// Local server that aggregates today's token usage from AI coding tools.
#[derive(Debug, Clone, Parser)]
#[command(name = "tokengate-server", version, about)]
pub struct ServerConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "TOKENGATE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 3847, env = "PORT")]
    pub port: u16,

    /// How long an aggregated result is served from cache, in seconds.
    #[arg(long, default_value_t = 30, env = "CACHE_TTL")]
    pub cache_ttl: u64,

    /// Adapters to query: `all` or a comma-separated list of names.
    #[arg(long, default_value = "all", env = "ADAPTERS")]
    pub adapters: AdapterFilter,

    /// Timeout for an adapter's install check, in milliseconds.
    #[arg(long, default_value_t = 15000, env = "TOKENGATE_CHECK_TIMEOUT_MS")]
    pub check_timeout_ms: u64,

    /// Timeout for an adapter's usage query, in milliseconds.
    #[arg(long, default_value_t = 30000, env = "TOKENGATE_USAGE_TIMEOUT_MS")]
    pub usage_timeout_ms: u64,

    /// Upper bound on one adapter's check + usage during aggregation, in milliseconds.
    #[arg(long, default_value_t = 45000, env = "TOKENGATE_AGGREGATE_TIMEOUT_MS")]
    pub aggregate_timeout_ms: u64,

    /// Log filter directive (e.g. `info`, `tokengate_server=debug`).
    #[arg(long, default_value = "info", env = "TOKENGATE_LOG")]
    pub log_level: String,

    /// Log output format: `text` or `json`.
    #[arg(long, default_value = "text", env = "TOKENGATE_LOG_FORMAT")]
    pub log_format: String,
}

impl ServerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.log_format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("invalid log format: {other} (expected text or json)"),
        }
        if self.aggregate_timeout_ms == 0 {
            anyhow::bail!("--aggregate-timeout-ms must be greater than zero");
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn adapter_timeouts(&self) -> AdapterTimeouts {
        AdapterTimeouts {
            check: Duration::from_millis(self.check_timeout_ms),
            usage: Duration::from_millis(self.usage_timeout_ms),
        }
    }

    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_millis(self.aggregate_timeout_ms)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
