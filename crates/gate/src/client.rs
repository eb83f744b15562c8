// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client for the local usage server.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Boxed future returned by [`UsageClient`] methods.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Fetches today's usage from a usage server.
pub trait UsageClient: Send + Sync {
    fn fetch_usage<'a>(
        &'a self,
        server_url: &'a str,
    ) -> ClientFuture<'a, Result<UsageReport, ClientError>>;
}

/// The parts of a `/usage` response the gate reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    #[serde(default)]
    pub total: UsageTotal,
    #[serde(default)]
    pub breakdown: Vec<BreakdownEntry>,
    #[serde(default)]
    pub cached: bool,
}

impl UsageReport {
    pub fn current_tokens(&self) -> u64 {
        self.total.total_tokens
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotal {
    #[serde(default)]
    pub total_tokens: u64,
}

/// One adapter's line in the breakdown, as shown on the block overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownEntry {
    pub source: String,
    pub display_name: String,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub available: bool,
}

/// `/health` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthInfo {
    pub status: String,
    pub version: String,
    #[serde(default)]
    pub adapters: Vec<String>,
}

/// The usage server could not be reached or answered nonsense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    Request(String),
    Status(u16),
    Decode(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(msg) => write!(f, "usage server unreachable: {msg}"),
            Self::Status(code) => write!(f, "usage server returned HTTP {code}"),
            Self::Decode(msg) => write!(f, "invalid usage response: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// [`UsageClient`] over HTTP.
pub struct HttpUsageClient {
    client: Client,
}

impl Default for HttpUsageClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpUsageClient {
    pub fn new() -> Self {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build().unwrap_or_default();
        Self { client }
    }

    fn url(server_url: &str, path: &str) -> String {
        format!("{}{}", server_url.trim_end_matches('/'), path)
    }

    /// Check server health, as the options page's connection test does.
    pub async fn health(&self, server_url: &str) -> Result<HealthInfo, ClientError> {
        let resp = self.client.get(Self::url(server_url, "/health")).send().await?;
        let info = resp.error_for_status()?.json().await?;
        Ok(info)
    }

    pub async fn usage(&self, server_url: &str) -> Result<UsageReport, ClientError> {
        let resp = self.client.get(Self::url(server_url, "/usage")).send().await?;
        let report = resp.error_for_status()?.json().await?;
        Ok(report)
    }
}

impl UsageClient for HttpUsageClient {
    fn fetch_usage<'a>(
        &'a self,
        server_url: &'a str,
    ) -> ClientFuture<'a, Result<UsageReport, ClientError>> {
        Box::pin(self.usage(server_url))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
