// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status summaries for the toolbar popup and the options page.

use serde_json::Value;

use crate::client::{ClientError, HealthInfo, UsageClient};
use crate::overlay::{format_tokens, progress_percent};
use crate::settings::{self, SettingsStore, KEY_ENABLED};

/// One breakdown line in the popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupRow {
    /// Display name upper-cased, first space replaced with `_`.
    pub label: String,
    pub tokens: String,
}

/// What the popup shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupStatus {
    Online {
        enabled: bool,
        current_tokens: String,
        threshold: String,
        percent: u8,
        rows: Vec<PopupRow>,
    },
    Offline {
        enabled: bool,
        threshold: String,
    },
}

impl PopupStatus {
    pub fn indicator(&self) -> &'static str {
        match self {
            Self::Online { .. } => "SYSTEM_ONLINE",
            Self::Offline { .. } => "OFFLINE",
        }
    }
}

/// Query the server once and summarize for the popup.
pub async fn popup_status(store: &dyn SettingsStore, client: &dyn UsageClient) -> PopupStatus {
    let settings = settings::load(store);
    let threshold = format_tokens(settings.token_threshold);
    match client.fetch_usage(&settings.server_url).await {
        Ok(report) => {
            let current = report.current_tokens();
            let rows = report
                .breakdown
                .iter()
                .filter(|b| b.available)
                .map(|b| PopupRow {
                    label: b.display_name.to_uppercase().replacen(' ', "_", 1),
                    tokens: format_tokens(b.total_tokens),
                })
                .collect();
            PopupStatus::Online {
                enabled: settings.enabled,
                current_tokens: format_tokens(current),
                threshold,
                percent: progress_percent(current, settings.token_threshold),
                rows,
            }
        }
        Err(e) => {
            tracing::debug!(err = %e, "popup status offline");
            PopupStatus::Offline { enabled: settings.enabled, threshold }
        }
    }
}

/// The popup's on/off toggle writes only the `enabled` key.
pub fn set_enabled(store: &dyn SettingsStore, enabled: bool) {
    store.set(KEY_ENABLED, Value::Bool(enabled));
}

/// One-line result of the options page's connection test.
pub fn connection_summary(result: &Result<HealthInfo, ClientError>) -> String {
    match result {
        Ok(info) => format!(
            "UPLINK_ESTABLISHED // V{} // ADAPTERS: {}",
            info.version,
            info.adapters.join(", ").to_uppercase()
        ),
        Err(_) => "CONNECTION_FAILURE: CHECK_SERVER_PROCESS".to_owned(),
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
