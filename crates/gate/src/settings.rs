// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-editable gate settings and their key-value persistence.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const KEY_BLOCKED_DOMAINS: &str = "blockedDomains";
pub const KEY_TOKEN_THRESHOLD: &str = "tokenThreshold";
pub const KEY_SERVER_URL: &str = "serverUrl";
pub const KEY_ENABLED: &str = "enabled";

pub const DEFAULT_THRESHOLD: u64 = 50_000;
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3847";
pub const DEFAULT_BLOCKED_DOMAINS: [&str; 9] = [
    "x.com",
    "twitter.com",
    "reddit.com",
    "*.reddit.com",
    "netflix.com",
    "youtube.com",
    "instagram.com",
    "facebook.com",
    "pornhub.com",
];

/// Gate configuration as persisted under the keys above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GateSettings {
    pub blocked_domains: Vec<String>,
    pub token_threshold: u64,
    pub server_url: String,
    pub enabled: bool,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            blocked_domains: DEFAULT_BLOCKED_DOMAINS.iter().map(|d| (*d).to_owned()).collect(),
            token_threshold: DEFAULT_THRESHOLD,
            server_url: DEFAULT_SERVER_URL.to_owned(),
            enabled: true,
        }
    }
}

impl GateSettings {
    /// Add a user-entered domain. Returns `false` when the input normalizes
    /// to nothing or is already listed.
    pub fn add_domain(&mut self, input: &str) -> bool {
        let Some(domain) = normalize_domain_input(input) else {
            return false;
        };
        if self.blocked_domains.contains(&domain) {
            return false;
        }
        self.blocked_domains.push(domain);
        true
    }

    pub fn remove_domain(&mut self, domain: &str) -> bool {
        let before = self.blocked_domains.len();
        self.blocked_domains.retain(|d| d != domain);
        self.blocked_domains.len() != before
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.token_threshold == 0 {
            return Err(SettingsError::InvalidThreshold);
        }
        validate_server_url(&self.server_url)?;
        for domain in &self.blocked_domains {
            if !is_valid_pattern(domain) {
                return Err(SettingsError::InvalidDomain(domain.clone()));
            }
        }
        Ok(())
    }
}

/// Settings rejected at save time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    InvalidThreshold,
    InvalidServerUrl(String),
    InvalidDomain(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidThreshold => f.write_str("Token threshold must be a positive number"),
            Self::InvalidServerUrl(url) => {
                write!(f, "Server URL {url:?} must be an http:// or https:// address")
            }
            Self::InvalidDomain(domain) => write!(f, "{domain:?} is not a valid domain"),
        }
    }
}

impl std::error::Error for SettingsError {}

fn validate_server_url(url: &str) -> Result<(), SettingsError> {
    let invalid = || SettingsError::InvalidServerUrl(url.to_owned());
    let parsed = reqwest::Url::parse(url).map_err(|_| invalid())?;
    let http = matches!(parsed.scheme(), "http" | "https");
    if !http || !parsed.has_host() {
        return Err(invalid());
    }
    Ok(())
}

fn is_valid_pattern(pattern: &str) -> bool {
    let name = pattern.strip_prefix("*.").unwrap_or(pattern);
    !name.is_empty()
        && name.split('.').all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        })
}

/// Normalize what a user typed into the domain box.
///
/// Lower-cases, strips an `http(s)://` scheme, one leading `www.`, and any
/// path. Returns `None` when nothing is left.
pub fn normalize_domain_input(input: &str) -> Option<String> {
    let lower = input.trim().to_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let host = rest.split('/').next().unwrap_or_default().trim();
    if host.is_empty() {
        None
    } else {
        Some(host.to_owned())
    }
}

/// Flat key-value settings storage.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
}

/// In-process store, used by tests and embedders without persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: &GateSettings) -> Self {
        let store = Self::new();
        write_all(&store, settings);
        store
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values.lock().insert(key.to_owned(), value);
    }
}

/// Read settings, falling back to the default for any missing or
/// mistyped key.
pub fn load(store: &dyn SettingsStore) -> GateSettings {
    let defaults = GateSettings::default();
    GateSettings {
        blocked_domains: read_key(store, KEY_BLOCKED_DOMAINS).unwrap_or(defaults.blocked_domains),
        token_threshold: read_key(store, KEY_TOKEN_THRESHOLD).unwrap_or(defaults.token_threshold),
        server_url: read_key(store, KEY_SERVER_URL).unwrap_or(defaults.server_url),
        enabled: read_key(store, KEY_ENABLED).unwrap_or(defaults.enabled),
    }
}

/// Validate and persist every key. Invalid settings are never written.
pub fn save(store: &dyn SettingsStore, settings: &GateSettings) -> Result<(), SettingsError> {
    settings.validate()?;
    write_all(store, settings);
    Ok(())
}

/// Write defaults for keys that are not yet present. Existing values win.
///
/// Returns the number of keys written.
pub fn merge_defaults(store: &dyn SettingsStore) -> usize {
    let defaults = GateSettings::default();
    let mut written = 0;
    for (key, value) in entries(&defaults) {
        if store.get(key).is_none() {
            store.set(key, value);
            written += 1;
        }
    }
    if written > 0 {
        tracing::info!(keys = written, "installed default settings");
    }
    written
}

fn read_key<T: DeserializeOwned>(store: &dyn SettingsStore, key: &str) -> Option<T> {
    let value = store.get(key)?;
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key, err = %e, "ignoring malformed setting");
            None
        }
    }
}

fn write_all(store: &dyn SettingsStore, settings: &GateSettings) {
    for (key, value) in entries(settings) {
        store.set(key, value);
    }
}

fn entries(settings: &GateSettings) -> [(&'static str, Value); 4] {
    [
        (KEY_BLOCKED_DOMAINS, Value::from(settings.blocked_domains.clone())),
        (KEY_TOKEN_THRESHOLD, Value::from(settings.token_threshold)),
        (KEY_SERVER_URL, Value::from(settings.server_url.clone())),
        (KEY_ENABLED, Value::from(settings.enabled)),
    ]
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
