// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hostname vs. blocklist pattern matching.

use std::fmt;

/// Whether `hostname` is covered by any of `patterns`.
///
/// Both sides are lower-cased and lose one leading `www.`. A `*.example.com`
/// pattern covers `example.com` and any dot-bounded subdomain of it; any
/// other pattern must match exactly.
pub fn matches<S: AsRef<str>>(hostname: &str, patterns: &[S]) -> bool {
    let host = normalize(hostname);
    patterns.iter().any(|p| pattern_matches(&host, &normalize(p.as_ref())))
}

fn pattern_matches(host: &str, pattern: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(suffix) => {
            host == suffix
                || host.strip_suffix(suffix).is_some_and(|head| head.ends_with('.'))
        }
        None => host == pattern,
    }
}

/// Lower-case and strip one leading `www.`.
pub fn normalize(name: &str) -> String {
    let lower = name.to_lowercase();
    match lower.strip_prefix("www.") {
        Some(rest) => rest.to_owned(),
        None => lower,
    }
}

/// A navigation URL without a usable hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    Malformed { url: String, message: String },
    NoHost { url: String },
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { url, message } => write!(f, "malformed url {url:?}: {message}"),
            Self::NoHost { url } => write!(f, "url {url:?} has no host"),
        }
    }
}

impl std::error::Error for HostError {}

/// Hostname of a navigation URL.
pub fn hostname_of(url: &str) -> Result<String, HostError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| HostError::Malformed { url: url.to_owned(), message: e.to_string() })?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(host.to_owned()),
        _ => Err(HostError::NoHost { url: url.to_owned() }),
    }
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;
