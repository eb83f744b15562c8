// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: scripted adapters and assertion helpers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::adapter::{AdapterError, AdapterFuture, UsageAdapter};
use crate::period::Period;
use crate::usage::UsageData;

/// Scripted outcome of [`FakeAdapter::usage`].
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Usage(UsageData),
    Fail(AdapterError),
    Panic,
}

/// An adapter with scripted results and call counters.
pub struct FakeAdapter {
    name: String,
    display_name: String,
    installed: bool,
    outcome: FakeOutcome,
    delay: Duration,
    checks: Arc<AtomicU32>,
    usage_calls: Arc<AtomicU32>,
}

impl FakeAdapter {
    /// An installed adapter reporting `usage`.
    pub fn new(name: &str, usage: UsageData) -> Self {
        Self {
            name: name.to_owned(),
            display_name: name.to_uppercase(),
            installed: true,
            outcome: FakeOutcome::Usage(usage),
            delay: Duration::ZERO,
            checks: Arc::new(AtomicU32::new(0)),
            usage_calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn not_installed(mut self) -> Self {
        self.installed = false;
        self
    }

    pub fn failing(mut self, err: AdapterError) -> Self {
        self.outcome = FakeOutcome::Fail(err);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.outcome = FakeOutcome::Panic;
        self
    }

    /// Sleep this long inside `usage` before answering.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn check_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.checks)
    }

    pub fn usage_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.usage_calls)
    }

    pub fn into_arc(self) -> Arc<dyn UsageAdapter> {
        Arc::new(self)
    }
}

impl UsageAdapter for FakeAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn check(&self) -> AdapterFuture<'_, bool> {
        Box::pin(async move {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.installed
        })
    }

    fn usage(&self, _period: Period) -> AdapterFuture<'_, Result<UsageData, AdapterError>> {
        Box::pin(async move {
            self.usage_calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.outcome {
                FakeOutcome::Usage(usage) => Ok(*usage),
                FakeOutcome::Fail(err) => Err(err.clone()),
                #[allow(clippy::panic)]
                FakeOutcome::Panic => panic!("scripted adapter panic"),
            }
        })
    }
}

/// Assert that `$expr` is an `Err` whose message contains `$substr`.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
