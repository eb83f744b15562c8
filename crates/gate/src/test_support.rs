// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: scripted collaborators for the tab tracker.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::client::{BreakdownEntry, ClientError, ClientFuture, UsageClient, UsageReport, UsageTotal};
use crate::message::{DeliveryError, GateMessage, MessageBus, TabId};
use crate::tracker::OptionsPage;

/// A report with `tokens` total, all from one available source.
pub fn report(tokens: u64) -> UsageReport {
    UsageReport {
        total: UsageTotal { total_tokens: tokens },
        breakdown: vec![BreakdownEntry {
            source: "claude-code".into(),
            display_name: "Claude Code".into(),
            total_tokens: tokens,
            available: true,
        }],
        cached: false,
    }
}

/// A usage client whose answer can be changed between calls.
pub struct FakeUsageClient {
    response: Mutex<Result<UsageReport, ClientError>>,
    delay: Mutex<Duration>,
    calls: Arc<AtomicU32>,
    servers: Mutex<Vec<String>>,
}

impl FakeUsageClient {
    pub fn new(tokens: u64) -> Self {
        Self {
            response: Mutex::new(Ok(report(tokens))),
            delay: Mutex::new(Duration::ZERO),
            calls: Arc::new(AtomicU32::new(0)),
            servers: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        let client = Self::new(0);
        client.set_unreachable();
        client
    }

    pub fn set_tokens(&self, tokens: u64) {
        *self.response.lock() = Ok(report(tokens));
    }

    pub fn set_unreachable(&self) {
        *self.response.lock() = Err(ClientError::Request("connection refused".into()));
    }

    /// Sleep this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Server URLs queried, in call order.
    pub fn servers(&self) -> Vec<String> {
        self.servers.lock().clone()
    }
}

impl UsageClient for FakeUsageClient {
    fn fetch_usage<'a>(
        &'a self,
        server_url: &'a str,
    ) -> ClientFuture<'a, Result<UsageReport, ClientError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.servers.lock().push(server_url.to_owned());
            let delay = *self.delay.lock();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.response.lock().clone()
        })
    }
}

/// Records every message sent; delivery to chosen tabs fails.
#[derive(Default)]
pub struct RecordingBus {
    sent: Mutex<Vec<(TabId, GateMessage)>>,
    unreachable: Mutex<HashSet<TabId>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, tab: TabId) {
        self.unreachable.lock().insert(tab);
    }

    pub fn sent(&self) -> Vec<(TabId, GateMessage)> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, tab: TabId) -> Vec<GateMessage> {
        self.sent.lock().iter().filter(|(t, _)| *t == tab).map(|(_, m)| m.clone()).collect()
    }

    pub fn last_to(&self, tab: TabId) -> Option<GateMessage> {
        self.sent_to(tab).pop()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl MessageBus for RecordingBus {
    fn send(&self, tab: TabId, message: GateMessage) -> Result<(), DeliveryError> {
        if self.unreachable.lock().contains(&tab) {
            return Err(DeliveryError::NoReceiver(tab));
        }
        self.sent.lock().push((tab, message));
        Ok(())
    }
}

/// Counts options-page opens.
#[derive(Default)]
pub struct RecordingOptions {
    opened: AtomicU32,
}

impl RecordingOptions {
    pub fn opened(&self) -> u32 {
        self.opened.load(Ordering::SeqCst)
    }
}

impl OptionsPage for RecordingOptions {
    fn open(&self) {
        self.opened.fetch_add(1, Ordering::SeqCst);
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
