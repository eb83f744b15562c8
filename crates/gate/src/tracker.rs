// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracks tabs showing a block overlay and keeps them in sync with a single
//! shared poll of the usage server.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::client::UsageClient;
use crate::matcher::{self, HostError};
use crate::message::{GateMessage, MessageBus, TabId};
use crate::settings::{self, GateSettings, SettingsStore};

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// A tab that currently shows (or should show) an overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedTab {
    pub tab_id: TabId,
    pub server_url: String,
    pub threshold: u64,
}

impl TrackedTab {
    fn from_settings(tab_id: TabId, settings: &GateSettings) -> Self {
        Self { tab_id, server_url: settings.server_url.clone(), threshold: settings.token_threshold }
    }
}

/// Tracked tabs plus the handle of the poll timer they keep alive.
#[derive(Debug, Default)]
pub struct TabRegistry {
    tabs: BTreeMap<TabId, TrackedTab>,
    timer: Option<CancellationToken>,
    /// Latest navigation stamp per open tab.
    navigations: BTreeMap<TabId, u64>,
    next_navigation: u64,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tab. Returns `true` when this took the registry
    /// from empty to non-empty.
    pub fn track(&mut self, tab: TrackedTab) -> bool {
        let was_empty = self.tabs.is_empty();
        self.tabs.insert(tab.tab_id, tab);
        was_empty
    }

    /// Remove a tab. Returns the removed entry and whether the registry is
    /// now empty as a result.
    pub fn untrack(&mut self, tab_id: TabId) -> (Option<TrackedTab>, bool) {
        let removed = self.tabs.remove(&tab_id);
        let emptied = removed.is_some() && self.tabs.is_empty();
        (removed, emptied)
    }

    /// Stamp a new top-level navigation of `tab_id`. Any navigation of the
    /// same tab still in flight is superseded.
    pub fn begin_navigation(&mut self, tab_id: TabId) -> u64 {
        self.next_navigation += 1;
        self.navigations.insert(tab_id, self.next_navigation);
        self.next_navigation
    }

    /// Whether `stamp` is still the tab's latest navigation. Always `false`
    /// once the tab has closed.
    pub fn is_current(&self, tab_id: TabId, stamp: u64) -> bool {
        self.navigations.get(&tab_id) == Some(&stamp)
    }

    /// Forget a closed tab, superseding its in-flight navigation.
    pub fn close(&mut self, tab_id: TabId) -> (Option<TrackedTab>, bool) {
        self.navigations.remove(&tab_id);
        self.untrack(tab_id)
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.tabs.contains_key(&tab_id)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn tabs(&self) -> impl Iterator<Item = &TrackedTab> {
        self.tabs.values()
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    fn start_timer(&mut self, token: CancellationToken) {
        self.timer = Some(token);
    }

    fn stop_timer(&mut self) -> bool {
        match self.timer.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Navigation committed in some frame of a tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent {
    pub tab_id: TabId,
    /// `0` is the top-level frame.
    pub frame_id: u64,
    pub url: String,
}

impl NavigationEvent {
    pub fn top(tab_id: TabId, url: impl Into<String>) -> Self {
        Self { tab_id, frame_id: 0, url: url.into() }
    }
}

/// What a navigation led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    SubFrame,
    Allowed,
    Blocked,
    NotConnected,
    QuotaMet,
    /// The tab closed or navigated again before the usage query returned.
    Superseded,
}

/// Opens the extension's options page.
pub trait OptionsPage: Send + Sync {
    fn open(&self);
}

/// Background controller: reacts to navigation and runs the poll loop.
pub struct TabTracker {
    settings: Arc<dyn SettingsStore>,
    client: Arc<dyn UsageClient>,
    bus: Arc<dyn MessageBus>,
    options: Arc<dyn OptionsPage>,
    poll_interval: Duration,
    registry: Mutex<TabRegistry>,
    in_flight: AtomicBool,
    timer_starts: AtomicU64,
}

impl TabTracker {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        client: Arc<dyn UsageClient>,
        bus: Arc<dyn MessageBus>,
        options: Arc<dyn OptionsPage>,
    ) -> Self {
        Self {
            settings,
            client,
            bus,
            options,
            poll_interval: POLL_INTERVAL,
            registry: Mutex::new(TabRegistry::new()),
            in_flight: AtomicBool::new(false),
            timer_starts: AtomicU64::new(0),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Handle a completed navigation or history-state update.
    ///
    /// Only the top frame is considered. A URL without a usable host drops
    /// the tab from tracking and is returned as an error. A result that
    /// arrives after the tab closed or navigated again is discarded.
    pub async fn on_navigation(
        self: &Arc<Self>,
        event: NavigationEvent,
    ) -> Result<NavigationOutcome, HostError> {
        if event.frame_id != 0 {
            return Ok(NavigationOutcome::SubFrame);
        }
        let tab_id = event.tab_id;
        let stamp = self.registry.lock().begin_navigation(tab_id);
        let host = match matcher::hostname_of(&event.url) {
            Ok(host) => host,
            Err(e) => {
                self.release(tab_id);
                return Err(e);
            }
        };

        let settings = settings::load(self.settings.as_ref());
        if !settings.enabled || !matcher::matches(&host, &settings.blocked_domains) {
            self.release(tab_id);
            return Ok(NavigationOutcome::Allowed);
        }

        let threshold = settings.token_threshold;
        let result = self.client.fetch_usage(&settings.server_url).await;
        if !self.registry.lock().is_current(tab_id, stamp) {
            tracing::debug!(tab_id = %tab_id, "navigation superseded, result dropped");
            return Ok(NavigationOutcome::Superseded);
        }
        match result {
            Err(e) => {
                tracing::debug!(tab_id = %tab_id, err = %e, "usage server unreachable");
                if !self.track_current(TrackedTab::from_settings(tab_id, &settings), stamp) {
                    return Ok(NavigationOutcome::Superseded);
                }
                self.deliver(
                    tab_id,
                    GateMessage::ShowNotConnected { server_url: settings.server_url, threshold },
                );
                Ok(NavigationOutcome::NotConnected)
            }
            Ok(report) if report.current_tokens() >= threshold => {
                self.untrack(tab_id);
                self.deliver(tab_id, GateMessage::HideBlock);
                Ok(NavigationOutcome::QuotaMet)
            }
            Ok(report) => {
                if !self.track_current(TrackedTab::from_settings(tab_id, &settings), stamp) {
                    return Ok(NavigationOutcome::Superseded);
                }
                self.deliver(
                    tab_id,
                    GateMessage::ShowBlock {
                        current_tokens: report.current_tokens(),
                        threshold,
                        breakdown: report.breakdown,
                    },
                );
                Ok(NavigationOutcome::Blocked)
            }
        }
    }

    pub fn on_tab_closed(&self, tab_id: TabId) {
        let mut registry = self.registry.lock();
        let (removed, emptied) = registry.close(tab_id);
        if removed.is_some() {
            tracing::debug!(tab_id = %tab_id, tracked = registry.len(), "closed tab untracked");
        }
        if emptied && registry.stop_timer() {
            tracing::info!("last tab closed, poll stopped");
        }
    }

    /// Handle a message an overlay sent to the background.
    pub fn on_runtime_message(&self, message: &GateMessage) {
        match message {
            GateMessage::OpenOptions => self.options.open(),
            other => tracing::debug!(kind = other.kind(), "ignoring runtime message"),
        }
    }

    /// Poll once on behalf of every tracked tab.
    ///
    /// Returns `false` when skipped, either because another poll is still
    /// running or because nothing is tracked.
    pub async fn tick(&self) -> bool {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!("poll still in flight, skipping tick");
            return false;
        }
        let _in_flight = InFlight(&self.in_flight);

        let settings = settings::load(self.settings.as_ref());
        {
            let mut registry = self.registry.lock();
            if registry.is_empty() {
                if registry.stop_timer() {
                    tracing::info!("no tracked tabs, poll stopped");
                }
                return false;
            }
            if settings.enabled {
                for tab in registry.tabs.values_mut() {
                    tab.server_url.clone_from(&settings.server_url);
                    tab.threshold = settings.token_threshold;
                }
            }
        }
        if !settings.enabled {
            for tab in self.tracked_tabs() {
                self.release(tab.tab_id);
            }
            return true;
        }

        let result = self.client.fetch_usage(&settings.server_url).await;

        // Tabs untracked while the query ran are left out.
        for tab in self.tracked_tabs() {
            let message = match &result {
                Err(_) => GateMessage::ShowNotConnected {
                    server_url: tab.server_url.clone(),
                    threshold: tab.threshold,
                },
                Ok(report) if report.current_tokens() >= tab.threshold => {
                    self.untrack(tab.tab_id);
                    GateMessage::HideBlock
                }
                Ok(report) => GateMessage::UpdateBlock {
                    current_tokens: report.current_tokens(),
                    threshold: tab.threshold,
                },
            };
            self.deliver(tab.tab_id, message);
        }
        if let Err(e) = &result {
            tracing::debug!(err = %e, "poll failed");
        }
        true
    }

    pub fn is_tracked(&self, tab_id: TabId) -> bool {
        self.registry.lock().contains(tab_id)
    }

    pub fn tracked_count(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn tracked_tabs(&self) -> Vec<TrackedTab> {
        self.registry.lock().tabs().cloned().collect()
    }

    pub fn is_polling(&self) -> bool {
        self.registry.lock().has_timer()
    }

    /// Number of poll timers started over the tracker's lifetime.
    pub fn timer_starts(&self) -> u64 {
        self.timer_starts.load(Ordering::Relaxed)
    }

    /// Track `tab` unless navigation `stamp` has been superseded. The check
    /// and the insert happen under one lock so a concurrent close wins.
    fn track_current(self: &Arc<Self>, tab: TrackedTab, stamp: u64) -> bool {
        let tab_id = tab.tab_id;
        let mut registry = self.registry.lock();
        if !registry.is_current(tab_id, stamp) {
            return false;
        }
        let first = registry.track(tab);
        tracing::debug!(tab_id = %tab_id, tracked = registry.len(), "tab tracked");
        if first && !registry.has_timer() {
            registry.start_timer(self.spawn_poll());
            tracing::info!(interval_ms = self.poll_interval.as_millis() as u64, "poll started");
        }
        true
    }

    /// Returns whether the tab was tracked.
    fn untrack(&self, tab_id: TabId) -> bool {
        let mut registry = self.registry.lock();
        let (removed, emptied) = registry.untrack(tab_id);
        if removed.is_some() {
            tracing::debug!(tab_id = %tab_id, tracked = registry.len(), "tab untracked");
        }
        if emptied && registry.stop_timer() {
            tracing::info!("last tab untracked, poll stopped");
        }
        removed.is_some()
    }

    /// Untrack and hide the overlay if the tab was tracked.
    fn release(&self, tab_id: TabId) {
        if self.untrack(tab_id) {
            self.deliver(tab_id, GateMessage::HideBlock);
        }
    }

    fn deliver(&self, tab_id: TabId, message: GateMessage) {
        let kind = message.kind();
        if let Err(e) = self.bus.send(tab_id, message) {
            tracing::debug!(tab_id = %tab_id, kind, err = %e, "message not delivered");
        }
    }

    fn spawn_poll(self: &Arc<Self>) -> CancellationToken {
        self.timer_starts.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let cancel = token.clone();
        let tracker: Weak<Self> = Arc::downgrade(self);
        let period = self.poll_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let Some(tracker) = tracker.upgrade() else {
                    break;
                };
                tracker.tick().await;
            }
        });

        token
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
