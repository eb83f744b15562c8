// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messages between the background tracker and per-tab overlays.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::client::BreakdownEntry;

/// Browser tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Wire message, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateMessage {
    #[serde(rename_all = "camelCase")]
    ShowBlock { current_tokens: u64, threshold: u64, breakdown: Vec<BreakdownEntry> },
    #[serde(rename_all = "camelCase")]
    UpdateBlock { current_tokens: u64, threshold: u64 },
    #[serde(rename_all = "camelCase")]
    ShowNotConnected { server_url: String, threshold: u64 },
    HideBlock,
    /// Sent by an overlay to the background, never to a tab.
    OpenOptions,
}

impl GateMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ShowBlock { .. } => "SHOW_BLOCK",
            Self::UpdateBlock { .. } => "UPDATE_BLOCK",
            Self::ShowNotConnected { .. } => "SHOW_NOT_CONNECTED",
            Self::HideBlock => "HIDE_BLOCK",
            Self::OpenOptions => "OPEN_OPTIONS",
        }
    }
}

/// A message could not be handed to a tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// No overlay is listening in that tab.
    NoReceiver(TabId),
    /// The tab's overlay went away.
    Closed(TabId),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoReceiver(tab) => write!(f, "no receiver in tab {tab}"),
            Self::Closed(tab) => write!(f, "receiver in tab {tab} closed"),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Fire-and-forget delivery to a single tab.
pub trait MessageBus: Send + Sync {
    fn send(&self, tab: TabId, message: GateMessage) -> Result<(), DeliveryError>;
}

/// [`MessageBus`] backed by one unbounded channel per connected tab.
#[derive(Debug, Default)]
pub struct ChannelBus {
    tabs: Mutex<HashMap<TabId, mpsc::UnboundedSender<GateMessage>>>,
}

impl ChannelBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect an overlay in `tab`, replacing any previous connection.
    pub fn connect(&self, tab: TabId) -> mpsc::UnboundedReceiver<GateMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.tabs.lock().insert(tab, tx);
        rx
    }

    pub fn disconnect(&self, tab: TabId) {
        self.tabs.lock().remove(&tab);
    }
}

impl MessageBus for ChannelBus {
    fn send(&self, tab: TabId, message: GateMessage) -> Result<(), DeliveryError> {
        let mut tabs = self.tabs.lock();
        let tx = tabs.get(&tab).ok_or(DeliveryError::NoReceiver(tab))?;
        if tx.send(message).is_err() {
            tabs.remove(&tab);
            return Err(DeliveryError::Closed(tab));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
