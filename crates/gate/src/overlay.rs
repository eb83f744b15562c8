// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-tab blocking overlay driven by [`GateMessage`]s.

use std::fmt::Write as _;

use tokio::sync::mpsc;

use crate::client::BreakdownEntry;
use crate::message::GateMessage;

/// Which overlay, if any, is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayState {
    #[default]
    None,
    Blocked,
    NotConnected,
}

/// Progress bar, percentage text and counter: the parts an update patches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub percent: u8,
    pub counter: String,
}

impl ProgressView {
    pub fn new(current_tokens: u64, threshold: u64) -> Self {
        Self {
            percent: progress_percent(current_tokens, threshold),
            counter: format!("{} / {} tokens", format_tokens(current_tokens), format_tokens(threshold)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownRow {
    pub display_name: String,
    pub tokens: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockView {
    pub progress: ProgressView,
    /// Available adapters only.
    pub breakdown: Vec<BreakdownRow>,
}

impl BlockView {
    pub fn new(current_tokens: u64, threshold: u64, breakdown: &[BreakdownEntry]) -> Self {
        let breakdown = breakdown
            .iter()
            .filter(|b| b.available)
            .map(|b| BreakdownRow {
                display_name: b.display_name.clone(),
                tokens: format!("{} tokens", format_tokens(b.total_tokens)),
            })
            .collect();
        Self { progress: ProgressView::new(current_tokens, threshold), breakdown }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotConnectedView {
    pub server_url: String,
}

/// A full overlay tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayView {
    Block(BlockView),
    NotConnected(NotConnectedView),
}

/// DOM side effects of the overlay.
pub trait OverlayRenderer {
    /// Insert a new overlay tree. Never called while one is mounted.
    fn mount(&mut self, view: &OverlayView);
    /// Update the progress portion of the mounted block overlay in place.
    fn patch_progress(&mut self, progress: &ProgressView);
    fn unmount(&mut self);
}

/// Buttons present on both overlay variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayAction {
    OpenSettings,
    /// "Refresh" on the block overlay, "Retry" when not connected.
    Refresh,
}

/// What the hosting tab should do after a button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayCommand {
    SendToBackground(GateMessage),
    ReloadPage,
}

/// Overlay state machine for one tab.
pub struct Overlay<R> {
    state: OverlayState,
    renderer: R,
}

impl<R: OverlayRenderer> Overlay<R> {
    pub fn new(renderer: R) -> Self {
        Self { state: OverlayState::None, renderer }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    pub fn handle(&mut self, message: &GateMessage) {
        match message {
            GateMessage::ShowBlock { current_tokens, threshold, breakdown } => {
                let view = BlockView::new(*current_tokens, *threshold, breakdown);
                self.rebuild(OverlayView::Block(view), OverlayState::Blocked);
            }
            GateMessage::UpdateBlock { current_tokens, threshold } => {
                if self.state == OverlayState::Blocked {
                    self.renderer.patch_progress(&ProgressView::new(*current_tokens, *threshold));
                } else {
                    let view = BlockView::new(*current_tokens, *threshold, &[]);
                    self.rebuild(OverlayView::Block(view), OverlayState::Blocked);
                }
            }
            GateMessage::ShowNotConnected { server_url, .. } => {
                if self.state != OverlayState::NotConnected {
                    let view = NotConnectedView { server_url: server_url.clone() };
                    self.rebuild(OverlayView::NotConnected(view), OverlayState::NotConnected);
                }
            }
            GateMessage::HideBlock => {
                if self.state != OverlayState::None {
                    self.renderer.unmount();
                }
                self.state = OverlayState::None;
            }
            GateMessage::OpenOptions => {
                tracing::debug!("overlay ignoring OPEN_OPTIONS");
            }
        }
    }

    /// Button press on the current overlay. `None` when nothing is showing.
    pub fn press(&self, action: OverlayAction) -> Option<OverlayCommand> {
        if self.state == OverlayState::None {
            return None;
        }
        Some(match action {
            OverlayAction::OpenSettings => OverlayCommand::SendToBackground(GateMessage::OpenOptions),
            OverlayAction::Refresh => OverlayCommand::ReloadPage,
        })
    }

    fn rebuild(&mut self, view: OverlayView, next: OverlayState) {
        if self.state != OverlayState::None {
            self.renderer.unmount();
        }
        self.renderer.mount(&view);
        self.state = next;
    }
}

/// Apply messages from a tab's channel until the sender side closes.
pub async fn run<R: OverlayRenderer>(
    mut overlay: Overlay<R>,
    mut inbox: mpsc::UnboundedReceiver<GateMessage>,
) -> Overlay<R> {
    while let Some(message) = inbox.recv().await {
        overlay.handle(&message);
    }
    overlay
}

/// `round(min(100, 100 * current / threshold))`; a zero threshold is 100.
pub fn progress_percent(current_tokens: u64, threshold: u64) -> u8 {
    if threshold == 0 || current_tokens >= threshold {
        return 100;
    }
    let rounded = (u128::from(current_tokens) * 200 + u128::from(threshold)) / (2 * u128::from(threshold));
    rounded.min(100) as u8
}

/// Decimal with `,` thousands separators.
pub fn format_tokens(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Renders the overlay to an HTML string, standing in for the page DOM.
#[derive(Debug, Default)]
pub struct MarkupRenderer {
    view: Option<OverlayView>,
    markup: Option<String>,
    mounts: u32,
    patches: u32,
}

impl MarkupRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current overlay HTML, `None` when nothing is mounted.
    pub fn markup(&self) -> Option<&str> {
        self.markup.as_deref()
    }

    pub fn view(&self) -> Option<&OverlayView> {
        self.view.as_ref()
    }

    /// Number of full rebuilds.
    pub fn mounts(&self) -> u32 {
        self.mounts
    }

    pub fn patches(&self) -> u32 {
        self.patches
    }

    fn rerender(&mut self) {
        self.markup = self.view.as_ref().map(render_markup);
    }
}

impl OverlayRenderer for MarkupRenderer {
    fn mount(&mut self, view: &OverlayView) {
        self.view = Some(view.clone());
        self.mounts += 1;
        self.rerender();
    }

    fn patch_progress(&mut self, progress: &ProgressView) {
        if let Some(OverlayView::Block(block)) = self.view.as_mut() {
            block.progress = progress.clone();
            self.patches += 1;
            self.rerender();
        }
    }

    fn unmount(&mut self) {
        self.view = None;
        self.markup = None;
    }
}

fn render_markup(view: &OverlayView) -> String {
    let mut html = String::new();
    match view {
        OverlayView::Block(block) => {
            html.push_str(r#"<div id="tokengate-overlay"><div class="tokengate-card">"#);
            html.push_str(r#"<h1 class="tokengate-title">Get back to work!</h1>"#);
            html.push_str(
                r#"<p class="tokengate-subtitle">You haven't hit your token goal yet.</p>"#,
            );
            let _ = write!(
                html,
                r#"<div class="tokengate-progress-fill" style="width: {}%"></div><div class="tokengate-progress-text">{}</div>"#,
                block.progress.percent,
                escape(&block.progress.counter)
            );
            if !block.breakdown.is_empty() {
                html.push_str(r#"<div class="tokengate-breakdown">"#);
                for row in &block.breakdown {
                    let _ = write!(
                        html,
                        r#"<div class="tokengate-breakdown-item">{}: {}</div>"#,
                        escape(&row.display_name),
                        escape(&row.tokens)
                    );
                }
                html.push_str("</div>");
            }
            push_actions(&mut html, "Refresh");
        }
        OverlayView::NotConnected(nc) => {
            html.push_str(
                r#"<div id="tokengate-overlay" class="tokengate-warning"><div class="tokengate-card">"#,
            );
            html.push_str(r#"<h1 class="tokengate-title">TokenGate Server Not Running</h1>"#);
            let _ = write!(
                html,
                r#"<p class="tokengate-subtitle">Cannot connect to {}</p>"#,
                escape(&nc.server_url)
            );
            html.push_str(
                r#"<div class="tokengate-help"><p>Start the server by running:</p><code>tokengate-server</code></div>"#,
            );
            push_actions(&mut html, "Retry");
        }
    }
    html.push_str("</div></div>");
    html
}

fn push_actions(html: &mut String, refresh_label: &str) {
    let _ = write!(
        html,
        r#"<div class="tokengate-actions"><button id="tokengate-settings">Open Settings</button><button id="tokengate-refresh">{refresh_label}</button></div>"#
    );
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "overlay_tests.rs"]
mod tests;
