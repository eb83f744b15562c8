// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Browser-side gate: decides which tabs to block, keeps their overlays in
//! sync with the usage server, and models the overlay itself.

pub mod client;
pub mod matcher;
pub mod message;
pub mod overlay;
pub mod settings;
pub mod status;
pub mod test_support;
pub mod tracker;
