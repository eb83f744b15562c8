// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tokengate server: aggregates today's token usage across coding CLIs and
//! serves it over local HTTP.

pub mod adapter;
pub mod aggregator;
pub mod cache;
pub mod config;
pub mod error;
pub mod exec;
pub mod period;
pub mod state;
pub mod test_support;
pub mod transport;
pub mod usage;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::state::ServerState;
use crate::transport::build_router;

/// Run the usage server until ctrl-c.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let shutdown = CancellationToken::new();

    let state = Arc::new(ServerState::new(config.clone()));
    tracing::info!(
        adapters = %config.adapters,
        enabled = state.adapter_count(),
        cache_ttl_secs = config.cache_ttl,
        "tokengate-server listening on {addr}"
    );

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutting down");
            }
            shutdown.cancel();
        });
    }

    let router = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}
