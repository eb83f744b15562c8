// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the usage HTTP API.
//!
//! Uses `axum_test::TestServer`, no real TCP needed.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum_test::TestServer;
use clap::Parser;
use tower::ServiceExt;

use tokengate_server::adapter::{AdapterError, ADAPTER_NAMES};
use tokengate_server::aggregator::Aggregator;
use tokengate_server::config::ServerConfig;
use tokengate_server::state::ServerState;
use tokengate_server::test_support::FakeAdapter;
use tokengate_server::transport::build_router;
use tokengate_server::usage::{AggregatedUsage, UsageData};

fn test_config(cache_ttl: u64) -> ServerConfig {
    ServerConfig::parse_from([
        "tokengate-server",
        "--port",
        "0",
        "--cache-ttl",
        &cache_ttl.to_string(),
        "--adapters",
        "all",
    ])
}

fn test_state(cache_ttl: u64, aggregator: Aggregator) -> Arc<ServerState> {
    Arc::new(ServerState::with_aggregator(test_config(cache_ttl), aggregator))
}

fn test_server(state: Arc<ServerState>) -> anyhow::Result<TestServer> {
    Ok(TestServer::new(build_router(state))?)
}

#[tokio::test]
async fn health_lists_adapters() -> anyhow::Result<()> {
    let server = test_server(test_state(30, Aggregator::new(vec![], Duration::from_secs(5))))?;

    let resp = server.get("/health").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["adapters"], serde_json::json!(ADAPTER_NAMES));
    Ok(())
}

#[tokio::test]
async fn usage_reports_breakdown_in_order() -> anyhow::Result<()> {
    let aggregator = Aggregator::new(
        vec![
            FakeAdapter::new("claude-code", UsageData::new(20_000, 10_000, 0)).into_arc(),
            FakeAdapter::new("opencode", UsageData::default()).not_installed().into_arc(),
            FakeAdapter::new("codex", UsageData::new(800, 300, 50)).into_arc(),
        ],
        Duration::from_secs(5),
    );
    let server = test_server(test_state(30, aggregator))?;

    let resp = server.get("/usage").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["cached"], false);
    assert_eq!(body["total"]["inputTokens"], 20_800);
    assert_eq!(body["total"]["outputTokens"], 10_300);
    assert_eq!(body["total"]["reasoningTokens"], 50);
    assert_eq!(body["total"]["totalTokens"], 31_150);

    let sources: Vec<&str> =
        body["breakdown"].as_array().into_iter().flatten().filter_map(|b| b["source"].as_str()).collect();
    assert_eq!(sources, ["claude-code", "opencode", "codex"]);
    assert_eq!(body["breakdown"][1]["available"], false);
    assert!(body["breakdown"][1]["error"].is_string());
    assert!(body["breakdown"][0].get("error").is_none());
    assert!(body["periodStart"].is_string());
    assert!(body["periodEnd"].is_string());
    assert!(body["timestamp"].is_string());
    Ok(())
}

#[tokio::test]
async fn usage_within_ttl_is_cached() -> anyhow::Result<()> {
    let fake = FakeAdapter::new("codex", UsageData::new(1, 1, 1));
    let calls = fake.usage_counter();
    let state = test_state(30, Aggregator::new(vec![fake.into_arc()], Duration::from_secs(5)));
    let server = test_server(Arc::clone(&state))?;

    let first: AggregatedUsage = server.get("/usage").await.json();
    let second: AggregatedUsage = server.get("/usage").await.json();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.snapshot, second.snapshot);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.aggregation_count(), 1);
    Ok(())
}

#[tokio::test]
async fn usage_after_ttl_reaggregates() -> anyhow::Result<()> {
    let fake = FakeAdapter::new("codex", UsageData::new(1, 1, 1));
    let calls = fake.usage_counter();
    let state = test_state(0, Aggregator::new(vec![fake.into_arc()], Duration::from_secs(5)));
    let server = test_server(state)?;

    let first: AggregatedUsage = server.get("/usage").await.json();
    let second: AggregatedUsage = server.get("/usage").await.json();

    assert!(!first.cached);
    assert!(!second.cached);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn concurrent_misses_aggregate_once() -> anyhow::Result<()> {
    let fake = FakeAdapter::new("slow", UsageData::new(5, 0, 0)).delayed(Duration::from_millis(100));
    let calls = fake.usage_counter();
    let state = test_state(30, Aggregator::new(vec![fake.into_arc()], Duration::from_secs(5)));

    let requests = (0..8).map(|_| {
        let state = Arc::clone(&state);
        tokio::spawn(async move { state.usage().await })
    });
    let results = futures_util::future::join_all(requests).await;

    let mut fresh = 0;
    for result in results {
        let usage = result?;
        assert_eq!(usage.snapshot.total.total_tokens, 5);
        if !usage.cached {
            fresh += 1;
        }
    }
    assert_eq!(fresh, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.aggregation_count(), 1);
    Ok(())
}

#[tokio::test]
async fn usage_is_200_when_nothing_available() -> anyhow::Result<()> {
    let aggregator = Aggregator::new(
        vec![
            FakeAdapter::new("claude-code", UsageData::default()).not_installed().into_arc(),
            FakeAdapter::new("codex", UsageData::default())
                .failing(AdapterError::Parse { tool: "codex".into(), message: "EOF".into() })
                .into_arc(),
        ],
        Duration::from_secs(5),
    );
    let server = test_server(test_state(30, aggregator))?;

    let resp = server.get("/usage").await;
    resp.assert_status(StatusCode::OK);
    let usage: AggregatedUsage = resp.json();
    assert_eq!(usage.snapshot.total, UsageData::default());
    assert!(usage.snapshot.breakdown.iter().all(|b| !b.available));
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_json_404() -> anyhow::Result<()> {
    let server = test_server(test_state(30, Aggregator::new(vec![], Duration::from_secs(5))))?;

    let resp = server.get("/nope").await;
    resp.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn post_usage_is_405() -> anyhow::Result<()> {
    let server = test_server(test_state(30, Aggregator::new(vec![], Duration::from_secs(5))))?;

    let resp = server.post("/usage").await;
    resp.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    Ok(())
}

#[tokio::test]
async fn cors_preflight_allows_extension_origin() -> anyhow::Result<()> {
    let router = build_router(test_state(30, Aggregator::new(vec![], Duration::from_secs(5))));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/usage")
        .header(header::ORIGIN, "chrome-extension://abcdef")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())?;

    let resp = router.oneshot(request).await?;

    assert!(resp.status().is_success());
    let allow_origin = resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN);
    assert_eq!(allow_origin.and_then(|v| v.to_str().ok()), Some("*"));
    let allow_methods = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(allow_methods.contains("GET"));
    Ok(())
}
