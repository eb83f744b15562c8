// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `tokengate-server` binary.

use std::time::Duration;

use tokengate_gate::client::HttpUsageClient;
use tokengate_gate::status::connection_summary;
use tokengate_specs::ServerProcess;

const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn health() -> anyhow::Result<()> {
    let server = ServerProcess::start()?;
    server.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value =
        reqwest::get(format!("{}/health", server.base_url())).await?.json().await?;

    assert_eq!(resp["status"], "ok");
    assert!(resp["version"].is_string());
    assert_eq!(resp["adapters"], serde_json::json!(["claude-code", "opencode", "codex"]));
    Ok(())
}

#[tokio::test]
async fn usage_with_no_adapters_is_zero() -> anyhow::Result<()> {
    let server = ServerProcess::start()?;
    server.wait_healthy(TIMEOUT).await?;

    let resp = reqwest::get(format!("{}/usage", server.base_url())).await?;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = resp.json().await?;

    assert_eq!(body["total"]["totalTokens"], 0);
    assert_eq!(body["breakdown"], serde_json::json!([]));
    assert_eq!(body["cached"], false);
    assert!(body["periodStart"].as_str().is_some_and(|s| s.ends_with('Z')));
    Ok(())
}

#[tokio::test]
async fn second_usage_is_cached() -> anyhow::Result<()> {
    let server = ServerProcess::start()?;
    server.wait_healthy(TIMEOUT).await?;

    let client = reqwest::Client::new();
    let url = format!("{}/usage", server.base_url());
    let first: serde_json::Value = client.get(&url).send().await?.json().await?;
    let second: serde_json::Value = client.get(&url).send().await?.json().await?;

    assert_eq!(first["cached"], false);
    assert_eq!(second["cached"], true);
    assert_eq!(first["timestamp"], second["timestamp"]);
    Ok(())
}

#[tokio::test]
async fn zero_ttl_never_caches() -> anyhow::Result<()> {
    let server = ServerProcess::build().cache_ttl(0).spawn()?;
    server.wait_healthy(TIMEOUT).await?;

    let client = reqwest::Client::new();
    let url = format!("{}/usage", server.base_url());
    for _ in 0..2 {
        let body: serde_json::Value = client.get(&url).send().await?.json().await?;
        assert_eq!(body["cached"], false);
    }
    Ok(())
}

#[tokio::test]
async fn cors_allows_any_origin() -> anyhow::Result<()> {
    let server = ServerProcess::start()?;
    server.wait_healthy(TIMEOUT).await?;

    let resp = reqwest::Client::new()
        .get(format!("{}/health", server.base_url()))
        .header("Origin", "chrome-extension://abcdef")
        .send()
        .await?;

    let allow = resp.headers().get("access-control-allow-origin").and_then(|v| v.to_str().ok());
    assert_eq!(allow, Some("*"));
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_404() -> anyhow::Result<()> {
    let server = ServerProcess::start()?;
    server.wait_healthy(TIMEOUT).await?;

    let resp = reqwest::get(format!("{}/metrics", server.base_url())).await?;
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn gate_client_reads_real_server() -> anyhow::Result<()> {
    let server = ServerProcess::start()?;
    server.wait_healthy(TIMEOUT).await?;

    let client = HttpUsageClient::new();
    let report = client.usage(&server.base_url()).await?;
    assert_eq!(report.current_tokens(), 0);

    let health = client.health(&server.base_url()).await;
    assert!(connection_summary(&health).starts_with("UPLINK_ESTABLISHED"));
    Ok(())
}

#[tokio::test]
async fn invalid_log_format_exits_2() -> anyhow::Result<()> {
    let mut server = ServerProcess::build().log_format("xml").spawn()?;

    let status = server.wait_exit(TIMEOUT).await?;
    assert_eq!(status.code(), Some(2));
    Ok(())
}
