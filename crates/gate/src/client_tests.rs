// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use super::*;

/// Serve `router` on an ephemeral loopback port and return its base URL.
async fn serve(router: Router) -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{addr}"))
}

fn usage_body() -> serde_json::Value {
    json!({
        "total": { "inputTokens": 20000, "outputTokens": 12500, "reasoningTokens": 0, "totalTokens": 32500 },
        "breakdown": [
            { "source": "claude-code", "displayName": "Claude Code", "inputTokens": 20000,
              "outputTokens": 12500, "reasoningTokens": 0, "totalTokens": 32500, "available": true },
            { "source": "opencode", "displayName": "OpenCode", "inputTokens": 0, "outputTokens": 0,
              "reasoningTokens": 0, "totalTokens": 0, "available": false, "error": "OpenCode not installed" }
        ],
        "timestamp": "2026-10-15T12:00:00.000Z",
        "periodStart": "2026-10-15T07:00:00.000Z",
        "periodEnd": "2026-10-16T07:00:00.000Z",
        "cached": true
    })
}

#[tokio::test]
async fn fetches_usage_report() -> anyhow::Result<()> {
    let base = serve(Router::new().route("/usage", get(|| async { Json(usage_body()) }))).await?;

    let report = HttpUsageClient::new().fetch_usage(&base).await?;
    assert_eq!(report.current_tokens(), 32_500);
    assert!(report.cached);
    assert_eq!(report.breakdown.len(), 2);
    assert_eq!(report.breakdown[0].display_name, "Claude Code");
    assert!(!report.breakdown[1].available);
    Ok(())
}

#[tokio::test]
async fn trailing_slash_is_tolerated() -> anyhow::Result<()> {
    let base = serve(Router::new().route("/usage", get(|| async { Json(usage_body()) }))).await?;

    let report = HttpUsageClient::new().usage(&format!("{base}/")).await?;
    assert_eq!(report.current_tokens(), 32_500);
    Ok(())
}

#[tokio::test]
async fn health_reports_version() -> anyhow::Result<()> {
    let router = Router::new().route(
        "/health",
        get(|| async { Json(json!({ "status": "ok", "version": "1.0.0", "adapters": ["codex"] })) }),
    );
    let base = serve(router).await?;

    let info = HttpUsageClient::new().health(&base).await?;
    assert_eq!(info.status, "ok");
    assert_eq!(info.adapters, ["codex"]);
    Ok(())
}

#[tokio::test]
async fn error_status_is_reported() -> anyhow::Result<()> {
    let router = Router::new().route("/usage", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
    let base = serve(router).await?;

    let err = HttpUsageClient::new().usage(&base).await.err();
    assert_eq!(err, Some(ClientError::Status(503)));
    Ok(())
}

#[tokio::test]
async fn non_json_body_is_decode_error() -> anyhow::Result<()> {
    let base = serve(Router::new().route("/usage", get(|| async { "hello" }))).await?;

    let err = HttpUsageClient::new().usage(&base).await.err();
    assert!(matches!(err, Some(ClientError::Decode(_))), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn closed_port_is_unreachable() -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let err = HttpUsageClient::new().usage(&format!("http://{addr}")).await.err();
    assert!(matches!(err, Some(ClientError::Request(_))), "got {err:?}");
    Ok(())
}

#[test]
fn missing_fields_default_to_zero() -> anyhow::Result<()> {
    let report: UsageReport = serde_json::from_value(json!({}))?;
    assert_eq!(report.current_tokens(), 0);
    assert!(report.breakdown.is_empty());
    Ok(())
}
