// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn not_found() -> ApiError {
    ApiError::RouteNotFound { path: "/metrics".into() }
}

fn not_allowed() -> ApiError {
    ApiError::MethodNotAllowed { method: "POST".into(), path: "/usage".into() }
}

#[yare::parameterized(
    not_found   = { super::not_found(), StatusCode::NOT_FOUND, "NOT_FOUND" },
    not_allowed = { super::not_allowed(), StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED" },
)]
fn status_and_code(err: ApiError, status: StatusCode, code: &str) {
    assert_eq!(err.status(), status);
    assert_eq!(err.code(), code);
    assert_eq!(err.to_body().error.code, code);
}

#[test]
fn messages_name_the_request() {
    assert_eq!(not_found().to_string(), "NOT_FOUND: no route for /metrics");
    assert!(not_allowed().message().contains("POST"));
}

#[test]
fn envelope_shape() -> anyhow::Result<()> {
    let value = serde_json::to_value(not_found().to_body())?;
    assert_eq!(
        value,
        serde_json::json!({ "error": { "code": "NOT_FOUND", "message": "no route for /metrics" } })
    );
    Ok(())
}

#[test]
fn into_response_uses_status() {
    let resp = not_allowed().into_response();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}
