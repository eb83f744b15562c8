// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the usage service.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, Uri};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::adapter::ADAPTER_NAMES;
use crate::error::ApiError;
use crate::state::ServerState;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub adapters: Vec<String>,
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_owned(),
        version: VERSION.to_owned(),
        adapters: ADAPTER_NAMES.iter().map(|n| (*n).to_owned()).collect(),
    })
}

/// `GET /usage`: aggregated usage for today. Always 200; adapter failures
/// are reported per entry in `breakdown`.
pub async fn usage(State(s): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(s.usage().await)
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::RouteNotFound { path: uri.path().to_owned() }
}

pub async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed { method: method.to_string(), path: uri.path().to_owned() }
}
