// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Requests the router cannot serve.
///
/// Adapter failures never surface here; they are reported inside the
/// `/usage` breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    RouteNotFound { path: String },
    MethodNotAllowed { method: String, path: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::RouteNotFound { .. } => "NOT_FOUND",
            Self::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::RouteNotFound { path } => format!("no route for {path}"),
            Self::MethodNotAllowed { method, path } => {
                format!("{method} not supported on {path}, use GET")
            }
        }
    }

    pub fn to_body(&self) -> ErrorResponse {
        ErrorResponse { error: ErrorBody { code: self.code().to_owned(), message: self.message() } }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::debug!(code = self.code(), "{}", self.message());
        (self.status(), Json(self.to_body())).into_response()
    }
}

/// Top-level error response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
