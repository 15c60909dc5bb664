// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use herald_broadcast::{BroadcastRequest, RawBroadcastRequest};
use herald_core::{BroadcastRecord, HealthStatus, HeraldError};
use serde::{Deserialize, Serialize};

use crate::server::GatewayState;

/// Default and maximum page size for `GET /broadcasts`.
const DEFAULT_RUNS_LIMIT: u32 = 20;
const MAX_RUNS_LIMIT: u32 = 200;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Maps a [`HeraldError`] onto a status code and `{"detail": ...}` body.
pub struct ApiError(HeraldError);

impl From<HeraldError> for ApiError {
    fn from(err: HeraldError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_invalid_request() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!(error = %self.0, "broadcast request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (
            status,
            Json(ErrorResponse {
                detail: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// POST /broadcast
///
/// Runs the broadcast to completion and returns its stats.
pub async fn post_broadcast(
    State(state): State<GatewayState>,
    body: Result<Json<RawBroadcastRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(raw) =
        body.map_err(|rejection| HeraldError::InvalidRequest(rejection.body_text()))?;
    let request = BroadcastRequest::try_from(raw)?;
    let response = state.broadcaster.run(request).await?;
    Ok((StatusCode::OK, Json(response.to_json())).into_response())
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct RunsResponse {
    pub runs: Vec<BroadcastRecord>,
}

/// GET /broadcasts?limit=N
pub async fn get_broadcasts(
    State(state): State<GatewayState>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<RunsResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RUNS_LIMIT)
        .clamp(1, MAX_RUNS_LIMIT);
    let runs = state.broadcaster.journal().recent_runs(limit).await?;
    Ok(Json(RunsResponse { runs }))
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub components: Vec<ComponentHealth>,
}

/// GET /health
///
/// 200 while every adapter is healthy or degraded, 503 otherwise.
pub async fn get_public_health(State(state): State<GatewayState>) -> Response {
    let mut components = Vec::with_capacity(state.health.components.len());
    let mut unhealthy = false;
    let mut degraded = false;

    for adapter in &state.health.components {
        let health = adapter
            .health_check()
            .await
            .unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()));
        let (status, detail) = match health {
            HealthStatus::Healthy => ("healthy", None),
            HealthStatus::Degraded(reason) => {
                degraded = true;
                ("degraded", Some(reason))
            }
            HealthStatus::Unhealthy(reason) => {
                unhealthy = true;
                ("unhealthy", Some(reason))
            }
        };
        components.push(ComponentHealth {
            name: adapter.name().to_string(),
            status: status.to_string(),
            detail,
        });
    }

    let overall = if unhealthy {
        "unhealthy"
    } else if degraded {
        "degraded"
    } else {
        "ok"
    };
    let code = if unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let body = HealthResponse {
        status: overall.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        components,
    };
    (code, Json(body)).into_response()
}

/// GET /metrics
pub async fn get_public_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_request_deserializes_with_defaults() {
        let json = r#"{"send_to": "all", "text": "Hello"}"#;
        let req: RawBroadcastRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.send_to, "all");
        assert!(req.photo.is_none());
        assert!(req.workers.is_none());
        assert!(req.messages_per_second.is_none());
    }

    #[test]
    fn error_response_uses_detail_key() {
        let json = serde_json::to_string(&ErrorResponse {
            detail: "Text cannot be empty".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"detail":"Text cannot be empty"}"#);
    }
}
