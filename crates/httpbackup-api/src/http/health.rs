//! Health and metrics endpoints.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::Response,
};
use httpbackup_telemetry::build_sha;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::http::errors::ApiError;
use crate::state::ApiState;

/// Liveness payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` while the process is serving.
    pub status: String,
    /// Build identifier.
    pub build: String,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        build: build_sha().to_string(),
    })
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.metrics.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::router::tests::test_state;

    #[tokio::test]
    async fn health_reports_ok_with_build() {
        let Json(body) = health().await;
        assert_eq!(body.status, "ok");
        assert!(!body.build.is_empty());
    }

    #[tokio::test]
    async fn metrics_render_as_prometheus_text() -> anyhow::Result<()> {
        let (state, _receiver, _root) = test_state()?;
        state.metrics.inc_run_started("manual");
        let response = metrics(State(state)).await.map_err(|err| {
            anyhow::anyhow!("metrics handler failed with {}", err.status)
        })?;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("text/plain"));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let text = String::from_utf8(bytes.to_vec())?;
        assert!(text.contains("backup_runs_started_total"));
        Ok(())
    }
}
