//! Configuration read/write endpoints.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use httpbackup_config::Config;
use httpbackup_events::Delivery;
use tracing::{error, info, warn};

use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn get_config(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Config>, ApiError> {
    let config = state.store.load_or_create().await.map_err(|err| {
        error!(error = %err, path = %state.store.path().display(), "failed to load configuration");
        ApiError::internal("failed to load configuration")
    })?;
    Ok(Json(config))
}

/// Replace the whole document; the scheduler picks it up through `ConfigChanged`.
pub(crate) async fn put_config(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<Config>, JsonRejection>,
) -> Result<Json<Config>, ApiError> {
    let Json(config) = payload.map_err(map_json_rejection)?;
    let saved = state.store.save(&config).await.map_err(|err| {
        error!(error = %err, path = %state.store.path().display(), "failed to save configuration");
        ApiError::internal("failed to save configuration")
    })?;
    info!(sites = saved.sites.len(), "configuration replaced via api");

    match state.control.config_changed() {
        Delivery::Queued | Delivery::Dropped => {}
        Delivery::Closed => warn!("scheduler stopped; saved configuration applies on restart"),
    }
    Ok(Json(saved))
}

fn map_json_rejection(rejection: JsonRejection) -> ApiError {
    let detail = rejection.body_text();
    if rejection.status() == StatusCode::UNPROCESSABLE_ENTITY {
        ApiError::config_invalid(detail)
    } else {
        ApiError::bad_request(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::router::tests::test_state;
    use axum::{
        body::Body,
        extract::FromRequest,
        http::{Request, header::CONTENT_TYPE},
    };
    use httpbackup_config::Site;
    use httpbackup_events::ControlSignal;

    async fn extract(raw: &'static str) -> anyhow::Result<Result<Json<Config>, JsonRejection>> {
        let request = Request::builder()
            .method("PUT")
            .uri("/v1/config")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(raw))?;
        Ok(Json::<Config>::from_request(request, &()).await)
    }

    #[tokio::test]
    async fn get_config_creates_default_document() -> anyhow::Result<()> {
        let (state, _receiver, _root) = test_state()?;
        let Json(config) = get_config(State(Arc::clone(&state)))
            .await
            .map_err(|err| anyhow::anyhow!("get_config failed with {}", err.status))?;
        assert_eq!(config, Config::initial().normalized());
        assert!(state.store.path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn put_config_saves_normalized_and_notifies() -> anyhow::Result<()> {
        let (state, mut receiver, root) = test_state()?;
        let submitted = Config {
            web_listen_addr: "127.0.0.1:9000".to_string(),
            interval_minutes: -4,
            backup_folder: root.path().join("archives"),
            retention: 0,
            sites: vec![
                Site {
                    enabled: true,
                    name: " Shop ".to_string(),
                    url: "http://shop.test/backup.zip".to_string(),
                },
                Site {
                    enabled: false,
                    name: "shop".to_string(),
                    url: "http://other.test/backup.zip".to_string(),
                },
            ],
        };

        let Json(saved) = put_config(State(Arc::clone(&state)), Ok(Json(submitted)))
            .await
            .map_err(|err| anyhow::anyhow!("put_config failed with {}", err.status))?;
        assert_eq!(saved.interval_minutes, 1);
        assert_eq!(saved.retention, 30);
        assert_eq!(saved.sites.len(), 1);
        assert_eq!(saved.sites[0].name, "Shop");

        assert_eq!(state.store.load().await?, saved);
        assert_eq!(receiver.try_recv().ok(), Some(ControlSignal::ConfigChanged));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() -> anyhow::Result<()> {
        let (state, mut receiver, _root) = test_state()?;
        let payload = extract("{\"Sites\": [").await?;
        let err = put_config(State(state), payload)
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected rejection"))?;
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(receiver.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn wrongly_typed_field_is_config_invalid() -> anyhow::Result<()> {
        let (state, _receiver, _root) = test_state()?;
        let payload = extract("{\"Retention\": \"many\"}").await?;
        let err = put_config(State(state), payload)
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected rejection"))?;
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        Ok(())
    }
}
