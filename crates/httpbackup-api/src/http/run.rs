//! Manual run trigger.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use httpbackup_events::Delivery;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::http::errors::ApiError;
use crate::state::ApiState;

/// Acknowledgement for `POST /v1/run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunQueuedResponse {
    /// `false` when the control queue was full and the request was dropped.
    pub queued: bool,
}

/// Queue a `RunNow` signal. Whether a pass actually starts is up to the scheduler:
/// it is dropped while another pass is running.
pub(crate) async fn run_now(
    State(state): State<Arc<ApiState>>,
) -> Result<(StatusCode, Json<RunQueuedResponse>), ApiError> {
    match state.control.run_now() {
        Delivery::Closed => Err(ApiError::service_unavailable(
            "scheduler is no longer accepting requests",
        )),
        delivery => {
            let queued = delivery.is_queued();
            info!(queued, "manual run requested");
            Ok((StatusCode::ACCEPTED, Json(RunQueuedResponse { queued })))
        }
    }
}
