//! Event backlog and server-sent event stream.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
    response::sse::{self, Sse},
};
use futures_util::{Stream, StreamExt, future};
use httpbackup_events::{EventBus, EventEnvelope, EventId};
use serde::Deserialize;
use tracing::error;

use crate::http::constants::{HEADER_LAST_EVENT_ID, SSE_KEEP_ALIVE_SECS};
use crate::state::ApiState;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BacklogQuery {
    #[serde(default)]
    pub(crate) since: Option<EventId>,
}

pub(crate) async fn list_events(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<BacklogQuery>,
) -> Json<Vec<EventEnvelope>> {
    Json(state.events.backlog_since(query.since.unwrap_or(0)))
}

pub(crate) async fn stream_events(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<sse::Event, Infallible>> + Send> {
    let last_id = headers
        .get(HEADER_LAST_EVENT_ID)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<EventId>().ok());

    Sse::new(event_sse_stream(&state.events, last_id)).keep_alive(
        sse::KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEP_ALIVE_SECS))
            .text("keep-alive"),
    )
}

pub(crate) fn event_sse_stream(
    bus: &EventBus,
    since: Option<EventId>,
) -> impl Stream<Item = Result<sse::Event, Infallible>> + Send + use<> {
    bus.subscribe(since).filter_map(|envelope| {
        future::ready(match serde_json::to_string(&envelope) {
            Ok(payload) => Some(Ok(sse::Event::default()
                .id(envelope.id.to_string())
                .event(envelope.event.kind())
                .data(payload))),
            Err(err) => {
                error!(error = %err, "failed to serialise SSE event payload");
                None
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::router::tests::test_state;
    use httpbackup_events::{Event, RunTrigger};

    #[tokio::test]
    async fn backlog_honours_since() -> anyhow::Result<()> {
        let (state, _receiver, _root) = test_state()?;
        let first = state.events.publish(Event::RunSkipped {
            trigger: RunTrigger::Tick,
        });
        let _ = state.events.publish(Event::RunSkipped {
            trigger: RunTrigger::Manual,
        });

        let Json(all) =
            list_events(State(Arc::clone(&state)), Query(BacklogQuery::default())).await;
        assert_eq!(all.len(), 2);

        let Json(newer) =
            list_events(State(state), Query(BacklogQuery { since: Some(first) })).await;
        assert_eq!(newer.len(), 1);
        assert_eq!(
            newer[0].event,
            Event::RunSkipped {
                trigger: RunTrigger::Manual
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn sse_stream_replays_after_last_id() -> anyhow::Result<()> {
        let (state, _receiver, _root) = test_state()?;
        let first = state.events.publish(Event::RunSkipped {
            trigger: RunTrigger::Tick,
        });
        let _ = state.events.publish(Event::ConfigReloadFailed {
            message: "bad json".to_string(),
        });

        let mut stream = Box::pin(event_sse_stream(&state.events, Some(first)));
        let next = tokio::time::timeout(Duration::from_secs(1), stream.next()).await?;
        assert!(matches!(next, Some(Ok(_))));
        Ok(())
    }
}
