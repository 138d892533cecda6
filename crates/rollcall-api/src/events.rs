// Event status HTTP routes and the periodic sweep task

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::Utc;
use rollcall_core::{sweep_event_statuses, RecordStore, StatusChange};
use tokio::task::JoinHandle;

use crate::common::ListResponse;

/// App state for event routes
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn RecordStore>,
}

impl AppState {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }
}

/// Create event routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/events/status-sweep", post(run_status_sweep))
        .with_state(state)
}

/// POST /v1/events/status-sweep - Move events into Ongoing / Accomplished
#[utoipa::path(
    post,
    path = "/v1/events/status-sweep",
    responses(
        (status = 200, description = "Status changes applied", body = ListResponse<StatusChange>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "events"
)]
pub async fn run_status_sweep(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<StatusChange>>, StatusCode> {
    let changes = sweep_event_statuses(state.records.as_ref(), Utc::now())
        .await
        .map_err(|e| {
            tracing::error!("Failed to sweep event statuses: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(ListResponse::new(changes)))
}

/// Run the status sweep every `period` until the task is aborted
pub fn spawn_status_sweep(records: Arc<dyn RecordStore>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_event_statuses(records.as_ref(), Utc::now()).await {
                tracing::warn!(error = %e, "Periodic event status sweep failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use rollcall_core::memory::{fixtures, InMemoryRecordStore};
    use rollcall_core::EventStatus;
    use serde_json::Value;
    use tower::ServiceExt;

    fn sweep_request() -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/events/status-sweep")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_status_sweep_route() {
        let records = Arc::new(InMemoryRecordStore::new());
        // fixture window ended in 2024
        records
            .add_event(fixtures::event("E1", EventStatus::Ongoing))
            .await;
        let app = routes(AppState::new(records.clone()));

        let response = app.oneshot(sweep_request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["data"][0]["event_id"], "E1");
        assert_eq!(body["data"][0]["to"], "Accomplished");
        assert_eq!(
            records.event_status("E1").await,
            Some(EventStatus::Accomplished)
        );
    }

    #[tokio::test]
    async fn test_status_sweep_route_error() {
        let records = Arc::new(InMemoryRecordStore::new());
        records.fail_reads("database unavailable").await;
        let app = routes(AppState::new(records));

        let response = app.oneshot(sweep_request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sweep() {
        let records = Arc::new(InMemoryRecordStore::new());
        let handle = spawn_status_sweep(records.clone(), Duration::from_secs(60));

        // First tick fires immediately; add the event afterwards
        tokio::time::sleep(Duration::from_secs(1)).await;
        records
            .add_event(fixtures::event("E1", EventStatus::Scheduled))
            .await;
        assert_eq!(records.event_status("E1").await, Some(EventStatus::Scheduled));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(
            records.event_status("E1").await,
            Some(EventStatus::Accomplished)
        );
        handle.abort();
    }
}
