// Certificate HTTP routes
//
// /edit-pdf is the batch trigger used by the admin UI; it keeps its legacy
// unversioned path and is mounted outside API_PREFIX. Listing routes are
// read-only views over the certificate ledger.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rollcall_core::{
    Certificate, CertificateDistributor, CertificateLedger, CertificateWithEvent,
    DistributionOutcome, RecordStore,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::common::ListResponse;

/// Message for batches that failed outside the known preconditions
const GENERIC_ERROR_MESSAGE: &str = "Error generating certificates";

/// App state for certificate routes
#[derive(Clone)]
pub struct AppState {
    pub distributor: Arc<CertificateDistributor>,
    pub records: Arc<dyn RecordStore>,
    pub ledger: Arc<dyn CertificateLedger>,
}

impl AppState {
    pub fn new(
        distributor: Arc<CertificateDistributor>,
        records: Arc<dyn RecordStore>,
        ledger: Arc<dyn CertificateLedger>,
    ) -> Self {
        Self {
            distributor,
            records,
            ledger,
        }
    }
}

/// Batch trigger route (not prefixed)
pub fn distribution_routes(state: AppState) -> Router {
    Router::new()
        .route("/edit-pdf", get(edit_pdf))
        .with_state(state)
}

/// Certificate listing routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/users/:user_id/certificates", get(list_user_certificates))
        .route("/v1/events/:event_id/certificates", get(list_event_certificates))
        .with_state(state)
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EditPdfParams {
    /// Event to generate certificates for
    pub event: Option<String>,
}

/// GET /edit-pdf?event={event_id} - Generate and distribute certificates for an event
#[utoipa::path(
    get,
    path = "/edit-pdf",
    params(EditPdfParams),
    responses(
        (status = 200, description = "Batch finished, or a precondition was not met", body = DistributionOutcome),
        (status = 500, description = "Unexpected failure while gathering records", body = DistributionOutcome),
    ),
    tag = "certificates"
)]
pub async fn edit_pdf(
    State(state): State<AppState>,
    Query(params): Query<EditPdfParams>,
) -> Result<Json<DistributionOutcome>, (StatusCode, Json<DistributionOutcome>)> {
    let Some(event_id) = params.event.filter(|e| !e.trim().is_empty()) else {
        return Ok(Json(DistributionOutcome::failed("Event not found")));
    };

    match state.distributor.distribute_certificates(&event_id).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            tracing::error!(event_id = %event_id, error = %e, "Failed to generate certificates");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DistributionOutcome::failed(GENERIC_ERROR_MESSAGE)),
            ))
        }
    }
}

/// GET /v1/users/{user_id}/certificates - Certificates held by a user, with their events
#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/certificates",
    params(
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Certificates held by the user", body = ListResponse<CertificateWithEvent>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "certificates"
)]
pub async fn list_user_certificates(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ListResponse<CertificateWithEvent>>, StatusCode> {
    let certificates = state.ledger.list_for_user(&user_id).await.map_err(|e| {
        tracing::error!("Failed to list certificates for user: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let mut joined = Vec::with_capacity(certificates.len());
    for certificate in certificates {
        let event = state
            .records
            .get_event(&certificate.event_id)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load event for certificate: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
        joined.push(CertificateWithEvent { certificate, event });
    }

    Ok(Json(ListResponse::new(joined)))
}

/// GET /v1/events/{event_id}/certificates - Certificates issued for an event
#[utoipa::path(
    get,
    path = "/v1/events/{event_id}/certificates",
    params(
        ("event_id" = String, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Certificates issued for the event", body = ListResponse<Certificate>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "certificates"
)]
pub async fn list_event_certificates(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<ListResponse<Certificate>>, StatusCode> {
    let certificates = state.ledger.list_for_event(&event_id).await.map_err(|e| {
        tracing::error!("Failed to list certificates for event: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(ListResponse::new(certificates)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use rollcall_core::memory::{
        fixtures, InMemoryBlobStore, InMemoryCertificateLedger, InMemoryRecordStore, StubRenderer,
    };
    use rollcall_core::{DistributionConfig, EventStatus, User, SUCCESS_MESSAGE};
    use serde_json::Value;
    use tower::ServiceExt;

    struct TestApp {
        records: Arc<InMemoryRecordStore>,
        ledger: Arc<InMemoryCertificateLedger>,
        router: Router,
    }

    fn test_app() -> TestApp {
        let records = Arc::new(InMemoryRecordStore::new());
        let ledger = Arc::new(InMemoryCertificateLedger::new());
        let distributor = CertificateDistributor::new(
            records.clone(),
            ledger.clone(),
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(StubRenderer::new()),
            DistributionConfig::default(),
        );
        let state = AppState::new(Arc::new(distributor), records.clone(), ledger.clone());
        let router = distribution_routes(state.clone()).merge(routes(state));
        TestApp {
            records,
            ledger,
            router,
        }
    }

    async fn seed_event(records: &InMemoryRecordStore) {
        records
            .add_event(fixtures::event("E1", EventStatus::Accomplished))
            .await;
        records.add_attendance(fixtures::attendance("E1", "U1")).await;
        records.add_evaluation(fixtures::evaluation("E1")).await;
        records.add_response(fixtures::response("E1", "U1")).await;
        records
            .add_user(User::student("U1", "Ada Lovelace", "ada@school.edu"))
            .await;
    }

    async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_edit_pdf_success() {
        let app = test_app();
        seed_event(&app.records).await;

        let (status, body) = get_json(&app.router, "/edit-pdf?event=E1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], SUCCESS_MESSAGE);
        assert_eq!(app.ledger.all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_edit_pdf_without_event_param() {
        let app = test_app();

        for uri in ["/edit-pdf", "/edit-pdf?event="] {
            let (status, body) = get_json(&app.router, uri).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], false);
            assert_eq!(body["message"], "Event not found");
        }
    }

    #[tokio::test]
    async fn test_edit_pdf_precondition_message() {
        let app = test_app();
        app.records
            .add_event(fixtures::event("E1", EventStatus::Accomplished))
            .await;

        let (status, body) = get_json(&app.router, "/edit-pdf?event=E1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "No attendance were found in the record");
        assert!(app.ledger.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_edit_pdf_unclassified_error_is_500() {
        let app = test_app();
        app.records.fail_reads("connection reset").await;

        let (status, body) = get_json(&app.router, "/edit-pdf?event=E1").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Error generating certificates");
    }

    #[tokio::test]
    async fn test_list_certificates_after_batch() {
        let app = test_app();
        seed_event(&app.records).await;
        get_json(&app.router, "/edit-pdf?event=E1").await;

        let (status, body) = get_json(&app.router, "/v1/users/U1/certificates").await;
        assert_eq!(status, StatusCode::OK);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["user_id"], "U1");
        assert_eq!(data[0]["event"]["title"], "tech talk");
        assert!(data[0]["cert"].as_str().unwrap().starts_with("memory://pdfs/U1-"));

        let (status, body) = get_json(&app.router, "/v1/events/E1/certificates").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (_, body) = get_json(&app.router, "/v1/users/U2/certificates").await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }
}
