// Rollcall API server
// Decision: /edit-pdf, /health and /files stay at the root; versioned routes honour API_PREFIX
// Decision: Rendered certificates are served from /files only with the filesystem blob backend

mod certificates;
mod common;
mod config;
mod events;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Json, Router};
use rollcall_core::{
    BlobStore, Certificate, CertificateDistributor, CertificateLedger, CertificateWithEvent,
    DistributionOutcome, Event, EventStatus, PdfTemplateRenderer, RecordStore, StatusChange,
};
use rollcall_storage::{
    create_db_certificate_ledger, create_db_record_store, Database, FsBlobStore, HttpBlobStore,
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::common::ListResponse;
use crate::config::{ApiConfig, BlobBackend};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        certificates::edit_pdf,
        certificates::list_user_certificates,
        certificates::list_event_certificates,
        events::run_status_sweep,
    ),
    components(
        schemas(
            DistributionOutcome,
            Certificate, CertificateWithEvent,
            Event, EventStatus, StatusChange,
            ListResponse<Certificate>,
            ListResponse<CertificateWithEvent>,
            ListResponse<StatusChange>,
        )
    ),
    tags(
        (name = "certificates", description = "Certificate generation and listing endpoints"),
        (name = "events", description = "Event status maintenance endpoints")
    ),
    info(
        title = "Rollcall API",
        version = "0.1.0",
        description = "API for generating and distributing event attendance certificates",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rollcall_api=debug,rollcall_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("rollcall-api starting...");

    let config = ApiConfig::from_env()?;

    // Initialize database
    let db = Database::from_url(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    if config.run_migrations {
        db.migrate().await.context("Failed to run migrations")?;
        tracing::info!("Database migrations applied");
    }

    let records: Arc<dyn RecordStore> = Arc::new(create_db_record_store(db.clone()));
    let ledger: Arc<dyn CertificateLedger> = Arc::new(create_db_certificate_ledger(db));

    // Blob storage for rendered certificates
    let (blobs, served_root) = match &config.blob {
        BlobBackend::Fs {
            root,
            public_base_url,
        } => {
            let store = FsBlobStore::new(root, public_base_url.clone())
                .await
                .context("Failed to initialize blob directory")?;
            let root = store.root_dir().to_path_buf();
            (Arc::new(store) as Arc<dyn BlobStore>, Some(root))
        }
        BlobBackend::Http {
            endpoint,
            public_base_url,
            token,
        } => {
            let mut store = HttpBlobStore::new(endpoint.clone(), public_base_url.clone());
            if let Some(token) = token {
                store = store.with_token(token.clone());
            }
            tracing::info!(endpoint = %endpoint, "Using HTTP blob store");
            (Arc::new(store) as Arc<dyn BlobStore>, None)
        }
    };

    // Certificate template
    let renderer = PdfTemplateRenderer::from_path(
        &config.template_path,
        config.distribution.display_offset(),
    )
    .context("Failed to load certificate template")?;
    let page_width = renderer
        .validate()
        .context("Certificate template is not usable")?;
    tracing::info!(
        path = %config.template_path.display(),
        page_width,
        "Certificate template loaded"
    );

    tracing::info!(
        roster = ?config.distribution.roster,
        concurrency = config.distribution.max_concurrency,
        recipient_timeout_secs = config.distribution.recipient_timeout.as_secs(),
        batch_deadline_secs = ?config.distribution.batch_deadline_secs,
        "Distribution configured"
    );

    let distributor = Arc::new(CertificateDistributor::new(
        records.clone(),
        ledger.clone(),
        blobs,
        Arc::new(renderer),
        config.distribution.clone(),
    ));

    // Create module-specific states
    let certificates_state =
        certificates::AppState::new(distributor, records.clone(), ledger.clone());
    let events_state = events::AppState::new(records.clone());

    let sweep_task = config.status_sweep_interval.map(|period| {
        tracing::info!(interval_secs = period.as_secs(), "Periodic event status sweep enabled");
        events::spawn_status_sweep(records.clone(), period)
    });

    if !config.api_prefix.is_empty() {
        tracing::info!(prefix = %config.api_prefix, "API prefix configured");
    }

    let cors_origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?cors_origins, "CORS origins configured");
    }

    if let Some(root) = &served_root {
        tracing::info!(path = %root.display(), "Serving certificates under /files");
    }

    let app = build_app(
        certificates_state,
        events_state,
        served_root,
        &config.api_prefix,
    );

    // Add CORS layer only if origins are configured
    let app = if !cors_origins.is_empty() {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    header::ACCEPT,
                    header::ORIGIN,
                    header::CACHE_CONTROL,
                ])
                .allow_credentials(true),
        )
    } else {
        app
    };

    // Add tracing
    let app = app.layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Listening on {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(task) = sweep_task {
        task.abort();
    }
    tracing::info!("Server shut down");

    Ok(())
}

/// Assemble every route: health, the batch trigger and artifacts at the root,
/// versioned routes under the prefix, and Swagger UI
fn build_app(
    certificates_state: certificates::AppState,
    events_state: events::AppState,
    files_root: Option<PathBuf>,
    api_prefix: &str,
) -> Router {
    let api_routes = Router::new()
        .merge(certificates::routes(certificates_state.clone()))
        .merge(events::routes(events_state));

    let mut app = Router::new()
        .route("/health", get(health))
        .merge(certificates::distribution_routes(certificates_state));

    if let Some(root) = files_root {
        app = app.nest_service("/files", ServeDir::new(root));
    }

    app.merge(build_router_with_prefix(api_routes, api_prefix))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
}

/// Build router with optional API prefix (extracted for testing)
fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use rollcall_core::memory::{
        InMemoryBlobStore, InMemoryCertificateLedger, InMemoryRecordStore, StubRenderer,
    };
    use rollcall_core::DistributionConfig;
    use tower::ServiceExt;

    fn test_routes() -> Router {
        Router::new().route("/v1/test", get(|| async { "ok" }))
    }

    #[tokio::test]
    async fn test_api_prefix_empty() {
        let app = build_router_with_prefix(test_routes(), "");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_api_prefix_set() {
        let app = build_router_with_prefix(test_routes(), "/api");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        // Unprefixed path is gone
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_health() {
        let app = Router::new().route("/health", get(health));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "ok");
    }

    fn test_states() -> (certificates::AppState, events::AppState) {
        let records: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
        let ledger: Arc<dyn CertificateLedger> = Arc::new(InMemoryCertificateLedger::new());
        let distributor = CertificateDistributor::new(
            records.clone(),
            ledger.clone(),
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(StubRenderer::new()),
            DistributionConfig::default(),
        );
        (
            certificates::AppState::new(Arc::new(distributor), records.clone(), ledger),
            events::AppState::new(records),
        )
    }

    async fn status_of(app: &Router, uri: &str) -> StatusCode {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_app_serves_files_and_keeps_root_routes_unprefixed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pdfs")).unwrap();
        std::fs::write(dir.path().join("pdfs/U1-attendance.pdf"), b"%PDF-1.5").unwrap();
        let (certificates_state, events_state) = test_states();
        let app = build_app(
            certificates_state,
            events_state,
            Some(dir.path().to_path_buf()),
            "/api",
        );

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/files/pdfs/U1-attendance.pdf")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"%PDF-1.5");

        assert_eq!(status_of(&app, "/health").await, StatusCode::OK);
        assert_eq!(status_of(&app, "/edit-pdf").await, StatusCode::OK);
        assert_eq!(
            status_of(&app, "/api/v1/events/E1/certificates").await,
            StatusCode::OK
        );
        assert_eq!(
            status_of(&app, "/v1/events/E1/certificates").await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_app_without_files_root() {
        let (certificates_state, events_state) = test_states();
        let app = build_app(certificates_state, events_state, None, "");

        assert_eq!(
            status_of(&app, "/files/pdfs/U1-attendance.pdf").await,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(&app, "/v1/events/E1/certificates").await,
            StatusCode::OK
        );
    }

    #[test]
    fn test_openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/edit-pdf"));
        assert!(doc.paths.paths.contains_key("/v1/events/status-sweep"));
    }
}
